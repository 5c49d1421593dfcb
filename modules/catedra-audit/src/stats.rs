use std::fmt;

use crate::pipeline::PostOutcome;

/// Tally of one audit run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuditStats {
    /// Posts handed to the analysis provider.
    pub attempted: u32,
    pub matched: u32,
    pub no_result: u32,
    pub timed_out: u32,
    pub unmatched: u32,
    pub failed: u32,
    pub rejected: u32,
    pub already_processed: u32,
    /// Posts absent from the store when reached.
    pub missing: u32,
    /// Posts never reached because the run was cancelled.
    pub cancelled: u32,
    pub by_sentiment: [u32; 3], // Positive, Neutral, Negative
}

impl AuditStats {
    pub fn record(&mut self, outcome: &PostOutcome) {
        match outcome {
            PostOutcome::AlreadyProcessed => self.already_processed += 1,
            PostOutcome::Missing => self.missing += 1,
            PostOutcome::Matched { sentiment, .. } => {
                self.attempted += 1;
                self.matched += 1;
                self.by_sentiment[sentiment.index()] += 1;
            }
            PostOutcome::NoResult => {
                self.attempted += 1;
                self.no_result += 1;
            }
            PostOutcome::TimedOut => {
                self.attempted += 1;
                self.timed_out += 1;
            }
            PostOutcome::Unmatched { .. } => {
                self.attempted += 1;
                self.unmatched += 1;
            }
            PostOutcome::Failed(_) => {
                self.attempted += 1;
                self.failed += 1;
            }
            PostOutcome::Rejected(_) => {
                self.attempted += 1;
                self.rejected += 1;
            }
        }
    }

    /// Analyzed posts that stayed pending.
    pub fn skipped(&self) -> u32 {
        self.no_result + self.timed_out + self.unmatched + self.failed + self.rejected
    }
}

impl fmt::Display for AuditStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "\n=== Audit Run Complete ===")?;
        writeln!(f, "Posts analyzed:     {}", self.attempted)?;
        writeln!(f, "Matched:            {}", self.matched)?;
        writeln!(f, "No result:          {}", self.no_result)?;
        writeln!(f, "Timed out:          {}", self.timed_out)?;
        writeln!(f, "Unknown department: {}", self.unmatched)?;
        writeln!(f, "Provider errors:    {}", self.failed)?;
        writeln!(f, "Rejected by store:  {}", self.rejected)?;
        writeln!(f, "Already processed:  {}", self.already_processed)?;
        if self.missing > 0 {
            writeln!(f, "Not in store:       {}", self.missing)?;
        }
        if self.cancelled > 0 {
            writeln!(f, "Not reached:        {} (cancelled)", self.cancelled)?;
        }
        let total = self.matched.max(1) as f64;
        writeln!(f, "\nBy sentiment:")?;
        for (label, count) in ["POSITIVO", "NEUTRAL", "NEGATIVO"]
            .iter()
            .zip(self.by_sentiment)
        {
            let pct = count as f64 / total * 100.0;
            writeln!(f, "  {:<9} {} ({:.0}%)", format!("{label}:"), count, pct)?;
        }
        Ok(())
    }
}
