//! Sequential AI audit over unprocessed posts.
//!
//! Each pending post is sent to the analysis provider with the current list
//! of department names. A result whose department resolves to a known one is
//! recorded in the store; anything else leaves the post pending for the next
//! run. Calls are strictly one at a time with a fixed pause between them.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use catedra_common::{Config, Recommendation, ScrapedPost, Sentiment};

use crate::matching::resolve_department;
use crate::stats::AuditStats;
use crate::store::{StateStore, StoreError};
use crate::traits::PostAnalyzer;

const DEFAULT_PACING: Duration = Duration::from_millis(800);
const DEFAULT_ANALYSIS_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuditConfig {
    /// Pause between consecutive provider calls.
    pub pacing: Duration,
    /// Upper bound on a single provider call. Exceeding it counts as no result.
    pub analysis_timeout: Duration,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            pacing: DEFAULT_PACING,
            analysis_timeout: DEFAULT_ANALYSIS_TIMEOUT,
        }
    }
}

impl From<&Config> for AuditConfig {
    fn from(config: &Config) -> Self {
        Self {
            pacing: config.pacing,
            analysis_timeout: config.analysis_timeout,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuditError {
    #[error("an audit run is already in progress")]
    AlreadyRunning,
}

/// Progress notifications, one per state change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuditStatus {
    Started { pending: usize },
    Processing { position: usize, total: usize, post_id: i64 },
    Finished { total: usize, matched: u32 },
    Cancelled { reached: usize, total: usize },
}

impl fmt::Display for AuditStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuditStatus::Started { pending } => write!(f, "starting audit of {pending} posts"),
            AuditStatus::Processing {
                position,
                total,
                post_id,
            } => write!(f, "processing post {position}/{total} (id {post_id})"),
            AuditStatus::Finished { total, matched } => {
                write!(f, "audit finished: {matched} of {total} posts matched")
            }
            AuditStatus::Cancelled { reached, total } => {
                write!(f, "audit cancelled after {reached} of {total} posts")
            }
        }
    }
}

/// What happened to a single post.
#[derive(Debug, Clone, PartialEq)]
pub enum PostOutcome {
    Matched {
        department_id: i64,
        recommendation_id: i64,
        sentiment: Sentiment,
    },
    /// Already processed when its turn came; the provider was not called.
    AlreadyProcessed,
    /// No longer in the store when its turn came; the provider was not called.
    Missing,
    NoResult,
    TimedOut,
    /// The provider named a department that is not in the store.
    Unmatched { department_name: String },
    Failed(String),
    Rejected(StoreError),
}

pub struct AuditPipeline {
    analyzer: Arc<dyn PostAnalyzer>,
    config: AuditConfig,
    running: AtomicBool,
    progress: Option<mpsc::UnboundedSender<AuditStatus>>,
}

impl AuditPipeline {
    pub fn new(analyzer: Arc<dyn PostAnalyzer>, config: AuditConfig) -> Self {
        Self {
            analyzer,
            config,
            running: AtomicBool::new(false),
            progress: None,
        }
    }

    pub fn with_progress(mut self, tx: mpsc::UnboundedSender<AuditStatus>) -> Self {
        self.progress = Some(tx);
        self
    }

    pub fn config(&self) -> &AuditConfig {
        &self.config
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Audit every post that is unprocessed at the start of the run.
    pub async fn run(
        &self,
        store: &mut StateStore,
        cancel: &CancellationToken,
    ) -> Result<AuditStats, AuditError> {
        let pending = store.pending_posts();
        self.run_batch(store, pending, cancel).await
    }

    /// Audit the given posts in order. Posts that are processed (or gone)
    /// by the time they are reached are skipped without calling the provider.
    pub async fn run_batch(
        &self,
        store: &mut StateStore,
        posts: Vec<ScrapedPost>,
        cancel: &CancellationToken,
    ) -> Result<AuditStats, AuditError> {
        let _guard = RunGuard::acquire(&self.running)?;

        let total = posts.len();
        let candidates = store.department_names();
        let mut stats = AuditStats::default();
        let mut called_before = false;

        info!(pending = total, departments = candidates.len(), "Audit started");
        self.emit(AuditStatus::Started { pending: total });

        for (i, post) in posts.iter().enumerate() {
            if cancel.is_cancelled() {
                return Ok(self.cancelled(stats, i, total));
            }

            match store.post(post.id) {
                Some(current) if current.processed => {
                    debug!(post_id = post.id, "Post already processed, skipping");
                    stats.record(&PostOutcome::AlreadyProcessed);
                    continue;
                }
                None => {
                    warn!(post_id = post.id, "Post not in store, skipping");
                    stats.record(&PostOutcome::Missing);
                    continue;
                }
                Some(_) => {}
            }

            if called_before {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => {
                        return Ok(self.cancelled(stats, i, total));
                    }
                    _ = tokio::time::sleep(self.config.pacing) => {}
                }
            }
            called_before = true;

            self.emit(AuditStatus::Processing {
                position: i + 1,
                total,
                post_id: post.id,
            });

            let outcome = self.audit_post(store, post, &candidates).await;
            stats.record(&outcome);
        }

        info!(
            total,
            matched = stats.matched,
            skipped = stats.skipped(),
            already_processed = stats.already_processed,
            missing = stats.missing,
            "Audit finished"
        );
        self.emit(AuditStatus::Finished {
            total,
            matched: stats.matched,
        });
        Ok(stats)
    }

    async fn audit_post(
        &self,
        store: &mut StateStore,
        post: &ScrapedPost,
        candidates: &[String],
    ) -> PostOutcome {
        let call = self.analyzer.analyze(&post.text, candidates);
        let result = match tokio::time::timeout(self.config.analysis_timeout, call).await {
            Err(_) => {
                warn!(
                    post_id = post.id,
                    timeout_secs = self.config.analysis_timeout.as_secs_f64(),
                    "Analysis timed out"
                );
                return PostOutcome::TimedOut;
            }
            Ok(Err(e)) => {
                warn!(post_id = post.id, error = %e, "Analysis failed");
                return PostOutcome::Failed(e.to_string());
            }
            Ok(Ok(None)) => {
                debug!(post_id = post.id, "No analysis result");
                return PostOutcome::NoResult;
            }
            Ok(Ok(Some(result))) => result,
        };

        let Some(department_id) =
            resolve_department(&result.department_name, store.departments()).map(|d| d.id)
        else {
            info!(
                post_id = post.id,
                department = %result.department_name,
                "Analysis named an unknown department"
            );
            return PostOutcome::Unmatched {
                department_name: result.department_name,
            };
        };

        let sentiment = result.sentiment();
        let recommendation = Recommendation {
            id: store.next_recommendation_id(),
            department_id,
            post_id: post.id,
            contributor_id: None,
            text: result.recommendation_summary,
            sentiment,
            confidence: result.confidence,
            useful_votes: 0,
        };
        let recommendation_id = recommendation.id;

        match store.apply_audit_result(post.id, department_id, recommendation) {
            Ok(()) => {
                info!(
                    post_id = post.id,
                    department_id,
                    recommendation_id,
                    sentiment = %sentiment,
                    confidence = result.confidence,
                    "Post matched"
                );
                PostOutcome::Matched {
                    department_id,
                    recommendation_id,
                    sentiment,
                }
            }
            Err(e) => {
                warn!(post_id = post.id, error = %e, "Store rejected audit result");
                PostOutcome::Rejected(e)
            }
        }
    }

    fn cancelled(&self, mut stats: AuditStats, reached: usize, total: usize) -> AuditStats {
        stats.cancelled = (total - reached) as u32;
        info!(reached, total, "Audit cancelled");
        self.emit(AuditStatus::Cancelled { reached, total });
        stats
    }

    fn emit(&self, status: AuditStatus) {
        if let Some(tx) = &self.progress {
            // Receiver gone means nobody is watching; the run continues.
            let _ = tx.send(status);
        }
    }
}

/// Holds the single-run flag for the lifetime of a run.
struct RunGuard<'a>(&'a AtomicBool);

impl<'a> RunGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Result<Self, AuditError> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| AuditError::AlreadyRunning)?;
        Ok(Self(flag))
    }
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}
