mod claude;
mod schema;
mod wire;

pub use claude::ClaudeAnalyzer;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::warn;

use catedra_common::Sentiment;

/// What the analysis provider returns for a single post.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AnalysisResult {
    /// Name of the department the post talks about, copied from the candidate
    /// list when possible. Empty or "none" when no department is discussed.
    pub department_name: String,
    /// One or two sentences summarizing the advice or opinion in the post.
    pub recommendation_summary: String,
    /// "positive", "neutral", or "negative"
    pub sentiment: String,
    /// Confidence in the department assignment, between 0 and 1.
    pub confidence: f64,
}

impl AnalysisResult {
    /// The provider's label as a sentiment. Labels outside the three known
    /// values fall back to neutral.
    pub fn sentiment(&self) -> Sentiment {
        Sentiment::from_label(&self.sentiment).unwrap_or_else(|| {
            warn!(label = %self.sentiment, "Unknown sentiment label, using NEUTRAL");
            Sentiment::Neutral
        })
    }
}
