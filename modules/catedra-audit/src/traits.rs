// Trait seams for the store loader and the audit pipeline.
//
// CollectionSource: the backend's five read endpoints.
// PostAnalyzer: the external analysis capability (text + candidates → result).
//
// Both have in-memory mocks in `testing` so the pipeline runs without network.

use anyhow::Result;
use async_trait::async_trait;

use backend_client::BackendClient;
use catedra_common::{Department, ScrapedPost, ScrapingSession, ScrapingSource, ScrapingTask};

use crate::analysis::AnalysisResult;

// ---------------------------------------------------------------------------
// CollectionSource
// ---------------------------------------------------------------------------

#[async_trait]
pub trait CollectionSource: Send + Sync {
    async fn departments(&self) -> Result<Vec<Department>>;
    async fn sources(&self) -> Result<Vec<ScrapingSource>>;
    async fn tasks(&self) -> Result<Vec<ScrapingTask>>;
    async fn sessions(&self) -> Result<Vec<ScrapingSession>>;
    async fn posts(&self) -> Result<Vec<ScrapedPost>>;
}

#[async_trait]
impl CollectionSource for BackendClient {
    async fn departments(&self) -> Result<Vec<Department>> {
        Ok(self.departments().await?)
    }

    async fn sources(&self) -> Result<Vec<ScrapingSource>> {
        Ok(self.sources().await?)
    }

    async fn tasks(&self) -> Result<Vec<ScrapingTask>> {
        Ok(self.tasks().await?)
    }

    async fn sessions(&self) -> Result<Vec<ScrapingSession>> {
        Ok(self.sessions().await?)
    }

    async fn posts(&self) -> Result<Vec<ScrapedPost>> {
        Ok(self.posts().await?)
    }
}

// ---------------------------------------------------------------------------
// PostAnalyzer
// ---------------------------------------------------------------------------

#[async_trait]
pub trait PostAnalyzer: Send + Sync {
    /// Analyze one post against the ordered list of candidate department
    /// names. `Ok(None)` means the provider had no usable answer.
    async fn analyze(&self, text: &str, candidates: &[String]) -> Result<Option<AnalysisResult>>;
}
