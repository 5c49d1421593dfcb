// Test mocks for the store loader and the audit pipeline.
//
// - MockSource (CollectionSource): canned collections, optional failure
// - MockAnalyzer (PostAnalyzer): post text → result, with call recording
//
// Plus fixture helpers for departments, posts, recommendations and stores.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use anyhow::{bail, Result};
use async_trait::async_trait;

use catedra_common::{
    Department, Recommendation, ScrapedPost, ScrapingSession, ScrapingSource, ScrapingTask,
    Sentiment,
};

use crate::analysis::AnalysisResult;
use crate::store::{Snapshot, StateStore};
use crate::traits::{CollectionSource, PostAnalyzer};

// ---------------------------------------------------------------------------
// MockSource
// ---------------------------------------------------------------------------

/// In-memory backend. `.failing_on("posts")` makes that one collection error.
#[derive(Default)]
pub struct MockSource {
    snapshot: Snapshot,
    failing: Option<String>,
}

impl MockSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_departments(mut self, departments: Vec<Department>) -> Self {
        self.snapshot.departments = departments;
        self
    }

    pub fn with_sources(mut self, sources: Vec<ScrapingSource>) -> Self {
        self.snapshot.sources = sources;
        self
    }

    pub fn with_tasks(mut self, tasks: Vec<ScrapingTask>) -> Self {
        self.snapshot.tasks = tasks;
        self
    }

    pub fn with_sessions(mut self, sessions: Vec<ScrapingSession>) -> Self {
        self.snapshot.sessions = sessions;
        self
    }

    pub fn with_posts(mut self, posts: Vec<ScrapedPost>) -> Self {
        self.snapshot.posts = posts;
        self
    }

    pub fn failing_on(mut self, collection: &str) -> Self {
        self.failing = Some(collection.to_string());
        self
    }

    fn check(&self, collection: &str) -> Result<()> {
        if self.failing.as_deref() == Some(collection) {
            bail!("MockSource: {collection} unavailable");
        }
        Ok(())
    }
}

#[async_trait]
impl CollectionSource for MockSource {
    async fn departments(&self) -> Result<Vec<Department>> {
        self.check("departments")?;
        Ok(self.snapshot.departments.clone())
    }

    async fn sources(&self) -> Result<Vec<ScrapingSource>> {
        self.check("sources")?;
        Ok(self.snapshot.sources.clone())
    }

    async fn tasks(&self) -> Result<Vec<ScrapingTask>> {
        self.check("tasks")?;
        Ok(self.snapshot.tasks.clone())
    }

    async fn sessions(&self) -> Result<Vec<ScrapingSession>> {
        self.check("sessions")?;
        Ok(self.snapshot.sessions.clone())
    }

    async fn posts(&self) -> Result<Vec<ScrapedPost>> {
        self.check("posts")?;
        Ok(self.snapshot.posts.clone())
    }
}

// ---------------------------------------------------------------------------
// MockAnalyzer
// ---------------------------------------------------------------------------

enum Reply {
    Result(AnalysisResult),
    Fail(String),
}

/// Analyzer keyed by exact post text. Unregistered text yields `Ok(None)`.
/// Builder pattern: `.on_text()`, `.fail_on()`, `.with_delay()`.
#[derive(Default)]
pub struct MockAnalyzer {
    replies: HashMap<String, Reply>,
    delay: Option<Duration>,
    calls: Mutex<Vec<(String, Vec<String>)>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl MockAnalyzer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_text(mut self, text: &str, result: AnalysisResult) -> Self {
        self.replies.insert(text.to_string(), Reply::Result(result));
        self
    }

    pub fn fail_on(mut self, text: &str, message: &str) -> Self {
        self.replies
            .insert(text.to_string(), Reply::Fail(message.to_string()));
        self
    }

    /// Every call sleeps this long before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Post texts in call order.
    pub fn calls(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|(text, _)| text.clone())
            .collect()
    }

    /// Candidate lists in call order.
    pub fn candidates_seen(&self) -> Vec<Vec<String>> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|(_, candidates)| candidates.clone())
            .collect()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PostAnalyzer for MockAnalyzer {
    async fn analyze(&self, text: &str, candidates: &[String]) -> Result<Option<AnalysisResult>> {
        self.calls
            .lock()
            .unwrap()
            .push((text.to_string(), candidates.to_vec()));

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        match self.replies.get(text) {
            Some(Reply::Result(result)) => Ok(Some(result.clone())),
            Some(Reply::Fail(message)) => bail!("MockAnalyzer: {message}"),
            None => Ok(None),
        }
    }
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

pub fn department(id: i64, name: &str) -> Department {
    Department {
        id,
        code: format!("D{id}"),
        name: name.to_string(),
        lead_instructor: format!("Titular {id}"),
        mentions: 0,
    }
}

pub fn post(id: i64, text: &str) -> ScrapedPost {
    ScrapedPost {
        id,
        source_id: 1,
        external_id: format!("fb_{id}"),
        text: text.to_string(),
        processed: false,
    }
}

pub fn processed_post(id: i64, text: &str) -> ScrapedPost {
    ScrapedPost {
        processed: true,
        ..post(id, text)
    }
}

pub fn recommendation(
    id: i64,
    department_id: i64,
    post_id: i64,
    sentiment: Sentiment,
) -> Recommendation {
    Recommendation {
        id,
        department_id,
        post_id,
        contributor_id: None,
        text: format!("Recommendation {id}"),
        sentiment,
        confidence: 0.8,
        useful_votes: 0,
    }
}

pub fn analysis(department_name: &str, sentiment: &str, confidence: f64) -> AnalysisResult {
    AnalysisResult {
        department_name: department_name.to_string(),
        recommendation_summary: format!("Sobre {department_name}"),
        sentiment: sentiment.to_string(),
        confidence,
    }
}

pub fn store_with(departments: Vec<Department>, posts: Vec<ScrapedPost>) -> StateStore {
    StateStore::from_snapshot(Snapshot {
        departments,
        posts,
        ..Default::default()
    })
}
