//! In-memory snapshot of backend entities plus locally created recommendations.
//!
//! The store is replaced wholesale by [`StateStore::load_all`] and patched one
//! post at a time by [`StateStore::apply_audit_result`]. Nothing is written
//! back to the backend; audit effects last until the next reload.

use anyhow::{Context, Result};
use thiserror::Error;
use tracing::info;

use catedra_common::{
    Department, Recommendation, ScrapedPost, ScrapingSession, ScrapingSource, ScrapingTask,
};

use crate::traits::CollectionSource;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("unknown post {0}")]
    UnknownPost(i64),

    #[error("unknown department {0}")]
    UnknownDepartment(i64),

    #[error("post {0} is already processed")]
    AlreadyProcessed(i64),

    #[error(
        "recommendation {id} targets post {rec_post} in department {rec_department}, \
         expected post {post} in department {department}"
    )]
    Mismatch {
        id: i64,
        rec_post: i64,
        rec_department: i64,
        post: i64,
        department: i64,
    },

    #[error("recommendation id {0} already exists")]
    DuplicateRecommendation(i64),
}

/// Backend collections, as loaded together.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub departments: Vec<Department>,
    pub sources: Vec<ScrapingSource>,
    pub tasks: Vec<ScrapingTask>,
    pub sessions: Vec<ScrapingSession>,
    pub posts: Vec<ScrapedPost>,
}

#[derive(Debug, Clone, Default)]
pub struct StateStore {
    departments: Vec<Department>,
    sources: Vec<ScrapingSource>,
    tasks: Vec<ScrapingTask>,
    sessions: Vec<ScrapingSession>,
    posts: Vec<ScrapedPost>,
    recommendations: Vec<Recommendation>,
    /// Highest recommendation id ever held. Survives reloads.
    last_recommendation_id: i64,
}

impl StateStore {
    pub fn from_snapshot(snapshot: Snapshot) -> Self {
        let mut store = Self::default();
        store.replace(snapshot);
        store
    }

    /// Fetch every collection concurrently and replace the snapshot.
    ///
    /// If any fetch fails the store is left untouched. Local recommendations
    /// are dropped on success because the reloaded posts no longer carry the
    /// processed flags they were created against.
    pub async fn load_all<S>(&mut self, source: &S) -> Result<()>
    where
        S: CollectionSource + ?Sized,
    {
        let (departments, sources, tasks, sessions, posts) = futures::try_join!(
            async { source.departments().await.context("failed to load departments") },
            async { source.sources().await.context("failed to load scraping sources") },
            async { source.tasks().await.context("failed to load scraping tasks") },
            async { source.sessions().await.context("failed to load scraping sessions") },
            async { source.posts().await.context("failed to load posts") },
        )?;

        self.replace(Snapshot {
            departments,
            sources,
            tasks,
            sessions,
            posts,
        });

        info!(
            departments = self.departments.len(),
            sources = self.sources.len(),
            tasks = self.tasks.len(),
            sessions = self.sessions.len(),
            posts = self.posts.len(),
            pending = self.pending_count(),
            "Store loaded"
        );
        Ok(())
    }

    /// Replace all backend collections and clear local recommendations.
    pub fn replace(&mut self, snapshot: Snapshot) {
        self.departments = snapshot.departments;
        self.sources = snapshot.sources;
        self.tasks = snapshot.tasks;
        self.sessions = snapshot.sessions;
        self.posts = snapshot.posts;
        self.recommendations.clear();
    }

    /// Record one audit outcome: append the recommendation, mark the post
    /// processed and bump the department's mention counter.
    ///
    /// Every precondition is checked before anything changes, so on error the
    /// store is exactly as it was.
    pub fn apply_audit_result(
        &mut self,
        post_id: i64,
        department_id: i64,
        recommendation: Recommendation,
    ) -> Result<(), StoreError> {
        if recommendation.post_id != post_id || recommendation.department_id != department_id {
            return Err(StoreError::Mismatch {
                id: recommendation.id,
                rec_post: recommendation.post_id,
                rec_department: recommendation.department_id,
                post: post_id,
                department: department_id,
            });
        }

        let post_idx = self
            .posts
            .iter()
            .position(|p| p.id == post_id)
            .ok_or(StoreError::UnknownPost(post_id))?;
        if self.posts[post_idx].processed {
            return Err(StoreError::AlreadyProcessed(post_id));
        }

        let dept_idx = self
            .departments
            .iter()
            .position(|d| d.id == department_id)
            .ok_or(StoreError::UnknownDepartment(department_id))?;

        if self.recommendations.iter().any(|r| r.id == recommendation.id) {
            return Err(StoreError::DuplicateRecommendation(recommendation.id));
        }

        self.last_recommendation_id = self.last_recommendation_id.max(recommendation.id);
        self.recommendations.push(recommendation);
        self.posts[post_idx].processed = true;
        self.departments[dept_idx].mentions += 1;
        Ok(())
    }

    /// Id for the next locally created recommendation. Never reuses an id,
    /// including ids dropped by a reload.
    pub fn next_recommendation_id(&self) -> i64 {
        self.last_recommendation_id + 1
    }

    // --- Reads ---

    pub fn departments(&self) -> &[Department] {
        &self.departments
    }

    pub fn sources(&self) -> &[ScrapingSource] {
        &self.sources
    }

    pub fn tasks(&self) -> &[ScrapingTask] {
        &self.tasks
    }

    pub fn sessions(&self) -> &[ScrapingSession] {
        &self.sessions
    }

    pub fn posts(&self) -> &[ScrapedPost] {
        &self.posts
    }

    pub fn recommendations(&self) -> &[Recommendation] {
        &self.recommendations
    }

    pub fn department(&self, id: i64) -> Option<&Department> {
        self.departments.iter().find(|d| d.id == id)
    }

    pub fn post(&self, id: i64) -> Option<&ScrapedPost> {
        self.posts.iter().find(|p| p.id == id)
    }

    /// Unprocessed posts, in store order.
    pub fn pending_posts(&self) -> Vec<ScrapedPost> {
        self.posts.iter().filter(|p| !p.processed).cloned().collect()
    }

    pub fn pending_count(&self) -> usize {
        self.posts.iter().filter(|p| !p.processed).count()
    }

    pub fn department_names(&self) -> Vec<String> {
        self.departments.iter().map(|d| d.name.clone()).collect()
    }

    pub fn recommendations_for_post(&self, post_id: i64) -> impl Iterator<Item = &Recommendation> {
        self.recommendations.iter().filter(move |r| r.post_id == post_id)
    }
}
