//! Read-only projections of the store for the dashboard views.

use std::fmt;

use catedra_common::{Department, Recommendation, SessionStatus};

use crate::store::StateStore;

pub const UNKNOWN_DEPARTMENT: &str = "Cátedra Desconocida";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DashboardSummary {
    pub departments: usize,
    pub posts: usize,
    pub pending_posts: usize,
    pub recommendations: usize,
    pub active_sessions: usize,
}

impl DashboardSummary {
    pub fn from_store(store: &StateStore) -> Self {
        Self {
            departments: store.departments().len(),
            posts: store.posts().len(),
            pending_posts: store.pending_count(),
            recommendations: store.recommendations().len(),
            active_sessions: store
                .sessions()
                .iter()
                .filter(|s| s.status == SessionStatus::Processing)
                .count(),
        }
    }
}

impl fmt::Display for DashboardSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Cátedras:          {}", self.departments)?;
        writeln!(f, "Posts:             {} ({} pending)", self.posts, self.pending_posts)?;
        writeln!(f, "Recommendations:   {}", self.recommendations)?;
        writeln!(f, "Active sessions:   {}", self.active_sessions)
    }
}

/// Departments whose name or lead instructor contains `query` (ignoring case)
/// or whose code contains it exactly. An empty query keeps everything.
pub fn filter_departments<'a>(departments: &'a [Department], query: &str) -> Vec<&'a Department> {
    let query = query.trim();
    if query.is_empty() {
        return departments.iter().collect();
    }
    let lowered = query.to_lowercase();
    departments
        .iter()
        .filter(|d| {
            d.name.to_lowercase().contains(&lowered)
                || d.lead_instructor.to_lowercase().contains(&lowered)
                || d.code.contains(query)
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq)]
pub struct FeedEntry<'a> {
    pub department_name: &'a str,
    pub recommendation: &'a Recommendation,
}

/// Recommendations newest first.
pub fn recommendation_feed(store: &StateStore) -> Vec<FeedEntry<'_>> {
    let mut entries: Vec<FeedEntry<'_>> = store
        .recommendations()
        .iter()
        .map(|rec| FeedEntry {
            department_name: store
                .department(rec.department_id)
                .map(|d| d.name.as_str())
                .unwrap_or(UNKNOWN_DEPARTMENT),
            recommendation: rec,
        })
        .collect();
    entries.sort_by(|a, b| b.recommendation.id.cmp(&a.recommendation.id));
    entries
}

/// (lead instructor, mentions) in department order.
pub fn mentions_by_department(store: &StateStore) -> Vec<(&str, u32)> {
    store
        .departments()
        .iter()
        .map(|d| (d.lead_instructor.as_str(), d.mentions))
        .collect()
}

/// (session day, posts found) in session order. Unparseable dates are shown raw.
pub fn posts_per_session(store: &StateStore) -> Vec<(String, u32)> {
    store
        .sessions()
        .iter()
        .map(|s| {
            let label = s
                .started_on()
                .map(|day| day.to_string())
                .unwrap_or_else(|| s.date.clone());
            (label, s.posts_found)
        })
        .collect()
}
