use std::fmt;

use serde::de::DeserializeOwned;
use serde::Deserialize;

/// The read-only collections the backend exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Collection {
    Departments,
    Sources,
    Tasks,
    Sessions,
    Posts,
}

impl Collection {
    /// Path segment under the API base URL.
    pub fn path(self) -> &'static str {
        match self {
            Collection::Departments => "catedras",
            Collection::Sources => "grupos",
            Collection::Tasks => "tareas",
            Collection::Sessions => "sesiones",
            Collection::Posts => "posts",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

/// One page of a paginated list response.
#[derive(Debug, Clone, Deserialize)]
pub struct Page<T> {
    #[serde(default)]
    pub count: Option<u64>,
    #[serde(default)]
    pub next: Option<String>,
    #[serde(default)]
    pub previous: Option<String>,
    pub results: Vec<T>,
}

/// Parse a list response body. List endpoints answer with a paginated
/// envelope, or with a bare array when pagination is disabled server-side.
///
/// The shape is picked from the first token so that serde errors about the
/// items themselves (a missing field, a wrong type) are reported as-is.
pub(crate) fn parse_page<T: DeserializeOwned>(body: &str) -> serde_json::Result<Page<T>> {
    if body.trim_start().starts_with('[') {
        let results: Vec<T> = serde_json::from_str(body)?;
        return Ok(Page {
            count: Some(results.len() as u64),
            next: None,
            previous: None,
            results,
        });
    }
    serde_json::from_str(body)
}
