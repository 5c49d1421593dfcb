pub mod error;
pub mod types;

pub use error::{ApiError, Result};
pub use types::{Collection, Page};

use catedra_common::{Department, ScrapedPost, ScrapingSession, ScrapingSource, ScrapingTask};
use reqwest::Url;
use serde::de::DeserializeOwned;

/// Upper bound on pages followed per collection unless overridden.
const DEFAULT_MAX_PAGES: u32 = 50;

pub struct BackendClient {
    client: reqwest::Client,
    base_url: String,
    max_pages: u32,
}

impl BackendClient {
    /// `base_url` is the API root, e.g. `http://localhost:8000/api`.
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            client: reqwest::Client::new(),
            base_url,
            max_pages: DEFAULT_MAX_PAGES,
        }
    }

    pub fn with_max_pages(mut self, max_pages: u32) -> Self {
        self.max_pages = max_pages.max(1);
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// URL of the first page of a collection.
    pub fn collection_url(&self, collection: Collection) -> Result<Url> {
        let raw = format!("{}/{}/", self.base_url, collection.path());
        Url::parse(&raw).map_err(|e| ApiError::InvalidUrl(format!("{raw}: {e}")))
    }

    /// Fetch a single page.
    pub async fn get_page<T: DeserializeOwned>(&self, url: Url) -> Result<Page<T>> {
        let resp = self.client.get(url).send().await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ApiError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let body = resp.text().await?;
        Ok(types::parse_page(&body)?)
    }

    /// Fetch every item of a collection, following `next` links.
    /// Stops after `max_pages` pages.
    pub async fn fetch_all<T: DeserializeOwned>(&self, collection: Collection) -> Result<Vec<T>> {
        let mut url = self.collection_url(collection)?;
        let mut items = Vec::new();
        let mut pages = 0u32;

        loop {
            let page: Page<T> = self.get_page(url.clone()).await?;
            pages += 1;
            items.extend(page.results);

            let Some(next) = page.next else {
                break;
            };
            if pages >= self.max_pages {
                tracing::warn!(
                    %collection,
                    pages,
                    items = items.len(),
                    "Page limit reached, remaining pages not fetched"
                );
                break;
            }
            url = url
                .join(&next)
                .map_err(|e| ApiError::InvalidUrl(format!("{next}: {e}")))?;
            tracing::debug!(%collection, %url, "Following next page");
        }

        tracing::debug!(%collection, pages, count = items.len(), "Fetched collection");
        Ok(items)
    }

    pub async fn departments(&self) -> Result<Vec<Department>> {
        self.fetch_all(Collection::Departments).await
    }

    pub async fn sources(&self) -> Result<Vec<ScrapingSource>> {
        self.fetch_all(Collection::Sources).await
    }

    pub async fn tasks(&self) -> Result<Vec<ScrapingTask>> {
        self.fetch_all(Collection::Tasks).await
    }

    pub async fn sessions(&self) -> Result<Vec<ScrapingSession>> {
        self.fetch_all(Collection::Sessions).await
    }

    pub async fn posts(&self) -> Result<Vec<ScrapedPost>> {
        self.fetch_all(Collection::Posts).await
    }
}
