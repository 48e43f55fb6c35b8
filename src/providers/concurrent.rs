//! Concurrent-mode search client
//!
//! Sends the same prompt to several search verticals at once and completes
//! when every vertical has answered. The harness still awaits one attempt at
//! a time; the concurrency lives entirely inside a single attempt.

use super::web::{WebSearchClient, WEB_VERTICAL};
use super::{SearchClient, SearchResponse};
use crate::error::SearchError;
use async_trait::async_trait;
use futures::future::join_all;

/// Verticals queried by default
pub const DEFAULT_VERTICALS: &[&str] = &[WEB_VERTICAL, "news/search"];

/// Fan-out search client
#[derive(Debug, Clone)]
pub struct ConcurrentSearchClient {
    inner: WebSearchClient,
    verticals: Vec<String>,
}

impl ConcurrentSearchClient {
    /// Create a client over the default verticals
    pub fn new(inner: WebSearchClient) -> Self {
        Self::with_verticals(inner, DEFAULT_VERTICALS.iter().map(|v| v.to_string()))
    }

    /// Create a client over explicit verticals
    pub fn with_verticals(
        inner: WebSearchClient,
        verticals: impl IntoIterator<Item = String>,
    ) -> Self {
        let mut verticals: Vec<String> = verticals.into_iter().collect();
        if verticals.is_empty() {
            verticals.push(WEB_VERTICAL.to_string());
        }
        Self { inner, verticals }
    }

    /// Verticals this client fans out to
    pub fn verticals(&self) -> &[String] {
        &self.verticals
    }
}

/// Merge per-vertical results: the first error wins, otherwise the bodies
/// are concatenated in vertical order
fn merge_responses(
    results: Vec<Result<SearchResponse, SearchError>>,
) -> Result<SearchResponse, SearchError> {
    let mut bodies = Vec::with_capacity(results.len());
    let mut status_code = 200;
    for result in results {
        let response = result?;
        status_code = response.status_code;
        bodies.push(response.content);
    }

    let merged = SearchResponse::new(bodies.join("\n"), status_code);
    if merged.is_empty() {
        return Err(SearchError::EmptyResponse);
    }
    Ok(merged)
}

#[async_trait]
impl SearchClient for ConcurrentSearchClient {
    async fn search(&self, query: &str) -> Result<SearchResponse, SearchError> {
        let calls = self
            .verticals
            .iter()
            .map(|vertical| self.inner.search_vertical(vertical, query));
        let results = join_all(calls).await;

        tracing::trace!(verticals = self.verticals.len(), "Fan-out completed");
        merge_responses(results)
    }

    fn name(&self) -> &str {
        "web-search-concurrent"
    }
}
