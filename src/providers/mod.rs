//! Search client implementations
//!
//! Each client implements the `SearchClient` trait: one text prompt in, one
//! response payload out. The harness never interprets the payload beyond
//! checking that it is non-empty.
//!
//! - `web`: the standard web-search API
//! - `concurrent`: the same API, fanned out across several verticals at once
//! - `agent`: a hosted agent answering with a web-grounding tool

pub mod agent;
pub mod concurrent;
pub mod web;

pub use agent::AgentClient;
pub use concurrent::ConcurrentSearchClient;
pub use web::WebSearchClient;

use crate::error::SearchError;
use crate::metrics::SearchLimitation;
use async_trait::async_trait;
use std::sync::Arc;

/// Payload returned by a search call
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResponse {
    /// Response content (raw body or extracted answer text)
    pub content: String,
    /// Payload size in bytes
    pub bytes: usize,
    /// HTTP status of the final call
    pub status_code: u16,
    /// Limitation hints the client found in the answer
    pub limitations: Vec<SearchLimitation>,
}

impl SearchResponse {
    /// Create a response from its content
    pub fn new(content: impl Into<String>, status_code: u16) -> Self {
        let content = content.into();
        Self {
            bytes: content.len(),
            content,
            status_code,
            limitations: Vec::new(),
        }
    }

    /// Flag limitation hints found in the content
    pub fn with_detected_limitations(mut self) -> Self {
        self.limitations = SearchLimitation::detect(&self.content);
        self
    }

    /// Check if the response carries any content
    pub fn is_empty(&self) -> bool {
        self.content.trim().is_empty()
    }

    /// Bounded preview of the content, whitespace collapsed
    pub fn preview(&self, max_chars: usize) -> String {
        let collapsed = self.content.split_whitespace().collect::<Vec<_>>().join(" ");
        let mut chars = collapsed.chars();
        let head: String = chars.by_ref().take(max_chars).collect();
        if chars.next().is_some() {
            format!("{head}...")
        } else {
            head
        }
    }
}

/// Client trait that all search backends implement
#[async_trait]
pub trait SearchClient: Send + Sync {
    /// Issue one search for the prompt and wait for the complete response
    async fn search(&self, query: &str) -> Result<SearchResponse, SearchError>;

    /// One-time setup before the first timed search
    async fn warmup(&self) -> Result<(), SearchError> {
        Ok(())
    }

    /// Get the client name
    fn name(&self) -> &str;
}

#[async_trait]
impl<C: SearchClient + ?Sized> SearchClient for Arc<C> {
    async fn search(&self, query: &str) -> Result<SearchResponse, SearchError> {
        (**self).search(query).await
    }

    async fn warmup(&self) -> Result<(), SearchError> {
        (**self).warmup().await
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

#[async_trait]
impl<C: SearchClient + ?Sized> SearchClient for Box<C> {
    async fn search(&self, query: &str) -> Result<SearchResponse, SearchError> {
        (**self).search(query).await
    }

    async fn warmup(&self) -> Result<(), SearchError> {
        (**self).warmup().await
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_size_and_emptiness() {
        let response = SearchResponse::new("  \n ", 200);
        assert_eq!(response.bytes, 4);
        assert!(response.is_empty());

        let response = SearchResponse::new("{\"webPages\":{}}", 200);
        assert!(!response.is_empty());
    }

    #[test]
    fn test_preview_collapses_whitespace() {
        let response = SearchResponse::new("line one\n\n  line   two", 200);
        assert_eq!(response.preview(100), "line one line two");
        assert_eq!(response.preview(4), "line...");
    }

    #[test]
    fn test_detected_limitations() {
        let response = SearchResponse::new("My training data ends in 2023.", 200);
        assert!(response.limitations.is_empty());
        let response = response.with_detected_limitations();
        assert_eq!(
            response.limitations,
            vec![SearchLimitation::TrainingData, SearchLimitation::KnowledgeCutoff]
        );
    }
}
