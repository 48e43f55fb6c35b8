//! Standard web-search API client

use super::{SearchClient, SearchResponse};
use crate::config::SearchCredentials;
use crate::error::SearchError;
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

/// Header carrying the subscription key
const SUBSCRIPTION_KEY_HEADER: &str = "Ocp-Apim-Subscription-Key";

/// Vertical used for a plain web search
pub const WEB_VERTICAL: &str = "search";

/// Client for the standard web-search API
#[derive(Debug, Clone)]
pub struct WebSearchClient {
    client: Client,
    credentials: SearchCredentials,
}

impl WebSearchClient {
    /// Create a new client; `timeout` bounds every request when set
    pub fn new(
        credentials: SearchCredentials,
        timeout: Option<Duration>,
    ) -> Result<Self, SearchError> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            client: builder.build()?,
            credentials,
        })
    }

    /// Get the endpoint URL for a search vertical
    pub(crate) fn vertical_url(&self, vertical: &str) -> String {
        format!(
            "{}/v7.0/{}",
            self.credentials.endpoint,
            vertical.trim_matches('/')
        )
    }

    /// Issue one query against a specific vertical (e.g. `search`, `news/search`)
    pub async fn search_vertical(
        &self,
        vertical: &str,
        query: &str,
    ) -> Result<SearchResponse, SearchError> {
        let mut params: Vec<(&str, &str)> = vec![("q", query)];
        if let Some(market) = self.credentials.market.as_deref() {
            params.push(("mkt", market));
        }

        let response = self
            .client
            .get(self.vertical_url(vertical))
            .header(SUBSCRIPTION_KEY_HEADER, &self.credentials.api_key)
            .query(&params)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(SearchError::status(status.as_u16(), error_text));
        }

        let body = response.text().await?;
        let response = SearchResponse::new(body, status.as_u16());
        if response.is_empty() {
            return Err(SearchError::EmptyResponse);
        }

        tracing::trace!(vertical, bytes = response.bytes, "Search response received");
        Ok(response)
    }
}

#[async_trait]
impl SearchClient for WebSearchClient {
    async fn search(&self, query: &str) -> Result<SearchResponse, SearchError> {
        self.search_vertical(WEB_VERTICAL, query).await
    }

    fn name(&self) -> &str {
        "web-search"
    }
}
