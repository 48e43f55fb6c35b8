//! Hosted agent client with web grounding
//!
//! One search is a complete agent round-trip:
//! 1. create a thread and a run in one call
//! 2. poll the run until it reaches a terminal status
//! 3. fetch the thread messages and take the newest assistant text
//!
//! Latency covers all three steps. The agent itself is resolved once during
//! warmup: the configured id, else the first listed agent, else a new one.

use super::{SearchClient, SearchResponse};
use crate::config::AgentCredentials;
use crate::error::SearchError;
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::{Duration, Instant};
use tokio::sync::OnceCell;
use tokio::time::sleep;

/// Default pause between run status polls
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Name of an agent this client creates
pub const AGENT_NAME: &str = "search-latency-bench-agent";

const AGENT_INSTRUCTIONS: &str =
    "You are a helpful assistant with access to real-time web search through a grounding tool.";

#[derive(Debug, Serialize)]
struct CreateAgent<'a> {
    name: &'a str,
    model: &'a str,
    instructions: &'a str,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<serde_json::Value>>,
}

#[derive(Debug, Serialize)]
struct UpdateAgentTools {
    tools: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct AgentList {
    data: Vec<AgentInfo>,
}

#[derive(Debug, Deserialize)]
struct AgentInfo {
    id: String,
    #[serde(default)]
    name: Option<String>,
}

#[derive(Debug, Serialize)]
struct CreateThreadAndRun<'a> {
    assistant_id: &'a str,
    thread: ThreadSpec<'a>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<serde_json::Value>>,
}

#[derive(Debug, Serialize)]
struct ThreadSpec<'a> {
    messages: Vec<ThreadMessageSpec<'a>>,
}

#[derive(Debug, Serialize)]
struct ThreadMessageSpec<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct Run {
    id: String,
    thread_id: String,
    status: String,
}

#[derive(Debug, Deserialize)]
struct MessageList {
    data: Vec<ThreadMessage>,
}

#[derive(Debug, Deserialize)]
struct ThreadMessage {
    role: String,
    #[serde(default)]
    content: Vec<MessageContent>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum MessageContent {
    Text { text: TextValue },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct TextValue {
    value: String,
}

/// Run lifecycle as reported by the service
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RunStatus {
    Pending,
    Completed,
    Failed,
}

impl RunStatus {
    fn classify(status: &str) -> Self {
        match status {
            "queued" | "in_progress" | "cancelling" => RunStatus::Pending,
            "completed" => RunStatus::Completed,
            // requires_action needs tool outputs we never submit
            _ => RunStatus::Failed,
        }
    }
}

/// Hosted agent client
#[derive(Debug, Clone)]
pub struct AgentClient {
    client: Client,
    credentials: AgentCredentials,
    poll_interval: Duration,
    timeout: Option<Duration>,
    agent_id: OnceCell<String>,
}

impl AgentClient {
    /// Create a new client; `timeout` bounds each HTTP call and the whole run
    pub fn new(
        credentials: AgentCredentials,
        timeout: Option<Duration>,
    ) -> Result<Self, SearchError> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            client: builder.build()?,
            credentials,
            poll_interval: DEFAULT_POLL_INTERVAL,
            timeout,
            agent_id: OnceCell::new(),
        })
    }

    /// Set the run status poll interval
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    fn url(&self, path: &str) -> String {
        format!(
            "{}/{}?api-version={}",
            self.credentials.endpoint,
            path.trim_start_matches('/'),
            self.credentials.api_version
        )
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        builder.header(
            "Authorization",
            format!("Bearer {}", self.credentials.api_token),
        )
    }

    /// Grounding tool definition attached to each run, if configured
    fn tools(&self) -> Option<Vec<serde_json::Value>> {
        self.credentials.connection_id.as_ref().map(|connection_id| {
            vec![json!({
                "type": "bing_grounding",
                "bing_grounding": {
                    "search_configurations": [
                        { "connection_id": connection_id }
                    ]
                }
            })]
        })
    }

    /// Agent every run goes to, resolved on first use
    async fn agent_id(&self) -> Result<&str, SearchError> {
        self.agent_id
            .get_or_try_init(|| self.resolve_agent())
            .await
            .map(String::as_str)
    }

    async fn resolve_agent(&self) -> Result<String, SearchError> {
        if let Some(id) = &self.credentials.agent_id {
            return Ok(id.clone());
        }

        let existing = match self.list_agents().await {
            Ok(agents) => {
                tracing::info!(count = agents.len(), "Listed existing agents");
                agents.into_iter().next()
            }
            Err(e) => {
                tracing::warn!(error = %e, "Could not list agents");
                None
            }
        };

        let agent = match existing {
            Some(agent) => agent,
            None => {
                let created = self.create_agent().await?;
                tracing::info!(agent_id = %created.id, "Created agent");
                return Ok(created.id);
            }
        };
        tracing::info!(
            agent_id = %agent.id,
            name = agent.name.as_deref().unwrap_or_default(),
            "Using existing agent"
        );

        let Some(tools) = self.tools() else {
            tracing::info!("No grounding connection configured, agent answers without web search");
            return Ok(agent.id);
        };
        match self.update_tools(&agent.id, tools).await {
            Ok(updated) => {
                tracing::info!(agent_id = %updated.id, "Grounding tool attached");
                Ok(updated.id)
            }
            Err(e) => {
                tracing::warn!(agent_id = %agent.id, error = %e, "Could not attach grounding tool");
                match self.create_agent().await {
                    Ok(created) => {
                        tracing::info!(agent_id = %created.id, "Created agent with grounding tool");
                        Ok(created.id)
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "Could not create agent, keeping existing one");
                        Ok(agent.id)
                    }
                }
            }
        }
    }

    async fn list_agents(&self) -> Result<Vec<AgentInfo>, SearchError> {
        let response = self
            .authorized(self.client.get(self.url("assistants")))
            .send()
            .await?;
        let list: AgentList = decode(response).await?;
        Ok(list.data)
    }

    async fn create_agent(&self) -> Result<AgentInfo, SearchError> {
        let body = CreateAgent {
            name: AGENT_NAME,
            model: &self.credentials.model,
            instructions: AGENT_INSTRUCTIONS,
            temperature: 0.0,
            tools: self.tools(),
        };
        let response = self
            .authorized(self.client.post(self.url("assistants")))
            .json(&body)
            .send()
            .await?;
        decode(response).await
    }

    async fn update_tools(
        &self,
        agent_id: &str,
        tools: Vec<serde_json::Value>,
    ) -> Result<AgentInfo, SearchError> {
        let path = format!("assistants/{agent_id}");
        let response = self
            .authorized(self.client.post(self.url(&path)))
            .json(&UpdateAgentTools { tools })
            .send()
            .await?;
        decode(response).await
    }

    async fn create_run(&self, query: &str) -> Result<Run, SearchError> {
        let body = CreateThreadAndRun {
            assistant_id: self.agent_id().await?,
            thread: ThreadSpec {
                messages: vec![ThreadMessageSpec {
                    role: "user",
                    content: query,
                }],
            },
            tools: self.tools(),
        };

        let response = self
            .authorized(self.client.post(self.url("threads/runs")))
            .json(&body)
            .send()
            .await?;
        decode(response).await
    }

    async fn wait_for_run(&self, mut run: Run, started: Instant) -> Result<Run, SearchError> {
        loop {
            match RunStatus::classify(&run.status) {
                RunStatus::Completed => return Ok(run),
                RunStatus::Failed => {
                    return Err(SearchError::RunFailed {
                        run_id: run.id,
                        status: run.status,
                    })
                }
                RunStatus::Pending => {}
            }

            if let Some(timeout) = self.timeout {
                if started.elapsed() >= timeout {
                    return Err(SearchError::RunFailed {
                        run_id: run.id,
                        status: format!("{} (timed out)", run.status),
                    });
                }
            }

            tracing::trace!(run_id = %run.id, status = %run.status, "Polling agent run");
            sleep(self.poll_interval).await;

            let path = format!("threads/{}/runs/{}", run.thread_id, run.id);
            let response = self
                .authorized(self.client.get(self.url(&path)))
                .send()
                .await?;
            run = decode(response).await?;
        }
    }

    async fn latest_answer(&self, thread_id: &str) -> Result<String, SearchError> {
        let path = format!("threads/{thread_id}/messages");
        let response = self
            .authorized(self.client.get(self.url(&path)))
            .query(&[("order", "desc")])
            .send()
            .await?;
        let messages: MessageList = decode(response).await?;
        Ok(assistant_text(&messages).unwrap_or_default())
    }
}

async fn decode<T: for<'de> Deserialize<'de>>(response: Response) -> Result<T, SearchError> {
    let status = response.status();
    if !status.is_success() {
        let error_text = response.text().await.unwrap_or_default();
        return Err(SearchError::status(status.as_u16(), error_text));
    }
    let body = response.text().await?;
    serde_json::from_str(&body).map_err(|e| SearchError::Decode(e.to_string()))
}

/// Text of the first assistant message that carries any
fn assistant_text(messages: &MessageList) -> Option<String> {
    messages
        .data
        .iter()
        .filter(|m| m.role == "assistant")
        .find_map(|m| {
            m.content.iter().find_map(|c| match c {
                MessageContent::Text { text } if !text.value.trim().is_empty() => {
                    Some(text.value.clone())
                }
                _ => None,
            })
        })
}

#[async_trait]
impl SearchClient for AgentClient {
    async fn search(&self, query: &str) -> Result<SearchResponse, SearchError> {
        let started = Instant::now();
        let run = self.create_run(query).await?;
        tracing::debug!(run_id = %run.id, thread_id = %run.thread_id, "Agent run created");

        let run = self.wait_for_run(run, started).await?;
        let answer = self.latest_answer(&run.thread_id).await?;

        let response = SearchResponse::new(answer, 200).with_detected_limitations();
        if response.is_empty() {
            return Err(SearchError::EmptyResponse);
        }
        if !response.limitations.is_empty() {
            tracing::info!(
                run_id = %run.id,
                limitations = ?response.limitations,
                "Answer mentions search limitations"
            );
        }
        Ok(response)
    }

    async fn warmup(&self) -> Result<(), SearchError> {
        let agent_id = self.agent_id().await?;
        tracing::info!(agent_id, "Agent ready");
        Ok(())
    }

    fn name(&self) -> &str {
        "grounded-agent"
    }
}
