//! Knowledge-base search backed by the OpenAI Assistants API (v2).
//!
//! Each question creates a thread, posts the question as a user message,
//! starts a run against the configured assistant and polls the run until it
//! reaches a terminal status. The first assistant message is the answer.
//! Every failure maps to a short spoken fallback rather than an error.
//! A whole search, setup requests included, is capped at `max_polls` poll
//! intervals.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;

use crate::config::ServerConfig;

const ASSISTANTS_BETA_HEADER: &str = "assistants=v2";

pub const UNAVAILABLE_ANSWER: &str = "Knowledge base unavailable.";
pub const THREAD_FAILED_ANSWER: &str = "I'm having trouble accessing the knowledge base.";
pub const RUN_FAILED_TO_START_ANSWER: &str = "I'm having trouble searching the knowledge base.";
pub const NOT_FOUND_ANSWER: &str = "I couldn't find that information.";
pub const GENERIC_FAILURE_ANSWER: &str = "I'm having trouble with the knowledge base.";

// =============================================================================
// Error Types
// =============================================================================

#[derive(Debug, Error)]
pub enum KnowledgeBaseError {
    #[error("OpenAI API key is not configured")]
    NotConfigured,

    #[error("Failed to create thread: {0}")]
    ThreadCreation(String),

    #[error("Failed to create run: {0}")]
    RunCreation(String),

    #[error("Run ended with status '{0}'")]
    RunFailed(String),

    #[error("Run did not complete within {0} polls")]
    Timeout(u32),

    #[error("No assistant answer in thread")]
    NoAnswer,

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Unexpected response: {0}")]
    Decode(String),
}

impl KnowledgeBaseError {
    /// Spoken fallback answer for this failure.
    pub fn fallback_answer(&self) -> &'static str {
        match self {
            KnowledgeBaseError::NotConfigured => UNAVAILABLE_ANSWER,
            KnowledgeBaseError::ThreadCreation(_) => THREAD_FAILED_ANSWER,
            KnowledgeBaseError::RunCreation(_) => RUN_FAILED_TO_START_ANSWER,
            KnowledgeBaseError::RunFailed(_)
            | KnowledgeBaseError::Timeout(_)
            | KnowledgeBaseError::NoAnswer => NOT_FOUND_ANSWER,
            KnowledgeBaseError::Http(_) | KnowledgeBaseError::Decode(_) => GENERIC_FAILURE_ANSWER,
        }
    }
}

// =============================================================================
// Public Interface
// =============================================================================

/// Answer returned to the AI session.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KnowledgeAnswer {
    pub found: bool,
    pub answer: String,
}

impl KnowledgeAnswer {
    pub fn found(answer: impl Into<String>) -> Self {
        Self {
            found: true,
            answer: answer.into(),
        }
    }

    pub fn fallback(answer: impl Into<String>) -> Self {
        Self {
            found: false,
            answer: answer.into(),
        }
    }
}

impl From<KnowledgeBaseError> for KnowledgeAnswer {
    fn from(error: KnowledgeBaseError) -> Self {
        KnowledgeAnswer::fallback(error.fallback_answer())
    }
}

/// A searchable knowledge base. Never fails; failures become fallback answers.
#[async_trait]
pub trait KnowledgeBase: Send + Sync {
    async fn search(&self, question: &str) -> KnowledgeAnswer;
}

// =============================================================================
// Configuration
// =============================================================================

#[derive(Clone)]
pub struct AssistantsConfig {
    pub api_key: Option<String>,
    pub api_base: String,
    pub assistant_id: String,
    pub poll_interval: Duration,
    pub max_polls: u32,
    pub timeout: Duration,
}

impl std::fmt::Debug for AssistantsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssistantsConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("api_base", &self.api_base)
            .field("assistant_id", &self.assistant_id)
            .field("poll_interval", &self.poll_interval)
            .field("max_polls", &self.max_polls)
            .finish()
    }
}

impl AssistantsConfig {
    /// Hard limit on one search, setup requests included.
    pub fn time_budget(&self) -> Duration {
        self.poll_interval * self.max_polls
    }

    pub fn from_server_config(config: &ServerConfig) -> Self {
        Self {
            api_key: config.openai_api_key.clone().filter(|k| !k.is_empty()),
            api_base: config.openai_api_base.trim_end_matches('/').to_string(),
            assistant_id: config.knowledge_base_assistant_id.clone(),
            poll_interval: config.knowledge_base_poll_interval(),
            max_polls: config.knowledge_base_max_polls,
            timeout: config.lookup_timeout(),
        }
    }
}

// =============================================================================
// Wire Types
// =============================================================================

#[derive(Debug, Deserialize)]
struct IdObject {
    id: String,
}

#[derive(Debug, Deserialize)]
struct RunObject {
    #[serde(default)]
    status: String,
}

#[derive(Debug, Deserialize)]
struct MessageList {
    #[serde(default)]
    data: Vec<ThreadMessage>,
}

#[derive(Debug, Deserialize)]
struct ThreadMessage {
    #[serde(default)]
    role: String,
    #[serde(default)]
    content: Vec<MessageContent>,
}

#[derive(Debug, Deserialize)]
struct MessageContent {
    #[serde(default)]
    text: Option<MessageText>,
}

#[derive(Debug, Deserialize)]
struct MessageText {
    #[serde(default)]
    value: String,
}

/// Run statuses that end polling without an answer.
fn is_failed_status(status: &str) -> bool {
    matches!(status, "failed" | "cancelled" | "expired")
}

// =============================================================================
// Provider
// =============================================================================

/// [`KnowledgeBase`] backed by an OpenAI assistant.
pub struct AssistantsKnowledgeBase {
    client: Client,
    config: AssistantsConfig,
}

impl AssistantsKnowledgeBase {
    pub fn new(client: Client, config: AssistantsConfig) -> Self {
        Self { client, config }
    }

    fn authorized(&self, builder: RequestBuilder, api_key: &str) -> RequestBuilder {
        builder
            .timeout(self.config.timeout)
            .bearer_auth(api_key)
            .header("OpenAI-Beta", ASSISTANTS_BETA_HEADER)
    }

    /// Full Assistants round trip for one question.
    pub async fn ask(&self, question: &str) -> Result<String, KnowledgeBaseError> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .ok_or(KnowledgeBaseError::NotConfigured)?;
        let base = &self.config.api_base;

        let response = self
            .authorized(self.client.post(format!("{base}/threads")), api_key)
            .json(&json!({}))
            .send()
            .await?;
        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(KnowledgeBaseError::ThreadCreation(format!(
                "status {status}: {error_text}"
            )));
        }
        let thread: IdObject = response
            .json()
            .await
            .map_err(|e| KnowledgeBaseError::ThreadCreation(e.to_string()))?;

        let response = self
            .authorized(
                self.client
                    .post(format!("{base}/threads/{}/messages", thread.id)),
                api_key,
            )
            .json(&json!({ "role": "user", "content": question }))
            .send()
            .await?;
        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(KnowledgeBaseError::ThreadCreation(format!(
                "failed to add question to thread {}: status {status}: {error_text}",
                thread.id
            )));
        }

        let response = self
            .authorized(
                self.client.post(format!("{base}/threads/{}/runs", thread.id)),
                api_key,
            )
            .json(&json!({ "assistant_id": self.config.assistant_id }))
            .send()
            .await?;
        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(KnowledgeBaseError::RunCreation(format!(
                "status {status}: {error_text}"
            )));
        }
        let run: IdObject = response
            .json()
            .await
            .map_err(|e| KnowledgeBaseError::RunCreation(e.to_string()))?;

        self.wait_for_run(api_key, &thread.id, &run.id).await?;

        let messages: MessageList = self
            .authorized(
                self.client
                    .get(format!("{base}/threads/{}/messages", thread.id)),
                api_key,
            )
            .send()
            .await?
            .json()
            .await
            .map_err(|e| KnowledgeBaseError::Decode(e.to_string()))?;

        messages
            .data
            .into_iter()
            .filter(|message| message.role == "assistant")
            .find_map(|message| message.content.into_iter().next())
            .map(|content| content.text.map(|t| t.value).unwrap_or_default())
            .ok_or(KnowledgeBaseError::NoAnswer)
    }

    /// Poll the run until it completes, fails or the poll budget is spent.
    /// The first poll is immediate; later polls wait `poll_interval`.
    async fn wait_for_run(
        &self,
        api_key: &str,
        thread_id: &str,
        run_id: &str,
    ) -> Result<(), KnowledgeBaseError> {
        let url = format!(
            "{}/threads/{thread_id}/runs/{run_id}",
            self.config.api_base
        );

        for attempt in 1..=self.config.max_polls {
            if attempt > 1 {
                tokio::time::sleep(self.config.poll_interval).await;
            }

            let run: RunObject = self
                .authorized(self.client.get(&url), api_key)
                .send()
                .await?
                .json()
                .await
                .map_err(|e| KnowledgeBaseError::Decode(e.to_string()))?;

            tracing::trace!(attempt, status = %run.status, "Polled knowledge-base run");

            if run.status == "completed" {
                return Ok(());
            }
            if is_failed_status(&run.status) {
                return Err(KnowledgeBaseError::RunFailed(run.status));
            }
        }

        Err(KnowledgeBaseError::Timeout(self.config.max_polls))
    }
}

#[async_trait]
impl KnowledgeBase for AssistantsKnowledgeBase {
    async fn search(&self, question: &str) -> KnowledgeAnswer {
        let budget = self.config.time_budget();
        let result = match tokio::time::timeout(budget, self.ask(question)).await {
            Ok(result) => result,
            Err(_) => Err(KnowledgeBaseError::Timeout(self.config.max_polls)),
        };

        match result {
            Ok(answer) => KnowledgeAnswer::found(answer),
            Err(e) => {
                tracing::warn!(error = %e, "Knowledge base search failed");
                e.into()
            }
        }
    }
}
