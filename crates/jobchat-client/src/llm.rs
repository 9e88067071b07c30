//! Chat-completion endpoint client.
//!
//! [`LanguageModel`] is the seam the orchestrator programs against; the
//! production implementation speaks the OpenAI-compatible
//! `/chat/completions` wire format.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use jobchat_core::config::LlmConfig;

use crate::error::ClientError;

// =============================================================================
// Prompt types
// =============================================================================

/// Role of one turn in a completion request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    System,
    User,
    Assistant,
}

/// One role-tagged turn sent to the model.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: TurnRole,
    pub content: String,
}

impl ChatTurn {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: TurnRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: TurnRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: TurnRole::Assistant,
            content: content.into(),
        }
    }
}

// =============================================================================
// LanguageModel
// =============================================================================

/// Stateless chat-completion capability.
///
/// One ordered turn list in, one generated message out. Used twice per
/// exchange: criteria extraction and reply generation.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Generate one completion for the given turns.
    async fn complete(&self, turns: &[ChatTurn]) -> Result<String, ClientError>;

    /// Feature detection. When this returns false the orchestrator skips
    /// the client-side pipeline entirely and uses the server-side path.
    fn is_available(&self) -> bool {
        true
    }
}

// =============================================================================
// OpenAiCompatClient
// =============================================================================

/// HTTP client for any OpenAI-compatible chat-completion service.
pub struct OpenAiCompatClient {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
    enabled: bool,
}

impl OpenAiCompatClient {
    pub fn new(config: &LlmConfig) -> Self {
        Self {
            client: Client::new(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            enabled: config.enabled,
        }
    }
}

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatTurn],
}

#[derive(Deserialize)]
struct CompletionResponse {
    choices: Vec<CompletionChoice>,
}

#[derive(Deserialize)]
struct CompletionChoice {
    message: CompletionMessage,
}

#[derive(Deserialize)]
struct CompletionMessage {
    content: String,
}

#[async_trait]
impl LanguageModel for OpenAiCompatClient {
    async fn complete(&self, turns: &[ChatTurn]) -> Result<String, ClientError> {
        if !self.enabled {
            return Err(ClientError::Unavailable);
        }

        let endpoint = format!("{}/chat/completions", self.base_url);
        debug!(endpoint = %endpoint, model = %self.model, turns = turns.len(), "Requesting completion");

        let mut request = self.client.post(&endpoint).json(&CompletionRequest {
            model: &self.model,
            messages: turns,
        });
        if !self.api_key.is_empty() {
            request = request.header("Authorization", format!("Bearer {}", self.api_key));
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::Status {
                endpoint,
                status: status.as_u16(),
            });
        }

        let body: CompletionResponse = response.json().await?;
        let choice = body
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ClientError::Malformed("completion has no choices".to_string()))?;
        Ok(choice.message.content)
    }

    fn is_available(&self) -> bool {
        self.enabled
    }
}

// =============================================================================
// Tests
// =============================================================================
