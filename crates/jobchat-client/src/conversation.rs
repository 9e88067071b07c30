//! Conversation persistence API client.
//!
//! The backend owns conversations and messages; this client covers
//! creating a conversation, the server-side `send` operation (which runs
//! its own matching logic and is the orchestrator's degraded path),
//! message history, and conversation listing/removal.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use jobchat_core::config::ApiConfig;
use jobchat_core::types::{ChatMessage, Conversation, JobSummary, MessageRole};

use crate::error::ClientError;

// =============================================================================
// Wire types
// =============================================================================

/// Body of `POST /api/chat/send`.
///
/// The backend expects the `userID` spelling; `jobs` is the client-side
/// candidate pool it may draw suggestions from.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageRequest {
    pub conversation_id: Option<i64>,
    pub message: String,
    #[serde(rename = "userID")]
    pub user_id: Option<i64>,
    pub jobs: Vec<JobSummary>,
}

/// Reply of `POST /api/chat/send`.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageResponse {
    #[serde(default)]
    pub reply: String,
    #[serde(default, alias = "suggestedJobs")]
    pub jobs: Vec<JobSummary>,
    #[serde(default)]
    pub conversation_id: Option<i64>,
}

/// One stored message as the backend returns it.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageRecord {
    pub sender: String,
    pub content: String,
    #[serde(default)]
    pub jobs: Option<Vec<JobSummary>>,
}

impl MessageRecord {
    /// Convert the wire record into the client-side message type.
    pub fn into_message(self) -> ChatMessage {
        let role = MessageRole::from_sender(&self.sender);
        let jobs = match role {
            // Stored user messages never carry suggestions.
            MessageRole::User => Vec::new(),
            MessageRole::Assistant => self.jobs.unwrap_or_default(),
        };
        match role {
            MessageRole::User => ChatMessage::user(self.content),
            MessageRole::Assistant => ChatMessage::assistant(self.content, jobs),
        }
    }
}

// =============================================================================
// ConversationApi
// =============================================================================

/// Server-side conversation persistence operations.
#[async_trait]
pub trait ConversationApi: Send + Sync {
    /// Create a conversation, optionally attributed to a user.
    async fn create_conversation(&self, user_id: Option<i64>)
        -> Result<Conversation, ClientError>;

    /// Append a user message and get the server-generated reply plus
    /// suggestions. Creates a conversation server-side when the request
    /// carries no id.
    async fn send_message(
        &self,
        request: &SendMessageRequest,
    ) -> Result<SendMessageResponse, ClientError>;

    /// All messages of a conversation, oldest first.
    async fn messages(&self, conversation_id: i64) -> Result<Vec<ChatMessage>, ClientError>;

    /// All conversations belonging to a user.
    async fn conversations(&self, user_id: i64) -> Result<Vec<Conversation>, ClientError>;

    /// Delete a conversation and its messages.
    async fn delete_conversation(&self, conversation_id: i64) -> Result<(), ClientError>;
}

// =============================================================================
// HttpConversationApi
// =============================================================================

/// Client for the portal's `/api/chat` endpoints.
pub struct HttpConversationApi {
    client: Client,
    base_url: String,
    token: String,
}

impl HttpConversationApi {
    pub fn new(config: &ApiConfig) -> Self {
        Self {
            client: Client::new(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            token: config.token.clone(),
        }
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        if self.token.is_empty() {
            request
        } else {
            request.header("Authorization", format!("Bearer {}", self.token))
        }
    }

    async fn check(
        response: reqwest::Response,
        endpoint: String,
    ) -> Result<reqwest::Response, ClientError> {
        let status = response.status();
        if status.is_success() {
            Ok(response)
        } else {
            Err(ClientError::Status {
                endpoint,
                status: status.as_u16(),
            })
        }
    }
}

#[async_trait]
impl ConversationApi for HttpConversationApi {
    async fn create_conversation(
        &self,
        user_id: Option<i64>,
    ) -> Result<Conversation, ClientError> {
        let endpoint = format!("{}/api/chat/conversation", self.base_url);
        debug!(endpoint = %endpoint, ?user_id, "Creating conversation");

        let mut request = self.client.post(&endpoint);
        if let Some(id) = user_id {
            request = request.query(&[("userId", id)]);
        }
        let response = self.authorize(request).send().await?;
        let response = Self::check(response, endpoint).await?;
        Ok(response.json().await?)
    }

    async fn send_message(
        &self,
        request: &SendMessageRequest,
    ) -> Result<SendMessageResponse, ClientError> {
        let endpoint = format!("{}/api/chat/send", self.base_url);
        debug!(endpoint = %endpoint, conversation_id = ?request.conversation_id, "Sending message");

        let response = self
            .authorize(self.client.post(&endpoint).json(request))
            .send()
            .await?;
        let response = Self::check(response, endpoint).await?;
        Ok(response.json().await?)
    }

    async fn messages(&self, conversation_id: i64) -> Result<Vec<ChatMessage>, ClientError> {
        let endpoint = format!(
            "{}/api/chat/conversation/{}/messages",
            self.base_url, conversation_id
        );
        let response = self.authorize(self.client.get(&endpoint)).send().await?;
        let response = Self::check(response, endpoint).await?;
        let records: Vec<MessageRecord> = response.json().await?;
        Ok(records.into_iter().map(MessageRecord::into_message).collect())
    }

    async fn conversations(&self, user_id: i64) -> Result<Vec<Conversation>, ClientError> {
        let endpoint = format!("{}/api/chat/conversation", self.base_url);
        let response = self
            .authorize(self.client.get(&endpoint).query(&[("userId", user_id)]))
            .send()
            .await?;
        let response = Self::check(response, endpoint).await?;
        Ok(response.json().await?)
    }

    async fn delete_conversation(&self, conversation_id: i64) -> Result<(), ClientError> {
        let endpoint = format!("{}/api/chat/conversation/{}", self.base_url, conversation_id);
        let response = self.authorize(self.client.delete(&endpoint)).send().await?;
        Self::check(response, endpoint).await?;
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================
