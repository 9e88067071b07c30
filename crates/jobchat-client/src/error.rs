//! Error types for the HTTP collaborators.

use jobchat_core::error::JobChatError;

/// Errors from the external services (LLM, search, persistence).
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("unexpected status {status} from {endpoint}")]
    Status { endpoint: String, status: u16 },
    #[error("malformed response: {0}")]
    Malformed(String),
    #[error("language model unavailable")]
    Unavailable,
}

impl From<ClientError> for JobChatError {
    fn from(err: ClientError) -> Self {
        JobChatError::Client(err.to_string())
    }
}
