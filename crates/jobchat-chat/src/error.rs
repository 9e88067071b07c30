//! Error types for the chat orchestrator.

use jobchat_client::ClientError;
use jobchat_core::error::JobChatError;

/// Errors surfaced by the orchestrator.
///
/// Pipeline failures never appear here; they resolve to an apology reply.
/// These variants cover input validation and local state access only.
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("chat is disabled")]
    Disabled,
    #[error("message cannot be empty")]
    EmptyMessage,
    #[error("message exceeds maximum length of {0} characters")]
    MessageTooLong(usize),
    #[error("another exchange is already in flight")]
    Busy,
    #[error("client error: {0}")]
    ClientError(String),
    #[error("storage error: {0}")]
    StorageError(String),
}

impl From<ClientError> for ChatError {
    fn from(err: ClientError) -> Self {
        ChatError::ClientError(err.to_string())
    }
}

impl From<JobChatError> for ChatError {
    fn from(err: JobChatError) -> Self {
        ChatError::StorageError(err.to_string())
    }
}
