use thiserror::Error;

/// Top-level error type for the JobChat system.
///
/// Each variant wraps a subsystem-specific error. Subsystem crates define
/// their own error types and implement `From<SubsystemError> for JobChatError`
/// so that the `?` operator works seamlessly across crate boundaries.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum JobChatError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Client error: {0}")]
    Client(String),

    #[error("Chat error: {0}")]
    Chat(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<toml::de::Error> for JobChatError {
    fn from(err: toml::de::Error) -> Self {
        JobChatError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for JobChatError {
    fn from(err: serde_json::Error) -> Self {
        JobChatError::Serialization(err.to_string())
    }
}

/// Convenience alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, JobChatError>;
