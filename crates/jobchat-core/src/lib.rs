//! Shared foundation for the JobChat workspace.
//!
//! Holds the configuration model, the top-level error type, the data
//! model shared by every crate (jobs, search criteria, chat messages),
//! and the tracing bootstrap.

pub mod config;
pub mod error;
pub mod telemetry;
pub mod types;

pub use config::JobChatConfig;
pub use error::{JobChatError, Result};
pub use types::{ChatMessage, Conversation, JobSummary, MessageRole, SearchCriteria};
