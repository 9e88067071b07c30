//! HTTP collaborators of the chat orchestrator.
//!
//! Each external service sits behind a narrow trait so the orchestration
//! logic can be exercised with fakes: [`LanguageModel`] for chat
//! completions, [`JobSearch`] for the advanced job-search endpoint, and
//! [`ConversationApi`] for server-side conversation persistence.

pub mod conversation;
pub mod error;
pub mod llm;
pub mod search;

pub use conversation::{
    ConversationApi, HttpConversationApi, MessageRecord, SendMessageRequest, SendMessageResponse,
};
pub use error::ClientError;
pub use llm::{ChatTurn, LanguageModel, OpenAiCompatClient, TurnRole};
pub use search::{HttpJobSearch, JobSearch};
