//! Conversational job-search orchestration.
//!
//! Turns one user utterance into one assistant reply plus suggested jobs
//! via a three-step pipeline: criteria extraction (LLM), retrieval with
//! fallback (search API + local candidate pool), and reply generation
//! (LLM). A politeness short-circuit overrides generated output for
//! closing remarks, and a fully server-side degraded path covers every
//! failure of the client-side pipeline.

pub mod error;
pub mod extractor;
pub mod orchestrator;
pub mod politeness;
pub mod reply;

pub use error::ChatError;
pub use orchestrator::{ChatExchange, ChatOrchestrator};
pub use politeness::PolitenessTable;
pub use reply::{ReplyComposer, ReplyMode};
