//! Session-scoped local storage for the chat client.
//!
//! Remembers the active conversation id and the last-known message list
//! between panel opens, behind an explicit [`SessionStore`] trait so the
//! orchestrator can be tested against an in-memory store.

pub mod db;
pub mod migrations;
pub mod store;

pub use db::Database;
pub use store::{MemorySessionStore, SessionStore, SqliteSessionStore};
