//! Session store: conversation id and last-known message list.
//!
//! An explicit, swappable store for the two pieces of client-local
//! session state. `SqliteSessionStore` is the production implementation;
//! `MemorySessionStore` backs tests.

use std::sync::Arc;
use std::sync::Mutex;

use rusqlite::{params, OptionalExtension};
use tracing::debug;

use jobchat_core::error::JobChatError;
use jobchat_core::types::ChatMessage;

use crate::db::Database;

/// Fixed key for the active conversation id.
const KEY_CONVERSATION_ID: &str = "conversationId";
/// Fixed key for the serialized message list.
const KEY_CHAT_HISTORY: &str = "chatHistory";

/// Client-local persistence of the active chat session.
///
/// Writes are last-writer-wins; there is a single writer (the chat
/// orchestrator), so no store-level coordination is needed.
pub trait SessionStore: Send + Sync {
    /// The cached conversation id, if one was established earlier.
    fn load_conversation_id(&self) -> Result<Option<i64>, JobChatError>;

    /// Remember the conversation id for subsequent opens.
    fn save_conversation_id(&self, id: i64) -> Result<(), JobChatError>;

    /// The last-known message list, oldest first. Empty when nothing was
    /// cached yet.
    fn load_messages(&self) -> Result<Vec<ChatMessage>, JobChatError>;

    /// Replace the cached message list.
    fn save_messages(&self, messages: &[ChatMessage]) -> Result<(), JobChatError>;

    /// Drop all cached session state.
    fn clear(&self) -> Result<(), JobChatError>;
}

// =============================================================================
// MemorySessionStore
// =============================================================================

/// In-memory store for tests and ephemeral sessions.
#[derive(Default)]
pub struct MemorySessionStore {
    inner: Mutex<MemoryInner>,
}

#[derive(Default)]
struct MemoryInner {
    conversation_id: Option<i64>,
    messages: Vec<ChatMessage>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, MemoryInner>, JobChatError> {
        self.inner
            .lock()
            .map_err(|e| JobChatError::Storage(format!("session store lock poisoned: {}", e)))
    }
}

impl SessionStore for MemorySessionStore {
    fn load_conversation_id(&self) -> Result<Option<i64>, JobChatError> {
        Ok(self.lock()?.conversation_id)
    }

    fn save_conversation_id(&self, id: i64) -> Result<(), JobChatError> {
        self.lock()?.conversation_id = Some(id);
        Ok(())
    }

    fn load_messages(&self) -> Result<Vec<ChatMessage>, JobChatError> {
        Ok(self.lock()?.messages.clone())
    }

    fn save_messages(&self, messages: &[ChatMessage]) -> Result<(), JobChatError> {
        self.lock()?.messages = messages.to_vec();
        Ok(())
    }

    fn clear(&self) -> Result<(), JobChatError> {
        let mut inner = self.lock()?;
        inner.conversation_id = None;
        inner.messages.clear();
        Ok(())
    }
}

// =============================================================================
// SqliteSessionStore
// =============================================================================

/// Durable store backed by the session database.
pub struct SqliteSessionStore {
    db: Arc<Database>,
}

impl SqliteSessionStore {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    fn get(&self, key: &str) -> Result<Option<String>, JobChatError> {
        self.db.with_conn(|conn| {
            conn.query_row(
                "SELECT value FROM session_kv WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| JobChatError::Storage(format!("Failed to read {}: {}", key, e)))
        })
    }

    fn set(&self, key: &str, value: &str) -> Result<(), JobChatError> {
        self.db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO session_kv (key, value, updated_at)
                 VALUES (?1, ?2, strftime('%s', 'now'))
                 ON CONFLICT(key) DO UPDATE SET
                     value = excluded.value,
                     updated_at = excluded.updated_at",
                params![key, value],
            )
            .map_err(|e| JobChatError::Storage(format!("Failed to write {}: {}", key, e)))?;
            Ok(())
        })
    }
}

impl SessionStore for SqliteSessionStore {
    fn load_conversation_id(&self) -> Result<Option<i64>, JobChatError> {
        let raw = self.get(KEY_CONVERSATION_ID)?;
        match raw {
            None => Ok(None),
            Some(s) => s
                .parse::<i64>()
                .map(Some)
                .map_err(|e| JobChatError::Storage(format!("Corrupt conversation id: {}", e))),
        }
    }

    fn save_conversation_id(&self, id: i64) -> Result<(), JobChatError> {
        debug!(conversation_id = id, "Caching conversation id");
        self.set(KEY_CONVERSATION_ID, &id.to_string())
    }

    fn load_messages(&self) -> Result<Vec<ChatMessage>, JobChatError> {
        match self.get(KEY_CHAT_HISTORY)? {
            None => Ok(Vec::new()),
            Some(json) => serde_json::from_str(&json)
                .map_err(|e| JobChatError::Storage(format!("Corrupt message cache: {}", e))),
        }
    }

    fn save_messages(&self, messages: &[ChatMessage]) -> Result<(), JobChatError> {
        let json = serde_json::to_string(messages)
            .map_err(|e| JobChatError::Storage(format!("Failed to serialize messages: {}", e)))?;
        self.set(KEY_CHAT_HISTORY, &json)
    }

    fn clear(&self) -> Result<(), JobChatError> {
        self.db.with_conn(|conn| {
            conn.execute("DELETE FROM session_kv", [])
                .map_err(|e| JobChatError::Storage(format!("Failed to clear session: {}", e)))?;
            Ok(())
        })
    }
}

// =============================================================================
// Tests
// =============================================================================
