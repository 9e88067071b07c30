//! Chat orchestrator: central coordinator wiring extraction, retrieval,
//! and reply generation.
//!
//! Manages the active conversation, runs the three-step pipeline per
//! send, and keeps the in-memory message list mirrored into the session
//! store.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use tracing::{debug, warn};

use jobchat_client::{
    ChatTurn, ClientError, ConversationApi, JobSearch, LanguageModel, SendMessageRequest,
};
use jobchat_core::config::ChatConfig;
use jobchat_core::types::{ChatMessage, Conversation, JobSummary, MessageRole};
use jobchat_storage::SessionStore;

use crate::error::ChatError;
use crate::extractor;
use crate::politeness::PolitenessTable;
use crate::reply::{ReplyComposer, ReplyMode, APOLOGY_REPLY, DEFAULT_REPLY, GREETING};

/// Result of one completed exchange.
#[derive(Clone, Debug)]
pub struct ChatExchange {
    /// Conversation the exchange belongs to, when one is established.
    pub conversation_id: Option<i64>,
    /// The stored user message.
    pub user: ChatMessage,
    /// The stored assistant message (reply + suggestions).
    pub assistant: ChatMessage,
}

/// Central chat orchestrator.
///
/// One instance per chat panel. All collaborators sit behind traits so
/// the pipeline can be driven by fakes in tests.
pub struct ChatOrchestrator {
    llm: Arc<dyn LanguageModel>,
    search: Arc<dyn JobSearch>,
    persistence: Arc<dyn ConversationApi>,
    store: Arc<dyn SessionStore>,
    politeness: PolitenessTable,
    composer: ReplyComposer,
    config: ChatConfig,
    user_id: Option<i64>,
    conversation_id: Mutex<Option<i64>>,
    messages: Mutex<Vec<ChatMessage>>,
    candidate_pool: Mutex<Vec<JobSummary>>,
    busy: AtomicBool,
}

impl ChatOrchestrator {
    /// Create a new orchestrator with the given collaborators.
    pub fn new(
        llm: Arc<dyn LanguageModel>,
        search: Arc<dyn JobSearch>,
        persistence: Arc<dyn ConversationApi>,
        store: Arc<dyn SessionStore>,
        config: ChatConfig,
    ) -> Self {
        let composer = ReplyComposer::new(config.intro_jobs);
        Self {
            llm,
            search,
            persistence,
            store,
            politeness: PolitenessTable::default(),
            composer,
            config,
            user_id: None,
            conversation_id: Mutex::new(None),
            messages: Mutex::new(Vec::new()),
            candidate_pool: Mutex::new(Vec::new()),
            busy: AtomicBool::new(false),
        }
    }

    /// Attribute the session to a signed-in user.
    pub fn with_user(mut self, user_id: i64) -> Self {
        self.user_id = Some(user_id);
        self
    }

    /// Replace the politeness table.
    pub fn with_politeness(mut self, table: PolitenessTable) -> Self {
        self.politeness = table;
        self
    }

    /// Replace the candidate pool used for fallback suggestions and the
    /// degraded server call (the "all known jobs" cache of the UI).
    pub fn set_candidate_pool(&self, jobs: Vec<JobSummary>) {
        match self.candidate_pool.lock() {
            Ok(mut pool) => *pool = jobs,
            Err(e) => warn!("Candidate pool lock poisoned: {}", e),
        }
    }

    // -----------------------------------------------------------------
    // Send
    // -----------------------------------------------------------------

    /// Handle one user message.
    ///
    /// Exactly one assistant message results from every accepted send,
    /// whatever fails along the way; errors are returned only for input
    /// validation and the busy guard.
    pub async fn handle_message(&self, message: &str) -> Result<ChatExchange, ChatError> {
        if !self.config.enabled {
            return Err(ChatError::Disabled);
        }
        let text = message.trim();
        if text.is_empty() {
            return Err(ChatError::EmptyMessage);
        }
        if text.len() > self.config.max_message_length {
            return Err(ChatError::MessageTooLong(self.config.max_message_length));
        }
        let _busy = BusyGuard::acquire(&self.busy).ok_or(ChatError::Busy)?;

        let conversation_id = self.ensure_conversation().await;

        // Primary client-side pipeline, best-effort.
        let primary = if self.llm.is_available() {
            match self.primary_pipeline(text).await {
                Ok(outcome) => Some(outcome),
                Err(e) => {
                    warn!(error = %e, "Client-side pipeline failed; using server path");
                    None
                }
            }
        } else {
            debug!("Language model unavailable; using server path");
            None
        };

        // The server path also covers a pipeline that produced nothing
        // usable (no reply text, or no suggestions at all).
        let (reply, jobs) = match primary {
            Some((reply, jobs)) if !reply.is_empty() && !jobs.is_empty() => (reply, jobs),
            _ => self.degraded_exchange(text, conversation_id).await,
        };

        // Politeness short-circuit: closing remarks override whatever the
        // pipeline produced, suggestions included.
        let (reply, jobs) = match self.politeness.closing_reply(text) {
            Some(closing) => (closing.to_string(), Vec::new()),
            None => (reply, jobs),
        };

        let user_msg = ChatMessage::user(text);
        let assistant_msg = ChatMessage::assistant(reply, jobs);
        self.append_exchange(&user_msg, &assistant_msg)?;

        Ok(ChatExchange {
            conversation_id: self.current_conversation_id(),
            user: user_msg,
            assistant: assistant_msg,
        })
    }

    /// Steps 1-3: extract criteria, retrieve with fallback, generate the
    /// reply. Returns the reply text and the suggestion set.
    async fn primary_pipeline(
        &self,
        text: &str,
    ) -> Result<(String, Vec<JobSummary>), ClientError> {
        // Step 1: criteria extraction (parse failures degrade inside).
        let criteria = extractor::extract_criteria(self.llm.as_ref(), text).await?;

        // Step 2: retrieval, falling back to the local candidate pool.
        let (jobs, fallback) = match self.search.search(&criteria).await {
            Ok(jobs) if !jobs.is_empty() => (jobs, false),
            Ok(_) => {
                debug!("No exact matches; suggesting from the local pool");
                (self.fallback_slice(), true)
            }
            Err(e) => {
                warn!(error = %e, "Job search failed; suggesting from the local pool");
                (self.fallback_slice(), true)
            }
        };

        // Step 3: reply generation with mode-dependent instruction.
        let mode = ReplyMode::select(fallback, &criteria);
        let instruction = self.composer.instruction(&mode, &criteria, &jobs);
        let mut turns = vec![ChatTurn::system(instruction)];
        turns.extend(self.recent_turns());
        turns.push(ChatTurn::user(text));

        let reply = self.llm.complete(&turns).await?;
        Ok((reply.trim().to_string(), jobs))
    }

    /// Server-side path: the backend runs its own matching and reply
    /// logic. Never errors; the final resort is the fixed apology.
    async fn degraded_exchange(
        &self,
        text: &str,
        conversation_id: Option<i64>,
    ) -> (String, Vec<JobSummary>) {
        let request = SendMessageRequest {
            conversation_id,
            message: text.to_string(),
            user_id: self.user_id,
            jobs: self.pool_snapshot(),
        };

        match self.persistence.send_message(&request).await {
            Ok(response) => {
                if let Some(server_id) = response.conversation_id {
                    if Some(server_id) != conversation_id {
                        debug!(conversation_id = server_id, "Adopting server conversation id");
                        self.adopt_conversation_id(server_id);
                    }
                }
                let reply = if response.reply.is_empty() {
                    DEFAULT_REPLY.to_string()
                } else {
                    response.reply
                };
                (reply, response.jobs)
            }
            Err(e) => {
                warn!(error = %e, "Server-side chat failed");
                (APOLOGY_REPLY.to_string(), Vec::new())
            }
        }
    }

    // -----------------------------------------------------------------
    // Session open / history
    // -----------------------------------------------------------------

    /// Restore session state on chat-panel open.
    ///
    /// Refreshes history from the backend when a conversation id is
    /// cached, falling back to the locally cached list; bootstraps a new
    /// conversation with the fixed greeting for signed-in users.
    pub async fn open(&self) -> Result<Vec<ChatMessage>, ChatError> {
        let cached_id = match self.store.load_conversation_id() {
            Ok(id) => id,
            Err(e) => {
                warn!(error = %e, "Could not read cached conversation id");
                None
            }
        };

        if let Some(id) = cached_id {
            self.set_conversation_id(id);
            match self.persistence.messages(id).await {
                Ok(history) => {
                    self.replace_messages(history)?;
                }
                Err(e) => {
                    warn!(error = %e, "History refresh failed; using local cache");
                    let cached = self.store.load_messages().unwrap_or_default();
                    self.replace_messages(cached)?;
                }
            }
        } else {
            let cached = self.store.load_messages().unwrap_or_default();
            if !cached.is_empty() {
                self.replace_messages(cached)?;
            } else if self.user_id.is_some() {
                self.init_conversation().await?;
            }
        }

        self.history()
    }

    /// Create a conversation and seed the greeting message.
    async fn init_conversation(&self) -> Result<(), ChatError> {
        let conversation = match self.persistence.create_conversation(self.user_id).await {
            Ok(conv) => conv,
            Err(e) => {
                warn!(error = %e, "Conversation bootstrap failed");
                return Ok(());
            }
        };
        self.adopt_conversation_id(conversation.id);

        // Store the greeting server-side as the opening message;
        // best-effort, the local seed happens either way.
        let request = SendMessageRequest {
            conversation_id: Some(conversation.id),
            message: GREETING.to_string(),
            user_id: self.user_id,
            jobs: Vec::new(),
        };
        if let Err(e) = self.persistence.send_message(&request).await {
            warn!(error = %e, "Could not store greeting server-side");
        }

        self.replace_messages(vec![ChatMessage::assistant(GREETING, Vec::new())])?;
        Ok(())
    }

    /// The current in-memory message list, oldest first.
    pub fn history(&self) -> Result<Vec<ChatMessage>, ChatError> {
        let messages = self
            .messages
            .lock()
            .map_err(|e| ChatError::StorageError(format!("messages lock poisoned: {}", e)))?;
        Ok(messages.clone())
    }

    /// List the user's conversations from the backend.
    pub async fn conversations(&self, user_id: i64) -> Result<Vec<Conversation>, ChatError> {
        Ok(self.persistence.conversations(user_id).await?)
    }

    /// Delete a conversation server-side; clears local state when it is
    /// the active one.
    pub async fn delete_conversation(&self, conversation_id: i64) -> Result<(), ChatError> {
        self.persistence.delete_conversation(conversation_id).await?;
        if self.current_conversation_id() == Some(conversation_id) {
            if let Ok(mut id) = self.conversation_id.lock() {
                *id = None;
            }
            if let Ok(mut messages) = self.messages.lock() {
                messages.clear();
            }
            if let Err(e) = self.store.clear() {
                warn!(error = %e, "Could not clear session store");
            }
        }
        Ok(())
    }

    // -----------------------------------------------------------------
    // Private helpers
    // -----------------------------------------------------------------

    /// Resolve the conversation id: memory, then store, then the backend.
    /// `None` means the server path will create one on first send.
    async fn ensure_conversation(&self) -> Option<i64> {
        if let Some(id) = self.current_conversation_id() {
            return Some(id);
        }

        match self.store.load_conversation_id() {
            Ok(Some(id)) => {
                self.set_conversation_id(id);
                return Some(id);
            }
            Ok(None) => {}
            Err(e) => warn!(error = %e, "Could not read cached conversation id"),
        }

        match self.persistence.create_conversation(self.user_id).await {
            Ok(conversation) => {
                self.adopt_conversation_id(conversation.id);
                Some(conversation.id)
            }
            Err(e) => {
                debug!(error = %e, "Conversation will be created server-side on first send");
                None
            }
        }
    }

    fn current_conversation_id(&self) -> Option<i64> {
        self.conversation_id.lock().ok().and_then(|id| *id)
    }

    fn set_conversation_id(&self, id: i64) {
        if let Ok(mut current) = self.conversation_id.lock() {
            *current = Some(id);
        }
    }

    /// Remember an established conversation id in memory and the store.
    fn adopt_conversation_id(&self, id: i64) {
        self.set_conversation_id(id);
        if let Err(e) = self.store.save_conversation_id(id) {
            warn!(error = %e, "Could not cache conversation id");
        }
    }

    /// First N pool entries used as substitute suggestions.
    fn fallback_slice(&self) -> Vec<JobSummary> {
        match self.candidate_pool.lock() {
            Ok(pool) => pool
                .iter()
                .take(self.config.fallback_suggestions)
                .cloned()
                .collect(),
            Err(e) => {
                warn!("Candidate pool lock poisoned: {}", e);
                Vec::new()
            }
        }
    }

    fn pool_snapshot(&self) -> Vec<JobSummary> {
        match self.candidate_pool.lock() {
            Ok(pool) => pool.clone(),
            Err(_) => Vec::new(),
        }
    }

    /// Recent history as prompt turns for the reply call.
    fn recent_turns(&self) -> Vec<ChatTurn> {
        let messages = match self.messages.lock() {
            Ok(m) => m,
            Err(_) => return Vec::new(),
        };
        let skip = messages.len().saturating_sub(self.config.context_messages);
        messages[skip..]
            .iter()
            .map(|message| match message.role {
                MessageRole::User => ChatTurn::user(message.content.clone()),
                MessageRole::Assistant => ChatTurn::assistant(message.content.clone()),
            })
            .collect()
    }

    /// Append the user/assistant pair, then mirror into the store.
    /// Store failures are logged, never propagated.
    fn append_exchange(
        &self,
        user: &ChatMessage,
        assistant: &ChatMessage,
    ) -> Result<(), ChatError> {
        let mut messages = self
            .messages
            .lock()
            .map_err(|e| ChatError::StorageError(format!("messages lock poisoned: {}", e)))?;
        messages.push(user.clone());
        messages.push(assistant.clone());
        if let Err(e) = self.store.save_messages(&messages) {
            warn!(error = %e, "Could not persist message cache");
        }
        Ok(())
    }

    fn replace_messages(&self, new_messages: Vec<ChatMessage>) -> Result<(), ChatError> {
        let mut messages = self
            .messages
            .lock()
            .map_err(|e| ChatError::StorageError(format!("messages lock poisoned: {}", e)))?;
        *messages = new_messages;
        if let Err(e) = self.store.save_messages(&messages) {
            warn!(error = %e, "Could not persist message cache");
        }
        Ok(())
    }
}

/// One-exchange-at-a-time guard; released on drop.
struct BusyGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> BusyGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
            .then_some(Self { flag })
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

// =============================================================================
// Tests
// =============================================================================
