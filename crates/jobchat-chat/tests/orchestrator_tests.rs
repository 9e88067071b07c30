//! End-to-end orchestrator tests with fake collaborators.
//!
//! Every external seam (language model, search API, conversation API,
//! session store) is replaced with an in-process fake so the full
//! pipeline runs without a network.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use jobchat_chat::politeness::{FAREWELL_CLOSING, GRATITUDE_CLOSING};
use jobchat_chat::reply::{APOLOGY_REPLY, GREETING};
use jobchat_chat::{ChatError, ChatOrchestrator};
use jobchat_client::{
    ChatTurn, ClientError, ConversationApi, JobSearch, LanguageModel, SendMessageRequest,
    SendMessageResponse,
};
use jobchat_core::config::ChatConfig;
use jobchat_core::types::{ChatMessage, Conversation, JobSummary, MessageRole, SearchCriteria};
use jobchat_storage::{MemorySessionStore, SessionStore};

// =============================================================================
// Fakes
// =============================================================================

/// Language model that replays a fixed script of completions.
struct ScriptedLlm {
    responses: Mutex<VecDeque<String>>,
    available: bool,
}

impl ScriptedLlm {
    fn new(responses: &[&str]) -> Self {
        Self {
            responses: Mutex::new(responses.iter().map(|s| s.to_string()).collect()),
            available: true,
        }
    }

    fn unavailable() -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            available: false,
        }
    }
}

#[async_trait]
impl LanguageModel for ScriptedLlm {
    async fn complete(&self, _turns: &[ChatTurn]) -> Result<String, ClientError> {
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| ClientError::Malformed("script exhausted".to_string()))
    }

    fn is_available(&self) -> bool {
        self.available
    }
}

/// Search API returning a fixed result set and recording the criteria
/// it was called with.
struct StaticSearch {
    results: Vec<JobSummary>,
    criteria_seen: Mutex<Vec<SearchCriteria>>,
}

impl StaticSearch {
    fn new(results: Vec<JobSummary>) -> Self {
        Self {
            results,
            criteria_seen: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl JobSearch for StaticSearch {
    async fn search(&self, criteria: &SearchCriteria) -> Result<Vec<JobSummary>, ClientError> {
        self.criteria_seen.lock().unwrap().push(criteria.clone());
        Ok(self.results.clone())
    }
}

/// Search API that always fails.
struct FailingSearch;

#[async_trait]
impl JobSearch for FailingSearch {
    async fn search(&self, _criteria: &SearchCriteria) -> Result<Vec<JobSummary>, ClientError> {
        Err(ClientError::Status {
            endpoint: "/api/jobs/search-advanced".to_string(),
            status: 503,
        })
    }
}

/// Conversation API backed by in-process state.
struct FakeApi {
    next_id: AtomicI64,
    create_calls: AtomicI64,
    create_fails: bool,
    send_response: Mutex<Option<SendMessageResponse>>,
    sent: Mutex<Vec<SendMessageRequest>>,
    history: Mutex<Vec<ChatMessage>>,
    deleted: Mutex<Vec<i64>>,
}

impl FakeApi {
    fn new() -> Self {
        Self {
            next_id: AtomicI64::new(1),
            create_calls: AtomicI64::new(0),
            create_fails: false,
            send_response: Mutex::new(None),
            sent: Mutex::new(Vec::new()),
            history: Mutex::new(Vec::new()),
            deleted: Mutex::new(Vec::new()),
        }
    }

    fn with_send_response(self, response: SendMessageResponse) -> Self {
        *self.send_response.lock().unwrap() = Some(response);
        self
    }

    fn failing_create(mut self) -> Self {
        self.create_fails = true;
        self
    }
}

#[async_trait]
impl ConversationApi for FakeApi {
    async fn create_conversation(
        &self,
        user_id: Option<i64>,
    ) -> Result<Conversation, ClientError> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        if self.create_fails {
            return Err(ClientError::Unavailable);
        }
        Ok(Conversation {
            id: self.next_id.fetch_add(1, Ordering::SeqCst),
            user_id,
            status: Some("ACTIVE".to_string()),
            created_at: None,
        })
    }

    async fn send_message(
        &self,
        request: &SendMessageRequest,
    ) -> Result<SendMessageResponse, ClientError> {
        self.sent.lock().unwrap().push(request.clone());
        self.send_response
            .lock()
            .unwrap()
            .clone()
            .ok_or(ClientError::Unavailable)
    }

    async fn messages(&self, _conversation_id: i64) -> Result<Vec<ChatMessage>, ClientError> {
        Ok(self.history.lock().unwrap().clone())
    }

    async fn conversations(&self, user_id: i64) -> Result<Vec<Conversation>, ClientError> {
        Ok(vec![Conversation {
            id: 1,
            user_id: Some(user_id),
            status: Some("ACTIVE".to_string()),
            created_at: None,
        }])
    }

    async fn delete_conversation(&self, conversation_id: i64) -> Result<(), ClientError> {
        self.deleted.lock().unwrap().push(conversation_id);
        Ok(())
    }
}

// =============================================================================
// Helpers
// =============================================================================

fn job(id: i64, title: &str, location: &str) -> JobSummary {
    JobSummary {
        id,
        title: title.to_string(),
        company_name: format!("Company {}", id),
        location: location.to_string(),
        salary_min: Some(10_000_000.0),
        salary_max: Some(20_000_000.0),
        image_url: None,
    }
}

fn pool(count: i64) -> Vec<JobSummary> {
    (1..=count).map(|i| job(i, "Nhân viên IT", "Hà Nội")).collect()
}

const JAVA_CRITERIA: &str = r#"{"query": "Java", "location": "Hà Nội"}"#;

struct Harness {
    orchestrator: ChatOrchestrator,
    api: Arc<FakeApi>,
    store: Arc<MemorySessionStore>,
}

fn harness(llm: ScriptedLlm, search: Arc<dyn JobSearch>, api: FakeApi) -> Harness {
    let api = Arc::new(api);
    let store = Arc::new(MemorySessionStore::new());
    let orchestrator = ChatOrchestrator::new(
        Arc::new(llm),
        search,
        api.clone(),
        store.clone(),
        ChatConfig::default(),
    );
    Harness {
        orchestrator,
        api,
        store,
    }
}

// =============================================================================
// Sending
// =============================================================================

#[tokio::test]
async fn test_search_hits_become_suggestions() {
    let llm = ScriptedLlm::new(&[JAVA_CRITERIA, "Đây là các job Java phù hợp 👇"]);
    let search = Arc::new(StaticSearch::new(vec![
        job(1, "Java Developer", "Hà Nội"),
        job(2, "Backend Java", "Hà Nội"),
        job(3, "Java Fresher", "Hà Nội"),
    ]));
    let h = harness(llm, search.clone(), FakeApi::new());

    let exchange = h
        .orchestrator
        .handle_message("Tìm việc Java ở Hà Nội")
        .await
        .unwrap();

    assert_eq!(exchange.user.role, MessageRole::User);
    assert_eq!(exchange.assistant.role, MessageRole::Assistant);
    assert_eq!(exchange.assistant.content, "Đây là các job Java phù hợp 👇");
    assert_eq!(exchange.assistant.suggested_jobs.len(), 3);
    assert_eq!(exchange.conversation_id, Some(1));

    // Extraction output drove the search call.
    let seen = search.criteria_seen.lock().unwrap();
    assert_eq!(seen[0].query.as_deref(), Some("Java"));
    assert_eq!(seen[0].location.as_deref(), Some("Hà Nội"));
}

#[tokio::test]
async fn test_exchange_appends_user_then_assistant() {
    let llm = ScriptedLlm::new(&[JAVA_CRITERIA, "ok"]);
    let h = harness(
        llm,
        Arc::new(StaticSearch::new(vec![job(1, "Java Dev", "Hà Nội")])),
        FakeApi::new(),
    );

    h.orchestrator.handle_message("tìm việc java").await.unwrap();

    let history = h.orchestrator.history().unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].role, MessageRole::User);
    assert!(history[0].suggested_jobs.is_empty());
    assert_eq!(history[1].role, MessageRole::Assistant);

    // The session store mirrors the in-memory list.
    assert_eq!(h.store.load_messages().unwrap().len(), 2);
}

#[tokio::test]
async fn test_empty_search_falls_back_to_candidate_pool() {
    let llm = ScriptedLlm::new(&[JAVA_CRITERIA, "Không tìm thấy job khớp, bạn tham khảo nhé"]);
    let h = harness(llm, Arc::new(StaticSearch::new(vec![])), FakeApi::new());
    h.orchestrator.set_candidate_pool(pool(8));

    let exchange = h.orchestrator.handle_message("tìm việc java").await.unwrap();

    // First five of the pool, in pool order.
    assert_eq!(exchange.assistant.suggested_jobs.len(), 5);
    assert_eq!(exchange.assistant.suggested_jobs[0].id, 1);
    assert_eq!(exchange.assistant.suggested_jobs[4].id, 5);
}

#[tokio::test]
async fn test_search_failure_falls_back_to_candidate_pool() {
    let llm = ScriptedLlm::new(&[JAVA_CRITERIA, "Gợi ý thay thế cho bạn đây"]);
    let h = harness(llm, Arc::new(FailingSearch), FakeApi::new());
    h.orchestrator.set_candidate_pool(pool(3));

    let exchange = h.orchestrator.handle_message("tìm việc java").await.unwrap();
    assert_eq!(exchange.assistant.suggested_jobs.len(), 3);
    assert_eq!(exchange.assistant.content, "Gợi ý thay thế cho bạn đây");
}

#[tokio::test]
async fn test_malformed_extraction_degrades_to_raw_query() {
    let llm = ScriptedLlm::new(&["đây không phải JSON", "vẫn trả lời được"]);
    let search = Arc::new(StaticSearch::new(vec![job(1, "Dev", "Đà Nẵng")]));
    let h = harness(llm, search.clone(), FakeApi::new());

    h.orchestrator
        .handle_message("việc gì lương cao ở Đà Nẵng?")
        .await
        .unwrap();

    // The whole utterance becomes the query; the pipeline keeps going.
    let seen = search.criteria_seen.lock().unwrap();
    assert_eq!(seen[0].query.as_deref(), Some("việc gì lương cao ở Đà Nẵng?"));
    assert!(seen[0].location.is_none());
}

// =============================================================================
// Politeness short-circuit
// =============================================================================

#[tokio::test]
async fn test_gratitude_overrides_generated_reply() {
    // The pipeline would produce a reply with suggestions; the closing
    // remark replaces both.
    let llm = ScriptedLlm::new(&[JAVA_CRITERIA, "Đây là các job phù hợp"]);
    let h = harness(
        llm,
        Arc::new(StaticSearch::new(vec![job(1, "Dev", "Hà Nội")])),
        FakeApi::new(),
    );

    let exchange = h.orchestrator.handle_message("Cảm ơn bạn nhiều").await.unwrap();
    assert_eq!(exchange.assistant.content, GRATITUDE_CLOSING);
    assert!(exchange.assistant.suggested_jobs.is_empty());
}

#[tokio::test]
async fn test_farewell_overrides_generated_reply() {
    let llm = ScriptedLlm::new(&[JAVA_CRITERIA, "Đây là các job phù hợp"]);
    let h = harness(
        llm,
        Arc::new(StaticSearch::new(vec![job(1, "Dev", "Hà Nội")])),
        FakeApi::new(),
    );

    let exchange = h.orchestrator.handle_message("tạm biệt nhé").await.unwrap();
    assert_eq!(exchange.assistant.content, FAREWELL_CLOSING);
    assert!(exchange.assistant.suggested_jobs.is_empty());
}

#[tokio::test]
async fn test_closing_applies_even_when_pipeline_fails() {
    let llm = ScriptedLlm::unavailable();
    let h = harness(llm, Arc::new(FailingSearch), FakeApi::new().failing_create());

    let exchange = h.orchestrator.handle_message("thanks!").await.unwrap();
    assert_eq!(exchange.assistant.content, GRATITUDE_CLOSING);
    assert!(exchange.assistant.suggested_jobs.is_empty());
}

// =============================================================================
// Degraded server path
// =============================================================================

#[tokio::test]
async fn test_unavailable_llm_uses_server_path() {
    let llm = ScriptedLlm::unavailable();
    let response = SendMessageResponse {
        reply: "Server đã tìm được 2 job cho bạn".to_string(),
        jobs: vec![job(10, "QA", "HCM"), job(11, "BA", "HCM")],
        conversation_id: Some(42),
    };
    let api = FakeApi::new().failing_create().with_send_response(response);
    let h = harness(llm, Arc::new(FailingSearch), api);
    h.orchestrator.set_candidate_pool(pool(4));

    let exchange = h.orchestrator.handle_message("tìm việc QA").await.unwrap();

    assert_eq!(exchange.assistant.content, "Server đã tìm được 2 job cho bạn");
    assert_eq!(exchange.assistant.suggested_jobs.len(), 2);
    // The server-assigned id is adopted and cached.
    assert_eq!(exchange.conversation_id, Some(42));
    assert_eq!(h.store.load_conversation_id().unwrap(), Some(42));

    // The request carried the full candidate pool.
    let sent = h.api.sent.lock().unwrap();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].jobs.len(), 4);
    assert_eq!(sent[0].message, "tìm việc QA");
}

#[tokio::test]
async fn test_empty_suggestions_trigger_server_path() {
    // Pipeline succeeds but produces no suggestions (empty pool, empty
    // search); the server path takes over.
    let llm = ScriptedLlm::new(&[JAVA_CRITERIA, "một câu trả lời suông"]);
    let response = SendMessageResponse {
        reply: "Server trả lời".to_string(),
        jobs: vec![job(1, "Dev", "Hà Nội")],
        conversation_id: None,
    };
    let api = FakeApi::new().with_send_response(response);
    let h = harness(llm, Arc::new(StaticSearch::new(vec![])), api);

    let exchange = h.orchestrator.handle_message("tìm việc java").await.unwrap();
    assert_eq!(exchange.assistant.content, "Server trả lời");
    assert_eq!(h.api.sent.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_double_failure_yields_fixed_apology() {
    let llm = ScriptedLlm::unavailable();
    let h = harness(llm, Arc::new(FailingSearch), FakeApi::new().failing_create());

    let exchange = h.orchestrator.handle_message("tìm việc").await.unwrap();
    assert_eq!(exchange.assistant.content, APOLOGY_REPLY);
    assert!(exchange.assistant.suggested_jobs.is_empty());

    // The failed exchange is still recorded as one user/assistant pair.
    assert_eq!(h.orchestrator.history().unwrap().len(), 2);
}

// =============================================================================
// Input validation
// =============================================================================

#[tokio::test]
async fn test_blank_message_rejected() {
    let h = harness(
        ScriptedLlm::unavailable(),
        Arc::new(FailingSearch),
        FakeApi::new(),
    );
    let result = h.orchestrator.handle_message("   \n ").await;
    assert!(matches!(result, Err(ChatError::EmptyMessage)));
    assert!(h.orchestrator.history().unwrap().is_empty());
}

#[tokio::test]
async fn test_oversized_message_rejected() {
    let h = harness(
        ScriptedLlm::unavailable(),
        Arc::new(FailingSearch),
        FakeApi::new(),
    );
    let huge = "a".repeat(2001);
    let result = h.orchestrator.handle_message(&huge).await;
    assert!(matches!(result, Err(ChatError::MessageTooLong(2000))));
}

#[tokio::test]
async fn test_disabled_chat_rejects_sends() {
    let api = Arc::new(FakeApi::new());
    let orchestrator = ChatOrchestrator::new(
        Arc::new(ScriptedLlm::unavailable()),
        Arc::new(FailingSearch),
        api,
        Arc::new(MemorySessionStore::new()),
        ChatConfig {
            enabled: false,
            ..ChatConfig::default()
        },
    );
    let result = orchestrator.handle_message("xin chào").await;
    assert!(matches!(result, Err(ChatError::Disabled)));
}

// =============================================================================
// Conversation lifecycle
// =============================================================================

#[tokio::test]
async fn test_conversation_id_reused_across_sends() {
    let llm = ScriptedLlm::new(&[JAVA_CRITERIA, "lần một", JAVA_CRITERIA, "lần hai"]);
    let h = harness(
        llm,
        Arc::new(StaticSearch::new(vec![job(1, "Dev", "Hà Nội")])),
        FakeApi::new(),
    );

    let first = h.orchestrator.handle_message("tìm việc java").await.unwrap();
    let second = h.orchestrator.handle_message("còn việc nào nữa").await.unwrap();

    assert_eq!(first.conversation_id, Some(1));
    assert_eq!(second.conversation_id, Some(1));
    assert_eq!(h.api.create_calls.load(Ordering::SeqCst), 1);
    assert_eq!(h.store.load_conversation_id().unwrap(), Some(1));
}

#[tokio::test]
async fn test_open_with_cached_id_refreshes_from_backend() {
    let api = FakeApi::new();
    *api.history.lock().unwrap() = vec![
        ChatMessage::assistant(GREETING, Vec::new()),
        ChatMessage::user("tìm việc kế toán"),
        ChatMessage::assistant("Đây là các job kế toán", vec![job(5, "Kế toán", "Hà Nội")]),
    ];
    let h = harness(ScriptedLlm::unavailable(), Arc::new(FailingSearch), api);
    h.store.save_conversation_id(7).unwrap();

    let history = h.orchestrator.open().await.unwrap();
    assert_eq!(history.len(), 3);
    assert_eq!(history[2].suggested_jobs.len(), 1);
    // No new conversation is created for a resumed session.
    assert_eq!(h.api.create_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_open_bootstraps_greeting_for_signed_in_user() {
    let api = Arc::new(FakeApi::new());
    let store = Arc::new(MemorySessionStore::new());
    let orchestrator = ChatOrchestrator::new(
        Arc::new(ScriptedLlm::unavailable()),
        Arc::new(FailingSearch),
        api.clone(),
        store.clone(),
        ChatConfig::default(),
    )
    .with_user(99);

    let history = orchestrator.open().await.unwrap();

    assert_eq!(history.len(), 1);
    assert_eq!(history[0].role, MessageRole::Assistant);
    assert_eq!(history[0].content, GREETING);
    assert_eq!(store.load_conversation_id().unwrap(), Some(1));

    // The greeting is stored server-side as the opening message.
    let sent = api.sent.lock().unwrap();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].message, GREETING);
    assert_eq!(sent[0].user_id, Some(99));
}

#[tokio::test]
async fn test_open_anonymous_without_state_stays_empty() {
    let h = harness(ScriptedLlm::unavailable(), Arc::new(FailingSearch), FakeApi::new());
    let history = h.orchestrator.open().await.unwrap();
    assert!(history.is_empty());
    assert_eq!(h.api.create_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_delete_active_conversation_clears_state() {
    let llm = ScriptedLlm::new(&[JAVA_CRITERIA, "một câu trả lời"]);
    let h = harness(
        llm,
        Arc::new(StaticSearch::new(vec![job(1, "Dev", "Hà Nội")])),
        FakeApi::new(),
    );

    let exchange = h.orchestrator.handle_message("tìm việc java").await.unwrap();
    let id = exchange.conversation_id.unwrap();

    h.orchestrator.delete_conversation(id).await.unwrap();

    assert_eq!(h.api.deleted.lock().unwrap().as_slice(), &[id]);
    assert!(h.orchestrator.history().unwrap().is_empty());
    assert!(h.store.load_conversation_id().unwrap().is_none());
    assert!(h.store.load_messages().unwrap().is_empty());
}

#[tokio::test]
async fn test_delete_other_conversation_keeps_state() {
    let llm = ScriptedLlm::new(&[JAVA_CRITERIA, "một câu trả lời"]);
    let h = harness(
        llm,
        Arc::new(StaticSearch::new(vec![job(1, "Dev", "Hà Nội")])),
        FakeApi::new(),
    );
    h.orchestrator.handle_message("tìm việc java").await.unwrap();

    h.orchestrator.delete_conversation(999).await.unwrap();
    assert_eq!(h.orchestrator.history().unwrap().len(), 2);
    assert_eq!(h.store.load_conversation_id().unwrap(), Some(1));
}
