use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// =============================================================================
// Enums
// =============================================================================

/// Author of a chat message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// Typed by the person looking for a job.
    User,
    /// Produced by the assistant (generated reply or server reply).
    Assistant,
}

impl MessageRole {
    /// Map a wire-level sender tag to a role.
    ///
    /// The backend stores `"user"` / `"assistant"`; anything unrecognized
    /// is treated as assistant output.
    pub fn from_sender(sender: &str) -> Self {
        if sender.eq_ignore_ascii_case("user") {
            MessageRole::User
        } else {
            MessageRole::Assistant
        }
    }
}

// =============================================================================
// Jobs
// =============================================================================

/// Read-only projection of a job posting as returned by the search API.
///
/// Never mutated by this system. Wire aliases (`postedByName`, `jobIMG`)
/// cover the two shapes the backend emits.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobSummary {
    pub id: i64,
    pub title: String,
    #[serde(default, alias = "postedByName")]
    pub company_name: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub salary_min: Option<f64>,
    #[serde(default)]
    pub salary_max: Option<f64>,
    #[serde(default, rename = "jobIMG")]
    pub image_url: Option<String>,
}

/// Structured search filter derived from one user utterance.
///
/// Ephemeral: built per turn by the extraction step, sent to the search
/// API, never persisted. All fields are optional; an unparseable
/// extraction degrades to `from_raw_query`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SearchCriteria {
    pub query: Option<String>,
    pub industry: Option<String>,
    pub location: Option<String>,
    pub exclude_location: Option<String>,
    pub min_salary: Option<f64>,
    pub job_type: Option<String>,
    pub skills: Vec<String>,
}

impl SearchCriteria {
    /// Fallback criteria carrying only the raw user text.
    pub fn from_raw_query(text: &str) -> Self {
        Self {
            query: Some(text.to_string()),
            ..Self::default()
        }
    }

    /// Best available label for the line of work the user asked about.
    pub fn field_label(&self) -> &str {
        self.industry
            .as_deref()
            .or(self.query.as_deref())
            .unwrap_or("này")
    }
}

// =============================================================================
// Conversation
// =============================================================================

/// One message in a conversation.
///
/// Immutable once created. Only assistant messages carry suggested jobs;
/// user messages always have an empty list.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: Uuid,
    pub role: MessageRole,
    pub content: String,
    #[serde(default)]
    pub suggested_jobs: Vec<JobSummary>,
    pub created_at: i64,
}

impl ChatMessage {
    /// Build a user message. User messages never carry suggestions.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            role: MessageRole::User,
            content: content.into(),
            suggested_jobs: Vec::new(),
            created_at: Utc::now().timestamp(),
        }
    }

    /// Build an assistant message with an optional suggestion set.
    pub fn assistant(content: impl Into<String>, suggested_jobs: Vec<JobSummary>) -> Self {
        Self {
            id: Uuid::new_v4(),
            role: MessageRole::Assistant,
            content: content.into(),
            suggested_jobs,
            created_at: Utc::now().timestamp(),
        }
    }
}

/// A conversation as known to the persistence backend.
///
/// The id is server-assigned and, once cached locally, stable for the
/// lifetime of the client session.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    pub id: i64,
    #[serde(default)]
    pub user_id: Option<i64>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

// =============================================================================
// Tests
// =============================================================================
