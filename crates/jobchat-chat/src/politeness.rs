//! Politeness short-circuit: closing remarks override generated output.
//!
//! An explicit token -> reply table instead of inline substring checks,
//! so the token set and wording can be tuned without touching the
//! pipeline. The check runs after generation and replaces both the reply
//! text and the suggestion set.

/// Closing reply for gratitude ("cảm ơn", "thanks", ...).
pub const GRATITUDE_CLOSING: &str =
    "Rất vui khi có thể giúp bạn 😊. Chúc bạn sớm tìm được công việc ưng ý! Hẹn gặp lại 👋";

/// Closing reply for farewells ("tạm biệt", "bye", ...).
pub const FAREWELL_CLOSING: &str =
    "Hẹn gặp lại bạn 👋 Chúc bạn một ngày tốt lành và sớm tìm được công việc như ý!";

/// One recognized closing token and the reply it maps to.
#[derive(Clone, Debug)]
pub struct PolitenessEntry {
    /// Lowercase token searched for in the lowercased input.
    pub token: String,
    /// Fixed reply substituted for the generated one.
    pub reply: String,
}

/// Case-insensitive token table for detecting closing remarks.
#[derive(Clone, Debug)]
pub struct PolitenessTable {
    entries: Vec<PolitenessEntry>,
}

impl Default for PolitenessTable {
    fn default() -> Self {
        let entry = |token: &str, reply: &str| PolitenessEntry {
            token: token.to_string(),
            reply: reply.to_string(),
        };
        Self {
            entries: vec![
                // Gratitude ("thank" also covers "thanks"/"thank you").
                entry("cảm ơn", GRATITUDE_CLOSING),
                entry("thank", GRATITUDE_CLOSING),
                entry("tks", GRATITUDE_CLOSING),
                entry("thx", GRATITUDE_CLOSING),
                // Farewells.
                entry("tạm biệt", FAREWELL_CLOSING),
                entry("bye", FAREWELL_CLOSING),
                entry("hẹn gặp lại", FAREWELL_CLOSING),
                entry("see you", FAREWELL_CLOSING),
            ],
        }
    }
}

impl PolitenessTable {
    /// Build a table from custom entries. Tokens are lowercased.
    pub fn from_entries(entries: impl IntoIterator<Item = (String, String)>) -> Self {
        Self {
            entries: entries
                .into_iter()
                .map(|(token, reply)| PolitenessEntry {
                    token: token.to_lowercase(),
                    reply,
                })
                .collect(),
        }
    }

    /// Table that never matches (disables the short-circuit).
    pub fn disabled() -> Self {
        Self { entries: vec![] }
    }

    /// The closing reply for the first matching token, if any.
    ///
    /// Matching is a case-insensitive substring check.
    pub fn closing_reply(&self, message: &str) -> Option<&str> {
        let lowered = message.to_lowercase();
        self.entries
            .iter()
            .find(|entry| lowered.contains(&entry.token))
            .map(|entry| entry.reply.as_str())
    }
}

// =============================================================================
// Tests
// =============================================================================
