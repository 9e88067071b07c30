//! Criteria extraction: free text in, structured search filter out.
//!
//! One best-effort LLM call with a fixed instruction. The model is asked
//! for JSON; code fences are stripped before parsing, and any parse
//! failure degrades to a criteria object carrying only the raw text.

use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use jobchat_client::{ChatTurn, ClientError, LanguageModel};
use jobchat_core::types::SearchCriteria;

/// Fixed instruction for the extraction call.
///
/// The explicit excludeLocation rule is what lets "ngoài Hà Nội" style
/// requests search everywhere except the named area.
const EXTRACTION_INSTRUCTION: &str = "\
Bạn là bộ lọc dữ liệu. Nhiệm vụ: phân tích câu nói và trích xuất JSON gồm:
- query: từ khóa chung.
- industry: ngành nghề (nếu có).
- location: địa điểm MUỐN tìm (ví dụ: \"tại Hà Nội\").
- excludeLocation: địa điểm MUỐN TRÁNH/LOẠI TRỪ.
  (Quy tắc: nếu người dùng nói \"ngoài Hà Nội\", \"không phải HCM\", \"khác Đà Nẵng\" \
-> điền vào excludeLocation, để null location).
- minSalary: lương (số).
- jobType: FULL_TIME/PART_TIME.
- skills: mảng kỹ năng.

Chỉ trả về JSON.";

// Markdown code-fence markers the model tends to wrap JSON in.
static CODE_FENCE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"```(?:json)?").expect("Invalid fence regex"));

/// Run the extraction step against the model.
///
/// Errors only when the model call itself fails; a malformed model reply
/// degrades to raw-text criteria instead.
pub async fn extract_criteria(
    llm: &dyn LanguageModel,
    message: &str,
) -> Result<SearchCriteria, ClientError> {
    let turns = [
        ChatTurn::system(EXTRACTION_INSTRUCTION),
        ChatTurn::user(message),
    ];
    let raw = llm.complete(&turns).await?;
    Ok(criteria_from_response(&raw, message))
}

/// Parse the model's reply into criteria, degrading on failure.
pub(crate) fn criteria_from_response(raw: &str, message: &str) -> SearchCriteria {
    let cleaned = CODE_FENCE_RE.replace_all(raw, "");
    let cleaned = cleaned.trim();

    match serde_json::from_str::<SearchCriteria>(cleaned) {
        Ok(criteria) => {
            debug!(?criteria, "Extraction produced structured criteria");
            criteria
        }
        Err(e) => {
            debug!(error = %e, "Extraction reply unparseable; using raw query");
            SearchCriteria::from_raw_query(message)
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
