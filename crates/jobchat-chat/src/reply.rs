//! Reply generation: prompt assembly for the final LLM call.
//!
//! The system instruction varies by how retrieval went: an apology with
//! substitute suggestions in fallback mode, an explicit "outside the
//! excluded area" confirmation when an exclusion was extracted, and a
//! plain confirmation otherwise.

use jobchat_core::types::{JobSummary, SearchCriteria};

/// Reply shown when even the server-side path failed.
pub const APOLOGY_REPLY: &str = "Xin lỗi, đã xảy ra lỗi trong khi xử lý yêu cầu.";

/// Reply used when the server path returns suggestions without text.
pub const DEFAULT_REPLY: &str =
    "Dưới đây là danh sách các job phù hợp cho yêu cầu của bạn 👇";

/// Opening message seeded into a freshly created conversation.
pub const GREETING: &str = "Xin chào 👋! Tôi là trợ lý việc làm JobPortal. \
Bạn đang muốn tìm công việc ở lĩnh vực hoặc vị trí nào?";

/// How the generated reply should be framed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReplyMode {
    /// Retrieval succeeded; confirm and introduce a few jobs.
    Normal,
    /// Retrieval was empty or failed; apologize and offer substitutes.
    Fallback,
    /// An excluded location was extracted; confirm matches outside it.
    Exclusion { location: String },
}

impl ReplyMode {
    /// Pick the mode for one exchange.
    ///
    /// Fallback wins over exclusion: when nothing matched, the substitute
    /// suggestions are generic and the exclusion wording would mislead.
    pub fn select(fallback: bool, criteria: &SearchCriteria) -> Self {
        if fallback {
            ReplyMode::Fallback
        } else if let Some(location) = criteria.exclude_location.clone() {
            ReplyMode::Exclusion { location }
        } else {
            ReplyMode::Normal
        }
    }
}

/// Builds the system instruction for the reply call.
pub struct ReplyComposer {
    /// How many jobs the reply should introduce in detail.
    pub intro_jobs: usize,
}

impl ReplyComposer {
    pub fn new(intro_jobs: usize) -> Self {
        Self { intro_jobs }
    }

    /// Compose the system instruction for the given mode and job list.
    pub fn instruction(
        &self,
        mode: &ReplyMode,
        criteria: &SearchCriteria,
        jobs: &[JobSummary],
    ) -> String {
        let context = job_context(jobs);
        match mode {
            ReplyMode::Fallback => format!(
                "Bạn là trợ lý tuyển dụng. Hiện KHÔNG TÌM THẤY job nào khớp chính xác.\n\
                 Hãy xin lỗi và gợi ý các job nổi bật khác dưới đây:\n{}",
                context
            ),
            ReplyMode::Exclusion { location } => format!(
                "Bạn là trợ lý tuyển dụng.\n\
                 Người dùng đang tìm việc NGÀNH \"{}\" ở CÁC KHU VỰC KHÁC (ngoài {}).\n\n\
                 Hệ thống đã tìm thấy các công việc phù hợp dưới đây:\n{}\n\n\
                 Hãy trả lời theo mẫu sau:\n\
                 \"Có chứ, dưới đây là các công việc [Tên ngành] ở các khu vực khác ngoài [{}] mà mình tìm được:\"\n\
                 Sau đó liệt kê ngắn gọn {} job.",
                criteria.field_label(),
                location,
                context,
                location,
                self.intro_span()
            ),
            ReplyMode::Normal => format!(
                "Bạn là trợ lý tuyển dụng.\n\
                 Dựa vào danh sách job tìm được:\n{}\n\
                 Hãy xác nhận đã tìm thấy job theo yêu cầu (ngành, địa điểm, lương...).\n\
                 Giới thiệu ngắn gọn {} job tốt nhất.",
                context,
                self.intro_span()
            ),
        }
    }

    /// "2-3" style span ending at the configured intro count.
    fn intro_span(&self) -> String {
        if self.intro_jobs <= 1 {
            "1".to_string()
        } else {
            format!("{}-{}", self.intro_jobs - 1, self.intro_jobs)
        }
    }
}

/// One line per job, the shape the model is asked to echo.
fn job_context(jobs: &[JobSummary]) -> String {
    jobs.iter()
        .map(|job| {
            format!(
                "- {} tại {} (Lương: {} - {})",
                job.title,
                job.location,
                salary(job.salary_min),
                salary(job.salary_max)
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn salary(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{}", v),
        None => "?".to_string(),
    }
}

// =============================================================================
// Tests
// =============================================================================
