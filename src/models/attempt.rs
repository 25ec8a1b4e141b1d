use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Sentinel stored when question content could not be resolved at write
/// time, and emitted again when reconstruction has to fill a gap.
pub const MISSING_QUESTION: &str = "Missing Question Data";
/// Sentinel for a question the user left blank.
pub const NOT_ANSWERED: &str = "Not Answered";
/// Sentinel correct-answer text for unresolved question content.
pub const NO_CORRECT_ANSWER: &str = "N/A";

/// One durable row of the append-only attempt log. An attempt is the set of
/// rows sharing (user_id, subject, level, attempt_at); `attempt_at` is the
/// join key used to group rows back together. Rows are immutable.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct AttemptRow {
    pub user_id: Uuid,
    pub subject: String,
    pub level: i32,
    pub attempt_at: DateTime<Utc>,
    pub question_number: i32,
    pub question: String,
    pub user_answer: String,
    pub correct_answer: String,
    pub is_correct: bool,
    /// Denormalized onto every row so one row is enough to rebuild the
    /// attempt's summary.
    pub total_score: i32,
    pub total_questions: i32,
}

/// Derived view: one per distinct (subject, level, attempt_at) group in a
/// user's log. Never stored.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AttemptSummary {
    pub subject: String,
    pub level: i32,
    /// Millisecond-precision ISO-8601, as originally written.
    pub timestamp: String,
    pub total_score: i32,
    pub total_questions: i32,
    pub percentage: f64,
    pub passed: bool,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct QuestionResult {
    pub question_number: i32,
    pub question: String,
    pub user_answer: String,
    pub correct_answer: String,
    pub is_correct: bool,
}

/// Full reconstruction of one attempt: a contiguous 1..=total question
/// range (gap-filled with sentinels) plus its summary.
#[derive(Debug, Clone, Serialize)]
pub struct AttemptDetail {
    pub questions: Vec<QuestionResult>,
    pub summary: AttemptSummary,
}
