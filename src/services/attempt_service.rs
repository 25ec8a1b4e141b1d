use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::Result;
use crate::models::attempt::{AttemptRow, MISSING_QUESTION, NOT_ANSWERED, NO_CORRECT_ANSWER};
use crate::models::question::Question;
use crate::services::attempt_log::AttemptLog;
use crate::services::grading_service::GradeOutcome;
use crate::utils::time::now_millis;

/// Writes one graded attempt to the durable log as a single batch sharing
/// one millisecond-precision timestamp (the grouping key used later to
/// reassemble the attempt).
#[derive(Clone)]
pub struct AttemptRecorder {
    log: Arc<dyn AttemptLog>,
}

impl AttemptRecorder {
    pub fn new(log: Arc<dyn AttemptLog>) -> Self {
        Self { log }
    }

    /// Appends the attempt and returns the shared timestamp.
    pub async fn record(
        &self,
        user_id: Uuid,
        subject: &str,
        level: i32,
        snapshot: &[Option<&Question>],
        answers: &HashMap<usize, String>,
        outcome: &GradeOutcome,
    ) -> Result<DateTime<Utc>> {
        let attempt_at = now_millis();
        let rows = build_rows(user_id, subject, level, snapshot, answers, outcome, attempt_at);
        self.log.append_batch(&rows).await?;
        tracing::info!(
            %user_id, subject, level,
            rows = rows.len(),
            score = outcome.score,
            "attempt recorded"
        );
        Ok(attempt_at)
    }
}

/// One row per question number from 1..=total inclusive, even where the
/// snapshot has no content for that position. Unresolved positions get the
/// "Missing Question Data"/"N/A" sentinels so reconstruction can always
/// produce a complete, gap-free range. Correctness is computed here, once,
/// and never recomputed from re-fetched content.
pub fn build_rows(
    user_id: Uuid,
    subject: &str,
    level: i32,
    snapshot: &[Option<&Question>],
    answers: &HashMap<usize, String>,
    outcome: &GradeOutcome,
    attempt_at: DateTime<Utc>,
) -> Vec<AttemptRow> {
    (1..=outcome.total)
        .map(|number| {
            let idx = (number - 1) as usize;
            let submitted = answers.get(&idx);
            let user_answer = submitted
                .cloned()
                .unwrap_or_else(|| NOT_ANSWERED.to_string());

            let (question, correct_answer, is_correct) = match snapshot.get(idx).and_then(|s| *s) {
                Some(q) => {
                    let is_correct = submitted.map(|a| *a == q.correct).unwrap_or(false);
                    (q.question.clone(), q.correct.clone(), is_correct)
                }
                None => (
                    MISSING_QUESTION.to_string(),
                    NO_CORRECT_ANSWER.to_string(),
                    false,
                ),
            };

            AttemptRow {
                user_id,
                subject: subject.to_string(),
                level,
                attempt_at,
                question_number: number,
                question,
                user_answer,
                correct_answer,
                is_correct,
                total_score: outcome.score,
                total_questions: outcome.total,
            }
        })
        .collect()
}
