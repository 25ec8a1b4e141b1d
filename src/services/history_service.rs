use chrono::{DateTime, Utc};
use std::sync::Arc;
use uuid::Uuid;

use crate::error::Result;
use crate::models::attempt::{
    AttemptDetail, AttemptRow, AttemptSummary, QuestionResult, MISSING_QUESTION, NOT_ANSWERED,
    NO_CORRECT_ANSWER,
};
use crate::services::attempt_log::AttemptLog;
use crate::services::grading_service::PASS_THRESHOLD;
use crate::utils::time::to_millis_iso;

/// Client round-trips may lose timestamp precision, so detail lookup
/// matches within this absolute window instead of requiring equality.
pub const DETAIL_TOLERANCE_SECS: i64 = 10;

/// Rebuilds attempts from the durable log. Reads only what the recorder
/// wrote; never consults live content or in-memory submission state.
#[derive(Clone)]
pub struct HistoryReconstructor {
    log: Arc<dyn AttemptLog>,
}

impl HistoryReconstructor {
    pub fn new(log: Arc<dyn AttemptLog>) -> Self {
        Self { log }
    }

    /// Distinct attempts, most recent first.
    pub async fn list_attempts(&self, user_id: Uuid) -> Result<Vec<AttemptSummary>> {
        let rows = self.log.scan_by_user(user_id).await?;
        Ok(summarize(&rows))
    }

    /// One attempt's full per-question detail, or None when nothing
    /// matches within tolerance.
    pub async fn attempt_detail(
        &self,
        user_id: Uuid,
        subject: &str,
        level: i32,
        approx: DateTime<Utc>,
    ) -> Result<Option<AttemptDetail>> {
        let rows = self.log.scan_by_user(user_id).await?;
        Ok(reconstruct_detail(&rows, subject, level, approx))
    }
}

/// Grouping key; must match exactly what the recorder stamps on a batch.
type GroupKey = (String, i32, DateTime<Utc>);

fn group_rows(rows: &[AttemptRow]) -> Vec<(GroupKey, Vec<&AttemptRow>)> {
    let mut groups: Vec<(GroupKey, Vec<&AttemptRow>)> = Vec::new();
    for row in rows {
        let key = (row.subject.clone(), row.level, row.attempt_at);
        match groups.iter_mut().find(|(k, _)| *k == key) {
            Some((_, members)) => members.push(row),
            None => groups.push((key, vec![row])),
        }
    }
    groups
}

fn summary_for(key: &GroupKey, first: &AttemptRow) -> AttemptSummary {
    // All rows of a batch carry identical totals by construction; the
    // first row is authoritative.
    let total = first.total_questions.max(1);
    let percentage = f64::from(first.total_score) / f64::from(total) * 100.0;
    AttemptSummary {
        subject: key.0.clone(),
        level: key.1,
        timestamp: to_millis_iso(key.2),
        total_score: first.total_score,
        total_questions: first.total_questions,
        percentage,
        passed: percentage >= PASS_THRESHOLD * 100.0,
    }
}

pub(crate) fn summarize(rows: &[AttemptRow]) -> Vec<AttemptSummary> {
    let groups = group_rows(rows);
    let mut summaries: Vec<(DateTime<Utc>, AttemptSummary)> = groups
        .iter()
        .map(|(key, members)| (key.2, summary_for(key, members[0])))
        .collect();
    summaries.sort_by(|a, b| b.0.cmp(&a.0));
    summaries.into_iter().map(|(_, s)| s).collect()
}

pub(crate) fn reconstruct_detail(
    rows: &[AttemptRow],
    subject: &str,
    level: i32,
    approx: DateTime<Utc>,
) -> Option<AttemptDetail> {
    // First group within tolerance wins, in append order: the same policy
    // the log has always had. Rapid retries that land inside one window
    // are indistinguishable here.
    let groups = group_rows(rows);
    let (key, members) = groups.into_iter().find(|((s, l, at), _)| {
        // Compared in milliseconds; whole-second arithmetic would truncate
        // a 10.9 s difference into the window.
        s.eq_ignore_ascii_case(subject)
            && *l == level
            && (*at - approx).num_milliseconds().abs() <= DETAIL_TOLERANCE_SECS * 1_000
    })?;

    let first = members[0];
    let highest_seen = members.iter().map(|r| r.question_number).max().unwrap_or(0);
    let total = first.total_questions.max(highest_seen);
    if total < 1 {
        return None;
    }

    // Refill to a contiguous 1..=total range independently of the
    // recorder's own gap-filling, in case an older batch was written
    // partially or corrupted.
    let questions: Vec<QuestionResult> = (1..=total)
        .map(|number| {
            match members.iter().find(|r| r.question_number == number) {
                Some(row) => QuestionResult {
                    question_number: number,
                    question: row.question.clone(),
                    user_answer: row.user_answer.clone(),
                    correct_answer: row.correct_answer.clone(),
                    is_correct: row.is_correct,
                },
                None => QuestionResult {
                    question_number: number,
                    question: MISSING_QUESTION.to_string(),
                    user_answer: NOT_ANSWERED.to_string(),
                    correct_answer: NO_CORRECT_ANSWER.to_string(),
                    is_correct: false,
                },
            }
        })
        .collect();

    if questions.is_empty() {
        return None;
    }

    let summary = summary_for(&key, first);
    Some(AttemptDetail { questions, summary })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use crate::utils::time::now_millis;

    fn row(
        user_id: Uuid,
        subject: &str,
        level: i32,
        at: DateTime<Utc>,
        number: i32,
        score: i32,
        total: i32,
    ) -> AttemptRow {
        AttemptRow {
            user_id,
            subject: subject.to_string(),
            level,
            attempt_at: at,
            question_number: number,
            question: format!("prompt {}", number),
            user_answer: "x".to_string(),
            correct_answer: "x".to_string(),
            is_correct: true,
            total_score: score,
            total_questions: total,
        }
    }

    #[test]
    fn summaries_are_deduplicated_and_newest_first() {
        let user = Uuid::new_v4();
        let older = now_millis();
        let newer = older + Duration::seconds(120);
        let mut rows = vec![
            row(user, "python", 1, older, 1, 2, 2),
            row(user, "python", 1, older, 2, 2, 2),
            row(user, "python", 2, newer, 1, 1, 2),
            row(user, "python", 2, newer, 2, 1, 2),
        ];
        // A retried submission can duplicate rows for the same key.
        rows.push(row(user, "python", 1, older, 1, 2, 2));

        let summaries = summarize(&rows);
        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[0].level, 2, "most recent first");
        assert_eq!(summaries[1].level, 1);
        assert_eq!(summaries[1].total_score, 2);
        assert_eq!(summaries[1].percentage, 100.0);
        assert!(summaries[1].passed);
        assert!(!summaries[0].passed);
    }

    #[test]
    fn detail_matches_within_tolerance_only() {
        let user = Uuid::new_v4();
        let at = now_millis();
        let rows = vec![row(user, "python", 3, at, 1, 1, 1)];

        let close = at + Duration::seconds(5);
        assert!(reconstruct_detail(&rows, "python", 3, close).is_some());

        let far = at + Duration::seconds(15);
        assert!(reconstruct_detail(&rows, "python", 3, far).is_none());
    }

    #[test]
    fn detail_window_is_not_truncated_to_whole_seconds() {
        let user = Uuid::new_v4();
        let at = now_millis();
        let rows = vec![row(user, "python", 3, at, 1, 1, 1)];

        let just_inside = at + Duration::milliseconds(9_900);
        assert!(reconstruct_detail(&rows, "python", 3, just_inside).is_some());

        // 10.9 s is outside the 10 s window even though it rounds down to 10.
        let just_outside = at + Duration::milliseconds(10_900);
        assert!(reconstruct_detail(&rows, "python", 3, just_outside).is_none());
    }

    #[test]
    fn detail_subject_match_is_case_insensitive_level_exact() {
        let user = Uuid::new_v4();
        let at = now_millis();
        let rows = vec![row(user, "Python", 3, at, 1, 1, 1)];

        assert!(reconstruct_detail(&rows, "python", 3, at).is_some());
        assert!(reconstruct_detail(&rows, "python", 4, at).is_none());
    }

    #[test]
    fn detail_refills_missing_question_numbers() {
        let user = Uuid::new_v4();
        let at = now_millis();
        // Rows 2 and 4 of a 5-question attempt were lost.
        let rows = vec![
            row(user, "cpp", 2, at, 1, 3, 5),
            row(user, "cpp", 2, at, 3, 3, 5),
            row(user, "cpp", 2, at, 5, 3, 5),
        ];

        let detail = reconstruct_detail(&rows, "cpp", 2, at).expect("detail");
        assert_eq!(detail.questions.len(), 5);
        let numbers: Vec<i32> = detail.questions.iter().map(|q| q.question_number).collect();
        assert_eq!(numbers, vec![1, 2, 3, 4, 5]);
        assert_eq!(detail.questions[1].question, MISSING_QUESTION);
        assert_eq!(detail.questions[1].correct_answer, NO_CORRECT_ANSWER);
        assert!(!detail.questions[1].is_correct);
        assert_eq!(detail.summary.total_score, 3);
    }

    #[test]
    fn detail_first_group_within_window_wins() {
        let user = Uuid::new_v4();
        let first_at = now_millis();
        let retry_at = first_at + Duration::seconds(3);
        let rows = vec![
            row(user, "python", 1, first_at, 1, 1, 1),
            row(user, "python", 1, retry_at, 1, 0, 1),
        ];

        let detail = reconstruct_detail(&rows, "python", 1, retry_at).expect("detail");
        // Both groups are inside the window; append order decides.
        assert_eq!(detail.summary.timestamp, to_millis_iso(first_at));
    }

    #[test]
    fn quoted_prompt_text_round_trips_exactly() {
        let user = Uuid::new_v4();
        let at = now_millis();
        let prompt = r#"What does "borrow" mean, in Rust's sense?"#;
        let mut quoted = row(user, "rust", 1, at, 1, 1, 1);
        quoted.question = prompt.to_string();

        let detail = reconstruct_detail(&[quoted], "rust", 1, at).expect("detail");
        assert_eq!(detail.questions[0].question, prompt);
    }

    #[tokio::test]
    async fn reconstructor_reads_through_the_log() {
        use crate::services::attempt_log::testing::InMemoryAttemptLog;

        let log = Arc::new(InMemoryAttemptLog::default());
        let user = Uuid::new_v4();
        let at = now_millis();
        log.append_batch(&[row(user, "python", 1, at, 1, 1, 1)])
            .await
            .unwrap();

        let history = HistoryReconstructor::new(log);
        let summaries = history.list_attempts(user).await.unwrap();
        assert_eq!(summaries.len(), 1);
        let detail = history
            .attempt_detail(user, "python", 1, at)
            .await
            .unwrap();
        assert!(detail.is_some());
        // Another user's log is empty.
        assert!(history.list_attempts(Uuid::new_v4()).await.unwrap().is_empty());
    }
}
