use std::collections::HashMap;

use crate::models::question::Question;

/// Minimum score ratio required for an attempt to unlock the next level.
pub const PASS_THRESHOLD: f64 = 0.70;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GradeOutcome {
    pub score: i32,
    pub total: i32,
    pub ratio: f64,
    pub passed: bool,
}

impl GradeOutcome {
    pub fn percentage(&self) -> f64 {
        self.ratio * 100.0
    }
}

/// Deterministic, side-effect-free grading. Safe to call repeatedly with
/// identical inputs for identical output.
pub struct GradingService;

impl GradingService {
    /// Grades a fully resolved question set. `answers` maps the 0-based
    /// question index to the submitted option text; a missing or
    /// non-matching answer counts as incorrect.
    pub fn grade(questions: &[Question], answers: &HashMap<usize, String>) -> GradeOutcome {
        let snapshot: Vec<Option<&Question>> = questions.iter().map(Some).collect();
        Self::grade_snapshot(&snapshot, answers)
    }

    /// Grades a snapshot that may contain holes where content lookup
    /// failed. A hole can never be answered correctly. The total is the
    /// snapshot length, never anything the client declares; it never drops
    /// below 1 so the ratio is well defined even for an empty set.
    pub fn grade_snapshot(
        snapshot: &[Option<&Question>],
        answers: &HashMap<usize, String>,
    ) -> GradeOutcome {
        let total = snapshot.len().max(1) as i32;
        let mut score: i32 = 0;
        for (idx, slot) in snapshot.iter().enumerate() {
            if let Some(q) = slot {
                if answers.get(&idx).map(|a| *a == q.correct).unwrap_or(false) {
                    score += 1;
                }
            }
        }
        let ratio = f64::from(score) / f64::from(total);
        GradeOutcome {
            score,
            total,
            ratio,
            passed: ratio >= PASS_THRESHOLD,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn question(n: usize) -> Question {
        Question {
            question: format!("Question {}", n),
            options: vec!["a".into(), "b".into(), "c".into(), "d".into()],
            correct: "a".into(),
        }
    }

    fn answers(correct_for: &[usize]) -> HashMap<usize, String> {
        correct_for.iter().map(|&i| (i, "a".to_string())).collect()
    }

    #[test]
    fn empty_question_set_is_degenerate_fail() {
        let outcome = GradingService::grade(&[], &HashMap::new());
        assert_eq!(outcome.score, 0);
        assert_eq!(outcome.total, 1);
        assert_eq!(outcome.ratio, 0.0);
        assert!(!outcome.passed);
    }

    #[test]
    fn seven_of_ten_passes_at_exact_threshold() {
        let questions: Vec<Question> = (0..10).map(question).collect();
        let outcome = GradingService::grade(&questions, &answers(&[0, 1, 2, 3, 4, 5, 6]));
        assert_eq!(outcome.score, 7);
        assert_eq!(outcome.total, 10);
        assert!(outcome.passed, "0.70 is boundary-inclusive");
    }

    #[test]
    fn six_of_ten_fails() {
        let questions: Vec<Question> = (0..10).map(question).collect();
        let outcome = GradingService::grade(&questions, &answers(&[0, 1, 2, 3, 4, 5]));
        assert_eq!(outcome.score, 6);
        assert!(!outcome.passed);
    }

    #[test]
    fn missing_answers_count_as_incorrect() {
        let questions: Vec<Question> = (0..4).map(question).collect();
        let outcome = GradingService::grade(&questions, &answers(&[2]));
        assert_eq!(outcome.score, 1);
        assert_eq!(outcome.total, 4);
    }

    #[test]
    fn wrong_option_does_not_score() {
        let questions: Vec<Question> = (0..2).map(question).collect();
        let mut submitted = HashMap::new();
        submitted.insert(0usize, "b".to_string());
        let outcome = GradingService::grade(&questions, &submitted);
        assert_eq!(outcome.score, 0);
    }

    #[test]
    fn snapshot_holes_never_score() {
        let q0 = question(0);
        let q2 = question(2);
        let snapshot = vec![Some(&q0), None, Some(&q2)];
        let mut submitted = answers(&[0, 2]);
        // An answer aimed at the hole must not count.
        submitted.insert(1, "a".to_string());
        let outcome = GradingService::grade_snapshot(&snapshot, &submitted);
        assert_eq!(outcome.score, 2);
        assert_eq!(outcome.total, 3);
        assert!(!outcome.passed);
    }

    #[test]
    fn total_is_bounded_by_the_question_set() {
        let q = question(0);
        let snapshot = vec![Some(&q)];
        let mut submitted = answers(&[0]);
        // Answer keys far outside the set neither score nor widen it.
        submitted.insert(1_999_999, "a".to_string());
        let outcome = GradingService::grade_snapshot(&snapshot, &submitted);
        assert_eq!(outcome.score, 1);
        assert_eq!(outcome.total, 1);
    }

    #[test]
    fn grading_is_deterministic() {
        let questions: Vec<Question> = (0..10).map(question).collect();
        let submitted = answers(&[0, 1, 2, 3, 4, 5, 6, 7]);
        let first = GradingService::grade(&questions, &submitted);
        let second = GradingService::grade(&questions, &submitted);
        assert_eq!(first, second);
    }
}
