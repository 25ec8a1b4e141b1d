use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use validator::Validate;

use crate::error::{Error, Result};
use crate::models::attempt::{AttemptSummary, QuestionResult};
use crate::models::question::Question;

#[derive(Debug, Clone, Deserialize)]
pub struct ProgressQuery {
    pub subject: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ProgressUpdateRequest {
    #[validate(length(min = 1, message = "subject is required"))]
    pub subject: String,
    pub highest_unlocked: i32,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressResponse {
    pub success: bool,
    pub subject: String,
    pub highest_unlocked: i32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct QuizQuery {
    pub subject: String,
    pub level: i32,
}

#[derive(Debug, Clone, Serialize)]
pub struct QuizResponse {
    pub success: bool,
    pub subject: String,
    pub level: i32,
    pub questions: Vec<Question>,
}

/// Submission as the client sends it. The question snapshot is what the
/// client was actually served; positions that failed to resolve arrive as
/// nulls and are preserved as holes rather than silently dropped. The
/// client's own score/totalQuestions are accepted for wire compatibility
/// but the server re-grades and trusts only its own result.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SubmitQuizRequest {
    #[validate(length(min = 1, message = "subject is required"))]
    pub subject: String,
    #[validate(range(min = 1, message = "level must be a positive number"))]
    pub level: i32,
    /// 0-based question index -> selected option text.
    #[validate(length(min = 1, message = "answers are required"))]
    pub answers: HashMap<String, String>,
    pub questions: Vec<Option<Question>>,
    #[serde(default)]
    pub score: Option<i32>,
    #[serde(default)]
    pub total_questions: Option<i32>,
}

impl SubmitQuizRequest {
    /// Converts the duck-typed wire map into the strongly-typed index map
    /// the grading engine expects, rejecting malformed keys outright.
    pub fn typed_answers(&self) -> Result<HashMap<usize, String>> {
        self.answers
            .iter()
            .map(|(key, value)| {
                key.parse::<usize>()
                    .map(|idx| (idx, value.clone()))
                    .map_err(|_| {
                        Error::BadRequest(format!("answers key '{}' is not a question index", key))
                    })
            })
            .collect()
    }

    /// Client-declared total, used only to cross-check the payload shape.
    /// Grading and recording size themselves from the question snapshot.
    pub fn declared_total(&self) -> usize {
        self.total_questions
            .and_then(|t| usize::try_from(t).ok())
            .unwrap_or(0)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SubmitResults {
    pub score: i32,
    pub total: i32,
    pub percentage: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitQuizResponse {
    pub success: bool,
    pub passed: bool,
    pub results: SubmitResults,
    pub plot_path: Option<String>,
    pub highest_unlocked: Option<i32>,
    pub timestamp: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct HistoryResponse {
    pub success: bool,
    pub history: Vec<AttemptSummary>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DetailsQuery {
    pub subject: String,
    pub level: i32,
    pub timestamp: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizDetails {
    pub questions: Vec<QuestionResult>,
    pub summary: AttemptSummary,
    pub plot_path: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DetailsResponse {
    pub success: bool,
    pub details: QuizDetails,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn typed_answers_parses_indices() {
        let req = SubmitQuizRequest {
            subject: "python".into(),
            level: 1,
            answers: [("0".to_string(), "a".to_string()), ("3".to_string(), "b".to_string())]
                .into(),
            questions: vec![],
            score: None,
            total_questions: None,
        };
        let typed = req.typed_answers().unwrap();
        assert_eq!(typed.get(&0), Some(&"a".to_string()));
        assert_eq!(typed.get(&3), Some(&"b".to_string()));
    }

    #[test]
    fn typed_answers_rejects_non_numeric_keys() {
        let req = SubmitQuizRequest {
            subject: "python".into(),
            level: 1,
            answers: [("first".to_string(), "a".to_string())].into(),
            questions: vec![],
            score: None,
            total_questions: None,
        };
        assert!(req.typed_answers().is_err());
    }
}
