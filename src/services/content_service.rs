use async_trait::async_trait;
use std::path::PathBuf;

use crate::error::{Error, Result};
use crate::models::question::Question;

/// Read-only lookup of the ordered question set for (subject, level). The
/// core never mutates question content.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ContentProvider: Send + Sync {
    async fn question_set(&self, subject: &str, level: i32) -> Result<Vec<Question>>;
}

/// Questions stored as `<data_dir>/<subject>/<level>.json`.
pub struct FsContentProvider {
    data_dir: PathBuf,
}

impl FsContentProvider {
    pub fn new(data_dir: PathBuf) -> Self {
        Self { data_dir }
    }
}

#[async_trait]
impl ContentProvider for FsContentProvider {
    async fn question_set(&self, subject: &str, level: i32) -> Result<Vec<Question>> {
        // Subject names come from the client and become a path component.
        if subject.is_empty()
            || !subject
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(Error::BadRequest("Invalid subject name".to_string()));
        }

        let path = self.data_dir.join(subject).join(format!("{}.json", level));
        let raw = tokio::fs::read(&path).await.map_err(|_| {
            Error::ContentUnavailable(format!(
                "Quiz file not found for subject '{}' level {}",
                subject, level
            ))
        })?;

        serde_json::from_slice(&raw).map_err(|e| {
            tracing::error!(subject, level, error = %e, "malformed quiz file");
            Error::ContentUnavailable(format!(
                "Quiz file for subject '{}' level {} could not be read",
                subject, level
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn rejects_path_traversal_subjects() {
        let provider = FsContentProvider::new(PathBuf::from("data"));
        let err = provider.question_set("../secrets", 1).await.unwrap_err();
        assert!(matches!(err, Error::BadRequest(_)));
    }

    #[tokio::test]
    async fn missing_file_is_content_unavailable() {
        let provider = FsContentProvider::new(std::env::temp_dir().join("no-such-quiz-data"));
        let err = provider.question_set("python", 1).await.unwrap_err();
        assert!(matches!(err, Error::ContentUnavailable(_)));
    }

    #[tokio::test]
    async fn provider_errors_pass_through_the_trait_object() {
        let mut provider = MockContentProvider::new();
        provider
            .expect_question_set()
            .returning(|_, _| Err(Error::ContentUnavailable("content offline".to_string())));

        let provider: std::sync::Arc<dyn ContentProvider> = std::sync::Arc::new(provider);
        let err = provider.question_set("python", 1).await.unwrap_err();
        assert!(matches!(err, Error::ContentUnavailable(_)));
    }

    #[tokio::test]
    async fn reads_and_parses_a_question_file() {
        let dir = std::env::temp_dir().join(format!("quiz-content-{}", uuid::Uuid::new_v4()));
        tokio::fs::create_dir_all(dir.join("python")).await.unwrap();
        tokio::fs::write(
            dir.join("python").join("1.json"),
            r#"[{"question":"2+2?","options":["3","4"],"correct":"4"}]"#,
        )
        .await
        .unwrap();

        let provider = FsContentProvider::new(dir.clone());
        let questions = provider.question_set("python", 1).await.unwrap();
        assert_eq!(questions.len(), 1);
        assert_eq!(questions[0].correct, "4");

        tokio::fs::remove_dir_all(dir).await.ok();
    }
}
