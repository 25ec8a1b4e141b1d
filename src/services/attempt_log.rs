use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::Result;
use crate::models::attempt::AttemptRow;

/// Append-only, per-user durable log of graded attempts. Rows are never
/// updated or deleted; reconstruction works purely from what was written.
#[async_trait]
pub trait AttemptLog: Send + Sync {
    /// Appends one attempt's rows atomically. All rows of a batch carry
    /// the same (user_id, subject, level, attempt_at).
    async fn append_batch(&self, rows: &[AttemptRow]) -> Result<()>;

    /// All rows for one user, in append order.
    async fn scan_by_user(&self, user_id: Uuid) -> Result<Vec<AttemptRow>>;
}

#[derive(Clone)]
pub struct PgAttemptLog {
    pool: PgPool,
}

impl PgAttemptLog {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AttemptLog for PgAttemptLog {
    async fn append_batch(&self, rows: &[AttemptRow]) -> Result<()> {
        if rows.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await?;
        for row in rows {
            sqlx::query(
                r#"
                INSERT INTO attempt_rows (
                    user_id, subject, level, attempt_at, question_number,
                    question, user_answer, correct_answer, is_correct,
                    total_score, total_questions
                ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
                "#,
            )
            .bind(row.user_id)
            .bind(&row.subject)
            .bind(row.level)
            .bind(row.attempt_at)
            .bind(row.question_number)
            .bind(&row.question)
            .bind(&row.user_answer)
            .bind(&row.correct_answer)
            .bind(row.is_correct)
            .bind(row.total_score)
            .bind(row.total_questions)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn scan_by_user(&self, user_id: Uuid) -> Result<Vec<AttemptRow>> {
        // id is a bigserial; ordering by it reproduces append order
        // regardless of how concurrent batches interleaved.
        let rows = sqlx::query_as::<_, AttemptRow>(
            r#"
            SELECT user_id, subject, level, attempt_at, question_number,
                   question, user_answer, correct_answer, is_correct,
                   total_score, total_questions
            FROM attempt_rows
            WHERE user_id = $1
            ORDER BY id ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}

#[cfg(test)]
pub mod testing {
    use super::*;
    use crate::error::Error;
    use std::sync::Mutex;

    #[derive(Default)]
    pub struct InMemoryAttemptLog {
        rows: Mutex<Vec<AttemptRow>>,
    }

    impl InMemoryAttemptLog {
        pub fn all_rows(&self) -> Vec<AttemptRow> {
            self.rows.lock().expect("attempt log poisoned").clone()
        }
    }

    #[async_trait]
    impl AttemptLog for InMemoryAttemptLog {
        async fn append_batch(&self, rows: &[AttemptRow]) -> Result<()> {
            self.rows
                .lock()
                .expect("attempt log poisoned")
                .extend_from_slice(rows);
            Ok(())
        }

        async fn scan_by_user(&self, user_id: Uuid) -> Result<Vec<AttemptRow>> {
            Ok(self
                .rows
                .lock()
                .expect("attempt log poisoned")
                .iter()
                .filter(|r| r.user_id == user_id)
                .cloned()
                .collect())
        }
    }

    pub struct UnavailableAttemptLog;

    #[async_trait]
    impl AttemptLog for UnavailableAttemptLog {
        async fn append_batch(&self, _: &[AttemptRow]) -> Result<()> {
            Err(Error::StoreUnavailable("attempt log offline".to_string()))
        }

        async fn scan_by_user(&self, _: Uuid) -> Result<Vec<AttemptRow>> {
            Err(Error::StoreUnavailable("attempt log offline".to_string()))
        }
    }
}
