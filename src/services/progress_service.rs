use async_trait::async_trait;
use sqlx::PgPool;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::progress::ProgressRecord;
use crate::services::grading_service::GradeOutcome;

/// Decision taken for a proposed unlock target against the current value.
/// The same rule runs in every store implementation so a misbehaving
/// caller is rejected even if the coordinator was bypassed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Advance {
    /// Target is at or below the current value; replays must neither
    /// regress nor error.
    NoOp(i32),
    Commit(i32),
}

pub fn decide_advance(current: i32, target: i32) -> Result<Advance> {
    if target < 1 {
        return Err(Error::BadRequest(
            "highestUnlocked must be a positive number".to_string(),
        ));
    }
    if target <= current {
        return Ok(Advance::NoOp(current));
    }
    if target > current + 1 {
        return Err(Error::SkipRejected { current });
    }
    Ok(Advance::Commit(target))
}

/// Per-user, per-subject "highest unlocked level" record. Monotonic:
/// `advance_to` never lowers a value and never jumps more than one level.
#[async_trait]
pub trait ProgressStore: Send + Sync {
    /// Never fails on "not found"; level 1 is always unlocked.
    async fn highest_unlocked(&self, user_id: Uuid, subject: &str) -> Result<i32>;

    /// Returns the resulting value. Durable before returning success.
    async fn advance_to(&self, user_id: Uuid, subject: &str, target: i32) -> Result<i32>;
}

#[derive(Clone)]
pub struct PgProgressStore {
    pool: PgPool,
}

impl PgProgressStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProgressStore for PgProgressStore {
    async fn highest_unlocked(&self, user_id: Uuid, subject: &str) -> Result<i32> {
        let record = sqlx::query_as::<_, ProgressRecord>(
            r#"SELECT user_id, subject, highest_unlocked, updated_at
               FROM progress_records WHERE user_id = $1 AND subject = $2"#,
        )
        .bind(user_id)
        .bind(subject)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record.map(|r| r.highest_unlocked).unwrap_or(1))
    }

    async fn advance_to(&self, user_id: Uuid, subject: &str, target: i32) -> Result<i32> {
        let current = self.highest_unlocked(user_id, subject).await?;
        let target = match decide_advance(current, target)? {
            Advance::NoOp(current) => return Ok(current),
            Advance::Commit(target) => target,
        };

        // GREATEST keeps the record monotonic even if two commits for the
        // same target race; the loser converges to the same value.
        let record = sqlx::query_as::<_, ProgressRecord>(
            r#"
            INSERT INTO progress_records (user_id, subject, highest_unlocked, updated_at)
            VALUES ($1, $2, $3, NOW())
            ON CONFLICT (user_id, subject) DO UPDATE
            SET highest_unlocked = GREATEST(progress_records.highest_unlocked, EXCLUDED.highest_unlocked),
                updated_at = NOW()
            RETURNING user_id, subject, highest_unlocked, updated_at
            "#,
        )
        .bind(user_id)
        .bind(subject)
        .bind(target)
        .fetch_one(&self.pool)
        .await?;

        Ok(record.highest_unlocked)
    }
}

/// Result of the unlock step of a submission. A store failure is carried
/// as a warning so the graded attempt is never lost because of it.
#[derive(Debug, Clone)]
pub struct UnlockOutcome {
    pub highest_unlocked: Option<i32>,
    pub warning: Option<String>,
}

/// The only component that calls `ProgressStore::advance_to`.
#[derive(Clone)]
pub struct UnlockCoordinator {
    store: Arc<dyn ProgressStore>,
}

impl UnlockCoordinator {
    pub fn new(store: Arc<dyn ProgressStore>) -> Self {
        Self { store }
    }

    pub async fn highest_unlocked(&self, user_id: Uuid, subject: &str) -> Result<i32> {
        self.store.highest_unlocked(user_id, subject).await
    }

    /// Direct advance requested by the client (POST /progress). Skip
    /// rejection surfaces to the caller as a 400.
    pub async fn propose(&self, user_id: Uuid, subject: &str, proposed: i32) -> Result<i32> {
        self.store.advance_to(user_id, subject, proposed).await
    }

    /// Unlock step after grading. A passed attempt at level N advances to
    /// exactly N+1, which makes retried submissions idempotent: replays
    /// hit the no-op path and can never unlock beyond N+1. Failures are
    /// downgraded to warnings.
    pub async fn apply(
        &self,
        user_id: Uuid,
        subject: &str,
        level: i32,
        outcome: &GradeOutcome,
    ) -> UnlockOutcome {
        if !outcome.passed {
            return UnlockOutcome {
                highest_unlocked: None,
                warning: None,
            };
        }

        match self.store.advance_to(user_id, subject, level + 1).await {
            Ok(value) => UnlockOutcome {
                highest_unlocked: Some(value),
                warning: None,
            },
            Err(Error::SkipRejected { current }) => {
                tracing::warn!(
                    %user_id, subject, level,
                    "passed attempt for a level beyond the unlocked range; progress unchanged"
                );
                UnlockOutcome {
                    highest_unlocked: Some(current),
                    warning: Some("Progress not advanced: level is not unlocked yet".to_string()),
                }
            }
            Err(e) => {
                tracing::warn!(%user_id, subject, level, error = ?e, "progress advance failed");
                UnlockOutcome {
                    highest_unlocked: None,
                    warning: Some("Progress could not be saved; your attempt was still recorded".to_string()),
                }
            }
        }
    }
}
