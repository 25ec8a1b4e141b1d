use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Per-(user, subject) unlock state. `highest_unlocked` starts at 1 and is
/// non-decreasing for the lifetime of the record.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ProgressRecord {
    pub user_id: Uuid,
    pub subject: String,
    pub highest_unlocked: i32,
    pub updated_at: DateTime<Utc>,
}
