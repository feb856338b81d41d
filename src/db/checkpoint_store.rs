use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Pool, Postgres, Row};
use tracing::debug;

use super::StoreError;

/// Name of the singleton checkpoint record for the video source.
const CHECKPOINT_NAME: &str = "youtube";

/// Durable marker of the latest publish timestamp already considered
/// processed. Read once at the start of a run, written at most once at
/// the end.
#[async_trait]
pub trait CheckpointStore: Send + Sync {
    /// Returns `None` when no run has completed yet (cold start).
    async fn load(&self) -> Result<Option<DateTime<Utc>>, StoreError>;

    /// Overwrite the checkpoint with the given publish timestamp.
    async fn save(&self, last_processed_at: DateTime<Utc>) -> Result<(), StoreError>;
}

/// Postgres-backed checkpoint store using a single named row in
/// `pipeline_state`.
pub struct PgCheckpointStore {
    pool: Pool<Postgres>,
}

impl PgCheckpointStore {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CheckpointStore for PgCheckpointStore {
    async fn load(&self) -> Result<Option<DateTime<Utc>>, StoreError> {
        let row = sqlx::query(
            "SELECT last_processed_at FROM pipeline_state WHERE name = $1",
        )
        .bind(CHECKPOINT_NAME)
        .fetch_optional(&self.pool)
        .await?;

        let last_processed_at = match row {
            Some(row) => row.try_get::<Option<DateTime<Utc>>, _>("last_processed_at")?,
            None => None,
        };

        debug!("Loaded checkpoint: {:?}", last_processed_at);
        Ok(last_processed_at)
    }

    async fn save(&self, last_processed_at: DateTime<Utc>) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO pipeline_state (name, last_processed_at)
            VALUES ($1, $2)
            ON CONFLICT (name) DO UPDATE SET last_processed_at = EXCLUDED.last_processed_at
            "#,
        )
        .bind(CHECKPOINT_NAME)
        .bind(last_processed_at)
        .execute(&self.pool)
        .await?;

        debug!("Checkpoint saved: {}", last_processed_at);
        Ok(())
    }
}
