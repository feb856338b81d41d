use async_trait::async_trait;
use sqlx::{Pool, Postgres};
use tracing::debug;

use super::models::SubscriberRow;
use super::StoreError;

/// Read-only view of the subscriber collection.
///
/// No pagination: the directory is small at this scale and the pipeline
/// filters active subscribers in memory.
#[async_trait]
pub trait SubscriberDirectory: Send + Sync {
    async fn list_all(&self) -> Result<Vec<SubscriberRow>, StoreError>;
}

/// Postgres-backed subscriber directory
pub struct PgSubscriberDirectory {
    pool: Pool<Postgres>,
}

impl PgSubscriberDirectory {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SubscriberDirectory for PgSubscriberDirectory {
    async fn list_all(&self) -> Result<Vec<SubscriberRow>, StoreError> {
        let rows = sqlx::query_as::<_, SubscriberRow>(
            "SELECT email, is_verified, subscribed, unsubscribe_token FROM subscribers",
        )
        .fetch_all(&self.pool)
        .await?;

        debug!("Listed {} subscriber(s)", rows.len());
        Ok(rows)
    }
}
