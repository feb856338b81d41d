pub mod checkpoint_store;
pub mod connection;
pub mod migrations;
pub mod models;
pub mod subscriber_directory;

use thiserror::Error;

/// Errors surfaced by the persistence layer
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub use checkpoint_store::{CheckpointStore, PgCheckpointStore};
pub use subscriber_directory::{PgSubscriberDirectory, SubscriberDirectory};
