use serde::Serialize;
use sqlx::FromRow;

/// Database representation of a subscriber.
///
/// Lifecycle (registration, verification, unsubscribe) is owned by the
/// opt-in subsystem; the pipeline only reads these rows.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct SubscriberRow {
    pub email: String,
    pub is_verified: bool,
    pub subscribed: bool,
    pub unsubscribe_token: Option<String>,
}

impl SubscriberRow {
    /// Only verified and currently subscribed recipients receive alerts.
    pub fn is_active(&self) -> bool {
        self.is_verified && self.subscribed
    }
}
