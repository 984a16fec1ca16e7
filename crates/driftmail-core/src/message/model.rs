//! Stored message row model.

use chrono::{DateTime, Utc};
use sqlx::FromRow;

/// One delivered message as persisted by a storage engine.
///
/// Rows are append-only once created: only the `seen` flag mutates, until
/// the row is removed individually or by a mailbox purge.
#[derive(Debug, Clone, FromRow)]
pub struct StoredMessage {
    /// Auto-assigned row id; never reused. Externally visible as its
    /// decimal string form, see [`Self::external_id`].
    pub id: u32,
    /// Recipient mailbox address the message was delivered to.
    pub mailbox: String,
    /// Delivery time as declared by the message's own Date header.
    pub created_at: DateTime<Utc>,
    /// HTML body with inline resources already embedded as data URIs.
    pub body: String,
    /// Subject line.
    pub subject: String,
    /// Sender email address.
    pub sender_address: String,
    /// Sender display name.
    pub sender_name: String,
    /// Whether the message has been marked read.
    pub seen: bool,
}

impl StoredMessage {
    /// The id in its canonical external string form.
    #[must_use]
    pub fn external_id(&self) -> String {
        self.id.to_string()
    }
}
