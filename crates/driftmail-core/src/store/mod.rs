//! Pluggable storage backends.
//!
//! The [`Store`] trait is the contract consumed by the SMTP intake and
//! web/API layers. Two engines ship here: [`MySqlStore`] for production
//! and [`SqliteStore`] for embedded deployments and tests. Both persist
//! the same rows and honor the same semantics.

mod mysql;
mod sqlite;

pub use mysql::MySqlStore;
pub use sqlite::SqliteStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use driftmail_mime::{Envelope, inline_resources};
use tokio::io::AsyncReadExt;

use crate::error::{Error, Result};
use crate::message::{InboundMessage, StoredMessage};

/// Visitor handed one mailbox's full message set per call by
/// [`Store::visit_mailboxes`]; returning `false` stops the enumeration.
pub type MailboxVisitor<'a> = &'a mut (dyn FnMut(&[StoredMessage]) -> bool + Send);

/// The pluggable store contract.
///
/// Implementations are safe for concurrent use without external locking:
/// they hold no in-process mutable state beyond a shared connection pool,
/// and every operation is a single bounded statement or round-trip
/// sequence, never a transaction held across calls. Cancellation follows
/// tokio future-drop semantics.
///
/// A backend that has not implemented an operation must return
/// [`Error::Unsupported`] rather than silently succeed with an empty
/// result.
#[async_trait]
pub trait Store: Send + Sync {
    /// Decodes, renders and persists one inbound message as a new row owned
    /// by the first recipient address, returning the new row's id in its
    /// canonical string form. Either one fully-populated durable row is
    /// written or none.
    async fn add_message(&self, message: &dyn InboundMessage) -> Result<String>;

    /// Fetches exactly the message with `id` scoped to `mailbox`.
    ///
    /// Fails with [`Error::NotFound`] when absent, including when the id
    /// belongs to a different mailbox.
    async fn get_message(&self, mailbox: &str, id: &str) -> Result<StoredMessage>;

    /// Returns all messages for `mailbox`, ordered oldest first.
    async fn get_messages(&self, mailbox: &str) -> Result<Vec<StoredMessage>>;

    /// Flags a message as read. Idempotent: a second call observes the
    /// same outcome as the first.
    async fn mark_seen(&self, mailbox: &str, id: &str) -> Result<()>;

    /// Deletes all messages for `mailbox`. An empty mailbox is a success.
    async fn purge_messages(&self, mailbox: &str) -> Result<()>;

    /// Deletes exactly the message with `id` scoped to `mailbox`.
    async fn remove_message(&self, mailbox: &str, id: &str) -> Result<()>;

    /// Enumerates all distinct mailboxes in a stable order, handing each
    /// one's full message set to `visitor` until it returns `false` or the
    /// set is exhausted. An early stop is a success.
    async fn visit_mailboxes(&self, visitor: MailboxVisitor<'_>) -> Result<()>;
}

/// One inbound message decoded and rendered, ready for row insertion.
pub(crate) struct RenderedMessage {
    pub mailbox: String,
    pub created_at: DateTime<Utc>,
    pub body: String,
    pub subject: String,
    pub sender_address: String,
    pub sender_name: String,
}

/// The shared intake pipeline: read the source, decode the envelope,
/// embed inline resources, and take the addressing fields the intake
/// layer already parsed.
pub(crate) async fn render_inbound(message: &dyn InboundMessage) -> Result<RenderedMessage> {
    let mailbox = message
        .recipients()
        .first()
        .cloned()
        .ok_or(Error::NoRecipients)?;

    let mut source = message.source().await.map_err(Error::SourceRead)?;
    let mut raw = Vec::new();
    let read = source.read_to_end(&mut raw).await;
    // Stream is released on every exit path, success or failure.
    drop(source);
    read.map_err(Error::SourceRead)?;

    let envelope = Envelope::decode(&raw)?;
    let body = if envelope.html.is_empty() {
        // Text-only message: store the plain body rather than nothing.
        envelope.text
    } else {
        inline_resources(&envelope.html, &envelope.inlines)
    };

    Ok(RenderedMessage {
        mailbox,
        created_at: message.date(),
        body,
        subject: message.subject().to_string(),
        sender_address: message.sender().address.clone(),
        sender_name: message.sender().name.clone(),
    })
}

/// Parses an external id string; ids that never were issued map to
/// [`Error::NotFound`] rather than a distinct parse error.
pub(crate) fn parse_id(mailbox: &str, id: &str) -> Result<u32> {
    id.parse().map_err(|_| Error::NotFound {
        mailbox: mailbox.to_string(),
        id: id.to_string(),
    })
}
