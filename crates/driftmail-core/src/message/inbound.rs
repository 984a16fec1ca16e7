//! Contract for messages handed over by the SMTP intake layer.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use driftmail_mime::{Address, Envelope};
use tokio::io::AsyncRead;

/// The raw message byte stream, consumed once by the store.
pub type MessageBody = Box<dyn AsyncRead + Send + Unpin>;

/// One inbound message as accepted by the SMTP intake layer.
///
/// The addressing accessors are pre-parsed by the intake layer and trusted
/// as-is; the store re-decodes the raw source only for body, HTML and
/// inline-resource extraction.
#[async_trait]
pub trait InboundMessage: Send + Sync {
    /// Recipient addresses; never empty for an accepted delivery.
    fn recipients(&self) -> &[String];

    /// Sender identity.
    fn sender(&self) -> &Address;

    /// Subject line.
    fn subject(&self) -> &str;

    /// Delivery time as declared by the message's Date header.
    fn date(&self) -> DateTime<Utc>;

    /// Opens the raw RFC 5322 byte stream.
    ///
    /// The stream is read to the end exactly once and released by the
    /// caller on every exit path, success or failure.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the source cannot be opened.
    async fn source(&self) -> std::io::Result<MessageBody>;
}

/// An inbound message buffered fully in memory, as produced by an SMTP
/// DATA phase.
#[derive(Debug, Clone)]
pub struct BufferedMessage {
    recipients: Vec<String>,
    sender: Address,
    subject: String,
    date: DateTime<Utc>,
    raw: Vec<u8>,
}

impl BufferedMessage {
    /// Builds a buffered message with explicit addressing fields, keeping
    /// `raw` as the source stream.
    #[must_use]
    pub fn new(
        recipients: Vec<String>,
        sender: Address,
        subject: String,
        date: DateTime<Utc>,
        raw: Vec<u8>,
    ) -> Self {
        Self {
            recipients,
            sender,
            subject,
            date,
            raw,
        }
    }

    /// Builds a buffered message whose addressing fields come from decoding
    /// `raw` itself, for intake layers without a separate envelope.
    ///
    /// # Errors
    ///
    /// Returns a decode error if `raw` is not a well-formed message.
    pub fn decode(raw: Vec<u8>) -> driftmail_mime::Result<Self> {
        let envelope = Envelope::decode(&raw)?;
        Ok(Self {
            recipients: envelope.recipients,
            sender: envelope.sender,
            subject: envelope.subject,
            date: envelope.date,
            raw,
        })
    }
}

#[async_trait]
impl InboundMessage for BufferedMessage {
    fn recipients(&self) -> &[String] {
        &self.recipients
    }

    fn sender(&self) -> &Address {
        &self.sender
    }

    fn subject(&self) -> &str {
        &self.subject
    }

    fn date(&self) -> DateTime<Utc> {
        self.date
    }

    async fn source(&self) -> std::io::Result<MessageBody> {
        Ok(Box::new(std::io::Cursor::new(self.raw.clone())))
    }
}
