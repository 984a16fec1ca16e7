//! Error types for the storage core.

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in storage operations.
///
/// Failures are returned to the immediate caller; the store never retries
/// internally. Retry policy belongs to the caller (e.g. SMTP intake may
/// requeue on [`Error::Persistence`]).
#[derive(Debug, Error)]
pub enum Error {
    /// The raw message source could not be read.
    #[error("Failed to read message source: {0}")]
    SourceRead(#[source] std::io::Error),

    /// The raw message is not well-formed RFC 5322 / MIME.
    #[error("Failed to decode message: {0}")]
    Decode(#[from] driftmail_mime::Error),

    /// The message carried no recipient to file it under.
    #[error("Message has no recipients")]
    NoRecipients,

    /// The backend could not be reached at construction.
    #[error("Failed to connect to database: {0}")]
    Connection(#[source] sqlx::Error),

    /// The schema could not be created or migrated at construction.
    #[error("Failed to ensure schema: {0}")]
    Schema(#[source] sqlx::Error),

    /// A read or write against an established connection failed.
    #[error("Storage operation {op} failed: {source}")]
    Persistence {
        /// The failing operation.
        op: &'static str,
        /// The underlying database error.
        #[source]
        source: sqlx::Error,
    },

    /// The requested (mailbox, id) pair does not exist.
    #[error("Message {id} not found in mailbox {mailbox}")]
    NotFound {
        /// Mailbox the lookup was scoped to.
        mailbox: String,
        /// Externally visible message id.
        id: String,
    },

    /// The backend does not implement this operation.
    ///
    /// A backend must fail loudly with this rather than return an empty
    /// result, so callers can detect unsupported backends.
    #[error("Operation not supported by this backend: {0}")]
    Unsupported(&'static str),
}

impl Error {
    /// True when the error reports a missing (mailbox, id) pair.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}
