//! Error types for envelope decoding.

/// Result type alias for envelope operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Envelope decoding error types.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The input is not a well-formed RFC 5322 / MIME message.
    #[error("Malformed message: {0}")]
    Parse(#[from] mailparse::MailParseError),
}
