//! # driftmail-mime
//!
//! Decoding of inbound RFC 5322 messages into a renderable envelope.
//!
//! This crate provides:
//! - **Envelope decoding**: parse a raw message into headers, text/HTML
//!   bodies and inline resources
//! - **Inline rendering**: rewrite `cid:` references into self-contained
//!   base64 data URIs, so the stored body depends on no external blobs
//!
//! ## Quick Start
//!
//! ```ignore
//! use driftmail_mime::{Envelope, inline_resources};
//!
//! let envelope = Envelope::decode(raw_bytes)?;
//! let body = inline_resources(&envelope.html, &envelope.inlines);
//! ```
//!
//! Decoding is a pure function over the input bytes: no I/O, no state.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod envelope;
mod error;
mod inline;

pub use envelope::{Address, Envelope, InlineResource};
pub use error::{Error, Result};
pub use inline::inline_resources;
