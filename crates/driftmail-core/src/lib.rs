//! # driftmail-core
//!
//! Mailbox storage backends for the driftmail disposable-email receiver.
//!
//! This crate provides:
//! - The [`Store`] capability trait consumed by the SMTP intake and
//!   web/API layers
//! - A MySQL engine ([`MySqlStore`]) for production deployments
//! - A SQLite engine ([`SqliteStore`]) for embedded use and tests
//! - The persisted [`StoredMessage`] model and the [`InboundMessage`]
//!   intake contract
//!
//! ## Quick Start
//!
//! ```ignore
//! use driftmail_core::{BufferedMessage, SqliteStore, Store};
//!
//! let store = SqliteStore::new("driftmail.db").await?;
//! let message = BufferedMessage::decode(raw_bytes)?;
//! let id = store.add_message(&message).await?;
//! let stored = store.get_message("box@drift.example", &id).await?;
//! ```
//!
//! Engines are cheap-to-clone handles over a shared connection pool and
//! are safe for concurrent use without external locking.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod config;
mod error;
pub mod message;
pub mod store;

pub use config::{DATABASE_NAME, DEFAULT_PORT, StorageConfig};
pub use driftmail_mime::{Address, Envelope, InlineResource, inline_resources};
pub use error::{Error, Result};
pub use message::{BufferedMessage, InboundMessage, MessageBody, StoredMessage};
pub use store::{MailboxVisitor, MySqlStore, SqliteStore, Store};
