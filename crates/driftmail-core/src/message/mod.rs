//! Message models crossing the storage boundary.
//!
//! [`InboundMessage`] is what the SMTP intake layer hands in;
//! [`StoredMessage`] is what retrieval hands back out.

mod inbound;
mod model;

pub use inbound::{BufferedMessage, InboundMessage, MessageBody};
pub use model::StoredMessage;
