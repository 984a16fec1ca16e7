//! Backend connection configuration.

use serde::Deserialize;

/// Name of the database/schema owned by this store.
///
/// Fixed by design: the store owns its schema the way a mailbox owns its
/// directory, and callers configure only how to reach the server.
pub const DATABASE_NAME: &str = "driftmail";

/// Default MySQL server port.
pub const DEFAULT_PORT: u16 = 3306;

/// Connection parameters for the MySQL storage engine.
///
/// Supplied by the host process's configuration loader; the database name
/// itself is [`DATABASE_NAME`] and not configurable.
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Database server hostname or IP.
    pub host: String,
    /// Database server port.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Database username.
    pub username: String,
    /// Database password.
    pub password: String,
}

const fn default_port() -> u16 {
    DEFAULT_PORT
}
