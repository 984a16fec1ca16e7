//! MySQL storage engine, the production backend.

use async_trait::async_trait;
use sqlx::mysql::{MySqlConnectOptions, MySqlPool, MySqlPoolOptions};
use tracing::debug;

use super::{MailboxVisitor, Store, parse_id, render_inbound};
use crate::config::{DATABASE_NAME, StorageConfig};
use crate::error::{Error, Result};
use crate::message::{InboundMessage, StoredMessage};

/// Storage engine backed by a MySQL server.
///
/// Cheap to clone; all clones share one connection pool.
#[derive(Debug, Clone)]
pub struct MySqlStore {
    pool: MySqlPool,
}

impl MySqlStore {
    /// Connects to the configured server and ensures the schema exists.
    ///
    /// The database name is [`DATABASE_NAME`], fixed by design.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Connection`] when the server is unreachable and
    /// [`Error::Schema`] when the message table cannot be created or
    /// migrated.
    pub async fn connect(config: &StorageConfig) -> Result<Self> {
        let options = MySqlConnectOptions::new()
            .host(&config.host)
            .port(config.port)
            .username(&config.username)
            .password(&config.password)
            .database(DATABASE_NAME);

        let pool = MySqlPoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(Error::Connection)?;

        let store = Self { pool };
        store.ensure_schema().await?;
        debug!(host = %config.host, port = config.port, "connected mysql store");
        Ok(store)
    }

    /// Creates the message table if absent and migrates pre-seen-flag
    /// tables forward.
    async fn ensure_schema(&self) -> Result<()> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS messages (
                id INT UNSIGNED NOT NULL AUTO_INCREMENT,
                mailbox VARCHAR(50) NOT NULL,
                created_at DATETIME NOT NULL,
                body LONGTEXT NOT NULL,
                subject VARCHAR(255) NOT NULL,
                sender_address VARCHAR(255) NOT NULL,
                sender_name VARCHAR(255) NOT NULL,
                seen BOOLEAN NOT NULL DEFAULT FALSE,
                PRIMARY KEY (id),
                INDEX idx_mailbox_created (mailbox, created_at)
            )
            ",
        )
        .execute(&self.pool)
        .await
        .map_err(Error::Schema)?;

        // Tables created before the seen flag existed lack the column.
        let seen_columns: i64 = sqlx::query_scalar(
            r"
            SELECT COUNT(*) FROM information_schema.columns
            WHERE table_schema = DATABASE()
              AND table_name = 'messages'
              AND column_name = 'seen'
            ",
        )
        .fetch_one(&self.pool)
        .await
        .map_err(Error::Schema)?;

        if seen_columns == 0 {
            sqlx::query(r"ALTER TABLE messages ADD COLUMN seen BOOLEAN NOT NULL DEFAULT FALSE")
                .execute(&self.pool)
                .await
                .map_err(Error::Schema)?;
        }

        Ok(())
    }
}

#[async_trait]
impl Store for MySqlStore {
    async fn add_message(&self, message: &dyn InboundMessage) -> Result<String> {
        let rendered = render_inbound(message).await?;

        let result = sqlx::query(
            r"
            INSERT INTO messages (mailbox, created_at, body, subject, sender_address, sender_name)
            VALUES (?, ?, ?, ?, ?, ?)
            ",
        )
        .bind(&rendered.mailbox)
        .bind(rendered.created_at)
        .bind(&rendered.body)
        .bind(&rendered.subject)
        .bind(&rendered.sender_address)
        .bind(&rendered.sender_name)
        .execute(&self.pool)
        .await
        .map_err(|source| Error::Persistence {
            op: "add_message",
            source,
        })?;

        let id = result.last_insert_id();
        debug!(mailbox = %rendered.mailbox, id, "stored message");
        Ok(id.to_string())
    }

    async fn get_message(&self, mailbox: &str, id: &str) -> Result<StoredMessage> {
        let numeric = parse_id(mailbox, id)?;
        sqlx::query_as::<_, StoredMessage>(
            r"
            SELECT id, mailbox, created_at, body, subject, sender_address, sender_name, seen
            FROM messages
            WHERE mailbox = ? AND id = ?
            ",
        )
        .bind(mailbox)
        .bind(numeric)
        .fetch_optional(&self.pool)
        .await
        .map_err(|source| Error::Persistence {
            op: "get_message",
            source,
        })?
        .ok_or_else(|| Error::NotFound {
            mailbox: mailbox.to_string(),
            id: id.to_string(),
        })
    }

    async fn get_messages(&self, mailbox: &str) -> Result<Vec<StoredMessage>> {
        sqlx::query_as::<_, StoredMessage>(
            r"
            SELECT id, mailbox, created_at, body, subject, sender_address, sender_name, seen
            FROM messages
            WHERE mailbox = ?
            ORDER BY created_at, id
            ",
        )
        .bind(mailbox)
        .fetch_all(&self.pool)
        .await
        .map_err(|source| Error::Persistence {
            op: "get_messages",
            source,
        })
    }

    async fn mark_seen(&self, mailbox: &str, id: &str) -> Result<()> {
        // Existence is checked first: MySQL reports zero affected rows for
        // value-identical updates, which would be indistinguishable from a
        // missing row.
        let message = self.get_message(mailbox, id).await?;

        sqlx::query(r"UPDATE messages SET seen = TRUE WHERE mailbox = ? AND id = ?")
            .bind(mailbox)
            .bind(message.id)
            .execute(&self.pool)
            .await
            .map_err(|source| Error::Persistence {
                op: "mark_seen",
                source,
            })?;
        Ok(())
    }

    async fn purge_messages(&self, mailbox: &str) -> Result<()> {
        let result = sqlx::query(r"DELETE FROM messages WHERE mailbox = ?")
            .bind(mailbox)
            .execute(&self.pool)
            .await
            .map_err(|source| Error::Persistence {
                op: "purge_messages",
                source,
            })?;
        debug!(mailbox, purged = result.rows_affected(), "purged mailbox");
        Ok(())
    }

    async fn remove_message(&self, mailbox: &str, id: &str) -> Result<()> {
        let numeric = parse_id(mailbox, id)?;
        let result = sqlx::query(r"DELETE FROM messages WHERE mailbox = ? AND id = ?")
            .bind(mailbox)
            .bind(numeric)
            .execute(&self.pool)
            .await
            .map_err(|source| Error::Persistence {
                op: "remove_message",
                source,
            })?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound {
                mailbox: mailbox.to_string(),
                id: id.to_string(),
            });
        }
        Ok(())
    }

    async fn visit_mailboxes(&self, visitor: MailboxVisitor<'_>) -> Result<()> {
        let mailboxes: Vec<String> =
            sqlx::query_scalar(r"SELECT DISTINCT mailbox FROM messages ORDER BY mailbox")
                .fetch_all(&self.pool)
                .await
                .map_err(|source| Error::Persistence {
                    op: "visit_mailboxes",
                    source,
                })?;

        for mailbox in mailboxes {
            let messages = self.get_messages(&mailbox).await?;
            if !visitor(&messages) {
                break;
            }
        }
        Ok(())
    }
}
