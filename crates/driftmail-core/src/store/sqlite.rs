//! SQLite storage engine for embedded deployments and tests.

use async_trait::async_trait;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use tracing::debug;

use super::{MailboxVisitor, Store, parse_id, render_inbound};
use crate::error::{Error, Result};
use crate::message::{InboundMessage, StoredMessage};

/// Storage engine backed by a SQLite database file.
///
/// Implements the same contract as [`super::MySqlStore`] against a local
/// file, which also makes it the in-process test target for the store
/// semantics.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Opens (creating if needed) the database at `path` and ensures the
    /// schema exists.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Connection`] when the file cannot be opened and
    /// [`Error::Schema`] when the message table cannot be created or
    /// migrated.
    pub async fn new(path: &str) -> Result<Self> {
        let url = format!("sqlite:{path}?mode=rwc");
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(&url)
            .await
            .map_err(Error::Connection)?;

        let store = Self { pool };
        store.ensure_schema().await?;
        debug!(path, "opened sqlite store");
        Ok(store)
    }

    /// Creates an in-memory store for testing.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Connection`] or [`Error::Schema`] as [`Self::new`].
    pub async fn in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .map_err(Error::Connection)?;

        let store = Self { pool };
        store.ensure_schema().await?;
        Ok(store)
    }

    /// Creates the message table if absent and migrates pre-seen-flag
    /// tables forward.
    async fn ensure_schema(&self) -> Result<()> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS messages (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                mailbox TEXT NOT NULL,
                created_at TEXT NOT NULL,
                body TEXT NOT NULL,
                subject TEXT NOT NULL,
                sender_address TEXT NOT NULL,
                sender_name TEXT NOT NULL,
                seen INTEGER NOT NULL DEFAULT 0
            )
            ",
        )
        .execute(&self.pool)
        .await
        .map_err(Error::Schema)?;

        // Tables created before the seen flag existed lack the column.
        let seen_columns: i64 = sqlx::query_scalar(
            r"SELECT COUNT(*) FROM pragma_table_info('messages') WHERE name = 'seen'",
        )
        .fetch_one(&self.pool)
        .await
        .map_err(Error::Schema)?;

        if seen_columns == 0 {
            sqlx::query(r"ALTER TABLE messages ADD COLUMN seen INTEGER NOT NULL DEFAULT 0")
                .execute(&self.pool)
                .await
                .map_err(Error::Schema)?;
        }

        sqlx::query(
            r"
            CREATE INDEX IF NOT EXISTS idx_messages_mailbox_created
            ON messages (mailbox, created_at)
            ",
        )
        .execute(&self.pool)
        .await
        .map_err(Error::Schema)?;

        Ok(())
    }
}

#[async_trait]
impl Store for SqliteStore {
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

        let id = result.last_insert_rowid();
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
        // Same shape as the MySQL engine: existence first, then an
        // absolute set, so repeated calls observe identical outcomes.
        let message = self.get_message(mailbox, id).await?;

        sqlx::query(r"UPDATE messages SET seen = 1 WHERE mailbox = ? AND id = ?")
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

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::message::BufferedMessage;

    fn html_message(mailbox: &str, subject: &str, date: &str, html: &str) -> BufferedMessage {
        let raw = format!(
            "From: Sender Name <sender@example.com>\r\n\
             To: {mailbox}\r\n\
             Subject: {subject}\r\n\
             Date: {date}\r\n\
             Content-Type: text/html; charset=utf-8\r\n\
             \r\n\
             {html}\r\n"
        );
        BufferedMessage::decode(raw.into_bytes()).unwrap()
    }

    #[tokio::test]
    async fn test_add_then_get_round_trip() {
        let store = SqliteStore::in_memory().await.unwrap();
        let message = html_message(
            "a@x.com",
            "Hi",
            "Mon, 5 Jan 2026 10:00:00 +0000",
            "<p>hello</p>",
        );

        let id = store.add_message(&message).await.unwrap();
        let fetched = store.get_message("a@x.com", &id).await.unwrap();

        assert_eq!(fetched.external_id(), id);
        assert_eq!(fetched.mailbox, "a@x.com");
        assert_eq!(fetched.subject, "Hi");
        assert_eq!(fetched.sender_address, "sender@example.com");
        assert_eq!(fetched.sender_name, "Sender Name");
        assert_eq!(fetched.created_at.timestamp(), 1_767_607_200);
        assert!(fetched.body.contains("<p>hello</p>"));
        assert!(!fetched.seen);
    }

    #[tokio::test]
    async fn test_add_inlines_cid_image() {
        let store = SqliteStore::in_memory().await.unwrap();
        let raw = b"From: Bob <bob@x.com>\r\n\
            To: a@x.com\r\n\
            Subject: Hi\r\n\
            Date: Mon, 5 Jan 2026 10:00:00 +0000\r\n\
            MIME-Version: 1.0\r\n\
            Content-Type: multipart/related; boundary=\"b1\"\r\n\
            \r\n\
            --b1\r\n\
            Content-Type: text/html\r\n\
            \r\n\
            <img src=\"cid:img1\">\r\n\
            --b1\r\n\
            Content-Type: image/png\r\n\
            Content-ID: <img1>\r\n\
            Content-Transfer-Encoding: base64\r\n\
            \r\n\
            3q2+7w==\r\n\
            --b1--\r\n"
            .to_vec();
        let message = BufferedMessage::decode(raw).unwrap();

        let id = store.add_message(&message).await.unwrap();
        assert!(id.parse::<u32>().is_ok());

        let fetched = store.get_message("a@x.com", &id).await.unwrap();
        assert_eq!(fetched.subject, "Hi");
        assert!(fetched.body.contains("data:application/octet-stream;base64,3q2+7w=="));
        assert!(!fetched.body.contains("cid:"));
    }

    #[tokio::test]
    async fn test_text_only_message_keeps_plain_body() {
        let store = SqliteStore::in_memory().await.unwrap();
        let raw = b"From: bob@x.com\r\n\
            To: a@x.com\r\n\
            Subject: plain\r\n\
            Content-Type: text/plain\r\n\
            \r\n\
            just words\r\n"
            .to_vec();
        let message = BufferedMessage::decode(raw).unwrap();

        let id = store.add_message(&message).await.unwrap();
        let fetched = store.get_message("a@x.com", &id).await.unwrap();
        assert!(fetched.body.contains("just words"));
    }

    #[tokio::test]
    async fn test_get_messages_orders_by_created_at() {
        let store = SqliteStore::in_memory().await.unwrap();
        // Inserted newest first; retrieval must sort oldest first.
        let later = html_message("b@x.com", "second", "Tue, 6 Jan 2026 09:00:00 +0000", "<i>2</i>");
        let earlier = html_message("b@x.com", "first", "Mon, 5 Jan 2026 09:00:00 +0000", "<i>1</i>");

        store.add_message(&later).await.unwrap();
        store.add_message(&earlier).await.unwrap();

        let messages = store.get_messages("b@x.com").await.unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].subject, "first");
        assert_eq!(messages[1].subject, "second");
        assert!(messages[0].created_at < messages[1].created_at);
    }

    #[tokio::test]
    async fn test_get_message_is_scoped_to_mailbox() {
        let store = SqliteStore::in_memory().await.unwrap();
        let message = html_message("a@x.com", "mine", "Mon, 5 Jan 2026 10:00:00 +0000", "x");
        let id = store.add_message(&message).await.unwrap();

        let err = store.get_message("other@x.com", &id).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_remove_then_get_is_not_found() {
        let store = SqliteStore::in_memory().await.unwrap();
        let message = html_message("a@x.com", "gone", "Mon, 5 Jan 2026 10:00:00 +0000", "x");
        let id = store.add_message(&message).await.unwrap();

        store.remove_message("a@x.com", &id).await.unwrap();
        let err = store.get_message("a@x.com", &id).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_remove_unknown_is_not_found() {
        let store = SqliteStore::in_memory().await.unwrap();
        let err = store.remove_message("a@x.com", "7").await.unwrap_err();
        assert!(err.is_not_found());

        // Ids that never were issued behave the same.
        let err = store.remove_message("a@x.com", "not-a-number").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_remove_is_scoped_to_mailbox() {
        let store = SqliteStore::in_memory().await.unwrap();
        let message = html_message("a@x.com", "keep", "Mon, 5 Jan 2026 10:00:00 +0000", "x");
        let id = store.add_message(&message).await.unwrap();

        let err = store.remove_message("other@x.com", &id).await.unwrap_err();
        assert!(err.is_not_found());
        assert!(store.get_message("a@x.com", &id).await.is_ok());
    }

    #[tokio::test]
    async fn test_purge_empty_mailbox_succeeds() {
        let store = SqliteStore::in_memory().await.unwrap();
        store.purge_messages("empty@x.com").await.unwrap();
        assert!(store.get_messages("empty@x.com").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_purge_removes_only_the_given_mailbox() {
        let store = SqliteStore::in_memory().await.unwrap();
        let mine = html_message("a@x.com", "one", "Mon, 5 Jan 2026 10:00:00 +0000", "x");
        let theirs = html_message("b@x.com", "two", "Mon, 5 Jan 2026 10:00:00 +0000", "y");
        store.add_message(&mine).await.unwrap();
        store.add_message(&theirs).await.unwrap();

        store.purge_messages("a@x.com").await.unwrap();

        assert!(store.get_messages("a@x.com").await.unwrap().is_empty());
        assert_eq!(store.get_messages("b@x.com").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_mark_seen_is_idempotent() {
        let store = SqliteStore::in_memory().await.unwrap();
        let message = html_message("a@x.com", "read me", "Mon, 5 Jan 2026 10:00:00 +0000", "x");
        let id = store.add_message(&message).await.unwrap();

        store.mark_seen("a@x.com", &id).await.unwrap();
        store.mark_seen("a@x.com", &id).await.unwrap();

        let fetched = store.get_message("a@x.com", &id).await.unwrap();
        assert!(fetched.seen);
    }

    #[tokio::test]
    async fn test_mark_seen_unknown_is_not_found() {
        let store = SqliteStore::in_memory().await.unwrap();
        let err = store.mark_seen("a@x.com", "3").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_visit_mailboxes_covers_all() {
        let store = SqliteStore::in_memory().await.unwrap();
        for mailbox in ["a@x.com", "b@x.com", "c@x.com"] {
            let message = html_message(mailbox, "m", "Mon, 5 Jan 2026 10:00:00 +0000", "x");
            store.add_message(&message).await.unwrap();
        }

        let mut visited = Vec::new();
        store
            .visit_mailboxes(&mut |messages| {
                visited.push(messages[0].mailbox.clone());
                true
            })
            .await
            .unwrap();

        assert_eq!(visited, ["a@x.com", "b@x.com", "c@x.com"]);
    }

    #[tokio::test]
    async fn test_visit_mailboxes_stops_when_visitor_says_so() {
        let store = SqliteStore::in_memory().await.unwrap();
        for mailbox in ["a@x.com", "b@x.com", "c@x.com"] {
            let message = html_message(mailbox, "m", "Mon, 5 Jan 2026 10:00:00 +0000", "x");
            store.add_message(&message).await.unwrap();
        }

        let mut calls = 0;
        store
            .visit_mailboxes(&mut |_| {
                calls += 1;
                false
            })
            .await
            .unwrap();

        assert_eq!(calls, 1);
    }

    #[tokio::test]
    async fn test_visit_mailboxes_on_empty_store() {
        let store = SqliteStore::in_memory().await.unwrap();
        let mut calls = 0;
        store
            .visit_mailboxes(&mut |_| {
                calls += 1;
                true
            })
            .await
            .unwrap();
        assert_eq!(calls, 0);
    }

    #[tokio::test]
    async fn test_ids_stay_unique_after_removal() {
        let store = SqliteStore::in_memory().await.unwrap();
        let first = html_message("a@x.com", "one", "Mon, 5 Jan 2026 10:00:00 +0000", "x");
        let id = store.add_message(&first).await.unwrap();
        store.remove_message("a@x.com", &id).await.unwrap();

        let second = html_message("a@x.com", "two", "Mon, 5 Jan 2026 11:00:00 +0000", "y");
        let next_id = store.add_message(&second).await.unwrap();
        assert_ne!(id, next_id);
    }

    #[tokio::test]
    async fn test_store_is_usable_as_trait_object() {
        let store: Box<dyn Store> = Box::new(SqliteStore::in_memory().await.unwrap());
        let message = html_message("a@x.com", "dyn", "Mon, 5 Jan 2026 10:00:00 +0000", "x");
        let id = store.add_message(&message).await.unwrap();
        assert!(store.get_message("a@x.com", &id).await.is_ok());
    }
}
