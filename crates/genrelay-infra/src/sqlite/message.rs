//! SQLite dialog message repository implementation.
//!
//! Implements `MessageRepository` from `genrelay-core` using sqlx with split
//! read/write pools. Rows are insert-only; `reply_id` forms the dialog chain
//! the assembler walks.

use sqlx::Row;

use genrelay_core::repository::MessageRepository;
use genrelay_types::error::RepositoryError;
use genrelay_types::message::StoredMessage;

use super::pool::DatabasePool;
use super::{format_datetime, map_sqlx, parse_datetime};

/// SQLite-backed implementation of `MessageRepository`.
pub struct SqliteMessageRepository {
    pool: DatabasePool,
}

impl SqliteMessageRepository {
    /// Create a new repository backed by the given database pool.
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

fn row_to_message(row: &sqlx::sqlite::SqliteRow) -> Result<StoredMessage, RepositoryError> {
    let timestamp: String = row.try_get("timestamp").map_err(map_sqlx)?;
    Ok(StoredMessage {
        chat_id: row.try_get("chat_id").map_err(map_sqlx)?,
        id: row.try_get("id").map_err(map_sqlx)?,
        reply_id: row.try_get("reply_id").map_err(map_sqlx)?,
        from_self: row.try_get("from_self").map_err(map_sqlx)?,
        text: row.try_get("text").map_err(map_sqlx)?,
        timestamp: parse_datetime(&timestamp)?,
    })
}

fn is_foreign_key_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .is_some_and(|db| matches!(db.kind(), sqlx::error::ErrorKind::ForeignKeyViolation))
}

impl MessageRepository for SqliteMessageRepository {
    /// Persist one dialog message.
    ///
    /// A `reply_id` that does not resolve within the chat is degraded to
    /// `NULL` instead of failing: the message becomes a dialog root rather
    /// than a permanently broken chain link.
    async fn save_message(&self, msg: &StoredMessage) -> Result<(), RepositoryError> {
        let timestamp = format_datetime(&msg.timestamp);
        let insert = sqlx::query(
            "INSERT INTO messages (chat_id, id, reply_id, from_self, text, timestamp)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        )
        .bind(msg.chat_id)
        .bind(msg.id)
        .bind(msg.reply_id)
        .bind(msg.from_self)
        .bind(&msg.text)
        .bind(&timestamp)
        .execute(&self.pool.writer)
        .await;

        match insert {
            Ok(_) => Ok(()),
            Err(err) if msg.reply_id.is_some() && is_foreign_key_violation(&err) => {
                tracing::debug!(
                    chat_id = msg.chat_id,
                    message_id = msg.id,
                    reply_id = msg.reply_id,
                    "reply target not stored, saving as a dialog root"
                );
                sqlx::query(
                    "INSERT INTO messages (chat_id, id, reply_id, from_self, text, timestamp)
                     VALUES (?1, ?2, NULL, ?3, ?4, ?5)",
                )
                .bind(msg.chat_id)
                .bind(msg.id)
                .bind(msg.from_self)
                .bind(&msg.text)
                .bind(&timestamp)
                .execute(&self.pool.writer)
                .await
                .map_err(map_sqlx)?;
                Ok(())
            }
            Err(err) => Err(map_sqlx(err)),
        }
    }

    async fn get_message(
        &self,
        chat_id: i64,
        id: i64,
    ) -> Result<Option<StoredMessage>, RepositoryError> {
        let row = sqlx::query(
            "SELECT chat_id, id, reply_id, from_self, text, timestamp
             FROM messages WHERE chat_id = ?1 AND id = ?2",
        )
        .bind(chat_id)
        .bind(id)
        .fetch_optional(&self.pool.reader)
        .await
        .map_err(map_sqlx)?;

        row.as_ref().map(row_to_message).transpose()
    }
}
