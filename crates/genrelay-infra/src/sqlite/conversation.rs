//! SQLite ambient conversation log repository.
//!
//! Implements `ConversationRepository` from `genrelay-core`. The windowed
//! read (`take_window`) runs its select and prune inside one transaction on
//! the writer pool, so concurrent calls never observe a half-pruned log.

use sqlx::Row;

use genrelay_core::repository::ConversationRepository;
use genrelay_core::window;
use genrelay_types::error::RepositoryError;
use genrelay_types::message::AmbientLogEntry;

use super::pool::DatabasePool;
use super::{format_datetime, map_sqlx, parse_datetime};

/// SQLite-backed implementation of `ConversationRepository`.
pub struct SqliteConversationRepository {
    pool: DatabasePool,
}

impl SqliteConversationRepository {
    /// Create a new repository backed by the given database pool.
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

struct LogRow {
    entry: AmbientLogEntry,
    /// Raw stored timestamp, used verbatim in the prune comparison.
    raw_timestamp: String,
}

fn row_to_entry(chat_id: i64, row: &sqlx::sqlite::SqliteRow) -> Result<LogRow, RepositoryError> {
    let raw_timestamp: String = row.try_get("timestamp").map_err(map_sqlx)?;
    Ok(LogRow {
        entry: AmbientLogEntry {
            chat_id,
            from_name: row.try_get("from_name").map_err(map_sqlx)?,
            to_name: row.try_get("to_name").map_err(map_sqlx)?,
            timestamp: parse_datetime(&raw_timestamp)?,
            text: row.try_get("text").map_err(map_sqlx)?,
        },
        raw_timestamp,
    })
}

impl ConversationRepository for SqliteConversationRepository {
    async fn append(&self, entry: &AmbientLogEntry) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO conversation (chat_id, from_name, to_name, timestamp, text)
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .bind(entry.chat_id)
        .bind(&entry.from_name)
        .bind(&entry.to_name)
        .bind(format_datetime(&entry.timestamp))
        .bind(&entry.text)
        .execute(&self.pool.writer)
        .await
        .map_err(map_sqlx)?;
        Ok(())
    }

    /// Return the newest suffix fitting `budget` bytes and prune the rest.
    ///
    /// When not even the newest entry fits, nothing is returned and nothing
    /// is deleted. Running the call again on its own result is a no-op.
    async fn take_window(
        &self,
        chat_id: i64,
        budget: usize,
    ) -> Result<Vec<AmbientLogEntry>, RepositoryError> {
        let mut tx = self.pool.writer.begin().await.map_err(map_sqlx)?;

        let rows = sqlx::query(
            "SELECT from_name, to_name, timestamp, text
             FROM conversation WHERE chat_id = ?1
             ORDER BY timestamp DESC, rowid_pk DESC",
        )
        .bind(chat_id)
        .fetch_all(&mut *tx)
        .await
        .map_err(map_sqlx)?;

        let rows = rows
            .iter()
            .map(|row| row_to_entry(chat_id, row))
            .collect::<Result<Vec<_>, _>>()?;

        let sizes: Vec<_> = rows
            .iter()
            .map(|r| {
                (
                    r.entry.timestamp,
                    window::serialized_len(
                        &r.entry.from_name,
                        r.entry.to_name.as_deref(),
                        &r.entry.text,
                    ),
                )
            })
            .collect();
        let Some(cutoff) = window::cutoff_timestamp(&sizes, budget) else {
            tx.commit().await.map_err(map_sqlx)?;
            return Ok(Vec::new());
        };

        // Prune by the raw stored form of the cutoff row's timestamp so the
        // comparison matches exactly what SQLite stores.
        let raw_cutoff = rows
            .iter()
            .rev()
            .find(|r| r.entry.timestamp == cutoff)
            .map(|r| r.raw_timestamp.clone())
            .unwrap_or_else(|| format_datetime(&cutoff));
        sqlx::query("DELETE FROM conversation WHERE chat_id = ?1 AND timestamp < ?2")
            .bind(chat_id)
            .bind(&raw_cutoff)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx)?;

        tx.commit().await.map_err(map_sqlx)?;

        let mut window: Vec<_> = rows
            .into_iter()
            .map(|r| r.entry)
            .filter(|e| e.timestamp >= cutoff)
            .collect();
        window.reverse(); // oldest first
        Ok(window)
    }
}
