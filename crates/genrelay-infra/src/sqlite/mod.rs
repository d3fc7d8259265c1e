//! SQLite storage layer.
//!
//! Repository implementations backed by SQLite with WAL mode and split
//! read/write connection pools.

pub mod conversation;
pub mod message;
pub mod pool;
pub mod preferences;
pub mod status;

pub use conversation::SqliteConversationRepository;
pub use message::SqliteMessageRepository;
pub use pool::DatabasePool;
pub use preferences::SqlitePreferencesRepository;
pub use status::SqliteStatusRepository;

use chrono::{DateTime, Utc};
use genrelay_types::error::RepositoryError;

/// Timestamps are stored as RFC 3339 text in UTC, so lexicographic order in
/// SQL matches chronological order.
pub(crate) fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339()
}

pub(crate) fn parse_datetime(s: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepositoryError::Query(format!("invalid datetime: {e}")))
}

pub(crate) fn map_sqlx(err: sqlx::Error) -> RepositoryError {
    match err {
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
            RepositoryError::Connection
        }
        other => RepositoryError::Query(other.to_string()),
    }
}
