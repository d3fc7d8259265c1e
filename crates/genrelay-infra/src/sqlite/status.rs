//! SQLite access-status repository.
//!
//! Implements `StatusRepository` from `genrelay-core`. Lookups upsert: a
//! user or chat seen for the first time is created as `PENDING`, so every
//! requester always resolves to an effective status.

use std::str::FromStr;

use sqlx::Row;

use genrelay_core::repository::StatusRepository;
use genrelay_types::error::RepositoryError;
use genrelay_types::status::{ChatStatus, UserStatus};

use super::map_sqlx;
use super::pool::DatabasePool;

/// SQLite-backed implementation of `StatusRepository`.
pub struct SqliteStatusRepository {
    pool: DatabasePool,
}

impl SqliteStatusRepository {
    /// Create a new repository backed by the given database pool.
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

fn parse_status<T: FromStr<Err = String>>(raw: &str) -> Result<T, RepositoryError> {
    raw.parse::<T>().map_err(RepositoryError::Query)
}

impl StatusRepository for SqliteStatusRepository {
    /// Status of a user, creating a `PENDING` row on first sight.
    ///
    /// The `direct` flag is sticky: once a user has messaged the bot
    /// one-to-one it stays set.
    async fn user_status(&self, user_id: i64, direct: bool) -> Result<UserStatus, RepositoryError> {
        let row = sqlx::query(
            "INSERT INTO users (id, status, direct) VALUES (?1, ?2, ?3)
             ON CONFLICT (id) DO UPDATE SET direct = users.direct | excluded.direct
             RETURNING status",
        )
        .bind(user_id)
        .bind(UserStatus::Pending.to_string())
        .bind(direct)
        .fetch_one(&self.pool.writer)
        .await
        .map_err(map_sqlx)?;

        let raw: String = row.try_get("status").map_err(map_sqlx)?;
        parse_status(&raw)
    }

    /// Status of a chat, creating a `PENDING` row on first sight.
    async fn chat_status(&self, chat_id: i64) -> Result<ChatStatus, RepositoryError> {
        let row = sqlx::query(
            "INSERT INTO chats (id, status) VALUES (?1, ?2)
             ON CONFLICT (id) DO UPDATE SET status = chats.status
             RETURNING status",
        )
        .bind(chat_id)
        .bind(ChatStatus::Pending.to_string())
        .fetch_one(&self.pool.writer)
        .await
        .map_err(map_sqlx)?;

        let raw: String = row.try_get("status").map_err(map_sqlx)?;
        parse_status(&raw)
    }

    async fn set_user_status(
        &self,
        user_id: i64,
        status: UserStatus,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO users (id, status, direct) VALUES (?1, ?2, 0)
             ON CONFLICT (id) DO UPDATE SET status = excluded.status",
        )
        .bind(user_id)
        .bind(status.to_string())
        .execute(&self.pool.writer)
        .await
        .map_err(map_sqlx)?;
        Ok(())
    }

    async fn set_chat_status(
        &self,
        chat_id: i64,
        status: ChatStatus,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO chats (id, status) VALUES (?1, ?2)
             ON CONFLICT (id) DO UPDATE SET status = excluded.status",
        )
        .bind(chat_id)
        .bind(status.to_string())
        .execute(&self.pool.writer)
        .await
        .map_err(map_sqlx)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sqlite::pool::tests::test_pool;

    #[tokio::test]
    async fn first_sight_creates_pending_user() {
        let (_dir, pool) = test_pool().await;
        let repo = SqliteStatusRepository::new(pool);

        let status = repo.user_status(1, false).await.unwrap();
        assert_eq!(status, UserStatus::Pending);
    }

    #[tokio::test]
    async fn set_then_get_user_status() {
        let (_dir, pool) = test_pool().await;
        let repo = SqliteStatusRepository::new(pool);

        repo.set_user_status(2, UserStatus::Authorized).await.unwrap();
        let status = repo.user_status(2, false).await.unwrap();
        assert_eq!(status, UserStatus::Authorized);
    }

    #[tokio::test]
    async fn direct_flag_is_sticky() {
        let (_dir, pool) = test_pool().await;
        let repo = SqliteStatusRepository::new(pool.clone());

        repo.user_status(3, true).await.unwrap();
        repo.user_status(3, false).await.unwrap();

        let (direct,): (bool,) = sqlx::query_as("SELECT direct FROM users WHERE id = 3")
            .fetch_one(&pool.reader)
            .await
            .unwrap();
        assert!(direct);
    }

    #[tokio::test]
    async fn lookup_does_not_reset_an_existing_status() {
        let (_dir, pool) = test_pool().await;
        let repo = SqliteStatusRepository::new(pool);

        repo.set_chat_status(9, ChatStatus::Authorized).await.unwrap();
        let status = repo.chat_status(9).await.unwrap();
        assert_eq!(status, ChatStatus::Authorized);
    }

    #[tokio::test]
    async fn first_sight_creates_pending_chat() {
        let (_dir, pool) = test_pool().await;
        let repo = SqliteStatusRepository::new(pool);

        let status = repo.chat_status(10).await.unwrap();
        assert_eq!(status, ChatStatus::Pending);
    }
}
