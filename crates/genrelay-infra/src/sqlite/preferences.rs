//! SQLite user-preferences repository.

use sqlx::Row;

use genrelay_core::repository::PreferencesRepository;
use genrelay_types::error::RepositoryError;
use genrelay_types::preferences::UserPreferences;

use super::map_sqlx;
use super::pool::DatabasePool;

/// SQLite-backed implementation of `PreferencesRepository`.
pub struct SqlitePreferencesRepository {
    pool: DatabasePool,
}

impl SqlitePreferencesRepository {
    /// Create a new repository backed by the given database pool.
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

impl PreferencesRepository for SqlitePreferencesRepository {
    async fn preferences(&self, user_id: i64) -> Result<UserPreferences, RepositoryError> {
        let row = sqlx::query(
            "SELECT temperature, instruction_text, timeout_secs
             FROM user_preferences WHERE user_id = ?1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool.reader)
        .await
        .map_err(map_sqlx)?;

        let Some(row) = row else {
            return Ok(UserPreferences::default());
        };
        let timeout_secs: Option<i64> = row.try_get("timeout_secs").map_err(map_sqlx)?;
        Ok(UserPreferences {
            temperature: row.try_get("temperature").map_err(map_sqlx)?,
            instruction_text: row.try_get("instruction_text").map_err(map_sqlx)?,
            timeout_secs: timeout_secs.map(|t| t as u64),
        })
    }

    async fn update_preferences(
        &self,
        user_id: i64,
        prefs: &UserPreferences,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO user_preferences (user_id, temperature, instruction_text, timeout_secs)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT (user_id) DO UPDATE SET
                 temperature = COALESCE(excluded.temperature, user_preferences.temperature),
                 instruction_text =
                     COALESCE(excluded.instruction_text, user_preferences.instruction_text),
                 timeout_secs = COALESCE(excluded.timeout_secs, user_preferences.timeout_secs)",
        )
        .bind(user_id)
        .bind(prefs.temperature)
        .bind(&prefs.instruction_text)
        .bind(prefs.timeout_secs.map(|t| t as i64))
        .execute(&self.pool.writer)
        .await
        .map_err(map_sqlx)?;
        Ok(())
    }

    async fn reset_preferences(&self, user_id: i64) -> Result<(), RepositoryError> {
        sqlx::query("DELETE FROM user_preferences WHERE user_id = ?1")
            .bind(user_id)
            .execute(&self.pool.writer)
            .await
            .map_err(map_sqlx)?;
        Ok(())
    }
}
