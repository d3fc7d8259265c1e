//! User preferences repository trait.

use genrelay_types::error::RepositoryError;
use genrelay_types::preferences::UserPreferences;

/// Per-user generation override store.
pub trait PreferencesRepository: Send + Sync {
    /// Preferences for a user; defaults when none are stored.
    fn preferences(
        &self,
        user_id: i64,
    ) -> impl Future<Output = Result<UserPreferences, RepositoryError>> + Send;

    /// Apply the given overrides, keeping stored fields the update leaves
    /// unset.
    fn update_preferences(
        &self,
        user_id: i64,
        prefs: &UserPreferences,
    ) -> impl Future<Output = Result<(), RepositoryError>> + Send;

    /// Drop all of a user's overrides, returning them to the defaults.
    fn reset_preferences(
        &self,
        user_id: i64,
    ) -> impl Future<Output = Result<(), RepositoryError>> + Send;
}
