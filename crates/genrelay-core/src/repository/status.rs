//! User/chat access-status repository trait.

use genrelay_types::error::RepositoryError;
use genrelay_types::status::{ChatStatus, UserStatus};

/// Access-control status store.
///
/// Lookups are upserting: a user or chat seen for the first time is created
/// with `PENDING` status, so every requester always has an effective status.
pub trait StatusRepository: Send + Sync {
    /// Status of a user; `direct` records that the user has messaged the
    /// bot one-to-one at least once.
    fn user_status(
        &self,
        user_id: i64,
        direct: bool,
    ) -> impl Future<Output = Result<UserStatus, RepositoryError>> + Send;

    /// Status of a chat.
    fn chat_status(
        &self,
        chat_id: i64,
    ) -> impl Future<Output = Result<ChatStatus, RepositoryError>> + Send;

    fn set_user_status(
        &self,
        user_id: i64,
        status: UserStatus,
    ) -> impl Future<Output = Result<(), RepositoryError>> + Send;

    fn set_chat_status(
        &self,
        chat_id: i64,
        status: ChatStatus,
    ) -> impl Future<Output = Result<(), RepositoryError>> + Send;
}
