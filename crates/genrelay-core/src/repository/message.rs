//! Dialog message repository trait.

use genrelay_types::error::RepositoryError;
use genrelay_types::message::StoredMessage;

/// Persistence for messages participating in generation dialogs.
///
/// Rows are insert-only. Implementations must keep the reply-resolution
/// invariant: a stored `reply_id` resolves within the same chat, or is
/// degraded to `None` at insert time (a dangling reply becomes a dialog
/// root, never a broken chain).
pub trait MessageRepository: Send + Sync {
    /// Persist one dialog message.
    fn save_message(
        &self,
        msg: &StoredMessage,
    ) -> impl Future<Output = Result<(), RepositoryError>> + Send;

    /// Point lookup by `(chat_id, id)`; `None` when absent.
    fn get_message(
        &self,
        chat_id: i64,
        id: i64,
    ) -> impl Future<Output = Result<Option<StoredMessage>, RepositoryError>> + Send;
}
