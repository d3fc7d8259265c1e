//! Ambient conversation log repository trait.

use genrelay_types::error::RepositoryError;
use genrelay_types::message::AmbientLogEntry;

/// Persistence for the per-chat ambient log feeding chat digests.
pub trait ConversationRepository: Send + Sync {
    /// Append one entry to the chat's log.
    fn append(
        &self,
        entry: &AmbientLogEntry,
    ) -> impl Future<Output = Result<(), RepositoryError>> + Send;

    /// Return the newest suffix of the chat's log whose serialized size
    /// stays below `budget` bytes, ordered oldest first, and durably prune
    /// everything older.
    ///
    /// Read and prune execute as one atomic unit against the store: a
    /// concurrent reader never observes deleted-but-unreturned entries, and
    /// after the call the retained set equals exactly the returned set
    /// (running again on the result changes nothing).
    fn take_window(
        &self,
        chat_id: i64,
        budget: usize,
    ) -> impl Future<Output = Result<Vec<AmbientLogEntry>, RepositoryError>> + Send;
}
