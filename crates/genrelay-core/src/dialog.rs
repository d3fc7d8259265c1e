//! Dialog assembly from reply-linked stored messages.
//!
//! Reconstructs the ordered conversation thread feeding one generation
//! call by walking the `reply_id` chain backward from the terminal message.
//! The chain is stored data and may contain cycles under concurrent
//! writes, so the walk is bounded by a visited set and fails closed.

use std::collections::HashSet;

use genrelay_types::error::PipelineError;
use genrelay_types::message::DialogEntry;

use crate::repository::MessageRepository;

/// Assemble the dialog terminating at `(chat_id, id)`.
///
/// Walks the reply chain to its root, then returns every visited message
/// ordered by timestamp ascending (oldest first). The result is the exact
/// prompt payload for the backend: even indexes are user turns, odd
/// indexes prior assistant turns.
///
/// # Errors
///
/// `PipelineError::DataIntegrity` when the chain revisits a message id (a
/// cycle); repository failures propagate as `PipelineError::Repository`.
pub async fn assemble<R: MessageRepository>(
    repo: &R,
    chat_id: i64,
    id: i64,
) -> Result<Vec<DialogEntry>, PipelineError> {
    let mut visited: HashSet<i64> = HashSet::new();
    let mut collected = Vec::new();

    let mut cursor = Some(id);
    while let Some(current) = cursor {
        if !visited.insert(current) {
            return Err(PipelineError::DataIntegrity(format!(
                "reply chain cycle at message {current} in chat {chat_id}"
            )));
        }
        let Some(msg) = repo.get_message(chat_id, current).await? else {
            // A dangling link terminates the walk; the insert-time degrade
            // should prevent this, but stored data is not trusted here.
            tracing::debug!(chat_id, message_id = current, "dialog walk hit a missing message");
            break;
        };
        cursor = msg.reply_id;
        collected.push(msg);
    }

    collected.sort_by_key(|m| m.timestamp);
    Ok(collected
        .into_iter()
        .map(|m| DialogEntry {
            text: m.text,
            from_self: m.from_self,
        })
        .collect())
}
