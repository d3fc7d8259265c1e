//! Conversation digest service.
//!
//! Wraps the ambient log: decides which inbound messages are worth logging,
//! appends them, and produces the digest context (the newest window that
//! fits the backend's context budget, pruning everything older).

use genrelay_types::error::RepositoryError;
use genrelay_types::event::InboundMessage;
use genrelay_types::message::AmbientLogEntry;

use crate::repository::ConversationRepository;
use crate::window;

/// Instruction handed to the backend along with the digest context.
pub const DEFAULT_DIGEST_INSTRUCTION: &str = "\
The next block contains chat messages written by different people.
Analyze them and produce a brief summary of the conversation, capturing
what was discussed and the positions of the participants.

Each log line holds three comma-separated columns: sender nickname,
addressee nickname, message text. Based on this data, identify the topics
under discussion and state each participant's position, referring to them
by nickname rather than impersonal wording. Present the answer as a
coherent text reflecting the dynamics of the dialog and its key moments.
Do not open with phrases like \"in this fragment\"; start with the
description itself. Use \"-\" as the list separator if lists are needed.

If any messages raise topics that cannot be discussed, ignore those
messages entirely; they must not be summarized.";

/// Service over the ambient log and its windowing.
pub struct ConversationService<C: ConversationRepository> {
    repo: C,
    instruction: String,
}

impl<C: ConversationRepository> ConversationService<C> {
    pub fn new(repo: C) -> Self {
        Self::with_instruction(repo, DEFAULT_DIGEST_INSTRUCTION.to_string())
    }

    pub fn with_instruction(repo: C, instruction: String) -> Self {
        Self { repo, instruction }
    }

    /// The digest instruction for the backend.
    pub fn instruction(&self) -> &str {
        &self.instruction
    }

    /// Text to record in the ambient log for this message, if any.
    ///
    /// Direct chats are never logged (they are dialogs, not digest
    /// material). Media captions are logged with an `(image)` marker.
    /// Empty messages are skipped.
    pub fn ambient_text(&self, message: &InboundMessage) -> Option<String> {
        if message.is_direct {
            return None;
        }
        let text = match (&message.text, &message.caption) {
            (_, Some(caption)) => format!("(image) {caption}"),
            (Some(text), None) => text.clone(),
            (None, None) => return None,
        };
        if text.is_empty() { None } else { Some(text) }
    }

    /// Append one inbound message to the chat's ambient log.
    pub async fn record(
        &self,
        message: &InboundMessage,
        text: String,
    ) -> Result<(), RepositoryError> {
        let entry = AmbientLogEntry {
            chat_id: message.chat_id,
            from_name: message.author_name.clone(),
            to_name: message
                .reply
                .as_ref()
                .and_then(|r| r.author_name.clone()),
            timestamp: message.timestamp,
            text,
        };
        self.repo.append(&entry).await
    }

    /// Build the digest context for a chat, pruning entries that fall out.
    ///
    /// `context_length` is the backend's total context budget; the window
    /// budget leaves room for the instruction and a separator. Returns
    /// `None` when not a single entry fits.
    pub async fn digest_context(
        &self,
        chat_id: i64,
        context_length: usize,
    ) -> Result<Option<String>, RepositoryError> {
        let budget = context_length.saturating_sub(self.instruction.len() + 1);
        let entries = self.repo.take_window(chat_id, budget).await?;
        if entries.is_empty() {
            return Ok(None);
        }
        Ok(Some(window::join_window(&entries)))
    }
}
