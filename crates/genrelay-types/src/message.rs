//! Stored message types for genrelay.
//!
//! Two distinct stores back the pipeline: `StoredMessage` tracks only
//! messages directly involved in a generation dialog (user prompts and bot
//! replies, linked by `reply_id`), while `AmbientLogEntry` is the flat
//! whole-chat log consumed by the context windower for digests.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A message participating in a generation dialog.
///
/// Rows are insert-only: created for every inbound prompt and every
/// generated reply, never updated or deleted. `reply_id` references another
/// message in the same chat, forming the dialog chain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredMessage {
    /// Chat the message belongs to (transport-assigned).
    pub chat_id: i64,
    /// Message id within the chat (transport-assigned).
    pub id: i64,
    /// Message this one replies to, if any. Must resolve within the chat.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply_id: Option<i64>,
    /// Whether the bot itself authored the message.
    pub from_self: bool,
    /// Message text (prompt or generated reply).
    pub text: String,
    /// When the message was sent.
    pub timestamp: DateTime<Utc>,
}

/// One entry of a chat's ambient log.
///
/// Append-only; the only mutation besides append is the context windower's
/// prune step. Owned exclusively by its chat, never read across chats.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AmbientLogEntry {
    /// Chat the entry belongs to.
    pub chat_id: i64,
    /// Display name of the sender.
    pub from_name: String,
    /// Display name of the addressee, when the message was a reply.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to_name: Option<String>,
    /// When the message was sent.
    pub timestamp: DateTime<Utc>,
    /// Message text.
    pub text: String,
}

/// A single turn of an assembled dialog, ready for the generation backend.
///
/// Entries are ordered oldest first; even indexes are user turns, odd
/// indexes prior assistant turns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DialogEntry {
    /// Turn text.
    pub text: String,
    /// Whether the bot authored this turn.
    pub from_self: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stored_message_json_roundtrip() {
        let msg = StoredMessage {
            chat_id: -100123,
            id: 42,
            reply_id: Some(41),
            from_self: false,
            text: "what is the weather".to_string(),
            timestamp: Utc::now(),
        };
        let json = serde_json::to_string(&msg).unwrap();
        let parsed: StoredMessage = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.chat_id, -100123);
        assert_eq!(parsed.reply_id, Some(41));
        assert!(!parsed.from_self);
    }

    #[test]
    fn test_stored_message_omits_absent_reply() {
        let msg = StoredMessage {
            chat_id: 1,
            id: 2,
            reply_id: None,
            from_self: true,
            text: "reply".to_string(),
            timestamp: Utc::now(),
        };
        let json = serde_json::to_string(&msg).unwrap();
        assert!(!json.contains("reply_id"));
    }

    #[test]
    fn test_ambient_entry_roundtrip() {
        let entry = AmbientLogEntry {
            chat_id: 7,
            from_name: "alice".to_string(),
            to_name: None,
            timestamp: Utc::now(),
            text: "hello there".to_string(),
        };
        let json = serde_json::to_string(&entry).unwrap();
        let parsed: AmbientLogEntry = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, entry);
    }
}
