//! Inbound transport events and outbound actions.
//!
//! The transport binding delivers `InboundMessage` values and consumes
//! `OutboundAction`s; the pipeline core never sees the underlying wire
//! protocol.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Context of the message an inbound message replies to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplyContext {
    /// Id of the replied-to message.
    pub message_id: i64,
    /// Whether the replied-to message was authored by the bot itself.
    pub author_is_self: bool,
    /// Whether the replied-to message was an image.
    #[serde(default)]
    pub is_image: bool,
    /// Display name of the replied-to author, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author_name: Option<String>,
}

/// One inbound chat message as delivered by the transport binding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboundMessage {
    pub chat_id: i64,
    pub message_id: i64,
    pub author_id: i64,
    /// Display name of the author (used for the ambient log).
    pub author_name: String,
    /// Whether the author is another bot. Bot-authored messages are never
    /// processed.
    #[serde(default)]
    pub author_is_bot: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply: Option<ReplyContext>,
    /// Plain message text, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Media caption, if any. Used as text when `text` is absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
    /// Whether the chat is a one-to-one conversation.
    pub is_direct: bool,
    pub timestamp: DateTime<Utc>,
}

impl InboundMessage {
    /// Effective message text: text, else caption, else empty.
    pub fn effective_text(&self) -> &str {
        self.text
            .as_deref()
            .or(self.caption.as_deref())
            .unwrap_or("")
    }

    /// Whether this message is a direct reply to a bot-authored non-image
    /// message (the reply-context continuation rule).
    pub fn replies_to_own_text(&self) -> bool {
        self.reply
            .as_ref()
            .is_some_and(|r| r.author_is_self && !r.is_image)
    }
}

/// Outbound operations the pipeline asks the transport to perform.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum OutboundAction {
    /// Reply to a message with text.
    Reply {
        chat_id: i64,
        reply_to: i64,
        text: String,
    },
    /// Reply to a message with an image (raw bytes, transport encodes).
    ReplyImage {
        chat_id: i64,
        reply_to: i64,
        #[serde(with = "image_bytes")]
        image: Vec<u8>,
    },
    /// Attach a reaction emoji to a message.
    React {
        chat_id: i64,
        message_id: i64,
        emoji: String,
    },
    /// Show a typing indicator in the chat.
    Typing { chat_id: i64 },
}

/// Hex serialization for image payloads so actions stay line-delimited JSON.
mod image_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], ser: S) -> Result<S::Ok, S::Error> {
        let mut out = String::with_capacity(bytes.len() * 2);
        for b in bytes {
            out.push_str(&format!("{b:02x}"));
        }
        ser.serialize_str(&out)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(de: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(de)?;
        if s.len() % 2 != 0 {
            return Err(serde::de::Error::custom("odd-length hex payload"));
        }
        (0..s.len())
            .step_by(2)
            .map(|i| {
                u8::from_str_radix(&s[i..i + 2], 16)
                    .map_err(|e| serde::de::Error::custom(format!("invalid hex payload: {e}")))
            })
            .collect()
    }
}
