//! Backend generation and transport collaborator traits.
//!
//! The pipeline drives the generation backend and the chat transport only
//! through these interfaces; concrete implementations (the gateway HTTP
//! client, the stdio transport adapter) live outside core.

use std::time::Duration;

use genrelay_types::error::{GenerationError, PipelineError};
use genrelay_types::message::DialogEntry;

/// Parameters of one text generation call.
#[derive(Debug, Clone, Default)]
pub struct TextRequest<'a> {
    /// Ordered dialog turns, oldest first; even indexes are user turns,
    /// odd indexes prior assistant turns.
    pub turns: &'a [DialogEntry],
    /// Sampling temperature override.
    pub temperature: Option<f64>,
    /// System instruction override.
    pub instruction: Option<&'a str>,
    /// Deadline override for the whole call.
    pub timeout: Option<Duration>,
}

/// Text generation backend.
pub trait TextGenerator: Send + Sync {
    fn generate_text(
        &self,
        request: TextRequest<'_>,
    ) -> impl Future<Output = Result<String, GenerationError>> + Send;
}

/// Image generation backend.
pub trait ArtGenerator: Send + Sync {
    fn generate_image(
        &self,
        prompt: &str,
        aspect_ratio: Option<f64>,
        seed: Option<i64>,
    ) -> impl Future<Output = Result<Vec<u8>, GenerationError>> + Send;
}

/// Outbound side of the chat transport.
///
/// `reply` returns the transport-assigned id of the delivered message so
/// generated replies can be persisted into the dialog chain.
pub trait Responder: Send + Sync {
    fn reply(
        &self,
        chat_id: i64,
        reply_to: i64,
        text: &str,
    ) -> impl Future<Output = Result<i64, PipelineError>> + Send;

    fn reply_image(
        &self,
        chat_id: i64,
        reply_to: i64,
        image: &[u8],
    ) -> impl Future<Output = Result<i64, PipelineError>> + Send;

    fn react(
        &self,
        chat_id: i64,
        message_id: i64,
        emoji: &str,
    ) -> impl Future<Output = Result<(), PipelineError>> + Send;

    fn typing(&self, chat_id: i64) -> impl Future<Output = Result<(), PipelineError>> + Send;
}
