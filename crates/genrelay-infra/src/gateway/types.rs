//! Generation gateway wire types.
//!
//! These are gateway-specific request/response structures used for HTTP
//! communication. They are NOT the pipeline types from `genrelay-types` --
//! those stay transport-agnostic.

use serde::{Deserialize, Serialize};

/// One turn of a completion request.
#[derive(Debug, Clone, Serialize)]
pub struct WireMessage {
    /// `"user"`, `"assistant"`, or `"system"`.
    pub role: String,
    pub text: String,
}

/// Request body for `POST /v1/text/completion`.
#[derive(Debug, Clone, Serialize)]
pub struct CompletionRequest {
    pub model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    pub messages: Vec<WireMessage>,
}

/// Response body of a completion call.
#[derive(Debug, Clone, Deserialize)]
pub struct CompletionResponse {
    pub text: String,
    /// `"complete"` normally; `"content_filter"` when the gateway censored
    /// the result.
    #[serde(default)]
    pub finish_reason: Option<String>,
}

impl CompletionResponse {
    pub fn is_censored(&self) -> bool {
        self.finish_reason.as_deref() == Some("content_filter")
    }
}

/// Request body for `POST /v1/image/generation`.
#[derive(Debug, Clone, Serialize)]
pub struct ImageRequest {
    pub model: String,
    pub prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aspect_ratio: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<i64>,
}

/// Response of the asynchronous image call: an operation to poll.
#[derive(Debug, Clone, Deserialize)]
pub struct OperationHandle {
    pub id: String,
}

/// Polled state of an image operation (`GET /v1/operations/{id}`).
#[derive(Debug, Clone, Deserialize)]
pub struct OperationStatus {
    pub done: bool,
    /// Base64-encoded image, present once `done` is true and no error
    /// occurred.
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub error: Option<OperationError>,
}

/// Terminal error of an image operation.
#[derive(Debug, Clone, Deserialize)]
pub struct OperationError {
    pub code: i64,
    pub message: String,
}
