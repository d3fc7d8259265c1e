//! GatewayClient -- HTTP implementation of the generation backend traits.
//!
//! Text completion is a single synchronous POST; image generation is
//! asynchronous on the gateway side, so the client starts an operation and
//! polls it until done or the deadline passes.
//!
//! The API key is wrapped in [`secrecy::SecretString`] and is never logged
//! or included in `Debug` output.

use std::time::Duration;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use secrecy::{ExposeSecret, SecretString};

use genrelay_core::generate::{ArtGenerator, TextGenerator, TextRequest};
use genrelay_types::error::GenerationError;
use genrelay_types::message::DialogEntry;

use super::types::{
    CompletionRequest, CompletionResponse, ImageRequest, OperationHandle, OperationStatus,
    WireMessage,
};

/// Default deadline for one generation call.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Longest pause between two polls of an image operation.
const MAX_POLL_INTERVAL: Duration = Duration::from_secs(10);

/// HTTP client for the generation gateway.
///
/// Implements [`TextGenerator`] and [`ArtGenerator`].
#[derive(Clone)]
pub struct GatewayClient {
    client: reqwest::Client,
    api_key: SecretString,
    base_url: String,
    text_model: String,
    art_model: String,
    timeout: Duration,
}

impl GatewayClient {
    pub fn new(
        api_key: SecretString,
        base_url: String,
        text_model: String,
        art_model: String,
    ) -> Self {
        let client = reqwest::Client::builder()
            .build()
            .expect("failed to create reqwest client");
        Self {
            client,
            api_key,
            base_url,
            text_model,
            art_model,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Override the default per-call deadline.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authed(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        builder.header(
            "authorization",
            format!("Bearer {}", self.api_key.expose_secret()),
        )
    }

    async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, GenerationError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(GenerationError::Backend {
            status: status.as_u16(),
            message: body,
        })
    }

    /// Start an image operation and poll it to completion.
    async fn run_image_operation(
        &self,
        body: &ImageRequest,
        deadline: Duration,
    ) -> Result<Vec<u8>, GenerationError> {
        let response = self
            .authed(self.client.post(self.url("/v1/image/generation")))
            .timeout(deadline)
            .json(body)
            .send()
            .await
            .map_err(map_transport)?;
        let handle: OperationHandle = Self::check_status(response)
            .await?
            .json()
            .await
            .map_err(|e| GenerationError::InvalidResponse(format!("operation handle: {e}")))?;

        let interval = poll_interval(deadline);
        let started = tokio::time::Instant::now();
        loop {
            tokio::time::sleep(interval).await;
            if started.elapsed() >= deadline {
                return Err(GenerationError::Timeout);
            }

            let url = self.url(&format!("/v1/operations/{}", handle.id));
            let response = self
                .authed(self.client.get(url))
                .timeout(interval.max(Duration::from_secs(1)))
                .send()
                .await
                .map_err(map_transport)?;
            let status: OperationStatus = Self::check_status(response)
                .await?
                .json()
                .await
                .map_err(|e| GenerationError::InvalidResponse(format!("operation status: {e}")))?;
            if !status.done {
                continue;
            }
            if let Some(err) = status.error {
                // The gateway reports policy refusals with the HTTP 451 code.
                if err.code == 451 {
                    return Err(GenerationError::ContentPolicy);
                }
                return Err(GenerationError::Backend {
                    status: err.code.clamp(0, u16::MAX as i64) as u16,
                    message: err.message,
                });
            }
            let image = status.image.ok_or_else(|| {
                GenerationError::InvalidResponse("operation finished without an image".to_string())
            })?;
            return BASE64
                .decode(image.as_bytes())
                .map_err(|e| GenerationError::InvalidResponse(format!("image payload: {e}")));
        }
    }
}

// GatewayClient intentionally does NOT derive Debug so the API key can
// never leak through formatting.

/// Poll pacing for asynchronous operations: a tenth of the deadline, capped
/// at ten seconds.
fn poll_interval(deadline: Duration) -> Duration {
    (deadline / 10).min(MAX_POLL_INTERVAL)
}

fn map_transport(err: reqwest::Error) -> GenerationError {
    if err.is_timeout() {
        GenerationError::Timeout
    } else {
        // Transport failures carry status 0 and are not retried.
        GenerationError::Backend {
            status: 0,
            message: err.to_string(),
        }
    }
}

/// Map dialog turns to wire messages, alternating user/assistant roles by
/// authorship.
fn wire_messages(instruction: Option<&str>, turns: &[DialogEntry]) -> Vec<WireMessage> {
    let mut messages = Vec::with_capacity(turns.len() + 1);
    if let Some(instruction) = instruction {
        messages.push(WireMessage {
            role: "system".to_string(),
            text: instruction.to_string(),
        });
    }
    for turn in turns {
        messages.push(WireMessage {
            role: if turn.from_self { "assistant" } else { "user" }.to_string(),
            text: turn.text.clone(),
        });
    }
    messages
}

impl TextGenerator for GatewayClient {
    async fn generate_text(&self, request: TextRequest<'_>) -> Result<String, GenerationError> {
        let body = CompletionRequest {
            model: self.text_model.clone(),
            temperature: request.temperature,
            messages: wire_messages(request.instruction, request.turns),
        };
        let timeout = request.timeout.unwrap_or(self.timeout);

        let response = self
            .authed(self.client.post(self.url("/v1/text/completion")))
            .timeout(timeout)
            .json(&body)
            .send()
            .await
            .map_err(map_transport)?;
        let completion: CompletionResponse = Self::check_status(response)
            .await?
            .json()
            .await
            .map_err(|e| GenerationError::InvalidResponse(format!("completion: {e}")))?;

        if completion.is_censored() {
            return Err(GenerationError::ContentPolicy);
        }
        Ok(completion.text)
    }
}

impl ArtGenerator for GatewayClient {
    async fn generate_image(
        &self,
        prompt: &str,
        aspect_ratio: Option<f64>,
        seed: Option<i64>,
    ) -> Result<Vec<u8>, GenerationError> {
        let body = ImageRequest {
            model: self.art_model.clone(),
            prompt: prompt.to_string(),
            aspect_ratio,
            seed,
        };
        self.run_image_operation(&body, self.timeout).await
    }
}
