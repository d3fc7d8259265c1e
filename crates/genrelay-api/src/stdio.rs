//! Line-delimited JSON stdio transport.
//!
//! A transport adapter process bridges the real chat protocol: it writes
//! one JSON `InboundMessage` per line to our stdin and consumes one JSON
//! `OutboundAction` per line from our stdout. Logs go to stderr, so stdout
//! carries nothing but actions.

use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use serde::Serialize;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use genrelay_types::error::PipelineError;
use genrelay_types::event::{InboundMessage, OutboundAction};
use genrelay_core::generate::Responder;

use crate::state::ConcretePipeline;

/// One stdout line: the action, plus the id we assigned to a sent message
/// so the dialog chain stays linkable before the transport echoes back.
#[derive(Serialize)]
struct ActionLine<'a> {
    #[serde(flatten)]
    action: &'a OutboundAction,
    #[serde(skip_serializing_if = "Option::is_none")]
    assigned_id: Option<i64>,
}

fn encode_action(action: &OutboundAction, assigned_id: Option<i64>) -> String {
    serde_json::to_string(&ActionLine {
        action,
        assigned_id,
    })
    .expect("outbound actions always serialize")
}

/// Responder writing actions to stdout.
///
/// Sent messages get synthetic negative ids (the transport assigns the real
/// ones); ids are unique process-wide, so reply chains stay consistent.
#[derive(Clone)]
pub struct StdioResponder {
    out: Arc<Mutex<tokio::io::Stdout>>,
    next_id: Arc<AtomicI64>,
}

impl StdioResponder {
    pub fn new() -> Self {
        Self {
            out: Arc::new(Mutex::new(tokio::io::stdout())),
            next_id: Arc::new(AtomicI64::new(1)),
        }
    }

    fn assign_id(&self) -> i64 {
        -self.next_id.fetch_add(1, Ordering::SeqCst)
    }

    async fn write_line(&self, line: String) -> Result<(), PipelineError> {
        let mut out = self.out.lock().await;
        out.write_all(line.as_bytes())
            .await
            .map_err(|e| PipelineError::Transport(e.to_string()))?;
        out.write_all(b"\n")
            .await
            .map_err(|e| PipelineError::Transport(e.to_string()))?;
        out.flush()
            .await
            .map_err(|e| PipelineError::Transport(e.to_string()))
    }
}

impl Default for StdioResponder {
    fn default() -> Self {
        Self::new()
    }
}

impl Responder for StdioResponder {
    async fn reply(&self, chat_id: i64, reply_to: i64, text: &str) -> Result<i64, PipelineError> {
        let id = self.assign_id();
        let action = OutboundAction::Reply {
            chat_id,
            reply_to,
            text: text.to_string(),
        };
        self.write_line(encode_action(&action, Some(id))).await?;
        Ok(id)
    }

    async fn reply_image(
        &self,
        chat_id: i64,
        reply_to: i64,
        image: &[u8],
    ) -> Result<i64, PipelineError> {
        let id = self.assign_id();
        let action = OutboundAction::ReplyImage {
            chat_id,
            reply_to,
            image: image.to_vec(),
        };
        self.write_line(encode_action(&action, Some(id))).await?;
        Ok(id)
    }

    async fn react(&self, chat_id: i64, message_id: i64, emoji: &str) -> Result<(), PipelineError> {
        let action = OutboundAction::React {
            chat_id,
            message_id,
            emoji: emoji.to_string(),
        };
        self.write_line(encode_action(&action, None)).await
    }

    async fn typing(&self, chat_id: i64) -> Result<(), PipelineError> {
        let action = OutboundAction::Typing { chat_id };
        self.write_line(encode_action(&action, None)).await
    }
}

/// Read inbound events from stdin until EOF or cancellation, running each
/// through the pipeline on its own task.
pub async fn run(pipeline: Arc<ConcretePipeline>, token: CancellationToken) -> anyhow::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = tokio::select! {
            _ = token.cancelled() => {
                tracing::info!("shutdown requested, stopping the event loop");
                break;
            }
            line = lines.next_line() => line?,
        };
        let Some(line) = line else {
            tracing::info!("stdin closed, stopping the event loop");
            break;
        };
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<InboundMessage>(&line) {
            Ok(message) => {
                let pipeline = Arc::clone(&pipeline);
                tokio::spawn(async move {
                    pipeline.handle(&message).await;
                });
            }
            Err(err) => {
                tracing::warn!(error = %err, "dropping unparseable inbound line");
            }
        }
    }
    Ok(())
}
