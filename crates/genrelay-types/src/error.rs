//! Error taxonomy for the generation pipeline.

use thiserror::Error;

/// Failures of a backend generation call.
#[derive(Debug, Clone, Error)]
pub enum GenerationError {
    /// The backend did not produce a result within the deadline.
    #[error("generation timed out")]
    Timeout,

    /// The backend reported an error with an HTTP-equivalent status code.
    /// Transport-level failures carry status 0.
    #[error("backend error (status {status}): {message}")]
    Backend { status: u16, message: String },

    /// The backend refused the request on content-policy grounds.
    #[error("request refused by content policy")]
    ContentPolicy,

    /// The backend answered with a payload we could not interpret.
    #[error("invalid backend response: {0}")]
    InvalidResponse(String),
}

impl GenerationError {
    /// Whether retrying this failure can plausibly succeed.
    ///
    /// Only generation timeouts and backend-reported server errors (5xx)
    /// qualify; everything else propagates on first occurrence.
    pub fn is_retryable(&self) -> bool {
        match self {
            GenerationError::Timeout => true,
            GenerationError::Backend { status, .. } => (500..=599).contains(status),
            _ => false,
        }
    }
}

/// Errors from repository operations (trait definitions live in genrelay-core).
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database connection error")]
    Connection,

    #[error("query error: {0}")]
    Query(String),

    #[error("entity not found")]
    NotFound,
}

/// Errors crossing the pipeline orchestrator's internal boundaries.
///
/// The orchestrator itself resolves every one of these to a single
/// user-visible outcome; they never escape `Pipeline::handle`.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Generation(#[from] GenerationError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error("transport error: {0}")]
    Transport(String),

    /// Stored data violates an invariant (e.g. a reply-chain cycle). Fatal
    /// for the single request, never retried.
    #[error("data integrity error: {0}")]
    DataIntegrity(String),
}

/// Invalid static configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid rate limit: {0}")]
    InvalidRate(String),

    #[error("invalid concurrency limit: {0}")]
    InvalidConcurrency(String),

    #[error("invalid retry count: {0}")]
    InvalidRetryCount(String),
}
