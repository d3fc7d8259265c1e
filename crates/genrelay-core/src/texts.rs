//! Canned user-visible responses.
//!
//! Every pipeline outcome resolves to one of these (or silence). Kept as a
//! plain struct so deployments can swap wording without touching the
//! pipeline.

use genrelay_types::status::UserStatus;

/// Emoji used as lightweight negative feedback for empty-after-trigger
/// messages.
pub const EMPTY_PROMPT_REACTION: &str = "🤡";

/// Response texts emitted by the pipeline.
#[derive(Debug, Clone)]
pub struct Responses {
    /// Prompt was empty in a direct chat.
    pub empty_request: String,
    /// Generation did not finish in time.
    pub timeout_error: String,
    /// Generic generation failure.
    pub generation_failed: String,
    /// The backend refused on content-policy grounds.
    pub content_refused: String,
    /// Requester is blocked.
    pub blocked: String,
    /// Requester is awaiting confirmation.
    pub pending: String,
    /// Requester is not authorized.
    pub unauthorized: String,
    /// Digest requested but no ambient entry fits the context.
    pub empty_digest: String,
}

impl Responses {
    /// Denial text for a user status that blocks generation.
    pub fn denial_for(&self, status: UserStatus) -> &str {
        match status {
            UserStatus::Blocked | UserStatus::ReverseBlocked => &self.blocked,
            UserStatus::Pending => &self.pending,
            _ => &self.unauthorized,
        }
    }
}

impl Default for Responses {
    fn default() -> Self {
        Self {
            empty_request: "The request is empty. Write what you want to ask about.".to_string(),
            timeout_error: "Generation timed out. Try again a bit later.".to_string(),
            generation_failed: "Something went wrong while generating a response.".to_string(),
            content_refused: "This request cannot be processed.".to_string(),
            blocked: "You are blocked from using the bot.".to_string(),
            pending: "Your access request is awaiting confirmation.".to_string(),
            unauthorized: "You are not authorized to send generation requests.".to_string(),
            empty_digest: "Something went wrong: not a single message fit into the context."
                .to_string(),
        }
    }
}
