//! Storage interfaces consumed by the pipeline.
//!
//! The infrastructure layer (genrelay-infra) implements these traits with
//! SQLite persistence. All traits use native async fn in traits (RPITIT
//! with `Send` bounds); core never depends on a concrete store.

pub mod conversation;
pub mod message;
pub mod preferences;
pub mod status;

pub use conversation::ConversationRepository;
pub use message::MessageRepository;
pub use preferences::PreferencesRepository;
pub use status::StatusRepository;
