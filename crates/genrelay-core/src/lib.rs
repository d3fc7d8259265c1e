//! Generation request pipeline for genrelay.
//!
//! The pipeline decides whether a message triggers generation (classify),
//! what context to send (dialog assembly or ambient windowing), how fast
//! requests may hit the throttled backend (admission gate), and how
//! failures are retried (retry coordinator). The orchestrator composes all
//! of it behind narrow collaborator traits; infrastructure implementations
//! live in genrelay-infra.

pub mod classify;
pub mod conversation;
pub mod dialog;
pub mod gate;
pub mod generate;
pub mod pipeline;
pub mod repository;
pub mod retry;
pub mod split;
pub mod texts;
pub mod window;
