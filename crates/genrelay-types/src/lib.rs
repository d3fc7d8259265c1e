//! Shared domain types for genrelay.
//!
//! This crate has no business logic: it defines the data shapes exchanged
//! between the pipeline core, the persistence layer, and the transport
//! adapter, plus the error taxonomy.

pub mod error;
pub mod event;
pub mod intent;
pub mod message;
pub mod preferences;
pub mod status;
