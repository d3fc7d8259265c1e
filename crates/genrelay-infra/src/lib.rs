//! Infrastructure layer for genrelay.
//!
//! Contains implementations of the repository traits defined in
//! `genrelay-core` (SQLite storage with WAL mode and split read/write
//! pools), the generation gateway HTTP client, and configuration loading.

pub mod config;
pub mod gateway;
pub mod sqlite;
