//! Generation gateway HTTP layer.
//!
//! Wire types and the client implementing the `TextGenerator` and
//! `ArtGenerator` traits from `genrelay-core` against the gateway's REST
//! API.

pub mod client;
pub mod types;

pub use client::GatewayClient;
