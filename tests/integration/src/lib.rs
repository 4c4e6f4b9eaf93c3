//! Integration test utilities for the engagement engine
//!
//! Boots the full Axum application on the in-memory store and drives it
//! over real HTTP and WebSocket connections.

pub mod fixtures;
pub mod helpers;

pub use fixtures::*;
pub use helpers::*;
