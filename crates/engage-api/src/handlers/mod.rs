//! Route handlers
//!
//! HTTP and WebSocket handlers organized by domain.

pub mod activity;
pub mod health;
pub mod leaderboard;
pub mod notifications;
pub mod polls;
pub mod reactions;
pub mod realtime;
pub mod targets;
