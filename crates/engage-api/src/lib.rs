//! # engage-api
//!
//! HTTP and WebSocket surface of the engagement engine, built with Axum.

pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod response;
pub mod routes;
pub mod server;
pub mod state;

pub use server::{create_app, create_app_state, run, run_server, spawn_batch_worker};
pub use state::AppState;
