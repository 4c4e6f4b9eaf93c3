//! Axum extractors for request handling
//!
//! Identity, path parsing, query strings and validated bodies.

mod auth;
mod path;
mod query;
mod validated;

pub use auth::AuthUser;
pub use path::{IdPath, TargetPath};
pub use query::QueryParams;
pub use validated::{JsonBody, ValidatedJson};
