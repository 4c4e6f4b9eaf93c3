//! Identity token validation

mod jwt;

pub use jwt::{Claims, IdentityVerifier};
