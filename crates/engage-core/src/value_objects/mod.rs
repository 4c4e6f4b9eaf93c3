//! Value objects - immutable types shared across the engine

mod scope;
mod snowflake;

pub use scope::{Scope, ScopeFilter};
pub use snowflake::{Snowflake, SnowflakeGenerator, SnowflakeParseError};
