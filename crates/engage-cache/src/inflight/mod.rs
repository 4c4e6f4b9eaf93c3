//! In-flight guards for toggle requests
//!
//! A key is held for the duration of one toggle. Both guards expire keys
//! after a TTL so a crashed request cannot block its key forever.

mod local;
mod redis_guard;

pub use local::LocalInFlight;
pub use redis_guard::RedisInFlight;
