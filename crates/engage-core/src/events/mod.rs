//! Events - the closed set of messages flowing out of mutating operations

mod change_event;
mod engagement_event;

pub use change_event::{ChangeEvent, ChangeOp, EntityType};
pub use engagement_event::{Actor, EngagementEvent};
