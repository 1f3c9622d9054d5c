//! Core types for coordinator and handle operations

mod backplane_event;
mod config;
mod expiration;
mod item;
mod observer_event;
mod stats;
mod update_result;

pub use backplane_event::{BackplaneAction, BackplaneEvent};
pub use config::{CoordinatorConfiguration, HandleConfiguration, UpdateMode};
pub use expiration::ExpirationMode;
pub use item::CacheItem;
pub use observer_event::{EventTarget, Origin, RemoveReason};
pub use stats::HandleStats;
pub use update_result::UpdateItemResult;
