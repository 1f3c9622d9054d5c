//! Cross-process invalidation events carried by the backplane

use serde::{Deserialize, Serialize};

/// The write that produced a `Change` event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BackplaneAction {
    Add,
    Put,
    Update,
}

/// An event published to (or received from) the backplane.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BackplaneEvent {
    /// A key was written; non-source handles should evict their copy.
    Change {
        key: String,
        region: Option<String>,
        action: BackplaneAction,
    },
    /// A key was removed.
    Remove { key: String, region: Option<String> },
    /// The entire cache was cleared.
    Clear,
    /// A single region was cleared.
    ClearRegion { region: String },
}

impl BackplaneEvent {
    /// The `(key, region)` this event targets, when applicable.
    pub fn target(&self) -> Option<(&str, Option<&str>)> {
        match self {
            BackplaneEvent::Change { key, region, .. } => Some((key, region.as_deref())),
            BackplaneEvent::Remove { key, region } => Some((key, region.as_deref())),
            BackplaneEvent::Clear | BackplaneEvent::ClearRegion { .. } => None,
        }
    }
}
