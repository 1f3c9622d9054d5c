//! Outcome of a handle-internal atomic update

use super::item::CacheItem;

/// What a handle's `update` produced, per the handle-internal update
/// contract: read-modify-write with optimistic-concurrency retries.
#[derive(Debug, Clone)]
pub enum UpdateItemResult<V> {
    /// The handle committed a new item.
    Success {
        new_item: CacheItem<V>,
        /// Whether at least one CAS/version conflict was observed and
        /// retried before the commit succeeded.
        version_conflict_occurred: bool,
        /// Number of attempts taken, including the final successful one.
        tries_needed: u32,
    },
    /// The key was absent; there was nothing to update.
    ItemDidNotExist,
    /// Every retry hit a conflict; the handle gave up.
    TooManyRetries { tries_needed: u32 },
    /// The caller's update function returned no value.
    FactoryReturnedNull,
}

impl<V> UpdateItemResult<V> {
    pub fn is_success(&self) -> bool {
        matches!(self, UpdateItemResult::Success { .. })
    }

    /// Number of attempts taken to reach this outcome, when known.
    pub fn tries_needed(&self) -> Option<u32> {
        match self {
            UpdateItemResult::Success { tries_needed, .. } => Some(*tries_needed),
            UpdateItemResult::TooManyRetries { tries_needed } => Some(*tries_needed),
            _ => None,
        }
    }
}
