//! Handle and coordinator configuration

use super::expiration::ExpirationMode;
use std::time::Duration;

/// Static configuration of a single handle, exposed through its
/// `Configuration` facet.
#[derive(Debug, Clone)]
pub struct HandleConfiguration {
    pub name: String,
    pub default_mode: ExpirationMode,
    pub default_timeout: Duration,
    /// Whether this handle is the authoritative source for backplane writes.
    pub is_backplane_source: bool,
    /// Whether this handle is out-of-process (Redis, etc.). A distributed
    /// backplane source does not need remote re-eviction on itself.
    pub is_distributed: bool,
}

impl HandleConfiguration {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            default_mode: ExpirationMode::None,
            default_timeout: Duration::ZERO,
            is_backplane_source: false,
            is_distributed: false,
        }
    }

    pub fn with_default_expiration(mut self, mode: ExpirationMode, timeout: Duration) -> Self {
        self.default_mode = mode;
        self.default_timeout = timeout;
        self
    }

    pub fn as_backplane_source(mut self) -> Self {
        self.is_backplane_source = true;
        self
    }

    pub fn as_distributed(mut self) -> Self {
        self.is_distributed = true;
        self
    }
}

/// How successful updates/remove-events reconcile handles above the
/// source of truth.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateMode {
    /// Leave upper handles alone; they reconcile lazily on next read.
    None,
    /// Evict the key from every handle above the one that served the
    /// write, immediately.
    Up,
}

/// Coordinator-level configuration. The actual `handles`/`backplane`
/// instances are supplied to the coordinator constructor directly (they are
/// trait objects, not `Clone`); this struct carries the scalar policy knobs.
#[derive(Debug, Clone)]
pub struct CoordinatorConfiguration {
    pub name: String,
    pub max_retries: u32,
    pub update_mode: UpdateMode,
}

impl CoordinatorConfiguration {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            max_retries: 3,
            update_mode: UpdateMode::None,
        }
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_update_mode(mut self, update_mode: UpdateMode) -> Self {
        self.update_mode = update_mode;
        self
    }
}

impl Default for CoordinatorConfiguration {
    fn default() -> Self {
        Self::new("default")
    }
}
