use crate::{CoordinatorObserver, EventTarget, Origin, RemoveReason};
use tracing::debug;

/// Observer that logs every coordinator event via `tracing`.
#[derive(Debug, Clone, Default)]
pub struct TracingObserver {
    /// Coordinator name prefix (optional)
    coordinator_name: Option<String>,
}

impl TracingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_coordinator_name(mut self, name: impl Into<String>) -> Self {
        self.coordinator_name = Some(name.into());
        self
    }
}

impl CoordinatorObserver for TracingObserver {
    fn on_add(&self, target: &EventTarget, origin: Origin) {
        debug!(
            target: "layercache",
            event = "add",
            key = %target.key,
            region = ?target.region,
            origin = ?origin,
            coordinator = ?self.coordinator_name,
            "cache add"
        );
    }

    fn on_put(&self, target: &EventTarget, origin: Origin) {
        debug!(
            target: "layercache",
            event = "put",
            key = %target.key,
            region = ?target.region,
            origin = ?origin,
            coordinator = ?self.coordinator_name,
            "cache put"
        );
    }

    fn on_get(&self, target: &EventTarget, origin: Origin) {
        tracing::trace!(
            target: "layercache",
            event = "get",
            key = %target.key,
            region = ?target.region,
            origin = ?origin,
            coordinator = ?self.coordinator_name,
            "cache get"
        );
    }

    fn on_update(&self, target: &EventTarget, origin: Origin) {
        debug!(
            target: "layercache",
            event = "update",
            key = %target.key,
            region = ?target.region,
            origin = ?origin,
            coordinator = ?self.coordinator_name,
            "cache update"
        );
    }

    fn on_remove(&self, target: &EventTarget, origin: Origin) {
        debug!(
            target: "layercache",
            event = "remove",
            key = %target.key,
            region = ?target.region,
            origin = ?origin,
            coordinator = ?self.coordinator_name,
            "cache remove"
        );
    }

    fn on_clear(&self, origin: Origin) {
        debug!(
            target: "layercache",
            event = "clear",
            origin = ?origin,
            coordinator = ?self.coordinator_name,
            "cache clear"
        );
    }

    fn on_clear_region(&self, region: &str, origin: Origin) {
        debug!(
            target: "layercache",
            event = "clear_region",
            region = %region,
            origin = ?origin,
            coordinator = ?self.coordinator_name,
            "cache clear region"
        );
    }

    fn on_remove_by_handle(&self, target: &EventTarget, reason: RemoveReason, above_index: usize) {
        debug!(
            target: "layercache",
            event = "remove_by_handle",
            key = %target.key,
            region = ?target.region,
            reason = ?reason,
            above_index = above_index,
            coordinator = ?self.coordinator_name,
            "handle evicted item on its own"
        );
    }
}
