//! Observer trait for coordinator events

use crate::{EventTarget, Origin, RemoveReason};

/// Handlers for every event the coordinator publishes
/// (`OnAdd`/`OnPut`/`OnGet`/`OnUpdate`/`OnRemove`/`OnClear`/`OnClearRegion`/
/// `OnRemoveByHandle`).
///
/// Invoked synchronously from the publishing call; handlers must not block
/// indefinitely. A panicking handler is caught at the call site and must not
/// corrupt coordinator state or interrupt the operation in progress.
pub trait CoordinatorObserver: Send + Sync + 'static {
    fn on_add(&self, _target: &EventTarget, _origin: Origin) {}
    fn on_put(&self, _target: &EventTarget, _origin: Origin) {}
    fn on_get(&self, _target: &EventTarget, _origin: Origin) {}
    fn on_update(&self, _target: &EventTarget, _origin: Origin) {}
    fn on_remove(&self, _target: &EventTarget, _origin: Origin) {}
    fn on_clear(&self, _origin: Origin) {}
    fn on_clear_region(&self, _region: &str, _origin: Origin) {}
    /// A handle evicted an item on its own initiative; `above_index` is the
    /// index of the first handle the coordinator evicted from in response
    /// (one above the emitting handle), present only under `UpdateMode::Up`.
    fn on_remove_by_handle(
        &self,
        _target: &EventTarget,
        _reason: RemoveReason,
        _above_index: usize,
    ) {
    }
}

/// Zero-overhead observer for when no one is listening.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl CoordinatorObserver for NoopObserver {}
