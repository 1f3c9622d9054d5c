//! Programmatic coordinator assembly
//!
//! No config-file parsing layer is in scope (the teacher this crate is
//! grounded on builds its manager the same way, `with_ttl`/`with_namespace`
//! style); a coordinator is assembled in code from an ordered handle list,
//! an optional backplane, and an observer.

use std::sync::Arc;

use layercache_core::{
    Backplane, CacheError, CacheHandle, CoordinatorConfiguration, CoordinatorObserver, NoopObserver,
    Result,
};

use super::Coordinator;

pub struct CoordinatorBuilder<V> {
    config: CoordinatorConfiguration,
    handles: Vec<Arc<dyn CacheHandle<V>>>,
    backplane: Option<Arc<dyn Backplane>>,
    observer: Arc<dyn CoordinatorObserver>,
}

impl<V> CoordinatorBuilder<V>
where
    V: Clone + Send + Sync + 'static,
{
    pub fn new(config: CoordinatorConfiguration) -> Self {
        Self {
            config,
            handles: Vec::new(),
            backplane: None,
            observer: Arc::new(NoopObserver),
        }
    }

    /// Append a handle. The first one appended is index 0 (topmost/
    /// fastest); the last one appended is the bottommost/authoritative
    /// handle.
    pub fn with_handle(mut self, handle: Arc<dyn CacheHandle<V>>) -> Self {
        self.handles.push(handle);
        self
    }

    pub fn with_backplane(mut self, backplane: Arc<dyn Backplane>) -> Self {
        self.backplane = Some(backplane);
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn CoordinatorObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn build(self) -> Result<Coordinator<V>> {
        if self.handles.is_empty() {
            return Err(CacheError::InvalidState(
                "coordinator requires at least one handle".into(),
            ));
        }
        Ok(Coordinator::new(
            self.config,
            self.handles,
            self.backplane,
            self.observer,
        ))
    }
}
