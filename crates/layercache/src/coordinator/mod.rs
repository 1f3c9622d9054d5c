//! The multi-tier cache coordinator
//!
//! Owns an ordered, non-empty list of handles (index 0 = topmost/fastest,
//! the last one = bottommost/authoritative), composes them into one logical
//! cache, and fans out invalidations to an optional backplane. The
//! coordinator never touches a handle's internals except through
//! `layercache_core::CacheHandle`.

mod builder;
mod expiration;
mod get_or_add;
mod reconcile;
mod update;

pub use builder::CoordinatorBuilder;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::task::JoinHandle;

use layercache_core::{
    Backplane, CacheError, CacheHandle, CacheItem, CoordinatorConfiguration, CoordinatorObserver,
    EventTarget, HandleStats, Origin, Result,
};

struct Inner<V> {
    config: CoordinatorConfiguration,
    handles: Vec<Arc<dyn CacheHandle<V>>>,
    backplane: Option<Arc<dyn Backplane>>,
    observer: Arc<dyn CoordinatorObserver>,
    disposed: AtomicBool,
    background: Mutex<Vec<JoinHandle<()>>>,
}

impl<V> Drop for Inner<V> {
    fn drop(&mut self) {
        for task in self.background.lock().drain(..) {
            task.abort();
        }
        // Disposed in the reverse of construction order: the bottommost
        // (last-appended) handle first, the topmost last.
        while self.handles.pop().is_some() {}
    }
}

/// The coordinator. Cheaply `Clone`: every clone shares the same handle
/// list, backplane, and background reconciliation tasks.
pub struct Coordinator<V> {
    inner: Arc<Inner<V>>,
}

impl<V> Clone for Coordinator<V> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<V> Coordinator<V>
where
    V: Clone + Send + Sync + 'static,
{
    fn new(
        config: CoordinatorConfiguration,
        handles: Vec<Arc<dyn CacheHandle<V>>>,
        backplane: Option<Arc<dyn Backplane>>,
        observer: Arc<dyn CoordinatorObserver>,
    ) -> Self {
        let inner = Arc::new(Inner {
            config,
            handles,
            backplane,
            observer,
            disposed: AtomicBool::new(false),
            background: Mutex::new(Vec::new()),
        });
        let coordinator = Self { inner };
        coordinator.spawn_background_tasks();
        coordinator
    }

    pub fn configuration(&self) -> &CoordinatorConfiguration {
        &self.inner.config
    }

    pub fn handle_count(&self) -> usize {
        self.inner.handles.len()
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.load(Ordering::Acquire)
    }

    /// Stop the background reconciliation tasks (per-handle remove-event
    /// listeners, the backplane subscription) and mark the coordinator
    /// disposed; subsequent operations fail with `CacheError::Disposed`.
    pub fn dispose(&self) {
        self.inner.disposed.store(true, Ordering::Release);
        for task in self.inner.background.lock().drain(..) {
            task.abort();
        }
    }

    /// Per-handle statistics, in handle order (index 0 = topmost).
    pub async fn handle_stats(&self) -> Vec<HandleStats> {
        let mut out = Vec::with_capacity(self.inner.handles.len());
        for handle in &self.inner.handles {
            out.push(handle.stats().await);
        }
        out
    }

    /// Statistics merged across every handle.
    pub async fn aggregate_stats(&self) -> HandleStats {
        let mut total = HandleStats::default();
        for stats in self.handle_stats().await {
            total.merge(&stats);
        }
        total
    }

    fn check_alive(&self) -> Result<()> {
        if self.inner.disposed.load(Ordering::Acquire) {
            return Err(CacheError::Disposed);
        }
        Ok(())
    }

    fn validate_key_region(key: &str, region: Option<&str>) -> Result<()> {
        if key.is_empty() {
            return Err(CacheError::InvalidArgument("key must not be empty".into()));
        }
        if let Some(r) = region {
            if r.trim().is_empty() {
                return Err(CacheError::InvalidArgument(
                    "region must not be empty".into(),
                ));
            }
        }
        Ok(())
    }

    /// §4.1: traverse handles top-down; on hit, promote into every handle
    /// above it via `add` (so a concurrently-written newer upper copy wins).
    pub async fn get_item(&self, key: &str, region: Option<&str>) -> Result<Option<CacheItem<V>>> {
        self.check_alive()?;
        Self::validate_key_region(key, region)?;

        let handles = &self.inner.handles;
        for i in 0..handles.len() {
            match handles[i].get_item(key, region).await {
                Ok(Some(mut item)) => {
                    item.touch();
                    for upper in &handles[..i] {
                        if let Err(e) = upper.add(item.clone()).await {
                            tracing::warn!(
                                target: "layercache",
                                handle = upper.configuration().name.as_str(),
                                error = %e,
                                "promotion to upper handle failed"
                            );
                        }
                    }
                    let target = EventTarget::new(key, region);
                    emit_observer(|| self.inner.observer.on_get(&target, Origin::Local));
                    return Ok(Some(item));
                }
                Ok(None) => continue,
                Err(e) => {
                    tracing::warn!(
                        target: "layercache",
                        handle = handles[i].configuration().name.as_str(),
                        error = %e,
                        "handle get_item failed"
                    );
                    continue;
                }
            }
        }
        Ok(None)
    }

    pub async fn get(&self, key: &str, region: Option<&str>) -> Result<Option<V>> {
        Ok(self.get_item(key, region).await?.map(CacheItem::into_value))
    }

    pub async fn exists(&self, key: &str, region: Option<&str>) -> Result<bool> {
        self.check_alive()?;
        Self::validate_key_region(key, region)?;
        for handle in &self.inner.handles {
            if handle.exists(key, region).await.unwrap_or(false) {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// §4.2: create-if-absent at the bottom layer, then evict the key from
    /// every other handle regardless of outcome (a failed bottom add may
    /// have left upper layers with a stale copy; a successful one may leave
    /// them with a different version either way).
    pub async fn add(&self, item: CacheItem<V>) -> Result<bool> {
        self.check_alive()?;
        let handles = &self.inner.handles;
        if handles.is_empty() {
            return Ok(false);
        }
        let bottom = handles.len() - 1;
        let key = item.key().to_string();
        let region = item.region().map(str::to_string);

        let success = match handles[bottom].add(item.clone()).await {
            Ok(ok) => ok,
            Err(e) => {
                tracing::warn!(target: "layercache", error = %e, "bottom handle add failed");
                false
            }
        };

        for (i, handle) in handles.iter().enumerate() {
            if i == bottom {
                continue;
            }
            if let Err(e) = handle.remove(&key, region.as_deref()).await {
                tracing::warn!(target: "layercache", error = %e, "eviction from other handle failed");
            }
        }

        if success {
            if let Some(backplane) = &self.inner.backplane {
                if let Err(e) = backplane
                    .notify_change(&key, region.as_deref(), layercache_core::BackplaneAction::Add)
                    .await
                {
                    tracing::warn!(target: "layercache", error = %e, "backplane notify_change failed");
                }
            }
            let target = EventTarget::new(key, region);
            emit_observer(|| self.inner.observer.on_add(&target, Origin::Local));
        }
        Ok(success)
    }

    /// §4.2: fan-out upsert to every handle.
    pub async fn put(&self, item: CacheItem<V>) -> Result<()> {
        self.check_alive()?;
        let key = item.key().to_string();
        let region = item.region().map(str::to_string);

        for handle in &self.inner.handles {
            if let Err(e) = handle.put(item.clone()).await {
                tracing::warn!(target: "layercache", error = %e, "handle put failed");
            }
        }

        if let Some(backplane) = &self.inner.backplane {
            if let Err(e) = backplane
                .notify_change(&key, region.as_deref(), layercache_core::BackplaneAction::Put)
                .await
            {
                tracing::warn!(target: "layercache", error = %e, "backplane notify_change failed");
            }
        }
        let target = EventTarget::new(key, region);
        emit_observer(|| self.inner.observer.on_put(&target, Origin::Local));
        Ok(())
    }

    pub async fn remove(&self, key: &str, region: Option<&str>) -> Result<bool> {
        self.check_alive()?;
        Self::validate_key_region(key, region)?;

        let mut any = false;
        for handle in &self.inner.handles {
            match handle.remove(key, region).await {
                Ok(true) => any = true,
                Ok(false) => {}
                Err(e) => tracing::warn!(target: "layercache", error = %e, "handle remove failed"),
            }
        }

        if any {
            if let Some(backplane) = &self.inner.backplane {
                if let Err(e) = backplane.notify_remove(key, region).await {
                    tracing::warn!(target: "layercache", error = %e, "backplane notify_remove failed");
                }
            }
            let target = EventTarget::new(key, region);
            emit_observer(|| self.inner.observer.on_remove(&target, Origin::Local));
        }
        Ok(any)
    }

    pub async fn clear(&self) -> Result<()> {
        self.check_alive()?;
        for handle in &self.inner.handles {
            if let Err(e) = handle.clear().await {
                tracing::warn!(target: "layercache", error = %e, "handle clear failed");
            }
        }
        if let Some(backplane) = &self.inner.backplane {
            if let Err(e) = backplane.notify_clear().await {
                tracing::warn!(target: "layercache", error = %e, "backplane notify_clear failed");
            }
        }
        emit_observer(|| self.inner.observer.on_clear(Origin::Local));
        Ok(())
    }

    pub async fn clear_region(&self, region: &str) -> Result<()> {
        self.check_alive()?;
        if region.trim().is_empty() {
            return Err(CacheError::InvalidArgument("region must not be empty".into()));
        }
        for handle in &self.inner.handles {
            if let Err(e) = handle.clear_region(region).await {
                tracing::warn!(target: "layercache", error = %e, "handle clear_region failed");
            }
        }
        if let Some(backplane) = &self.inner.backplane {
            if let Err(e) = backplane.notify_clear_region(region).await {
                tracing::warn!(target: "layercache", error = %e, "backplane notify_clear_region failed");
            }
        }
        emit_observer(|| self.inner.observer.on_clear_region(region, Origin::Local));
        Ok(())
    }
}

/// Invoke an observer callback, catching a panic so it cannot interrupt the
/// operation in progress or corrupt coordinator state (spec §5, §7).
fn emit_observer<F: FnOnce()>(f: F) {
    if std::panic::catch_unwind(std::panic::AssertUnwindSafe(f)).is_err() {
        tracing::warn!(target: "layercache", "observer callback panicked; ignoring");
    }
}
