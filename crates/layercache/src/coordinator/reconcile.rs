//! Background reconciliation: per-handle remove events (§4.8) and backplane
//! events from peers (§4.7).

use std::sync::Arc;
use std::sync::Weak;

use layercache_core::{
    BackplaneAction, BackplaneEvent, CacheHandle, EventTarget, HandleRemoveEvent, Origin,
    RemoveReason, UpdateMode,
};
use tokio::sync::broadcast::error::RecvError;

use super::{emit_observer, Coordinator, Inner};

impl<V> Coordinator<V>
where
    V: Clone + Send + Sync + 'static,
{
    pub(super) fn spawn_background_tasks(&self) {
        let mut background = self.inner.background.lock();

        for (index, handle) in self.inner.handles.iter().enumerate() {
            let mut removals = handle.subscribe_removals();
            let weak: Weak<Inner<V>> = Arc::downgrade(&self.inner);
            background.push(tokio::spawn(async move {
                loop {
                    match removals.recv().await {
                        Ok(event) => {
                            let Some(inner) = weak.upgrade() else { break };
                            reconcile_handle_remove(&inner, index, event).await;
                        }
                        Err(RecvError::Lagged(_)) => continue,
                        Err(RecvError::Closed) => break,
                    }
                }
            }));
        }

        if let Some(backplane) = &self.inner.backplane {
            let mut events = backplane.subscribe();
            let weak: Weak<Inner<V>> = Arc::downgrade(&self.inner);
            background.push(tokio::spawn(async move {
                loop {
                    match events.recv().await {
                        Ok(event) => {
                            let Some(inner) = weak.upgrade() else { break };
                            reconcile_backplane_event(&inner, event).await;
                        }
                        Err(RecvError::Lagged(_)) => continue,
                        Err(RecvError::Closed) => break,
                    }
                }
            }));
        }
    }
}

/// A handle list partitioned by whether it's the backplane source.
type PartitionedHandles<V> = (Vec<Arc<dyn CacheHandle<V>>>, Option<Arc<dyn CacheHandle<V>>>);

/// Split handles into (every handle except the backplane source, the
/// backplane source itself) so callers can decide whether the source
/// participates in a given reconciliation.
fn partition_handles<V>(inner: &Inner<V>) -> PartitionedHandles<V>
where
    V: Clone + Send + Sync + 'static,
{
    let mut excluding = Vec::new();
    let mut source = None;
    for handle in &inner.handles {
        if handle.configuration().is_backplane_source {
            source = Some(handle.clone());
        } else {
            excluding.push(handle.clone());
        }
    }
    (excluding, source)
}

/// §4.7: a peer published a change over the backplane. Apply it to every
/// handle except the one that sourced it — a non-distributed source also
/// needs the update applied locally, since it never observed its own write.
async fn reconcile_backplane_event<V>(inner: &Inner<V>, event: BackplaneEvent)
where
    V: Clone + Send + Sync + 'static,
{
    let (excluding_source, source) = partition_handles(inner);
    let mut targets = excluding_source;
    if let Some(source) = source {
        if !source.configuration().is_distributed {
            targets.push(source);
        }
    }

    match event {
        BackplaneEvent::Change { key, region, action } => {
            for handle in &targets {
                let _ = handle.remove(&key, region.as_deref()).await;
            }
            let target = EventTarget::new(key, region);
            match action {
                BackplaneAction::Add => emit_observer(|| inner.observer.on_add(&target, Origin::Remote)),
                BackplaneAction::Put => emit_observer(|| inner.observer.on_put(&target, Origin::Remote)),
                BackplaneAction::Update => {
                    emit_observer(|| inner.observer.on_update(&target, Origin::Remote))
                }
            }
        }
        BackplaneEvent::Remove { key, region } => {
            for handle in &targets {
                let _ = handle.remove(&key, region.as_deref()).await;
            }
            let target = EventTarget::new(key, region);
            emit_observer(|| inner.observer.on_remove(&target, Origin::Remote));
        }
        BackplaneEvent::Clear => {
            for handle in &targets {
                let _ = handle.clear().await;
            }
            emit_observer(|| inner.observer.on_clear(Origin::Remote));
        }
        BackplaneEvent::ClearRegion { region } => {
            for handle in &targets {
                let _ = handle.clear_region(&region).await;
            }
            emit_observer(|| inner.observer.on_clear_region(&region, Origin::Remote));
        }
    }
}

/// §4.8: a handle evicted an item on its own (expiration, capacity). Under
/// `UpdateMode::Up`, propagate the eviction to every handle above it — the
/// upper handles may be holding a copy that's now stale relative to the
/// (now-gone) source of truth below them.
async fn reconcile_handle_remove<V>(inner: &Inner<V>, emitting_index: usize, event: HandleRemoveEvent)
where
    V: Clone + Send + Sync + 'static,
{
    if inner.config.update_mode != UpdateMode::Up {
        return;
    }
    for handle in &inner.handles[..emitting_index] {
        let _ = handle.remove(&event.key, event.region.as_deref()).await;
    }
    let target = EventTarget::new(event.key, event.region);
    emit_observer(|| {
        inner
            .observer
            .on_remove_by_handle(&target, event.reason, emitting_index + 1)
    });
}

#[allow(dead_code)]
fn _assert_reason_exhaustive(r: RemoveReason) -> RemoveReason {
    r
}

#[cfg(test)]
mod tests {
    use super::super::CoordinatorBuilder;
    use layercache_core::{CoordinatorConfiguration, HandleConfiguration};
    use layercache_storage::{MemoryConfig, MemoryHandle};
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn expired_bottom_item_is_evicted_from_top_under_up_mode() {
        let top: Arc<dyn layercache_core::CacheHandle<String>> = Arc::new(MemoryHandle::<String>::new(
            HandleConfiguration::new("top"),
            MemoryConfig::unlimited(),
        ));
        let bottom: Arc<dyn layercache_core::CacheHandle<String>> = Arc::new(MemoryHandle::<String>::new(
            HandleConfiguration::new("bottom"),
            MemoryConfig::unlimited(),
        ));

        let _coordinator = CoordinatorBuilder::new(
            CoordinatorConfiguration::new("t").with_update_mode(layercache_core::UpdateMode::Up),
        )
        .with_handle(top.clone())
        .with_handle(bottom.clone())
        .build()
        .unwrap();

        let item = layercache_core::CacheItem::with_expiration(
            "k",
            None::<String>,
            "v".to_string(),
            layercache_core::ExpirationMode::Absolute,
            Duration::from_millis(5),
        )
        .unwrap();
        bottom.put(item.clone()).await.unwrap();
        top.put(item).await.unwrap();

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(bottom.get_item("k", None).await.unwrap().is_none());

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(top.get_item("k", None).await.unwrap().is_none());
    }
}
