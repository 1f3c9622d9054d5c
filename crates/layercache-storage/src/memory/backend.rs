//! In-memory cache handle using DashMap

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::RwLock;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use layercache_core::{
    CacheError, CacheHandle, CacheItem, HandleConfiguration, HandleRemoveEvent, HandleStats,
    RegionEnumerableHandle, RemoveReason, UpdateItemResult,
};
use tokio::sync::broadcast;

use super::ttl_index::TtlIndex;

/// Tuning knobs for [`MemoryHandle`], orthogonal to the generic
/// `HandleConfiguration` (which carries expiration defaults and coordinator
/// topology flags).
#[derive(Debug, Clone)]
pub struct MemoryConfig {
    /// Maximum number of items (0 = unlimited).
    pub max_capacity: usize,
    /// Maximum absolute-expiration timeout the TTL index is sized for.
    pub max_ttl: Duration,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            max_capacity: 10_000,
            max_ttl: Duration::from_secs(86_400),
        }
    }
}

impl MemoryConfig {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            max_capacity: capacity,
            ..Default::default()
        }
    }

    pub fn unlimited() -> Self {
        Self {
            max_capacity: 0,
            ..Default::default()
        }
    }
}

fn composite_key(key: &str, region: Option<&str>) -> String {
    match region {
        Some(r) => format!("{r}\u{1}{key}"),
        None => format!("\u{1}{key}"),
    }
}

/// An in-memory handle backed by a `DashMap`.
///
/// Entries carry a version counter alongside the item so `update` can
/// implement the handle-internal CAS retry contract: a successful commit
/// requires the version observed at read time to still match at write time.
/// Cloning creates a new handle to the SAME underlying store.
#[derive(Clone)]
pub struct MemoryHandle<V> {
    data: Arc<DashMap<String, (CacheItem<V>, u64)>>,
    region_index: Arc<DashMap<String, HashSet<String>>>,
    ttl_index: Arc<RwLock<TtlIndex>>,
    stats: Arc<RwLock<HandleStats>>,
    remove_tx: broadcast::Sender<HandleRemoveEvent>,
    config: HandleConfiguration,
    memory_config: MemoryConfig,
}

impl<V> MemoryHandle<V>
where
    V: Clone + Send + Sync + 'static,
{
    pub fn new(config: HandleConfiguration, memory_config: MemoryConfig) -> Self {
        let ttl_index = TtlIndex::new(Duration::from_secs(1), memory_config.max_ttl);
        let (remove_tx, _) = broadcast::channel(256);
        Self {
            data: Arc::new(DashMap::new()),
            region_index: Arc::new(DashMap::new()),
            ttl_index: Arc::new(RwLock::new(ttl_index)),
            stats: Arc::new(RwLock::new(HandleStats::default())),
            remove_tx,
            config,
            memory_config,
        }
    }

    fn maybe_evict(&self) {
        if self.memory_config.max_capacity == 0 || self.data.len() < self.memory_config.max_capacity
        {
            return;
        }
        let overflow = self.data.len().saturating_sub(self.memory_config.max_capacity - 1);
        let victims: Vec<String> = self
            .data
            .iter()
            .take(overflow)
            .map(|e| e.key().clone())
            .collect();
        for composite in victims {
            if let Some((_, (item, _))) = self.data.remove(&composite) {
                self.unindex(&composite, item.region());
                self.stats.write().items = self.data.len() as u64;
                let _ = self.remove_tx.send(HandleRemoveEvent {
                    key: item.key().to_string(),
                    region: item.region().map(str::to_string),
                    reason: RemoveReason::Capacity,
                });
            }
        }
    }

    fn index(&self, composite: &str, region: Option<&str>) {
        if let Some(r) = region {
            self.region_index
                .entry(r.to_string())
                .or_default()
                .insert(composite.to_string());
        }
    }

    fn unindex(&self, composite: &str, region: Option<&str>) {
        self.ttl_index.write().remove(composite);
        if let Some(r) = region {
            if let Some(mut set) = self.region_index.get_mut(r) {
                set.remove(composite);
            }
        }
    }

    fn schedule_expiration(&self, composite: &str, item: &CacheItem<V>) {
        use layercache_core::ExpirationMode;
        self.ttl_index.write().remove(composite);
        if item.expiration_mode() == ExpirationMode::Absolute {
            self.ttl_index
                .write()
                .schedule(composite.to_string(), item.expiration_timeout());
        }
    }

    fn remove_locked(&self, composite: &str) -> Option<CacheItem<V>> {
        self.data.remove(composite).map(|(_, (item, _))| {
            self.unindex(composite, item.region());
            item
        })
    }

    /// Drive the TTL wheel forward and evict items whose absolute
    /// expiration has elapsed, emitting a `HandleRemoveEvent` for each.
    /// Intended to be called periodically by whatever owns this handle
    /// (the coordinator's background housekeeping task, or a test).
    pub fn cleanup_expired(&self) -> usize {
        let due = self.ttl_index.write().tick();
        let now = SystemTime::now();
        let mut count = 0;
        for composite in due {
            let expired = self
                .data
                .get(&composite)
                .map(|e| e.value().0.is_expired(now))
                .unwrap_or(false);
            if expired {
                if let Some(item) = self.remove_locked(&composite) {
                    self.stats.write().items = self.data.len() as u64;
                    let _ = self.remove_tx.send(HandleRemoveEvent {
                        key: item.key().to_string(),
                        region: item.region().map(str::to_string),
                        reason: RemoveReason::Expired,
                    });
                    count += 1;
                }
            }
        }
        count
    }

    fn apply_handle_defaults(&self, mut item: CacheItem<V>) -> CacheItem<V> {
        item.apply_defaults(self.config.default_mode, self.config.default_timeout);
        item
    }

    fn cas_loop(
        &self,
        composite: &str,
        f: &layercache_core::UpdateFn<V>,
        max_retries: u32,
    ) -> UpdateItemResult<V> {
        let now = SystemTime::now();
        let mut tries = 0u32;

        loop {
            tries += 1;

            let (current_item, current_version) = match self.data.get(composite) {
                Some(entry) => entry.value().clone(),
                None => return UpdateItemResult::ItemDidNotExist,
            };

            if current_item.is_expired(now) {
                self.remove_locked(composite);
                return UpdateItemResult::ItemDidNotExist;
            }

            let next_value = match f(current_item.value()) {
                Some(v) => v,
                None => return UpdateItemResult::FactoryReturnedNull,
            };
            let new_item = current_item.with_value(next_value);

            let committed = match self.data.get_mut(composite) {
                Some(mut slot) if slot.value().1 == current_version => {
                    *slot.value_mut() = (new_item.clone(), current_version + 1);
                    true
                }
                Some(_) => false,
                None => return UpdateItemResult::ItemDidNotExist,
            };

            if committed {
                self.stats.write().update_calls += 1;
                return UpdateItemResult::Success {
                    new_item,
                    version_conflict_occurred: tries > 1,
                    tries_needed: tries,
                };
            }

            if tries >= max_retries {
                return UpdateItemResult::TooManyRetries { tries_needed: tries };
            }
        }
    }
}

#[async_trait]
impl<V> CacheHandle<V> for MemoryHandle<V>
where
    V: Clone + Send + Sync + 'static,
{
    fn configuration(&self) -> &HandleConfiguration {
        &self.config
    }

    async fn stats(&self) -> HandleStats {
        self.stats.read().clone()
    }

    async fn get_item(
        &self,
        key: &str,
        region: Option<&str>,
    ) -> Result<Option<CacheItem<V>>, CacheError> {
        let composite = composite_key(key, region);
        let now = SystemTime::now();

        let expired = match self.data.get(&composite) {
            Some(entry) => entry.value().0.is_expired(now),
            None => {
                self.stats.write().misses += 1;
                return Ok(None);
            }
        };

        if expired {
            if let Some(item) = self.remove_locked(&composite) {
                self.stats.write().items = self.data.len() as u64;
                let _ = self.remove_tx.send(HandleRemoveEvent {
                    key: item.key().to_string(),
                    region: item.region().map(str::to_string),
                    reason: RemoveReason::Expired,
                });
            }
            self.stats.write().misses += 1;
            return Ok(None);
        }

        let mut entry = self.data.get_mut(&composite).expect("checked above");
        entry.0.touch();
        let item = entry.0.clone();
        drop(entry);
        self.schedule_expiration(&composite, &item);
        self.stats.write().hits += 1;
        Ok(Some(item))
    }

    async fn add(&self, item: CacheItem<V>) -> Result<bool, CacheError> {
        let composite = composite_key(item.key(), item.region());
        let now = SystemTime::now();

        if let Some(entry) = self.data.get(&composite) {
            if !entry.0.is_expired(now) {
                return Ok(false);
            }
        }

        self.maybe_evict();
        let item = self.apply_handle_defaults(item);
        let region = item.region().map(str::to_string);
        self.schedule_expiration(&composite, &item);
        self.index(&composite, region.as_deref());
        self.data.insert(composite, (item, 0));
        let mut stats = self.stats.write();
        stats.adds += 1;
        stats.items = self.data.len() as u64;
        Ok(true)
    }

    async fn put(&self, item: CacheItem<V>) -> Result<(), CacheError> {
        let composite = composite_key(item.key(), item.region());
        if !self.data.contains_key(&composite) {
            self.maybe_evict();
        }
        let item = self.apply_handle_defaults(item);
        let region = item.region().map(str::to_string);
        self.schedule_expiration(&composite, &item);
        self.index(&composite, region.as_deref());
        let version = self.data.get(&composite).map(|e| e.1 + 1).unwrap_or(0);
        self.data.insert(composite, (item, version));
        let mut stats = self.stats.write();
        stats.puts += 1;
        stats.items = self.data.len() as u64;
        Ok(())
    }

    async fn remove(&self, key: &str, region: Option<&str>) -> Result<bool, CacheError> {
        let composite = composite_key(key, region);
        let removed = self.remove_locked(&composite).is_some();
        if removed {
            let mut stats = self.stats.write();
            stats.removes += 1;
            stats.items = self.data.len() as u64;
        }
        Ok(removed)
    }

    async fn clear(&self) -> Result<(), CacheError> {
        self.data.clear();
        self.region_index.clear();
        self.ttl_index.write().clear();
        let mut stats = self.stats.write();
        stats.clears += 1;
        stats.items = 0;
        Ok(())
    }

    async fn clear_region(&self, region: &str) -> Result<(), CacheError> {
        if let Some((_, composites)) = self.region_index.remove(region) {
            for composite in composites {
                self.data.remove(&composite);
                self.ttl_index.write().remove(&composite);
            }
        }
        let mut stats = self.stats.write();
        stats.clear_regions += 1;
        stats.items = self.data.len() as u64;
        Ok(())
    }

    async fn exists(&self, key: &str, region: Option<&str>) -> Result<bool, CacheError> {
        let composite = composite_key(key, region);
        let now = SystemTime::now();
        Ok(self
            .data
            .get(&composite)
            .map(|e| !e.0.is_expired(now))
            .unwrap_or(false))
    }

    async fn count(&self) -> Result<usize, CacheError> {
        Ok(self.data.len())
    }

    async fn update(
        &self,
        key: &str,
        region: Option<&str>,
        f: Box<layercache_core::UpdateFn<V>>,
        max_retries: u32,
    ) -> Result<UpdateItemResult<V>, CacheError> {
        Ok(self.cas_loop(&composite_key(key, region), f.as_ref(), max_retries))
    }

    fn subscribe_removals(&self) -> broadcast::Receiver<HandleRemoveEvent> {
        self.remove_tx.subscribe()
    }
}

#[async_trait]
impl<V> RegionEnumerableHandle<V> for MemoryHandle<V>
where
    V: Clone + Send + Sync + 'static,
{
    async fn keys_in_region(&self, region: &str) -> Result<Vec<String>, CacheError> {
        let now = SystemTime::now();
        Ok(self
            .region_index
            .get(region)
            .map(|set| {
                set.iter()
                    .filter_map(|composite| {
                        self.data.get(composite).and_then(|e| {
                            if e.0.is_expired(now) {
                                None
                            } else {
                                Some(e.0.key().to_string())
                            }
                        })
                    })
                    .collect()
            })
            .unwrap_or_default())
    }
}
