//! The handle contract the coordinator composes

use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::{
    CacheError, CacheItem, HandleConfiguration, HandleStats, RemoveReason, UpdateItemResult,
};

/// Emitted by a handle when it evicts an item on its own initiative
/// (capacity pressure, an internal TTL sweep, …) rather than because the
/// coordinator asked it to. The coordinator subscribes to these to drive
/// `OnRemoveByHandle` and, under `UpdateMode::Up`, evict the key from the
/// handles above the emitter.
#[derive(Debug, Clone)]
pub struct HandleRemoveEvent {
    pub key: String,
    pub region: Option<String>,
    pub reason: RemoveReason,
}

/// The caller-supplied read-modify-write function passed to `update`.
///
/// Named as a type alias (rather than inlined in the trait signature) so
/// `async_trait`'s lifetime rewriting leaves the closure's `&V` argument
/// higher-ranked instead of tying it to a single call's lifetime.
pub type UpdateFn<V> = dyn Fn(&V) -> Option<V> + Send + Sync;

/// One cache backend composed into the coordinator.
///
/// Implementations own their storage; the coordinator never reaches into a
/// handle's internals except through this trait.
#[async_trait]
pub trait CacheHandle<V>: Send + Sync
where
    V: Clone + Send + Sync + 'static,
{
    /// Static facet describing this handle (name, defaults, topology).
    fn configuration(&self) -> &HandleConfiguration;

    /// Current operation counters.
    async fn stats(&self) -> HandleStats;

    /// Fetch an item. Applies the handle's own expiration check; an expired
    /// item is treated as absent (and removed) rather than returned stale.
    async fn get_item(
        &self,
        key: &str,
        region: Option<&str>,
    ) -> Result<Option<CacheItem<V>>, CacheError>;

    /// Create-if-absent. Returns `true` iff the item was stored (a key that
    /// already exists is left untouched and `false` is returned).
    async fn add(&self, item: CacheItem<V>) -> Result<bool, CacheError>;

    /// Upsert: store the item unconditionally.
    async fn put(&self, item: CacheItem<V>) -> Result<(), CacheError>;

    /// Remove `(key, region)`. Returns `true` iff a value was present.
    async fn remove(&self, key: &str, region: Option<&str>) -> Result<bool, CacheError>;

    /// Remove everything, across all regions.
    async fn clear(&self) -> Result<(), CacheError>;

    /// Remove everything in one region.
    async fn clear_region(&self, region: &str) -> Result<(), CacheError>;

    /// Check existence without affecting sliding-expiration or stats the
    /// way `get_item` does.
    async fn exists(&self, key: &str, region: Option<&str>) -> Result<bool, CacheError>;

    /// Number of live items.
    async fn count(&self) -> Result<usize, CacheError>;

    /// Atomic read-modify-write per the handle-internal update contract
    /// (§4.9): absent key yields `ItemDidNotExist`; a null-returning `f`
    /// yields `FactoryReturnedNull`; CAS conflicts retry up to
    /// `max_retries` times before `TooManyRetries`.
    async fn update(
        &self,
        key: &str,
        region: Option<&str>,
        f: Box<UpdateFn<V>>,
        max_retries: u32,
    ) -> Result<UpdateItemResult<V>, CacheError>;

    /// Subscribe to this handle's own-initiative removals (capacity
    /// eviction, internal TTL expiry). The default implementation never
    /// emits anything — a channel with no writers — for handles that don't
    /// evict independently of the coordinator.
    fn subscribe_removals(&self) -> broadcast::Receiver<HandleRemoveEvent> {
        broadcast::channel(1).1
    }
}

/// Extended trait for handles that can enumerate the keys in a region
/// (kept separate so a minimal handle need not implement it).
#[async_trait]
pub trait RegionEnumerableHandle<V>: CacheHandle<V>
where
    V: Clone + Send + Sync + 'static,
{
    /// All keys currently stored in a region.
    async fn keys_in_region(&self, region: &str) -> Result<Vec<String>, CacheError>;
}
