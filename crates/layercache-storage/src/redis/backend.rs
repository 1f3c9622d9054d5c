//! Redis-backed distributed handle
//!
//! Items are stored as JSON; Redis's own key expiry (`SET PX`/`PEXPIRE`)
//! carries `Absolute`/`Sliding` expiration instead of the handle tracking
//! timestamps itself, since the distributed store is the one place those
//! timestamps would need to be kept consistent across processes.

use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bb8::{Pool, PooledConnection};
use bb8_redis::RedisConnectionManager;
use parking_lot::RwLock as SyncRwLock;
use redis::AsyncCommands;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use layercache_core::{
    CacheError, CacheHandle, CacheItem, ExpirationMode, HandleConfiguration, HandleStats,
    RegionEnumerableHandle, UpdateItemResult,
};

use super::config::RedisConfig;

fn backend_err(e: impl std::fmt::Display) -> CacheError {
    CacheError::TransientBackendFailure(e.to_string())
}

/// On-the-wire representation of a `CacheItem`. `created_utc`/
/// `last_accessed_utc` are not carried: Redis's own TTL is the source of
/// truth for when a key disappears, so there is nothing for this handle to
/// reconcile them against.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct RedisItem<V> {
    value: V,
    mode: ExpirationModeWire,
    timeout_ms: u64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
enum ExpirationModeWire {
    None,
    Absolute,
    Sliding,
}

impl From<ExpirationMode> for ExpirationModeWire {
    fn from(mode: ExpirationMode) -> Self {
        match mode {
            ExpirationMode::Absolute => ExpirationModeWire::Absolute,
            ExpirationMode::Sliding => ExpirationModeWire::Sliding,
            ExpirationMode::None | ExpirationMode::Default => ExpirationModeWire::None,
        }
    }
}

impl<V> RedisItem<V> {
    fn from_item(item: &CacheItem<V>) -> Self
    where
        V: Clone,
    {
        Self {
            value: item.value().clone(),
            mode: item.expiration_mode().into(),
            timeout_ms: item.expiration_timeout().as_millis() as u64,
        }
    }

    fn into_item(self, key: &str, region: Option<&str>) -> Result<CacheItem<V>, CacheError> {
        match self.mode {
            ExpirationModeWire::None => {
                Ok(CacheItem::with_region(key, region, self.value)?.with_no_expiration())
            }
            ExpirationModeWire::Absolute => CacheItem::with_expiration(
                key,
                region,
                self.value,
                ExpirationMode::Absolute,
                Duration::from_millis(self.timeout_ms),
            ),
            ExpirationModeWire::Sliding => CacheItem::with_expiration(
                key,
                region,
                self.value,
                ExpirationMode::Sliding,
                Duration::from_millis(self.timeout_ms),
            ),
        }
    }

    fn ttl(&self) -> Option<Duration> {
        match self.mode {
            ExpirationModeWire::None => None,
            ExpirationModeWire::Absolute | ExpirationModeWire::Sliding => {
                Some(Duration::from_millis(self.timeout_ms.max(1)))
            }
        }
    }
}

/// A handle backed by Redis. Typically the bottom handle of a coordinator
/// and the coordinator's backplane source of truth.
#[derive(Clone)]
pub struct RedisHandle<V> {
    pool: Pool<RedisConnectionManager>,
    config: RedisConfig,
    handle_config: HandleConfiguration,
    stats: Arc<SyncRwLock<HandleStats>>,
    _marker: PhantomData<fn() -> V>,
}

impl<V> RedisHandle<V>
where
    V: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
{
    pub async fn new(
        config: RedisConfig,
        handle_config: HandleConfiguration,
    ) -> Result<Self, CacheError> {
        let manager =
            RedisConnectionManager::new(config.url.as_str()).map_err(backend_err)?;
        let pool = Pool::builder()
            .max_size(config.pool_size)
            .connection_timeout(config.connection_timeout)
            .build(manager)
            .await
            .map_err(backend_err)?;
        Ok(Self {
            pool,
            config,
            handle_config,
            stats: Arc::new(SyncRwLock::new(HandleStats::default())),
            _marker: PhantomData,
        })
    }

    fn data_key(&self, key: &str, region: Option<&str>) -> String {
        match region {
            Some(r) => format!("{}:item:{}:{}", self.config.key_prefix, r, key),
            None => format!("{}:item:_:{}", self.config.key_prefix, key),
        }
    }

    fn region_set_key(&self, region: &str) -> String {
        format!("{}:region:{}", self.config.key_prefix, region)
    }

    async fn connection(&self) -> Result<PooledConnection<'_, RedisConnectionManager>, CacheError> {
        self.pool.get().await.map_err(backend_err)
    }

    fn serialize(wire: &RedisItem<V>) -> Result<Vec<u8>, CacheError> {
        serde_json::to_vec(wire).map_err(|e| CacheError::InvalidArgument(e.to_string()))
    }

    fn deserialize(raw: &[u8]) -> Result<RedisItem<V>, CacheError> {
        serde_json::from_slice(raw).map_err(|e| CacheError::InvalidState(e.to_string()))
    }

    async fn store(&self, data_key: &str, region: Option<&str>, wire: &RedisItem<V>) -> Result<(), CacheError> {
        let mut conn = self.connection().await?;
        let payload = Self::serialize(wire)?;

        let mut pipe = redis::pipe();
        pipe.atomic();
        match wire.ttl() {
            Some(ttl) => {
                pipe.pset_ex(data_key, &payload, ttl.as_millis() as u64);
            }
            None => {
                pipe.set(data_key, &payload);
            }
        }
        if let Some(r) = region {
            pipe.sadd(self.region_set_key(r), data_key);
        }
        pipe.query_async::<Vec<redis::Value>>(&mut *conn)
            .await
            .map_err(backend_err)?;
        Ok(())
    }
}

#[async_trait]
impl<V> CacheHandle<V> for RedisHandle<V>
where
    V: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
{
    fn configuration(&self) -> &HandleConfiguration {
        &self.handle_config
    }

    async fn stats(&self) -> HandleStats {
        self.stats.read().clone()
    }

    async fn get_item(
        &self,
        key: &str,
        region: Option<&str>,
    ) -> Result<Option<CacheItem<V>>, CacheError> {
        let data_key = self.data_key(key, region);
        let mut conn = self.connection().await?;
        let raw: Option<Vec<u8>> = conn.get(&data_key).await.map_err(backend_err)?;

        let Some(raw) = raw else {
            self.stats.write().misses += 1;
            return Ok(None);
        };
        let wire = Self::deserialize(&raw)?;

        // Sliding expiration: a successful read refreshes the window.
        if matches!(wire.mode, ExpirationModeWire::Sliding) {
            let _: Result<bool, _> = conn.pexpire(&data_key, wire.timeout_ms.max(1) as i64).await;
        }

        self.stats.write().hits += 1;
        Ok(Some(wire.into_item(key, region)?))
    }

    async fn add(&self, item: CacheItem<V>) -> Result<bool, CacheError> {
        let data_key = self.data_key(item.key(), item.region());
        let mut item = item;
        item.apply_defaults(self.handle_config.default_mode, self.handle_config.default_timeout);
        let wire = RedisItem::from_item(&item);
        let payload = Self::serialize(&wire)?;

        let mut conn = self.connection().await?;
        let set: bool = match wire.ttl() {
            Some(ttl) => redis::cmd("SET")
                .arg(&data_key)
                .arg(&payload)
                .arg("PX")
                .arg(ttl.as_millis() as u64)
                .arg("NX")
                .query_async::<Option<String>>(&mut *conn)
                .await
                .map_err(backend_err)?
                .is_some(),
            None => redis::cmd("SET")
                .arg(&data_key)
                .arg(&payload)
                .arg("NX")
                .query_async::<Option<String>>(&mut *conn)
                .await
                .map_err(backend_err)?
                .is_some(),
        };

        if set {
            if let Some(r) = item.region() {
                let _: i64 = conn.sadd(self.region_set_key(r), &data_key).await.map_err(backend_err)?;
            }
            self.stats.write().adds += 1;
        }
        Ok(set)
    }

    async fn put(&self, item: CacheItem<V>) -> Result<(), CacheError> {
        let mut item = item;
        item.apply_defaults(self.handle_config.default_mode, self.handle_config.default_timeout);
        let data_key = self.data_key(item.key(), item.region());
        let wire = RedisItem::from_item(&item);
        self.store(&data_key, item.region(), &wire).await?;
        self.stats.write().puts += 1;
        Ok(())
    }

    async fn remove(&self, key: &str, region: Option<&str>) -> Result<bool, CacheError> {
        let data_key = self.data_key(key, region);
        let mut conn = self.connection().await?;
        let removed: u64 = conn.del(&data_key).await.map_err(backend_err)?;
        if let Some(r) = region {
            let _: i64 = conn.srem(self.region_set_key(r), &data_key).await.map_err(backend_err)?;
        }
        if removed > 0 {
            self.stats.write().removes += 1;
        }
        Ok(removed > 0)
    }

    async fn clear(&self) -> Result<(), CacheError> {
        let mut conn = self.connection().await?;
        let pattern = format!("{}:*", self.config.key_prefix);
        let mut cursor = 0u64;
        loop {
            let (next, keys): (u64, Vec<String>) = redis::cmd("SCAN")
                .cursor_arg(cursor)
                .arg("MATCH")
                .arg(&pattern)
                .arg("COUNT")
                .arg(1000)
                .query_async(&mut *conn)
                .await
                .map_err(backend_err)?;
            if !keys.is_empty() {
                let _: usize = conn.del(&keys).await.map_err(backend_err)?;
            }
            cursor = next;
            if cursor == 0 {
                break;
            }
        }
        self.stats.write().clears += 1;
        Ok(())
    }

    async fn clear_region(&self, region: &str) -> Result<(), CacheError> {
        let mut conn = self.connection().await?;
        let set_key = self.region_set_key(region);
        let members: Vec<String> = conn.smembers(&set_key).await.map_err(backend_err)?;
        if !members.is_empty() {
            let _: usize = conn.del(&members).await.map_err(backend_err)?;
        }
        let _: i64 = conn.del(&set_key).await.map_err(backend_err)?;
        self.stats.write().clear_regions += 1;
        Ok(())
    }

    async fn exists(&self, key: &str, region: Option<&str>) -> Result<bool, CacheError> {
        let data_key = self.data_key(key, region);
        let mut conn = self.connection().await?;
        conn.exists(&data_key).await.map_err(backend_err)
    }

    async fn count(&self) -> Result<usize, CacheError> {
        let mut conn = self.connection().await?;
        let pattern = format!("{}:item:*", self.config.key_prefix);
        let mut cursor = 0u64;
        let mut count = 0usize;
        loop {
            let (next, keys): (u64, Vec<String>) = redis::cmd("SCAN")
                .cursor_arg(cursor)
                .arg("MATCH")
                .arg(&pattern)
                .arg("COUNT")
                .arg(1000)
                .query_async(&mut *conn)
                .await
                .map_err(backend_err)?;
            count += keys.len();
            cursor = next;
            if cursor == 0 {
                break;
            }
        }
        Ok(count)
    }

    async fn update(
        &self,
        key: &str,
        region: Option<&str>,
        f: Box<layercache_core::UpdateFn<V>>,
        max_retries: u32,
    ) -> Result<UpdateItemResult<V>, CacheError> {
        let data_key = self.data_key(key, region);
        let mut conn = self.connection().await?;
        let mut tries = 0u32;

        loop {
            tries += 1;

            redis::cmd("WATCH")
                .arg(&data_key)
                .query_async::<()>(&mut *conn)
                .await
                .map_err(backend_err)?;

            let raw: Option<Vec<u8>> = conn.get(&data_key).await.map_err(backend_err)?;
            let Some(raw) = raw else {
                redis::cmd("UNWATCH").query_async::<()>(&mut *conn).await.ok();
                return Ok(UpdateItemResult::ItemDidNotExist);
            };
            let wire = Self::deserialize(&raw)?;

            let next_value = match f(&wire.value) {
                Some(v) => v,
                None => {
                    redis::cmd("UNWATCH").query_async::<()>(&mut *conn).await.ok();
                    return Ok(UpdateItemResult::FactoryReturnedNull);
                }
            };

            let new_wire = RedisItem {
                value: next_value,
                mode: wire.mode,
                timeout_ms: wire.timeout_ms,
            };
            let payload = Self::serialize(&new_wire)?;

            let mut pipe = redis::pipe();
            pipe.atomic();
            match new_wire.ttl() {
                Some(ttl) => {
                    pipe.pset_ex(&data_key, &payload, ttl.as_millis() as u64);
                }
                None => {
                    pipe.set(&data_key, &payload);
                }
            }

            let committed: Option<Vec<redis::Value>> =
                pipe.query_async(&mut *conn).await.map_err(backend_err)?;

            if committed.is_some() {
                self.stats.write().update_calls += 1;
                return Ok(UpdateItemResult::Success {
                    new_item: new_wire.into_item(key, region)?,
                    version_conflict_occurred: tries > 1,
                    tries_needed: tries,
                });
            }

            if tries >= max_retries {
                return Ok(UpdateItemResult::TooManyRetries { tries_needed: tries });
            }
        }
    }
}

#[async_trait]
impl<V> RegionEnumerableHandle<V> for RedisHandle<V>
where
    V: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
{
    async fn keys_in_region(&self, region: &str) -> Result<Vec<String>, CacheError> {
        let mut conn = self.connection().await?;
        let set_key = self.region_set_key(region);
        let members: Vec<String> = conn.smembers(&set_key).await.map_err(backend_err)?;
        let prefix = format!("{}:item:{}:", self.config.key_prefix, region);
        Ok(members
            .into_iter()
            .filter_map(|m| m.strip_prefix(&prefix).map(str::to_string))
            .collect())
    }
}

/// Integration tests require a reachable Redis and are gated behind
/// `--ignored` plus a `REDIS_URL` environment variable.
#[cfg(test)]
mod tests {
    use super::*;

    async fn handle() -> Option<RedisHandle<i32>> {
        let url = std::env::var("REDIS_URL").ok()?;
        RedisHandle::new(RedisConfig::new(url), HandleConfiguration::new("redis"))
            .await
            .ok()
    }

    #[tokio::test]
    #[ignore = "requires a running redis instance; set REDIS_URL"]
    async fn add_then_get_roundtrips() {
        let Some(h) = handle().await else { return };
        let item = CacheItem::new("update-test-key", 42).unwrap();
        h.remove("update-test-key", None).await.unwrap();
        assert!(h.add(item).await.unwrap());
        let got = h.get_item("update-test-key", None).await.unwrap().unwrap();
        assert_eq!(*got.value(), 42);
    }

    #[tokio::test]
    #[ignore = "requires a running redis instance; set REDIS_URL"]
    async fn update_applies_cas() {
        let Some(h) = handle().await else { return };
        h.remove("cas-test-key", None).await.unwrap();
        h.add(CacheItem::new("cas-test-key", 1).unwrap()).await.unwrap();
        let result = h
            .update("cas-test-key", None, Box::new(|v: &i32| Some(v + 1)), 3)
            .await
            .unwrap();
        assert!(result.is_success());
    }
}
