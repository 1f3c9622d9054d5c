//! Expiration helpers (spec §4.6)

use std::time::Duration;

use layercache_core::{ExpirationMode, Result};

use super::Coordinator;

impl<V> Coordinator<V>
where
    V: Clone + Send + Sync + 'static,
{
    /// Re-expire `(key, region)` with an explicit mode/timeout: read via
    /// `get_item`, apply the matching transformer, `put` the result. A
    /// no-op if the key is absent.
    pub async fn expire(
        &self,
        key: &str,
        region: Option<&str>,
        mode: ExpirationMode,
        timeout: Duration,
    ) -> Result<()> {
        self.check_alive()?;
        mode.validate(timeout)?;

        let Some(item) = self.get_item(key, region).await? else {
            return Ok(());
        };

        let transformed = match mode {
            ExpirationMode::Absolute => item.with_absolute_expiration(timeout)?,
            ExpirationMode::Sliding => item.with_sliding_expiration(timeout)?,
            ExpirationMode::None => item.with_no_expiration(),
            ExpirationMode::Default => item.with_default_expiration(),
        };
        self.put(transformed).await
    }

    /// Convenience wrapper for an absolute re-expiration.
    pub async fn expire_absolute(&self, key: &str, region: Option<&str>, timeout: Duration) -> Result<()> {
        self.expire(key, region, ExpirationMode::Absolute, timeout).await
    }

    /// Convenience wrapper for a sliding re-expiration.
    pub async fn expire_sliding(&self, key: &str, region: Option<&str>, timeout: Duration) -> Result<()> {
        self.expire(key, region, ExpirationMode::Sliding, timeout).await
    }

    /// Restore `(None, 0)`: the item never expires by time again.
    pub async fn remove_expiration(&self, key: &str, region: Option<&str>) -> Result<()> {
        self.expire(key, region, ExpirationMode::None, Duration::ZERO).await
    }
}

#[cfg(test)]
mod tests {
    use super::super::CoordinatorBuilder;
    use layercache_core::{CacheHandle, CacheItem, CoordinatorConfiguration, HandleConfiguration};
    use layercache_storage::{MemoryConfig, MemoryHandle};
    use std::sync::Arc;
    use std::time::Duration;

    fn coordinator() -> super::Coordinator<String> {
        let handle: Arc<dyn CacheHandle<String>> = Arc::new(MemoryHandle::<String>::new(
            HandleConfiguration::new("h1"),
            MemoryConfig::unlimited(),
        ));
        CoordinatorBuilder::new(CoordinatorConfiguration::new("t"))
            .with_handle(handle)
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn expire_absolute_then_item_expires() {
        let coordinator = coordinator();
        coordinator
            .add(CacheItem::new("k", "v".to_string()).unwrap())
            .await
            .unwrap();

        coordinator
            .expire_absolute("k", None, Duration::from_millis(5))
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(coordinator.get("k", None).await.unwrap(), None);
    }

    #[tokio::test]
    async fn remove_expiration_restores_none_mode() {
        let coordinator = coordinator();
        coordinator
            .add(CacheItem::new("k", "v".to_string()).unwrap())
            .await
            .unwrap();
        coordinator
            .expire_absolute("k", None, Duration::from_millis(5))
            .await
            .unwrap();
        coordinator.remove_expiration("k", None).await.unwrap();

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(coordinator.get("k", None).await.unwrap(), Some("v".to_string()));
    }

    #[tokio::test]
    async fn expire_on_missing_key_is_a_no_op() {
        let coordinator = coordinator();
        coordinator
            .expire_absolute("missing", None, Duration::from_secs(1))
            .await
            .unwrap();
    }
}
