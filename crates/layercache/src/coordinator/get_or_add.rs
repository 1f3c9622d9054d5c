//! `get_or_add` / `try_get_or_add` (spec §4.5)
//!
//! The factory is invoked at most once per call, even across internal
//! retries: it's captured in an `Option<F>` taken on first use and never
//! re-invoked once consumed, per the design note's single-use-factory
//! invariant.

use layercache_core::{CacheError, CacheItem, Result};

use super::Coordinator;

/// Outcome of the internal loop, distinguishing the two failure causes the
/// strict variant reports with different messages.
enum Outcome<V> {
    Present(V),
    FactoryReturnedNull,
    RetriesExhausted,
}

impl<V> Coordinator<V>
where
    V: Clone + Send + Sync + 'static,
{
    async fn get_or_add_inner<F>(
        &self,
        key: &str,
        region: Option<&str>,
        factory: F,
        max_retries: u32,
    ) -> Result<Outcome<V>>
    where
        F: FnOnce() -> Option<V> + Send,
    {
        self.check_alive()?;
        Self::validate_key_region(key, region)?;

        let mut factory = Some(factory);
        let mut pending: Option<CacheItem<V>> = None;

        for _ in 0..=max_retries {
            if let Some(item) = self.get_item(key, region).await? {
                return Ok(Outcome::Present(item.into_value()));
            }

            let item = match &pending {
                Some(item) => item.clone(),
                None => {
                    let Some(f) = factory.take() else {
                        return Ok(Outcome::RetriesExhausted);
                    };
                    match f() {
                        Some(value) => {
                            let item = CacheItem::with_region(key, region, value)?;
                            pending = Some(item.clone());
                            item
                        }
                        None => return Ok(Outcome::FactoryReturnedNull),
                    }
                }
            };

            if self.add(item.clone()).await? {
                return Ok(Outcome::Present(item.into_value()));
            }
        }

        Ok(Outcome::RetriesExhausted)
    }

    /// §4.5: read-or-create. Fails loudly if the factory returns null or
    /// retries are exhausted without either a read or a successful add.
    pub async fn get_or_add<F>(
        &self,
        key: &str,
        region: Option<&str>,
        factory: F,
        max_retries: u32,
    ) -> Result<V>
    where
        F: FnOnce() -> Option<V> + Send,
    {
        match self.get_or_add_inner(key, region, factory, max_retries).await? {
            Outcome::Present(value) => Ok(value),
            Outcome::FactoryReturnedNull => {
                Err(CacheError::InvalidState("value factory returned null".into()))
            }
            Outcome::RetriesExhausted => {
                Err(CacheError::InvalidState("could not get nor add".into()))
            }
        }
    }

    /// Non-throwing variant of [`Coordinator::get_or_add`].
    pub async fn try_get_or_add<F>(
        &self,
        key: &str,
        region: Option<&str>,
        factory: F,
        max_retries: u32,
    ) -> Result<(bool, Option<V>)>
    where
        F: FnOnce() -> Option<V> + Send,
    {
        match self.get_or_add_inner(key, region, factory, max_retries).await? {
            Outcome::Present(value) => Ok((true, Some(value))),
            _ => Ok((false, None)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::CoordinatorBuilder;
    use layercache_core::{CacheHandle, CoordinatorConfiguration, HandleConfiguration};
    use layercache_storage::{MemoryConfig, MemoryHandle};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

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
    async fn factory_invoked_once_on_first_call() {
        let coordinator = coordinator();
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = calls.clone();

        let value = coordinator
            .get_or_add("k", None, move || {
                calls_clone.fetch_add(1, Ordering::SeqCst);
                Some("v".to_string())
            }, 3)
            .await
            .unwrap();

        assert_eq!(value, "v");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn second_call_sees_existing_value_without_invoking_factory() {
        let coordinator = coordinator();
        coordinator
            .get_or_add("k", None, || Some("first".to_string()), 3)
            .await
            .unwrap();

        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = calls.clone();
        let value = coordinator
            .get_or_add("k", None, move || {
                calls_clone.fetch_add(1, Ordering::SeqCst);
                Some("second".to_string())
            }, 3)
            .await
            .unwrap();

        assert_eq!(value, "first");
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn factory_returning_null_fails_strict_variant() {
        let coordinator = coordinator();
        let result = coordinator
            .get_or_add("k", None, || None::<String>, 3)
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn try_variant_returns_false_on_null_factory() {
        let coordinator = coordinator();
        let (ok, value) = coordinator
            .try_get_or_add("k", None, || None::<String>, 3)
            .await
            .unwrap();
        assert!(!ok);
        assert!(value.is_none());
    }
}
