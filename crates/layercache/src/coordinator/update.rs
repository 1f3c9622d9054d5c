//! Atomic update state machine (spec §4.3, §4.4)

use std::sync::Arc;

use layercache_core::{
    BackplaneAction, CacheError, CacheItem, EventTarget, Origin, Result, UpdateItemResult,
    UpdateMode,
};

use super::{emit_observer, Coordinator};

impl<V> Coordinator<V>
where
    V: Clone + Send + Sync + 'static,
{
    async fn update_once(
        &self,
        key: &str,
        region: Option<&str>,
        f: Box<layercache_core::UpdateFn<V>>,
        max_retries: u32,
    ) -> Result<UpdateItemResult<V>> {
        self.check_alive()?;
        Self::validate_key_region(key, region)?;

        let handles = &self.inner.handles;
        if handles.is_empty() {
            return Ok(UpdateItemResult::ItemDidNotExist);
        }
        let bottom = handles.len() - 1;
        let result = handles[bottom].update(key, region, f, max_retries).await?;

        match &result {
            UpdateItemResult::Success { new_item, .. } => {
                if self.inner.config.update_mode == UpdateMode::Up {
                    for handle in &handles[..bottom] {
                        if let Err(e) = handle.remove(key, region).await {
                            tracing::warn!(target: "layercache", error = %e, "post-update eviction failed");
                        }
                    }
                }
                // Generalizes to multi-bottom topologies; a no-op today
                // since `bottom` is always the last handle.
                for handle in &handles[bottom + 1..] {
                    if let Err(e) = handle.add(new_item.clone()).await {
                        tracing::warn!(target: "layercache", error = %e, "post-update fan-out add failed");
                    }
                }
                if let Some(backplane) = &self.inner.backplane {
                    if let Err(e) = backplane.notify_change(key, region, BackplaneAction::Update).await {
                        tracing::warn!(target: "layercache", error = %e, "backplane notify_change failed");
                    }
                }
                let target = EventTarget::new(key, region);
                emit_observer(|| self.inner.observer.on_update(&target, Origin::Local));
            }
            UpdateItemResult::FactoryReturnedNull => {
                tracing::debug!(target: "layercache", key = key, "update factory returned null");
            }
            UpdateItemResult::TooManyRetries { .. } | UpdateItemResult::ItemDidNotExist => {
                for (i, handle) in handles.iter().enumerate() {
                    if i == bottom {
                        continue;
                    }
                    let _ = handle.remove(key, region).await;
                }
            }
        }

        Ok(result)
    }

    /// §4.3: atomic read-modify-write, delegated to the bottommost handle's
    /// own CAS retry loop. Fails loudly with `InvalidState` on any
    /// non-success outcome.
    pub async fn update<F>(&self, key: &str, region: Option<&str>, f: F, max_retries: u32) -> Result<V>
    where
        F: Fn(&V) -> Option<V> + Send + Sync + 'static,
    {
        let boxed: Box<layercache_core::UpdateFn<V>> = Box::new(f);
        match self.update_once(key, region, boxed, max_retries).await? {
            UpdateItemResult::Success { new_item, .. } => Ok(new_item.into_value()),
            UpdateItemResult::FactoryReturnedNull => {
                Err(CacheError::InvalidState("value factory returned null".into()))
            }
            UpdateItemResult::TooManyRetries { tries_needed } => Err(CacheError::InvalidState(
                format!("too many retries ({tries_needed})"),
            )),
            UpdateItemResult::ItemDidNotExist => {
                Err(CacheError::InvalidState("key did not exist".into()))
            }
        }
    }

    /// Non-throwing variant of [`Coordinator::update`].
    pub async fn try_update<F>(
        &self,
        key: &str,
        region: Option<&str>,
        f: F,
        max_retries: u32,
    ) -> Result<(bool, Option<V>)>
    where
        F: Fn(&V) -> Option<V> + Send + Sync + 'static,
    {
        let boxed: Box<layercache_core::UpdateFn<V>> = Box::new(f);
        match self.update_once(key, region, boxed, max_retries).await? {
            UpdateItemResult::Success { new_item, .. } => Ok((true, Some(new_item.into_value()))),
            _ => Ok((false, None)),
        }
    }

    /// §4.4: try `add`; under contention fall back to `try_update`, up to
    /// `max_retries + 1` attempts total. Returns `None` if every attempt
    /// loses the race — kept lenient rather than `InvalidState` to match the
    /// design note's default (see DESIGN.md for the policy decision).
    pub async fn add_or_update<F>(
        &self,
        item: CacheItem<V>,
        f: F,
        max_retries: u32,
    ) -> Result<Option<V>>
    where
        F: Fn(&V) -> Option<V> + Send + Sync + 'static,
    {
        self.check_alive()?;
        let key = item.key().to_string();
        let region = item.region().map(str::to_string);
        let f = Arc::new(f);

        for _ in 0..=max_retries {
            if self.add(item.clone()).await? {
                return Ok(Some(item.value().clone()));
            }
            let f = f.clone();
            let (updated, value) = self
                .try_update(&key, region.as_deref(), move |v| f(v), max_retries)
                .await?;
            if updated {
                return Ok(value);
            }
        }
        Ok(None)
    }
}
