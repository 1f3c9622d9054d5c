//! Cache item type

use super::expiration::ExpirationMode;
use crate::CacheError;
use std::time::{Duration, SystemTime};

/// An immutable cache item, keyed by `(key, region)`.
///
/// Updates never mutate an item in place; they produce a new one (see
/// `with_absolute_expiration` and friends below).
#[derive(Debug, Clone)]
pub struct CacheItem<V> {
    key: String,
    region: Option<String>,
    value: V,
    expiration_mode: ExpirationMode,
    expiration_timeout: Duration,
    created_utc: SystemTime,
    last_accessed_utc: SystemTime,
    uses_expiration_defaults: bool,
}

impl<V> CacheItem<V> {
    /// Construct an item with no explicit expiration. `uses_expiration_defaults`
    /// is `true`, so the receiving handle applies its own default mode/timeout
    /// at store time.
    pub fn new(key: impl Into<String>, value: V) -> Result<Self, CacheError> {
        Self::with_region(key, None::<String>, value)
    }

    /// Construct an item in a region, with no explicit expiration.
    pub fn with_region(
        key: impl Into<String>,
        region: Option<impl Into<String>>,
        value: V,
    ) -> Result<Self, CacheError> {
        let key = key.into();
        if key.is_empty() {
            return Err(CacheError::InvalidArgument("key must not be empty".into()));
        }
        let region = region.map(Into::into);
        if let Some(r) = &region {
            if r.trim().is_empty() {
                return Err(CacheError::InvalidArgument(
                    "region must not be empty".into(),
                ));
            }
        }
        let now = SystemTime::now();
        Ok(Self {
            key,
            region,
            value,
            expiration_mode: ExpirationMode::Default,
            expiration_timeout: Duration::ZERO,
            created_utc: now,
            last_accessed_utc: now,
            uses_expiration_defaults: true,
        })
    }

    /// Construct an item with an explicit mode/timeout. `uses_expiration_defaults`
    /// is `false`: the handle must not overwrite this expiration with its own
    /// defaults.
    pub fn with_expiration(
        key: impl Into<String>,
        region: Option<impl Into<String>>,
        value: V,
        mode: ExpirationMode,
        timeout: Duration,
    ) -> Result<Self, CacheError> {
        mode.validate(timeout)?;
        let mut item = Self::with_region(key, region, value)?;
        item.expiration_mode = mode;
        item.expiration_timeout = timeout;
        item.uses_expiration_defaults = false;
        Ok(item)
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn region(&self) -> Option<&str> {
        self.region.as_deref()
    }

    pub fn value(&self) -> &V {
        &self.value
    }

    pub fn into_value(self) -> V {
        self.value
    }

    pub fn expiration_mode(&self) -> ExpirationMode {
        self.expiration_mode
    }

    pub fn expiration_timeout(&self) -> Duration {
        self.expiration_timeout
    }

    pub fn created_utc(&self) -> SystemTime {
        self.created_utc
    }

    pub fn last_accessed_utc(&self) -> SystemTime {
        self.last_accessed_utc
    }

    /// `true` iff the mode/timeout were never explicitly set on this item,
    /// so a receiving handle should apply its own defaults at store time.
    pub fn uses_expiration_defaults(&self) -> bool {
        self.uses_expiration_defaults
    }

    /// Record a successful read, refreshing the sliding-expiration window.
    pub fn touch(&mut self) {
        self.last_accessed_utc = SystemTime::now();
    }

    /// Apply a handle's default mode/timeout. Only takes effect when
    /// `uses_expiration_defaults()` is true; called by a handle exactly once,
    /// at store time.
    pub fn apply_defaults(&mut self, mode: ExpirationMode, timeout: Duration) {
        if self.uses_expiration_defaults {
            self.expiration_mode = mode;
            self.expiration_timeout = timeout;
        }
    }

    /// `is_expired` per the data model: Absolute compares against
    /// `created_utc`, Sliding against `last_accessed_utc`, everything else
    /// never expires by time.
    pub fn is_expired(&self, now: SystemTime) -> bool {
        match self.expiration_mode {
            ExpirationMode::Absolute => now
                .duration_since(self.created_utc)
                .map(|elapsed| elapsed >= self.expiration_timeout)
                .unwrap_or(false),
            ExpirationMode::Sliding => now
                .duration_since(self.last_accessed_utc)
                .map(|elapsed| elapsed >= self.expiration_timeout)
                .unwrap_or(false),
            ExpirationMode::None | ExpirationMode::Default => false,
        }
    }

    /// Re-expire with an absolute timeout. Resets `created_utc` so the new
    /// deadline is measured from now.
    pub fn with_absolute_expiration(mut self, timeout: Duration) -> Result<Self, CacheError> {
        ExpirationMode::Absolute.validate(timeout)?;
        self.expiration_mode = ExpirationMode::Absolute;
        self.expiration_timeout = timeout;
        self.created_utc = SystemTime::now();
        self.uses_expiration_defaults = false;
        Ok(self)
    }

    /// Re-expire with a sliding timeout.
    pub fn with_sliding_expiration(mut self, timeout: Duration) -> Result<Self, CacheError> {
        ExpirationMode::Sliding.validate(timeout)?;
        self.expiration_mode = ExpirationMode::Sliding;
        self.expiration_timeout = timeout;
        self.last_accessed_utc = SystemTime::now();
        self.uses_expiration_defaults = false;
        Ok(self)
    }

    /// Strip expiration: the item never expires by time.
    pub fn with_no_expiration(mut self) -> Self {
        self.expiration_mode = ExpirationMode::None;
        self.expiration_timeout = Duration::ZERO;
        self.uses_expiration_defaults = false;
        self
    }

    /// Revert to "inherit the enclosing handle's defaults".
    pub fn with_default_expiration(mut self) -> Self {
        self.expiration_mode = ExpirationMode::Default;
        self.expiration_timeout = Duration::ZERO;
        self.uses_expiration_defaults = true;
        self
    }

    /// Re-value a clone of this item, keeping key/region/expiration. Used by
    /// the update state machine to produce the committed next version.
    pub fn with_value(mut self, value: V) -> Self {
        self.value = value;
        self
    }
}
