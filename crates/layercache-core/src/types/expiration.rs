//! Expiration mode and timeout validation

use crate::CacheError;
use std::time::Duration;

/// Expiration strategy for a [`CacheItem`](super::CacheItem).
///
/// `Default` means "inherit from the containing handle" (see
/// [`CacheItem::uses_expiration_defaults`](super::CacheItem::uses_expiration_defaults)).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExpirationMode {
    /// Never expires by time.
    None,
    /// Inherit the enclosing handle's configured default mode/timeout.
    Default,
    /// Expires `timeout` after creation (or after the last absolute
    /// re-expiration), regardless of access pattern.
    Absolute,
    /// Expires `timeout` after the last successful read; each read
    /// refreshes the window.
    Sliding,
}

impl ExpirationMode {
    /// Validate a `(mode, timeout)` pair per the invariants in the data
    /// model: `Absolute`/`Sliding` require a strictly positive timeout;
    /// `None`/`Default` accept any timeout (conventionally zero).
    pub fn validate(self, timeout: Duration) -> Result<(), CacheError> {
        match self {
            ExpirationMode::Absolute | ExpirationMode::Sliding if timeout.is_zero() => Err(
                CacheError::InvalidArgument(format!(
                    "{self:?} expiration requires a timeout > 0"
                )),
            ),
            _ => Ok(()),
        }
    }
}
