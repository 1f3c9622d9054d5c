//! Cross-process pub/sub transport

use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::{BackplaneAction, BackplaneEvent, CacheError};

/// Process-wide pub/sub channel carrying cross-process invalidations.
///
/// The coordinator publishes after a successful local write and never
/// relays events it received itself (no loopback).
#[async_trait]
pub trait Backplane: Send + Sync {
    async fn notify_change(
        &self,
        key: &str,
        region: Option<&str>,
        action: BackplaneAction,
    ) -> Result<(), CacheError>;

    async fn notify_remove(&self, key: &str, region: Option<&str>) -> Result<(), CacheError>;

    async fn notify_clear(&self) -> Result<(), CacheError>;

    async fn notify_clear_region(&self, region: &str) -> Result<(), CacheError>;

    /// Subscribe to inbound events (from other processes). Implementations
    /// must not deliver events published by `self` back to this
    /// subscription.
    fn subscribe(&self) -> broadcast::Receiver<BackplaneEvent>;
}
