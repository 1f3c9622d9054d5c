//! In-process backplane transport
//!
//! Carries `BackplaneEvent`s between coordinators sharing one process (a
//! single binary running several coordinator instances, or tests). Every
//! clone of a `LocalBackplane` shares the same underlying broadcast channel
//! but carries a distinct source id, so a coordinator never reconciles
//! against the events it itself published.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use layercache_core::{Backplane, BackplaneAction, BackplaneEvent, CacheError};
use tokio::sync::broadcast;

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Clone)]
pub struct LocalBackplane {
    id: u64,
    tx: Arc<broadcast::Sender<(u64, BackplaneEvent)>>,
}

impl LocalBackplane {
    /// Create a new, independent bus with room for `capacity` buffered
    /// events per subscriber.
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity);
        Self {
            id: NEXT_ID.fetch_add(1, Ordering::Relaxed),
            tx: Arc::new(tx),
        }
    }

    /// A handle to the SAME bus with a fresh source id, as if it were a
    /// second process attached to the same backplane.
    pub fn fork(&self) -> Self {
        Self {
            id: NEXT_ID.fetch_add(1, Ordering::Relaxed),
            tx: self.tx.clone(),
        }
    }

    fn publish(&self, event: BackplaneEvent) {
        // No subscribers is not an error: a coordinator running solo still
        // publishes so that peers attaching later see subsequent writes.
        let _ = self.tx.send((self.id, event));
    }
}

#[async_trait]
impl Backplane for LocalBackplane {
    async fn notify_change(
        &self,
        key: &str,
        region: Option<&str>,
        action: BackplaneAction,
    ) -> Result<(), CacheError> {
        self.publish(BackplaneEvent::Change {
            key: key.to_string(),
            region: region.map(str::to_string),
            action,
        });
        Ok(())
    }

    async fn notify_remove(&self, key: &str, region: Option<&str>) -> Result<(), CacheError> {
        self.publish(BackplaneEvent::Remove {
            key: key.to_string(),
            region: region.map(str::to_string),
        });
        Ok(())
    }

    async fn notify_clear(&self) -> Result<(), CacheError> {
        self.publish(BackplaneEvent::Clear);
        Ok(())
    }

    async fn notify_clear_region(&self, region: &str) -> Result<(), CacheError> {
        self.publish(BackplaneEvent::ClearRegion {
            region: region.to_string(),
        });
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<BackplaneEvent> {
        let mut inbound = self.tx.subscribe();
        let (outbound_tx, outbound_rx) = broadcast::channel(inbound.len().max(64));
        let self_id = self.id;

        tokio::spawn(async move {
            loop {
                match inbound.recv().await {
                    Ok((source_id, event)) => {
                        if source_id != self_id {
                            let _ = outbound_tx.send(event);
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });

        outbound_rx
    }
}

impl Default for LocalBackplane {
    fn default() -> Self {
        Self::new(256)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn does_not_echo_own_events() {
        let bus = LocalBackplane::new(16);
        let mut rx = bus.subscribe();
        bus.notify_clear().await.unwrap();

        tokio::time::timeout(std::time::Duration::from_millis(50), rx.recv())
            .await
            .expect_err("own event must not be delivered back");
    }

    #[tokio::test]
    async fn forked_peer_sees_events() {
        let bus = LocalBackplane::new(16);
        let peer = bus.fork();
        let mut rx = peer.subscribe();

        bus.notify_remove("k", None).await.unwrap();

        let event = rx.recv().await.unwrap();
        assert_eq!(
            event,
            BackplaneEvent::Remove {
                key: "k".to_string(),
                region: None
            }
        );
    }
}
