//! Redis pub/sub backplane transport
//!
//! Carries `BackplaneEvent`s across processes sharing one Redis instance.
//! Grounded on the same publish/subscribe shape as the in-process
//! `LocalBackplane`, but the channel is a real Redis `PUBLISH`/`SUBSCRIBE`
//! rather than a `tokio::sync::broadcast`.

use async_trait::async_trait;
use redis::AsyncCommands;
use tokio::sync::broadcast;
use tokio_stream::StreamExt;

use layercache_core::{Backplane, BackplaneAction, BackplaneEvent, CacheError};

use super::redis::RedisConfig;

fn backend_err(e: impl std::fmt::Display) -> CacheError {
    CacheError::TransientBackendFailure(e.to_string())
}

/// A backplane transport over Redis pub/sub. Every call to `subscribe`
/// opens its own dedicated pub/sub connection (Redis multiplexes a
/// connection entirely into subscriber mode), forwarding onto a local
/// broadcast channel so callers get the usual `Receiver` handle.
#[derive(Clone)]
pub struct RedisBackplane {
    client: redis::Client,
    channel: String,
}

impl RedisBackplane {
    pub fn new(config: &RedisConfig) -> Result<Self, CacheError> {
        let client = redis::Client::open(config.url.as_str()).map_err(backend_err)?;
        Ok(Self {
            client,
            channel: config.backplane_channel.clone(),
        })
    }

    async fn publish(&self, event: &BackplaneEvent) -> Result<(), CacheError> {
        let payload = serde_json::to_string(event)
            .map_err(|e| CacheError::InvalidArgument(e.to_string()))?;
        let mut conn = self
            .client
            .get_multiplexed_async_connection()
            .await
            .map_err(backend_err)?;
        let _: i64 = conn.publish(&self.channel, payload).await.map_err(backend_err)?;
        Ok(())
    }
}

#[async_trait]
impl Backplane for RedisBackplane {
    async fn notify_change(
        &self,
        key: &str,
        region: Option<&str>,
        action: BackplaneAction,
    ) -> Result<(), CacheError> {
        self.publish(&BackplaneEvent::Change {
            key: key.to_string(),
            region: region.map(str::to_string),
            action,
        })
        .await
    }

    async fn notify_remove(&self, key: &str, region: Option<&str>) -> Result<(), CacheError> {
        self.publish(&BackplaneEvent::Remove {
            key: key.to_string(),
            region: region.map(str::to_string),
        })
        .await
    }

    async fn notify_clear(&self) -> Result<(), CacheError> {
        self.publish(&BackplaneEvent::Clear).await
    }

    async fn notify_clear_region(&self, region: &str) -> Result<(), CacheError> {
        self.publish(&BackplaneEvent::ClearRegion {
            region: region.to_string(),
        })
        .await
    }

    fn subscribe(&self) -> broadcast::Receiver<BackplaneEvent> {
        let (tx, rx) = broadcast::channel(256);
        let client = self.client.clone();
        let channel = self.channel.clone();

        tokio::spawn(async move {
            let mut pubsub = match client.get_async_pubsub().await {
                Ok(p) => p,
                Err(_) => return,
            };
            if pubsub.subscribe(&channel).await.is_err() {
                return;
            }
            let mut stream = pubsub.on_message();
            while let Some(msg) = stream.next().await {
                let Ok(payload) = msg.get_payload::<String>() else {
                    continue;
                };
                let Ok(event) = serde_json::from_str::<BackplaneEvent>(&payload) else {
                    continue;
                };
                if tx.send(event).is_err() {
                    break;
                }
            }
        });

        rx
    }
}
