//! Configuration for the Redis handle and the Redis backplane transport

use std::time::Duration;

/// Connection and key-naming configuration shared by [`super::RedisHandle`]
/// and [`super::RedisBackplane`].
#[derive(Debug, Clone)]
pub struct RedisConfig {
    /// Redis connection URL (e.g., "redis://127.0.0.1:6379")
    pub url: String,

    /// Connection pool size
    pub pool_size: u32,

    /// Connection timeout
    pub connection_timeout: Duration,

    /// Prefix applied to every key this handle writes, so several
    /// coordinators can share one Redis instance.
    pub key_prefix: String,

    /// Pub/sub channel the backplane publishes/subscribes on.
    pub backplane_channel: String,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: "redis://127.0.0.1:6379".to_string(),
            pool_size: 10,
            connection_timeout: Duration::from_secs(5),
            key_prefix: "layercache".to_string(),
            backplane_channel: "layercache:backplane".to_string(),
        }
    }
}

impl RedisConfig {
    /// Create new config with URL
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    /// Set pool size
    pub fn pool_size(mut self, size: u32) -> Self {
        self.pool_size = size;
        self
    }

    /// Set key prefix
    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = prefix.into();
        self
    }

    /// Set the backplane pub/sub channel name
    pub fn backplane_channel(mut self, channel: impl Into<String>) -> Self {
        self.backplane_channel = channel.into();
        self
    }
}
