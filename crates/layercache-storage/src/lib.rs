//! layercache-storage: handle implementations for layercache
//!
//! Each module implements `layercache_core::CacheHandle` for one concrete
//! backend; the coordinator in the `layercache` crate composes them.

#[cfg(feature = "memory")]
pub mod memory;

#[cfg(feature = "memory")]
pub use memory::{MemoryConfig, MemoryHandle};

#[cfg(feature = "redis")]
pub mod redis;

#[cfg(feature = "redis")]
pub use redis::{RedisConfig, RedisHandle};

#[cfg(feature = "redis")]
pub mod backplane;

#[cfg(feature = "redis")]
pub use backplane::RedisBackplane;

pub mod local_backplane;
pub use local_backplane::LocalBackplane;
