//! layercache: multi-tier cache coordinator for Rust
//!
//! # Features
//!
//! - **Ordered multi-handle coordination** (any number of tiers, not just
//!   L1/L2)
//! - **Atomic update protocol** with CAS retry, `add_or_update`, `get_or_add`
//! - **Cross-process invalidation** via a pluggable backplane
//! - **Expiration policies**: absolute, sliding, or none, with per-handle
//!   defaults
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use layercache::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
//!     let handle: std::sync::Arc<dyn CacheHandle<i32>> = std::sync::Arc::new(
//!         MemoryHandle::new(HandleConfiguration::new("l1"), MemoryConfig::default()),
//!     );
//!     let coordinator = CoordinatorBuilder::new(CoordinatorConfiguration::new("app"))
//!         .with_handle(handle)
//!         .build()?;
//!
//!     coordinator.add(CacheItem::new("key", 42)?).await?;
//!     match coordinator.get("key", None).await? {
//!         Some(value) => println!("Got: {value}"),
//!         None => println!("Cache miss"),
//!     }
//!
//!     Ok(())
//! }
//! ```

mod coordinator;

pub use coordinator::{Coordinator, CoordinatorBuilder};

// Re-export core
pub use layercache_core::*;

// Re-export storage
#[cfg(feature = "memory")]
pub use layercache_storage::{MemoryConfig, MemoryHandle};

#[cfg(feature = "redis")]
pub use layercache_storage::{RedisBackplane, RedisConfig, RedisHandle};

pub use layercache_storage::LocalBackplane;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::{
        BackplaneAction, BackplaneEvent, CacheError, CacheHandle, CacheItem, Coordinator,
        CoordinatorBuilder, CoordinatorConfiguration, CoordinatorObserver, ExpirationMode,
        HandleConfiguration, HandleStats, LocalBackplane, NoopObserver, Result, UpdateMode,
    };

    #[cfg(feature = "memory")]
    pub use crate::{MemoryConfig, MemoryHandle};

    #[cfg(feature = "redis")]
    pub use crate::{RedisBackplane, RedisConfig, RedisHandle};

    #[cfg(feature = "tracing")]
    pub use crate::TracingObserver;
}
