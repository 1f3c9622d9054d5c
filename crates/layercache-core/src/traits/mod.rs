//! Core traits for coordinator and handle operations

mod backplane;
mod handle;
mod observer;
mod serializer;

pub use backplane::Backplane;
pub use handle::{CacheHandle, HandleRemoveEvent, RegionEnumerableHandle, UpdateFn};
pub use observer::{CoordinatorObserver, NoopObserver};
pub use serializer::{JsonSerializer, Serializer};

#[cfg(feature = "tracing")]
mod tracing_observer;
#[cfg(feature = "tracing")]
pub use tracing_observer::TracingObserver;
