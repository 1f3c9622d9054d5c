//! layercache-core: core traits and types for the layercache multi-tier
//! cache coordinator.
//!
//! This crate has no knowledge of any concrete handle implementation; it
//! defines the item/expiration/update-result data model and the
//! `CacheHandle`/`Backplane`/`CoordinatorObserver` contracts that
//! `layercache-storage` and `layercache` build on.

mod error;
mod traits;
mod types;

pub use error::{CacheError, Result};
pub use traits::*;
pub use types::*;
