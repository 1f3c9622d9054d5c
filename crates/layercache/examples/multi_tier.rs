//! Two-tier coordinator: a fast in-memory handle above a Redis handle.
//!
//! Run with a Redis instance reachable at `REDIS_URL` (defaults to
//! `redis://127.0.0.1:6379`).

use layercache::prelude::*;
use std::sync::Arc;

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    let redis_url =
        std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string());
    println!("Connecting to Redis at {redis_url}");

    let l2 = match RedisHandle::<String>::new(
        RedisConfig::new(&redis_url).prefix("layercache-example"),
        HandleConfiguration::new("l2").as_distributed().as_backplane_source(),
    )
    .await
    {
        Ok(handle) => handle,
        Err(e) => {
            eprintln!("Could not connect to Redis: {e}");
            return Ok(());
        }
    };

    let l1: Arc<dyn CacheHandle<String>> = Arc::new(MemoryHandle::new(
        HandleConfiguration::new("l1"),
        MemoryConfig::default(),
    ));
    let l2: Arc<dyn CacheHandle<String>> = Arc::new(l2);

    let coordinator = CoordinatorBuilder::new(CoordinatorConfiguration::new("multi-tier"))
        .with_handle(l1)
        .with_handle(l2)
        .build()?;

    println!("Setting tier_key...");
    coordinator
        .put(CacheItem::new("tier_key", "persistent_data".to_string())?)
        .await?;

    println!("Getting tier_key (served from L1, promoted from L2 on L1 miss)...");
    match coordinator.get("tier_key", None).await? {
        Some(value) => println!("Hit: {value}"),
        None => println!("Miss"),
    }

    for (i, stats) in coordinator.handle_stats().await.iter().enumerate() {
        println!("handle[{i}] stats: {stats:?}");
    }

    Ok(())
}
