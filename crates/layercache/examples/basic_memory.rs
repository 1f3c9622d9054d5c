//! Basic example: a single in-memory handle behind a coordinator.

use layercache::prelude::*;
use std::sync::Arc;

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    println!("=== layercache basic example ===\n");

    let handle: Arc<dyn CacheHandle<String>> = Arc::new(MemoryHandle::new(
        HandleConfiguration::new("l1"),
        MemoryConfig::default(),
    ));
    let coordinator = CoordinatorBuilder::new(CoordinatorConfiguration::new("app"))
        .with_handle(handle)
        .build()?;

    println!("Adding user:123...");
    coordinator
        .add(CacheItem::new("user:123", "Alice <alice@example.com>".to_string())?)
        .await?;

    match coordinator.get("user:123", None).await? {
        Some(value) => println!("Cache HIT: {value}"),
        None => println!("Cache MISS"),
    }

    println!("\nExists check: {}", coordinator.exists("user:123", None).await?);

    let stats = coordinator.aggregate_stats().await;
    println!("\nStatistics:");
    println!("  hits: {}", stats.hits);
    println!("  misses: {}", stats.misses);
    println!("  hit ratio: {:.2}%", stats.hit_ratio() * 100.0);

    println!("\nRemoving user:123...");
    let removed = coordinator.remove("user:123", None).await?;
    println!("  removed: {removed}");
    println!("  exists after remove: {}", coordinator.exists("user:123", None).await?);

    Ok(())
}
