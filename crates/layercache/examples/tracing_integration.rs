//! Wiring a `TracingObserver` into a coordinator so every cache event shows
//! up as a structured log line.

use layercache::prelude::*;
use std::sync::Arc;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::TRACE)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    println!("Initialized tracing...");

    let handle: Arc<dyn CacheHandle<String>> = Arc::new(MemoryHandle::new(
        HandleConfiguration::new("l1"),
        MemoryConfig::default(),
    ));
    let observer = Arc::new(TracingObserver::new().with_coordinator_name("example-service"));
    let coordinator = CoordinatorBuilder::new(CoordinatorConfiguration::new("app"))
        .with_handle(handle)
        .with_observer(observer)
        .build()?;

    println!("\nSetting value...");
    coordinator
        .put(CacheItem::new("user:1", "Alice".to_string())?)
        .await?;

    println!("\nGetting value (hit)...");
    let val = coordinator.get("user:1", None).await?;
    println!("   Got: {val:?}");

    println!("\nGetting missing value (miss)...");
    let miss = coordinator.get("user:99", None).await?;
    println!("   Got: {miss:?}");

    println!("\nCheck your console output for structured logs!");

    Ok(())
}
