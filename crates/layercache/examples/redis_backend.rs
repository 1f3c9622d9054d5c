//! Single Redis-backed handle, used directly without a memory tier.

use layercache::prelude::*;
use std::sync::Arc;

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    let redis_url =
        std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string());
    println!("Connecting to Redis at {redis_url}");

    let config = RedisConfig::new(redis_url).pool_size(5).prefix("example");

    match RedisHandle::<String>::new(config, HandleConfiguration::new("redis")).await {
        Ok(handle) => {
            let handle: Arc<dyn CacheHandle<String>> = Arc::new(handle);
            let coordinator = CoordinatorBuilder::new(CoordinatorConfiguration::new("app"))
                .with_handle(handle)
                .build()?;

            coordinator
                .put(CacheItem::with_region("hello", None::<String>, "world".to_string())?)
                .await?;

            match coordinator.get("hello", None).await? {
                Some(value) => println!("Hit: {value}"),
                None => println!("Miss"),
            }
        }
        Err(e) => {
            eprintln!("Failed to connect to Redis: {e}");
            println!("Make sure Redis is running at 127.0.0.1:6379 or set REDIS_URL");
        }
    }

    Ok(())
}
