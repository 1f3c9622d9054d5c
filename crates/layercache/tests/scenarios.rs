//! End-to-end scenarios from the coordinator design (promotion, eviction,
//! expiration, backplane fan-out, factory-once `get_or_add`), exercised
//! against real `MemoryHandle`s and a real `LocalBackplane` — no mocked
//! coordinator internals.

mod support;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use layercache::{Coordinator, CoordinatorBuilder};
use layercache_core::{
    CacheHandle, CacheItem, CoordinatorConfiguration, ExpirationMode, HandleConfiguration,
    UpdateMode,
};
use layercache_storage::{LocalBackplane, MemoryConfig, MemoryHandle};

fn memory_handle(name: &str) -> Arc<dyn CacheHandle<String>> {
    Arc::new(MemoryHandle::<String>::new(
        HandleConfiguration::new(name),
        MemoryConfig::unlimited(),
    ))
}

fn two_tier_up(name: &str) -> Coordinator<String> {
    CoordinatorBuilder::new(
        CoordinatorConfiguration::new(name).with_update_mode(UpdateMode::Up),
    )
    .with_handle(memory_handle("h1"))
    .with_handle(memory_handle("h2"))
    .build()
    .unwrap()
}

/// Scenario 1: two in-memory handles, `update_mode = Up`.
#[tokio::test]
async fn scenario_add_promotes_then_evicts_on_remove() {
    let coordinator = two_tier_up("scenario1");

    assert!(coordinator
        .add(CacheItem::new("k", "v".to_string()).unwrap())
        .await
        .unwrap());

    // add() writes the bottom handle and evicts everywhere else.
    let stats = coordinator.handle_stats().await;
    assert_eq!(stats[0].items, 0, "top handle must not hold the item yet");
    assert_eq!(stats[1].items, 1, "bottom handle holds the authoritative copy");

    assert_eq!(coordinator.get("k", None).await.unwrap(), Some("v".to_string()));
    let stats = coordinator.handle_stats().await;
    assert_eq!(stats[0].items, 1, "a read hit promotes into the top handle");

    assert!(coordinator.remove("k", None).await.unwrap());
    assert_eq!(coordinator.get("k", None).await.unwrap(), None);
}

/// Scenario 2: `add` then `update`, verifying the evict-from-other-handles
/// step of the update state machine under `UpdateMode::Up`.
#[tokio::test]
async fn scenario_update_evicts_upper_handles() {
    let coordinator = two_tier_up("scenario2");
    coordinator
        .add(CacheItem::new("k", "a".to_string()).unwrap())
        .await
        .unwrap();
    coordinator.get("k", None).await.unwrap(); // promote into h1

    let updated = coordinator
        .update("k", None, |v| Some(format!("{v}b")), 3)
        .await
        .unwrap();
    assert_eq!(updated, "ab");
    assert_eq!(coordinator.get("k", None).await.unwrap(), Some("ab".to_string()));

    let stats = coordinator.handle_stats().await;
    assert_eq!(stats[0].items, 1, "h1 repopulated by the subsequent get");
}

/// Scenario 3: each handle's default expiration applies independently.
#[tokio::test]
async fn scenario_put_applies_per_handle_defaults() {
    let fast = Arc::new(MemoryHandle::<String>::new(
        HandleConfiguration::new("fast")
            .with_default_expiration(ExpirationMode::Absolute, Duration::from_secs(10)),
        MemoryConfig::unlimited(),
    ));
    let slow = Arc::new(MemoryHandle::<String>::new(
        HandleConfiguration::new("slow")
            .with_default_expiration(ExpirationMode::Sliding, Duration::from_secs(864_000)),
        MemoryConfig::unlimited(),
    ));

    let coordinator: Coordinator<String> = CoordinatorBuilder::new(CoordinatorConfiguration::new("scenario3"))
        .with_handle(fast.clone())
        .with_handle(slow.clone())
        .build()
        .unwrap();

    coordinator
        .put(CacheItem::new("k", "v".to_string()).unwrap())
        .await
        .unwrap();

    let fast_item = fast.get_item("k", None).await.unwrap().unwrap();
    assert_eq!(fast_item.expiration_mode(), ExpirationMode::Absolute);
    assert_eq!(fast_item.expiration_timeout(), Duration::from_secs(10));

    let slow_item = slow.get_item("k", None).await.unwrap().unwrap();
    assert_eq!(slow_item.expiration_mode(), ExpirationMode::Sliding);
    assert_eq!(slow_item.expiration_timeout(), Duration::from_secs(864_000));
}

/// Scenario 4: two coordinators sharing a backplane, each with a single
/// in-memory handle acting as the backplane source. Per §4.7, a `Remove`
/// applies to `sync_including_source`, so a non-distributed source also
/// re-applies the change locally; here it's a `Change(Put)`, which applies
/// to `sync_excluding_source` only — the peer's own source handle drops its
/// (now stale) copy, not the process that made the write.
#[tokio::test]
async fn scenario_backplane_fans_out_put_to_peer() {
    let bus = LocalBackplane::new(64);

    let p1_handle: Arc<dyn CacheHandle<String>> = Arc::new(MemoryHandle::<String>::new(
        HandleConfiguration::new("p1").as_backplane_source(),
        MemoryConfig::unlimited(),
    ));
    let p1: Coordinator<String> = CoordinatorBuilder::new(CoordinatorConfiguration::new("p1"))
        .with_handle(p1_handle)
        .with_backplane(Arc::new(bus.clone()))
        .build()
        .unwrap();

    let p2_handle: Arc<dyn CacheHandle<String>> = Arc::new(MemoryHandle::<String>::new(
        HandleConfiguration::new("p2").as_backplane_source(),
        MemoryConfig::unlimited(),
    ));
    let p2: Coordinator<String> = CoordinatorBuilder::new(CoordinatorConfiguration::new("p2"))
        .with_handle(p2_handle)
        .with_backplane(Arc::new(bus.fork()))
        .build()
        .unwrap();

    p2.put(CacheItem::new("k", "v1".to_string()).unwrap())
        .await
        .unwrap();
    assert_eq!(p2.get("k", None).await.unwrap(), Some("v1".to_string()));

    // Give the background reconciliation task a chance to run.
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(
        p1.get("k", None).await.unwrap(),
        None,
        "p1's single handle (the backplane source) must drop its stale copy"
    );
}

/// Scenario 5: concurrent `get_or_add` callers racing on an absent key. The
/// factory fires at most once per caller even though the inner `add` may
/// lose the race against a sibling.
#[tokio::test]
async fn scenario_get_or_add_factory_once_under_contention() {
    let handle = memory_handle("h1");
    let coordinator: Coordinator<String> = CoordinatorBuilder::new(CoordinatorConfiguration::new("scenario5"))
        .with_handle(handle)
        .build()
        .unwrap();

    let invocations = Arc::new(AtomicUsize::new(0));
    let mut tasks = Vec::new();
    for _ in 0..6 {
        let coordinator = coordinator.clone();
        let invocations = invocations.clone();
        tasks.push(tokio::spawn(async move {
            coordinator
                .get_or_add(
                    "k",
                    None,
                    move || {
                        invocations.fetch_add(1, Ordering::SeqCst);
                        Some("v".to_string())
                    },
                    5,
                )
                .await
        }));
    }

    for task in tasks {
        assert_eq!(task.await.unwrap().unwrap(), "v");
    }
    assert!(
        invocations.load(Ordering::SeqCst) <= 6,
        "factory must not be invoked more than once per caller"
    );
}

/// Scenario 6: `update` on an absent key with `max_retries = 0` fails loudly
/// on the strict variant, and returns `(false, None)` on the try-variant.
#[tokio::test]
async fn scenario_update_on_absent_key_fails() {
    let coordinator: Coordinator<String> = CoordinatorBuilder::new(CoordinatorConfiguration::new("scenario6"))
        .with_handle(memory_handle("h1"))
        .build()
        .unwrap();

    let err = coordinator
        .update("k", None, |v: &String| Some(v.clone()), 0)
        .await
        .unwrap_err();
    assert!(matches!(err, layercache_core::CacheError::InvalidState(_)));

    let (ok, value) = coordinator
        .try_update("k", None, |v: &String| Some(v.clone()), 0)
        .await
        .unwrap();
    assert!(!ok);
    assert!(value.is_none());
}

/// Region isolation and case sensitivity (spec §8 universal invariants).
#[tokio::test]
async fn region_isolation_and_case_sensitivity() {
    let coordinator: Coordinator<String> =
        CoordinatorBuilder::new(CoordinatorConfiguration::new("regions"))
            .with_handle(memory_handle("h1"))
            .build()
            .unwrap();

    coordinator
        .add(CacheItem::with_region("k", Some("r"), "scoped".to_string()).unwrap())
        .await
        .unwrap();
    assert_eq!(coordinator.get("k", Some("r")).await.unwrap(), Some("scoped".to_string()));
    assert_eq!(coordinator.get("k", None).await.unwrap(), None);

    coordinator
        .add(CacheItem::new("K", "upper".to_string()).unwrap())
        .await
        .unwrap();
    assert_eq!(coordinator.get("K", None).await.unwrap(), Some("upper".to_string()));
    assert_eq!(coordinator.get("k", None).await.unwrap(), None);
}

/// Expiration round-trip: `expire` then `remove_expiration` restores
/// `(None, 0)` and the item never expires by time again.
#[tokio::test]
async fn expire_then_remove_expiration_restores_permanence() {
    let coordinator: Coordinator<String> =
        CoordinatorBuilder::new(CoordinatorConfiguration::new("expiry"))
            .with_handle(memory_handle("h1"))
            .build()
            .unwrap();

    coordinator
        .add(CacheItem::new("k", "v".to_string()).unwrap())
        .await
        .unwrap();
    coordinator
        .expire("k", None, ExpirationMode::Absolute, Duration::from_millis(5))
        .await
        .unwrap();

    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(coordinator.get("k", None).await.unwrap(), None);

    coordinator
        .add(CacheItem::new("k", "v2".to_string()).unwrap())
        .await
        .unwrap();
    coordinator
        .expire("k", None, ExpirationMode::Absolute, Duration::from_millis(5))
        .await
        .unwrap();
    coordinator.remove_expiration("k", None).await.unwrap();

    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(coordinator.get("k", None).await.unwrap(), Some("v2".to_string()));
}

/// Scoped-lock-serialized orchestration (spec §9 design note): a global test
/// lock guards a shared coordinator across two "sessions" that must not
/// interleave their add/remove phases.
#[tokio::test]
async fn scoped_lock_serializes_shared_coordinator_sessions() {
    let coordinator: Coordinator<String> =
        CoordinatorBuilder::new(CoordinatorConfiguration::new("scoped-lock"))
            .with_handle(memory_handle("h1"))
            .build()
            .unwrap();
    let lock = support::ScopedLock::new();

    {
        let _guard = lock.acquire().await;
        coordinator
            .add(CacheItem::new("k", "v".to_string()).unwrap())
            .await
            .unwrap();
        assert_eq!(coordinator.get("k", None).await.unwrap(), Some("v".to_string()));
    }

    {
        let _guard = lock.acquire().await;
        assert!(coordinator.remove("k", None).await.unwrap());
    }
}
