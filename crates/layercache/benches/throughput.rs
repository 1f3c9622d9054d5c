//! Benchmarks for coordinator throughput

use criterion::{criterion_group, criterion_main, Criterion, Throughput};
use layercache::{CacheHandle, CacheItem, Coordinator, CoordinatorBuilder, CoordinatorConfiguration};
use layercache::{HandleConfiguration, MemoryConfig, MemoryHandle};
use std::hint::black_box;
use std::sync::Arc;
use tokio::runtime::Runtime;

fn create_coordinator() -> Coordinator<i32> {
    let handle: Arc<dyn CacheHandle<i32>> = Arc::new(MemoryHandle::new(
        HandleConfiguration::new("l1"),
        MemoryConfig::default(),
    ));
    CoordinatorBuilder::new(CoordinatorConfiguration::new("bench"))
        .with_handle(handle)
        .build()
        .unwrap()
}

fn bench_put(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let coordinator = create_coordinator();

    let mut group = c.benchmark_group("put");
    group.throughput(Throughput::Elements(1));

    group.bench_function("small_value", |b| {
        b.iter(|| {
            rt.block_on(async {
                coordinator
                    .put(CacheItem::new(black_box("key"), black_box(42i32)).unwrap())
                    .await
                    .unwrap();
            });
        });
    });

    group.finish();
}

fn bench_get(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let coordinator = create_coordinator();

    rt.block_on(async {
        coordinator
            .put(CacheItem::new("key", 42i32).unwrap())
            .await
            .unwrap();
    });

    let mut group = c.benchmark_group("get");
    group.throughput(Throughput::Elements(1));

    group.bench_function("hit", |b| {
        b.iter(|| {
            rt.block_on(async {
                let result = coordinator.get(black_box("key"), None).await.unwrap();
                black_box(result);
            });
        });
    });

    group.bench_function("miss", |b| {
        b.iter(|| {
            rt.block_on(async {
                let result = coordinator.get(black_box("nonexistent"), None).await.unwrap();
                black_box(result);
            });
        });
    });

    group.finish();
}

fn bench_mixed_workload(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let coordinator = create_coordinator();

    rt.block_on(async {
        for i in 0..100 {
            coordinator
                .put(CacheItem::new(format!("key:{i}"), i).unwrap())
                .await
                .unwrap();
        }
    });

    let mut group = c.benchmark_group("mixed");
    group.throughput(Throughput::Elements(100));

    group.bench_function("80_read_20_write", |b| {
        let mut i = 0u64;
        b.iter(|| {
            rt.block_on(async {
                for _ in 0..100 {
                    i = i.wrapping_add(1);
                    if i % 5 == 0 {
                        coordinator
                            .put(CacheItem::new(format!("key:{}", i % 100), i as i32).unwrap())
                            .await
                            .unwrap();
                    } else {
                        let _ = coordinator.get(&format!("key:{}", i % 100), None).await.unwrap();
                    }
                }
            });
        });
    });

    group.finish();
}

criterion_group!(benches, bench_put, bench_get, bench_mixed_workload);
criterion_main!(benches);
