//! Test-only helpers (spec §9: "Scoped lock for test orchestration")
//!
//! Production code never takes a coordinator-wide lock (§5); these
//! primitives exist only so concurrency tests can serialize setup/assertion
//! phases around otherwise-racy shared-cache mutations.

use std::sync::Arc;
use tokio::sync::Mutex as AsyncMutex;

/// A mutual-exclusion primitive with both a synchronous (blocking) and a
/// suspendable acquisition surface, for orchestrating tests that mix
/// sync assertions with async coordinator calls.
#[derive(Clone, Default)]
pub struct ScopedLock {
    inner: Arc<AsyncMutex<()>>,
}

impl ScopedLock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Block the current thread until the lock is free, then hold it until
    /// the returned guard drops.
    pub fn acquire_blocking(&self) -> tokio::sync::OwnedMutexGuard<()> {
        self.inner.clone().blocking_lock_owned()
    }

    /// Suspend the calling task until the lock is free, then hold it until
    /// the returned guard drops.
    pub async fn acquire(&self) -> tokio::sync::OwnedMutexGuard<()> {
        self.inner.clone().lock_owned().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn acquire_blocking_hands_off_to_a_suspendable_waiter() {
        let lock = ScopedLock::new();
        let guard = lock.acquire_blocking();
        drop(guard);
        // A second blocking acquisition on the same (now free) lock must not
        // deadlock.
        let _guard = lock.acquire_blocking();
    }

    #[tokio::test]
    async fn acquire_serializes_two_holders() {
        let lock = ScopedLock::new();
        let order = Arc::new(tokio::sync::Mutex::new(Vec::new()));

        let guard = lock.acquire().await;
        let lock2 = lock.clone();
        let order2 = order.clone();
        let handle = tokio::spawn(async move {
            let _guard = lock2.acquire().await;
            order2.lock().await.push(2);
        });

        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        order.lock().await.push(1);
        drop(guard);
        handle.await.unwrap();

        assert_eq!(*order.lock().await, vec![1, 2]);
    }
}
