use std::time::Duration;

use cas_lease_lock::{mem::MemoryStore, LeaseLock, LockError};
use common::random_str;
mod common;

const TTL: Duration = Duration::from_secs(10);

#[tokio::test]
async fn acquire_free_lock() {
    let store = MemoryStore::new();
    let lock = LeaseLock::new(store, "owner-a", random_str(10), TTL);
    assert!(lock.try_acquire().await.expect("store failure"));
    assert_eq!(lock.holder().await.unwrap().as_deref(), Some("owner-a"));
}

#[tokio::test]
async fn reacquire_is_idempotent_for_same_owner() {
    let store = MemoryStore::new();
    let lock = LeaseLock::new(store, "owner-a", random_str(10), TTL);
    assert!(lock.try_acquire().await.unwrap());
    // A retried acquire after a lost acknowledgment must still report success.
    assert!(lock.try_acquire().await.unwrap());
    assert!(lock.try_acquire().await.unwrap());
}

#[tokio::test]
async fn acquire_held_lock_returns_false() {
    let store = MemoryStore::new();
    let name = random_str(10);
    let lock_a = LeaseLock::new(store.clone(), "owner-a", name.as_str(), TTL);
    let lock_b = LeaseLock::new(store, "owner-b", name, TTL);
    assert!(lock_a.try_acquire().await.unwrap());
    assert!(!lock_b.try_acquire().await.unwrap());
}

#[tokio::test]
async fn release_removes_the_row_completely() {
    let store = MemoryStore::new();
    let name = random_str(10);
    let lock_a = LeaseLock::new(store.clone(), "owner-a", name.as_str(), TTL);
    assert!(lock_a.try_acquire().await.unwrap());
    lock_a.release().await.expect("release should succeed");
    assert_eq!(lock_a.holder().await.unwrap(), None);

    let lock_b = LeaseLock::new(store, "owner-b", name, TTL);
    assert!(lock_b.try_acquire().await.unwrap());
}

#[tokio::test]
async fn renew_by_holder_succeeds() {
    let store = MemoryStore::new();
    let lock = LeaseLock::new(store, "owner-a", random_str(10), TTL);
    assert!(lock.try_acquire().await.unwrap());
    lock.renew().await.expect("holder renew should succeed");
}

#[tokio::test]
async fn renew_by_non_holder_fails_with_lease_lost() {
    let store = MemoryStore::new();
    let name = random_str(10);
    let lock_a = LeaseLock::new(store.clone(), "owner-a", name.as_str(), TTL);
    let lock_b = LeaseLock::new(store, "owner-b", name, TTL);
    assert!(lock_a.try_acquire().await.unwrap());
    let result = lock_b.renew().await;
    assert!(matches!(result, Err(LockError::LeaseLost)));
}

#[tokio::test]
async fn renew_on_never_held_lock_fails_with_lease_lost() {
    let store = MemoryStore::new();
    let lock = LeaseLock::new(store, "owner-a", random_str(10), TTL);
    assert!(matches!(lock.renew().await, Err(LockError::LeaseLost)));
}

#[tokio::test]
async fn double_release_fails_the_second_time() {
    let store = MemoryStore::new();
    let lock = LeaseLock::new(store, "owner-a", random_str(10), TTL);
    assert!(lock.try_acquire().await.unwrap());
    lock.release().await.expect("first release should succeed");
    let second = lock.release().await;
    assert!(matches!(second, Err(LockError::LeaseLost)));
}

#[tokio::test]
async fn full_handoff_scenario() {
    let store = MemoryStore::new();
    let lock_a = LeaseLock::new(store.clone(), "A", "job-1", TTL);
    let lock_b = LeaseLock::new(store, "B", "job-1", TTL);

    assert!(lock_a.try_acquire().await.unwrap());
    assert!(!lock_b.try_acquire().await.unwrap());
    lock_a.renew().await.expect("A still holds the lease");
    lock_a.release().await.expect("A releases cleanly");
    assert!(lock_b.try_acquire().await.unwrap());
}

#[tokio::test(start_paused = true)]
async fn expiry_frees_the_row_without_release() {
    let store = MemoryStore::new();
    let lock = LeaseLock::new(store, "owner-a", random_str(10), TTL);
    assert!(lock.try_acquire().await.unwrap());

    tokio::time::advance(TTL + Duration::from_secs(1)).await;
    assert_eq!(lock.holder().await.unwrap(), None);
}

#[tokio::test(start_paused = true)]
async fn takeover_after_expiry_kills_the_stale_handle() {
    let store = MemoryStore::new();
    let lock_a = LeaseLock::new(store.clone(), "A", "job-2", TTL);
    let lock_b = LeaseLock::new(store, "B", "job-2", TTL);

    assert!(lock_a.try_acquire().await.unwrap());
    tokio::time::advance(TTL + Duration::from_secs(1)).await;

    assert!(lock_b.try_acquire().await.unwrap());
    assert!(matches!(lock_a.renew().await, Err(LockError::LeaseLost)));
    assert!(matches!(lock_a.release().await, Err(LockError::LeaseLost)));
    assert_eq!(lock_b.holder().await.unwrap().as_deref(), Some("B"));
}

#[tokio::test(start_paused = true)]
async fn renew_extends_the_lease_past_its_original_expiry() {
    let store = MemoryStore::new();
    let name = random_str(10);
    let lock_a = LeaseLock::new(store.clone(), "owner-a", name.as_str(), TTL);
    let lock_b = LeaseLock::new(store, "owner-b", name, TTL);

    assert!(lock_a.try_acquire().await.unwrap());
    tokio::time::advance(Duration::from_secs(6)).await;
    lock_a.renew().await.expect("renew within ttl");

    // Past the original deadline but within the renewed one.
    tokio::time::advance(Duration::from_secs(6)).await;
    assert!(!lock_b.try_acquire().await.unwrap());
    lock_a.renew().await.expect("still held after renewal");
}
