use {
    crate::store::{InsertOutcome, LeaseRow, LeaseStore, StoreError},
    async_trait::async_trait,
    std::{
        collections::HashMap,
        sync::{Arc, Mutex, MutexGuard},
        time::Duration,
    },
    tokio::time::Instant,
};

struct Entry {
    owner: String,
    deadline: Instant,
}

///
/// In-process [`LeaseStore`]: a mutex-guarded map with lazy TTL expiry.
///
/// Single-mutex serialization makes every operation trivially linearizable.
/// Expiry is enforced on entry to each operation by dropping a row whose
/// deadline has passed, measured on `tokio::time::Instant` — under a paused
/// tokio clock, `tokio::time::advance` drives expiry deterministically.
///
/// Cloning is cheap and clones share the same map.
///
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<HashMap<String, Entry>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lock the map and drop `name`'s row if its TTL has elapsed.
    fn lock_purged(&self, name: &str) -> MutexGuard<'_, HashMap<String, Entry>> {
        let mut map = self.inner.lock().expect("memory store mutex poisoned");
        let now = Instant::now();
        if matches!(map.get(name), Some(entry) if entry.deadline <= now) {
            map.remove(name);
        }
        map
    }
}

#[async_trait]
impl LeaseStore for MemoryStore {
    async fn insert_if_absent(
        &self,
        name: &str,
        owner: &str,
        ttl: Duration,
    ) -> Result<InsertOutcome, StoreError> {
        let mut map = self.lock_purged(name);
        match map.get(name) {
            Some(entry) => Ok(InsertOutcome::Taken {
                holder: Some(entry.owner.clone()),
            }),
            None => {
                map.insert(
                    name.to_string(),
                    Entry {
                        owner: owner.to_string(),
                        deadline: Instant::now() + ttl,
                    },
                );
                Ok(InsertOutcome::Applied)
            }
        }
    }

    async fn update_if_owner(
        &self,
        name: &str,
        owner: &str,
        ttl: Duration,
    ) -> Result<bool, StoreError> {
        let mut map = self.lock_purged(name);
        match map.get_mut(name) {
            Some(entry) if entry.owner == owner => {
                entry.deadline = Instant::now() + ttl;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn delete_if_owner(&self, name: &str, owner: &str) -> Result<bool, StoreError> {
        let mut map = self.lock_purged(name);
        match map.get(name) {
            Some(entry) if entry.owner == owner => {
                map.remove(name);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn get(&self, name: &str) -> Result<Option<LeaseRow>, StoreError> {
        let map = self.lock_purged(name);
        Ok(map.get(name).map(|entry| LeaseRow {
            owner: entry.owner.clone(),
        }))
    }
}
