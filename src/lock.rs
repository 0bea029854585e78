use {
    crate::store::{InsertOutcome, LeaseStore, StoreError},
    std::time::Duration,
    thiserror::Error,
    tracing::{info, trace},
};

#[derive(Debug, Error)]
pub enum LockError {
    ///
    /// The conditional write's owner precondition failed: the lease expired or
    /// was taken over. The handle's exclusivity guarantee is gone — the
    /// protected work may already be running under another owner. Always fatal
    /// to the current lease, never retried here.
    ///
    #[error("lock lease lost")]
    LeaseLost,

    ///
    /// The store call itself failed. For conditional writes the outcome is
    /// unknown: the request may have been applied. Resolve with a fresh
    /// [`LeaseLock::holder`] read before assuming either way.
    ///
    #[error(transparent)]
    Store(#[from] StoreError),
}

///
/// A distributed mutual-exclusion lease lock over a linearizable CAS store.
///
/// One handle represents one logical holder's claim on one resource. The
/// handle holds no mutable state — all truth lives in the store — so a single
/// acquire/renew/release sequence needs no synchronization, and any number of
/// handles (same or different owners) may operate on the same name
/// concurrently; the store serializes their conditional writes.
///
/// Renewal cadence is the caller's job: pick a renew period comfortably
/// shorter than `ttl` to absorb store latency. There is no background timer
/// here and no waiting on contended locks — [`LeaseLock::try_acquire`]
/// returning `false` is immediate.
///
/// After a [`LockError::LeaseLost`] from [`LeaseLock::renew`] or
/// [`LeaseLock::release`] the handle is spent: discard it and construct a
/// fresh one if the lock should be contended for again.
///
pub struct LeaseLock<S> {
    store: S,
    owner: String,
    name: String,
    ttl: Duration,
}

impl<S> LeaseLock<S> {
    pub fn new(store: S, owner: impl Into<String>, name: impl Into<String>, ttl: Duration) -> Self {
        Self {
            store,
            owner: owner.into(),
            name: name.into(),
            ttl,
        }
    }

    /// Lock owner identity, fixed at construction.
    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Lockable resource name, fixed at construction.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Lease lifetime granted on each successful write.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }
}

impl<S: LeaseStore> LeaseLock<S> {
    ///
    /// Try to acquire the lease with a single conditional insert.
    ///
    /// Returns `true` when the insert was applied, and also when the existing
    /// row already carries this handle's owner — a retried acquire whose
    /// earlier acknowledgment was lost is a success, not a conflict. Returns
    /// `false` when another owner holds the lease; contention is a normal
    /// result, not an error.
    ///
    pub async fn try_acquire(&self) -> Result<bool, LockError> {
        let outcome = self
            .store
            .insert_if_absent(&self.name, &self.owner, self.ttl)
            .await?;
        match outcome {
            InsertOutcome::Applied => {
                info!(
                    "acquired lease {} for owner {} (ttl {:?})",
                    self.name, self.owner, self.ttl
                );
                Ok(true)
            }
            InsertOutcome::Taken { holder } => {
                let ours = holder.as_deref() == Some(self.owner.as_str());
                trace!(
                    "lease {} already held by {:?}, re-acquire={ours}",
                    self.name,
                    holder
                );
                Ok(ours)
            }
        }
    }

    ///
    /// Extend the lease by `ttl` from now with a single conditional update.
    ///
    /// Fails with [`LockError::LeaseLost`] when the owner no longer matches —
    /// the lease expired, or someone else holds it now.
    ///
    pub async fn renew(&self) -> Result<(), LockError> {
        let applied = self
            .store
            .update_if_owner(&self.name, &self.owner, self.ttl)
            .await?;
        if applied {
            trace!("renewed lease {} for owner {}", self.name, self.owner);
            Ok(())
        } else {
            Err(LockError::LeaseLost)
        }
    }

    ///
    /// Release the lease with a single conditional delete.
    ///
    /// Fails with [`LockError::LeaseLost`] when the row is already gone or
    /// owned by someone else. Not idempotent: a second release after a
    /// successful first one fails this way, which callers should tolerate.
    ///
    pub async fn release(&self) -> Result<(), LockError> {
        let applied = self.store.delete_if_owner(&self.name, &self.owner).await?;
        if applied {
            info!("released lease {} for owner {}", self.name, self.owner);
            Ok(())
        } else {
            Err(LockError::LeaseLost)
        }
    }

    ///
    /// Linearizable read of the current holder, if any.
    ///
    /// Diagnostic, and the way to resolve an ambiguous store failure during
    /// [`LeaseLock::try_acquire`]: check whether the write landed before
    /// deciding the attempt failed.
    ///
    pub async fn holder(&self) -> Result<Option<String>, LockError> {
        let row = self.store.get(&self.name).await?;
        Ok(row.map(|row| row.owner))
    }
}
