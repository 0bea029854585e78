use {
    async_trait::async_trait,
    serde::{Deserialize, Serialize},
    std::{error::Error, time::Duration},
    thiserror::Error,
};

///
/// The stored value for a lease key.
///
/// Adapters persist this row under the lease name; the `owner` field is the
/// identity every conditional write compares against.
///
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaseRow {
    pub owner: String,
}

///
/// Outcome of a conditional insert.
///
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertOutcome {
    /// No row existed, the insert was applied.
    Applied,
    /// A row already existed and the insert was rejected.
    ///
    /// `holder` is the owner of the conflicting row, read atomically with the
    /// failed compare where the backend supports it. A backend that has to
    /// issue a separate read after the failed write may observe the row gone
    /// already and report `None`.
    Taken { holder: Option<String> },
}

///
/// Error from the underlying store: transport failure, timeout, unavailability.
///
/// A `StoreError` returned from a conditional write means the outcome of that
/// write is *unknown* — the request may or may not have been applied. Callers
/// must not assume failure; [`crate::LeaseLock::holder`] gives a fresh
/// linearizable read to resolve the ambiguity.
///
#[derive(Debug, Error)]
#[error("lease store error: {0}")]
pub struct StoreError(#[source] Box<dyn Error + Send + Sync + 'static>);

impl StoreError {
    pub fn new(source: impl Error + Send + Sync + 'static) -> Self {
        Self(Box::new(source))
    }

    pub fn source_ref(&self) -> &(dyn Error + Send + Sync + 'static) {
        self.0.as_ref()
    }
}

///
/// A key/value store capable of linearizable conditional writes over single keys.
///
/// Every method must be linearizable across the whole replica set — the
/// equivalent of a synchronous quorum write observed through a serial read.
/// A store that cannot guarantee this breaks mutual exclusion entirely and
/// must not implement this trait.
///
/// TTLs are enforced by the store itself: a row whose TTL elapses without a
/// refreshing write disappears on its own. The lock core carries no expiry
/// clock of its own.
///
#[async_trait]
pub trait LeaseStore: Send + Sync {
    ///
    /// Create the row for `name` with `owner` and a lifetime of `ttl`, only if
    /// no row currently exists for `name`.
    ///
    async fn insert_if_absent(
        &self,
        name: &str,
        owner: &str,
        ttl: Duration,
    ) -> Result<InsertOutcome, StoreError>;

    ///
    /// Re-write the row's owner (value-wise a no-op) and reset its TTL to
    /// `ttl`, only if the current owner already equals `owner`.
    ///
    /// Returns the applied flag.
    ///
    async fn update_if_owner(
        &self,
        name: &str,
        owner: &str,
        ttl: Duration,
    ) -> Result<bool, StoreError>;

    ///
    /// Delete the row for `name`, only if its current owner equals `owner`.
    ///
    /// Returns the applied flag. An absent row fails the condition.
    ///
    async fn delete_if_owner(&self, name: &str, owner: &str) -> Result<bool, StoreError>;

    ///
    /// Linearizable read of the current row, for diagnostics and for resolving
    /// ambiguous conditional-write failures.
    ///
    async fn get(&self, name: &str) -> Result<Option<LeaseRow>, StoreError>;
}
