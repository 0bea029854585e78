///
/// Store abstraction: the conditional-write (CAS) surface a lease lock needs.
///
pub mod store;

///
/// The lease lock protocol: acquire-if-absent, renew-if-owned, release-if-owned.
///
pub mod lock;

///
/// In-process reference store, used by the crate's own tests and as a local backend.
///
pub mod mem;

///
/// etcd-backed store adapter.
///
pub mod etcd;

///
/// Utility functions to manage various transient etcd errors.
pub mod retry;

pub use crate::{
    lock::{LeaseLock, LockError},
    store::{InsertOutcome, LeaseRow, LeaseStore, StoreError},
};
