use {
    crate::{
        retry::retry_etcd,
        store::{InsertOutcome, LeaseRow, LeaseStore, StoreError},
    },
    async_trait::async_trait,
    etcd_client::{Compare, CompareOp, PutOptions, Txn, TxnOp, TxnOpResponse},
    std::time::Duration,
    tracing::warn,
};

pub const DEFAULT_PREFIX: &str = "lock_leases/";

///
/// [`LeaseStore`] adapter over etcd.
///
/// Each conditional operation is one etcd transaction (compare + then/else
/// branch); etcd's MVCC makes the whole transaction atomic and linearizable,
/// so a failed insert returns the conflicting row from the same request.
/// TTLs map to etcd leases: every applied write binds the key to a freshly
/// granted lease of the requested lifetime, which also makes
/// [`LeaseStore::update_if_owner`] the TTL-reset operation.
///
/// The adapter is stateless between calls — no lease id is kept client-side.
/// A lease superseded by a renewal carries no keys and expires on its own.
///
#[derive(Clone)]
pub struct EtcdLeaseStore {
    etcd: etcd_client::Client,
    prefix: String,
}

impl EtcdLeaseStore {
    pub fn new(etcd: etcd_client::Client) -> Self {
        Self::with_prefix(etcd, DEFAULT_PREFIX)
    }

    pub fn with_prefix(etcd: etcd_client::Client, prefix: impl Into<String>) -> Self {
        Self {
            etcd,
            prefix: prefix.into(),
        }
    }

    fn key(&self, name: &str) -> String {
        format!("{}{name}", self.prefix)
    }

    async fn grant_lease(&self, ttl: Duration) -> Result<i64, StoreError> {
        // etcd rejects lease TTLs below one second.
        let ttl_secs = ttl.as_secs().max(1) as i64;
        let lease = retry_etcd(self.etcd.clone(), (ttl_secs,), |mut etcd, (ttl,)| {
            async move { etcd.lease_grant(ttl, None).await }
        })
        .await
        .map_err(StoreError::new)?;
        Ok(lease.id())
    }

    /// Best-effort revoke of a lease whose transaction branch did not apply.
    async fn revoke_unused(&self, lease_id: i64) {
        let mut etcd = self.etcd.clone();
        match etcd.lease_revoke(lease_id).await {
            Ok(_) => {}
            Err(etcd_client::Error::GRpcStatus(ref status))
                if status.code() == tonic::Code::NotFound => {}
            Err(e) => warn!("failed to revoke unused lease {lease_id}: {e}"),
        }
    }
}

fn encode_row(owner: &str) -> Result<Vec<u8>, StoreError> {
    serde_json::to_vec(&LeaseRow {
        owner: owner.to_string(),
    })
    .map_err(StoreError::new)
}

fn decode_owner(value: &[u8]) -> Option<String> {
    serde_json::from_slice::<LeaseRow>(value)
        .ok()
        .map(|row| row.owner)
}

#[async_trait]
impl LeaseStore for EtcdLeaseStore {
    async fn insert_if_absent(
        &self,
        name: &str,
        owner: &str,
        ttl: Duration,
    ) -> Result<InsertOutcome, StoreError> {
        let key = self.key(name);
        let value = encode_row(owner)?;
        let lease_id = self.grant_lease(ttl).await?;
        let txn = Txn::new()
            .when(vec![Compare::create_revision(
                key.clone(),
                CompareOp::Equal,
                0,
            )])
            .and_then(vec![TxnOp::put(
                key.clone(),
                value,
                Some(PutOptions::new().with_lease(lease_id)),
            )])
            .or_else(vec![TxnOp::get(key, None)]);
        // Issued exactly once; a transport failure here leaves the outcome
        // unknown and the caller resolves it with a fresh read. The granted
        // lease is orphaned in that case and expires on its own.
        let resp = self
            .etcd
            .kv_client()
            .txn(txn)
            .await
            .map_err(StoreError::new)?;
        if resp.succeeded() {
            Ok(InsertOutcome::Applied)
        } else {
            self.revoke_unused(lease_id).await;
            let holder = resp.op_responses().into_iter().find_map(|op| match op {
                TxnOpResponse::Get(get) => get.kvs().first().and_then(|kv| decode_owner(kv.value())),
                _ => None,
            });
            Ok(InsertOutcome::Taken { holder })
        }
    }

    async fn update_if_owner(
        &self,
        name: &str,
        owner: &str,
        ttl: Duration,
    ) -> Result<bool, StoreError> {
        let key = self.key(name);
        let value = encode_row(owner)?;
        let lease_id = self.grant_lease(ttl).await?;
        let txn = Txn::new()
            .when(vec![Compare::value(
                key.clone(),
                CompareOp::Equal,
                value.clone(),
            )])
            .and_then(vec![TxnOp::put(
                key,
                value,
                Some(PutOptions::new().with_lease(lease_id)),
            )]);
        let resp = self
            .etcd
            .kv_client()
            .txn(txn)
            .await
            .map_err(StoreError::new)?;
        if !resp.succeeded() {
            self.revoke_unused(lease_id).await;
        }
        Ok(resp.succeeded())
    }

    async fn delete_if_owner(&self, name: &str, owner: &str) -> Result<bool, StoreError> {
        let key = self.key(name);
        let value = encode_row(owner)?;
        let txn = Txn::new()
            .when(vec![Compare::value(key.clone(), CompareOp::Equal, value)])
            .and_then(vec![TxnOp::delete(key, None)]);
        let resp = self
            .etcd
            .kv_client()
            .txn(txn)
            .await
            .map_err(StoreError::new)?;
        Ok(resp.succeeded())
    }

    async fn get(&self, name: &str) -> Result<Option<LeaseRow>, StoreError> {
        let key = self.key(name);
        let resp = retry_etcd(self.etcd.clone(), (key,), |etcd, (key,)| async move {
            etcd.kv_client().get(key, None).await
        })
        .await
        .map_err(StoreError::new)?;
        match resp.kvs().first() {
            Some(kv) => {
                let row = serde_json::from_slice(kv.value()).map_err(StoreError::new)?;
                Ok(Some(row))
            }
            None => Ok(None),
        }
    }
}
