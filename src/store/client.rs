use async_trait::async_trait;
use std::sync::Arc;

use crate::config::registry::ConnectionRecord;
use crate::errors::{ConnectionError, StoreError};
use crate::store::KeyValueRecord;

// -----------------------------------------------------------------------------
// ----- StoreClient -----------------------------------------------------------

/// A live client bound to one backend cluster.
///
/// This is the seam between the pool/gateway layers and the wire protocol:
/// everything above works against this trait, so tests run on an in-memory
/// implementation and production runs on the etcd bindings.
#[async_trait]
pub trait StoreClient: Send + Sync + std::fmt::Debug {
    /// Fetches the value stored under exactly `key`, if any.
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Fetches every record whose key starts with `prefix`.
    ///
    /// An empty prefix selects the whole keyspace. With `keys_only` the
    /// backend omits values and the returned records carry empty values.
    async fn get_prefix(
        &self,
        prefix: &str,
        keys_only: bool,
    ) -> Result<Vec<KeyValueRecord>, StoreError>;

    /// Writes `value` under `key`, replacing any existing value.
    async fn put(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Deletes `key`. Deleting an absent key is not an error at this layer.
    async fn delete(&self, key: &str) -> Result<(), StoreError>;

    /// Lightweight liveness probe against the cluster.
    async fn status(&self) -> Result<(), StoreError>;

    /// Releases any resources held by the client.
    async fn close(&self) {}
}

// -----------------------------------------------------------------------------
// ----- Dialer ----------------------------------------------------------------

/// Factory for store clients, injected into the pool.
#[async_trait]
pub trait Dialer: Send + Sync {
    /// Builds a client for `record` against the already-normalized
    /// `endpoints`. Credential or handshake failures surface as
    /// `ConnectionError::DialFailed`.
    async fn dial(
        &self,
        record: &ConnectionRecord,
        endpoints: &[String],
    ) -> Result<Arc<dyn StoreClient>, ConnectionError>;
}

// -----------------------------------------------------------------------------
// -----------------------------------------------------------------------------
