use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::config::registry::ConnectionRecord;
use crate::errors::StoreError;
use crate::store::pool::ClientPool;

// -----------------------------------------------------------------------------
// ----- Constants -------------------------------------------------------------

/// Deadline for single-key and keys-only operations.
const OP_TIMEOUT: Duration = Duration::from_secs(5);

/// Deadline for ranged reads that also fetch values; these can be large.
const RANGE_TIMEOUT: Duration = Duration::from_secs(10);

// -----------------------------------------------------------------------------
// ----- KvGateway -------------------------------------------------------------

/// Uniform store operations against any registered connection.
///
/// Every operation resolves a client through the pool first, so connection
/// errors surface before any store call is made, then runs under a bounded
/// deadline. The gateway performs no authorization; read-only enforcement is
/// the caller's job.
pub struct KvGateway {
    pool: Arc<ClientPool>,
    timeouts: GatewayTimeouts,
}

/// Per-call deadlines. Overridable so timeout behavior stays testable.
#[derive(Debug, Clone, Copy)]
pub struct GatewayTimeouts {
    pub op: Duration,
    pub range: Duration,
}

impl Default for GatewayTimeouts {
    fn default() -> Self {
        Self {
            op: OP_TIMEOUT,
            range: RANGE_TIMEOUT,
        }
    }
}

// -----------------------------------------------------------------------------
// ----- KvGateway: Public -----------------------------------------------------

impl KvGateway {
    pub fn new(pool: Arc<ClientPool>) -> Self {
        Self::with_timeouts(pool, GatewayTimeouts::default())
    }

    pub fn with_timeouts(pool: Arc<ClientPool>, timeouts: GatewayTimeouts) -> Self {
        Self { pool, timeouts }
    }

    pub fn pool(&self) -> &Arc<ClientPool> {
        &self.pool
    }

    /// Returns every key under `prefix`, values not fetched.
    pub async fn list_keys(
        &self,
        conn: &ConnectionRecord,
        prefix: &str,
    ) -> Result<Vec<String>, StoreError> {
        let client = self.pool.resolve(conn).await?;
        let records = self
            .bounded(self.timeouts.op, client.get_prefix(prefix, true))
            .await?;
        debug!(
            "listed {} keys under '{prefix}' on connection {}",
            records.len(),
            conn.id
        );
        Ok(records.into_iter().map(|record| record.key).collect())
    }

    /// Fetches the value stored under exactly `key`.
    pub async fn get_value(
        &self,
        conn: &ConnectionRecord,
        key: &str,
    ) -> Result<String, StoreError> {
        let client = self.pool.resolve(conn).await?;
        let value = self.bounded(self.timeouts.op, client.get(key)).await?;
        value.ok_or_else(|| StoreError::NotFound(key.to_string()))
    }

    /// Writes `value` under `key`. No read-only check happens here.
    pub async fn set_value(
        &self,
        conn: &ConnectionRecord,
        key: &str,
        value: &str,
    ) -> Result<(), StoreError> {
        let client = self.pool.resolve(conn).await?;
        self.bounded(self.timeouts.op, client.put(key, value)).await
    }

    /// Deletes `key`. Deleting an absent key succeeds.
    pub async fn delete_key(&self, conn: &ConnectionRecord, key: &str) -> Result<(), StoreError> {
        let client = self.pool.resolve(conn).await?;
        self.bounded(self.timeouts.op, client.delete(key)).await
    }

    /// Fetches keys and values under `prefix`.
    ///
    /// The whole range is materialized in memory; callers own any size
    /// limits.
    pub async fn get_all(
        &self,
        conn: &ConnectionRecord,
        prefix: &str,
    ) -> Result<BTreeMap<String, String>, StoreError> {
        let client = self.pool.resolve(conn).await?;
        let records = self
            .bounded(self.timeouts.range, client.get_prefix(prefix, false))
            .await?;
        Ok(records
            .into_iter()
            .map(|record| (record.key, record.value))
            .collect())
    }

    /// Resolves a client and re-probes status; used to validate endpoints
    /// and credentials before persisting a connection.
    pub async fn test_connection(&self, conn: &ConnectionRecord) -> Result<(), StoreError> {
        let client = self.pool.resolve(conn).await?;
        self.bounded(self.timeouts.op, client.status()).await
    }
}

// -----------------------------------------------------------------------------
// ----- KvGateway: Private ----------------------------------------------------

impl KvGateway {
    async fn bounded<T>(
        &self,
        limit: Duration,
        operation: impl Future<Output = Result<T, StoreError>>,
    ) -> Result<T, StoreError> {
        match tokio::time::timeout(limit, operation).await {
            Ok(result) => result,
            Err(_) => Err(StoreError::Timeout(limit)),
        }
    }
}

// -----------------------------------------------------------------------------
// -----------------------------------------------------------------------------
