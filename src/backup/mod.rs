use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::info;

use crate::config::registry::ConnectionRecord;
use crate::errors::StoreError;
use crate::gateway::KvGateway;
use crate::transfer::BulkOutcome;

// -----------------------------------------------------------------------------
// ----- Snapshot --------------------------------------------------------------

/// Portable export of one connection's key space at a point in time.
///
/// Values that parse as JSON are embedded structured; anything else is kept
/// as the raw string, so non-JSON payloads survive a round trip untouched.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub connection_name: String,
    pub connection_id: i64,
    pub export_time: DateTime<Utc>,
    pub data: BTreeMap<String, Value>,
}

// -----------------------------------------------------------------------------
// ----- BackupCodec -----------------------------------------------------------

/// Serializes a connection's key space into a snapshot and restores it.
pub struct BackupCodec {
    gateway: Arc<KvGateway>,
}

impl BackupCodec {
    pub fn new(gateway: Arc<KvGateway>) -> Self {
        Self { gateway }
    }

    /// Materializes every key under `prefix` into a snapshot.
    ///
    /// The whole range is held in memory; there is no pagination.
    pub async fn export(
        &self,
        conn: &ConnectionRecord,
        prefix: &str,
    ) -> Result<Snapshot, StoreError> {
        let raw = self.gateway.get_all(conn, prefix).await?;

        let data = raw
            .into_iter()
            .map(|(key, value)| (key, parse_value(&value)))
            .collect::<BTreeMap<_, _>>();

        info!(
            "exported {} keys from connection {} ({})",
            data.len(),
            conn.id,
            conn.name
        );

        Ok(Snapshot {
            connection_name: conn.name.clone(),
            connection_id: conn.id,
            export_time: Utc::now(),
            data,
        })
    }

    /// Restores snapshot entries into `conn`.
    ///
    /// With overwrite off, keys that already exist are recorded as skips.
    /// Write failures are counted per key and never abort the batch.
    pub async fn import(
        &self,
        conn: &ConnectionRecord,
        data: &BTreeMap<String, Value>,
        overwrite: bool,
    ) -> BulkOutcome {
        let mut outcome = BulkOutcome::default();

        for (key, value) in data {
            if !overwrite && self.gateway.get_value(conn, key).await.is_ok() {
                outcome.record_skip(format!("skipped existing key: {key}"));
                continue;
            }

            let raw = render_value(value);
            match self.gateway.set_value(conn, key, &raw).await {
                Ok(()) => outcome.record_success(format!("imported: {key}")),
                Err(err) => outcome.record_error(format!("failed to set key '{key}': {err}")),
            }
        }

        info!(
            "import into connection {}: {} ok, {} skipped, {} failed",
            conn.id, outcome.success_count, outcome.skipped_count, outcome.error_count
        );
        outcome
    }
}

// -----------------------------------------------------------------------------
// ----- Value codec -----------------------------------------------------------

/// Best-effort JSON detection at the snapshot boundary.
fn parse_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

/// Canonical string form for writing a snapshot value back to the store.
///
/// JSON strings render bare (no quotes) so a value that was exported as a
/// raw string is written back byte-identically; everything else serializes
/// as compact JSON.
fn render_value(value: &Value) -> String {
    match value {
        Value::String(raw) => raw.clone(),
        other => other.to_string(),
    }
}

// -----------------------------------------------------------------------------
// ----- Tests -----------------------------------------------------------------


// -----------------------------------------------------------------------------
// -----------------------------------------------------------------------------
