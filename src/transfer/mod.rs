mod outcome;

pub use outcome::BulkOutcome;

use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, info};

use crate::config::registry::ConnectionRecord;
use crate::errors::TransferError;
use crate::gateway::KvGateway;

// -----------------------------------------------------------------------------
// ----- TransferRequest -------------------------------------------------------

/// Parameters for a bulk cross-connection copy.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct TransferRequest {
    /// Explicit keys to move. When non-empty, `prefix` is ignored.
    #[serde(default)]
    pub keys: Vec<String>,
    /// Prefix filter for the source listing; empty selects all keys.
    #[serde(default)]
    pub prefix: String,
    /// Overwrite keys that already exist on the target.
    #[serde(default)]
    pub overwrite: bool,
    /// Rewrite leading key prefixes while copying.
    #[serde(default)]
    pub key_mapping: bool,
    #[serde(default)]
    pub source_prefix: String,
    #[serde(default)]
    pub target_prefix: String,
}

// -----------------------------------------------------------------------------
// ----- TransferEngine --------------------------------------------------------

/// Bulk data movement between two registered connections.
pub struct TransferEngine {
    gateway: Arc<KvGateway>,
}

impl TransferEngine {
    pub fn new(gateway: Arc<KvGateway>) -> Self {
        Self { gateway }
    }

    /// Copies keys from `source` to `target` per `request`.
    ///
    /// Only two failures abort the whole run: source and target being the
    /// same connection, and a failed source listing. Everything after that
    /// is per-key and lands in the outcome.
    pub async fn transfer(
        &self,
        source: &ConnectionRecord,
        target: &ConnectionRecord,
        request: &TransferRequest,
    ) -> Result<BulkOutcome, TransferError> {
        if source.id == target.id {
            return Err(TransferError::SameConnection);
        }

        let keys = if !request.keys.is_empty() {
            request.keys.clone()
        } else {
            let effective = if request.key_mapping && !request.source_prefix.is_empty() {
                request.source_prefix.as_str()
            } else {
                request.prefix.as_str()
            };
            self.gateway
                .list_keys(source, effective)
                .await
                .map_err(TransferError::ListFailed)?
        };

        debug!(
            "transferring {} keys from connection {} to {}",
            keys.len(),
            source.id,
            target.id
        );

        let mut outcome = BulkOutcome::default();

        for key in &keys {
            let value = match self.gateway.get_value(source, key).await {
                Ok(value) => value,
                Err(err) => {
                    outcome.record_error(format!("failed to get key '{key}' from source: {err}"));
                    continue;
                }
            };

            let target_key = remap_key(key, request);

            if !request.overwrite && self.gateway.get_value(target, &target_key).await.is_ok() {
                outcome.record_skip(format!("skipped existing key: {target_key}"));
                continue;
            }

            match self.gateway.set_value(target, &target_key, &value).await {
                Ok(()) => {
                    outcome.record_success(format!("transferred: {key} -> {target_key}"));
                }
                Err(err) => {
                    outcome
                        .record_error(format!("failed to set key '{target_key}' on target: {err}"));
                }
            }
        }

        info!(
            "transfer {} -> {}: {} ok, {} skipped, {} failed",
            source.id, target.id, outcome.success_count, outcome.skipped_count, outcome.error_count
        );
        Ok(outcome)
    }

    /// Copies exactly one key, returning the copied value.
    ///
    /// Unlike the bulk path, an existing target key is a hard conflict
    /// (`TargetExists`) rather than a counted skip, and no write happens.
    pub async fn copy_key(
        &self,
        source: &ConnectionRecord,
        target: &ConnectionRecord,
        source_key: &str,
        target_key: &str,
        overwrite: bool,
    ) -> Result<String, TransferError> {
        let value = self.gateway.get_value(source, source_key).await?;

        if !overwrite && self.gateway.get_value(target, target_key).await.is_ok() {
            return Err(TransferError::TargetExists(target_key.to_string()));
        }

        self.gateway.set_value(target, target_key, &value).await?;
        Ok(value)
    }
}

// -----------------------------------------------------------------------------
// ----- Key remapping ---------------------------------------------------------

/// Rewrites a key's leading prefix segment when remapping applies.
///
/// Remapping needs the flag plus both prefixes non-empty, and only touches
/// keys that actually start with the source prefix; everything else copies
/// under its original name.
fn remap_key(key: &str, request: &TransferRequest) -> String {
    if request.key_mapping
        && !request.source_prefix.is_empty()
        && !request.target_prefix.is_empty()
    {
        if let Some(rest) = key.strip_prefix(&request.source_prefix) {
            return format!("{}{rest}", request.target_prefix);
        }
    }

    key.to_string()
}

// -----------------------------------------------------------------------------
// ----- Tests -----------------------------------------------------------------


// -----------------------------------------------------------------------------
// -----------------------------------------------------------------------------
