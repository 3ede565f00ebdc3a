use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, info};

use crate::config::registry::ConnectionRecord;
use crate::errors::ConnectionError;
use crate::store::client::{Dialer, StoreClient};
use crate::store::endpoints;

// -----------------------------------------------------------------------------
// ----- Constants -------------------------------------------------------------

/// Deadline for building a client, including any auth handshake.
pub const DIAL_TIMEOUT: Duration = Duration::from_secs(5);

/// Deadline for the post-dial liveness probe.
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(2);

// -----------------------------------------------------------------------------
// ----- ClientPool ------------------------------------------------------------

/// Owns at most one live client per registered connection.
///
/// Clients are created lazily on first use and reused until evicted. The
/// dialer is injected so the pool can be instantiated against any transport;
/// isolated pools per test come for free.
pub struct ClientPool {
    dialer: Arc<dyn Dialer>,
    clients: Mutex<HashMap<i64, Arc<dyn StoreClient>>>,
    // One gate per connection id so concurrent first-use resolves never race
    // to create two clients, while different ids proceed in parallel.
    dial_gates: Mutex<HashMap<i64, Arc<tokio::sync::Mutex<()>>>>,
}

impl ClientPool {
    pub fn new(dialer: Arc<dyn Dialer>) -> Self {
        Self {
            dialer,
            clients: Mutex::new(HashMap::new()),
            dial_gates: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the pooled client for `conn`, dialing on first use.
    ///
    /// A cached client is returned as-is, with no health check. A fresh
    /// client must pass a status probe before it is cached; a client that
    /// fails the probe is closed and never stored.
    pub async fn resolve(
        &self,
        conn: &ConnectionRecord,
    ) -> Result<Arc<dyn StoreClient>, ConnectionError> {
        if let Some(client) = self.clients.lock().get(&conn.id) {
            return Ok(client.clone());
        }

        let gate = self
            .dial_gates
            .lock()
            .entry(conn.id)
            .or_default()
            .clone();
        let _creating = gate.lock().await;

        // Another caller may have finished dialing while we waited.
        if let Some(client) = self.clients.lock().get(&conn.id) {
            return Ok(client.clone());
        }

        let endpoints = endpoints::normalize(&conn.endpoints);
        if endpoints.is_empty() {
            return Err(ConnectionError::NoEndpoints);
        }

        debug!("dialing connection {} ({})", conn.id, conn.name);
        let client = match timeout(DIAL_TIMEOUT, self.dialer.dial(conn, &endpoints)).await {
            Ok(dialed) => dialed?,
            Err(_) => {
                return Err(ConnectionError::DialFailed(format!(
                    "dial timed out after {DIAL_TIMEOUT:?}"
                )));
            }
        };

        match timeout(PROBE_TIMEOUT, client.status()).await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => {
                client.close().await;
                return Err(ConnectionError::Unreachable(err.to_string()));
            }
            Err(_) => {
                client.close().await;
                return Err(ConnectionError::Unreachable(format!(
                    "status probe timed out after {PROBE_TIMEOUT:?}"
                )));
            }
        }

        info!("connection {} ({}) is live", conn.id, conn.name);
        self.clients.lock().insert(conn.id, client.clone());
        Ok(client)
    }

    /// Closes and removes the client for `id`, if any.
    ///
    /// Must be called whenever a connection's endpoints, credentials, or TLS
    /// settings change, or the connection is deleted; a stale client must
    /// never serve another request. Eviction takes the same per-id gate as
    /// dialing, so a resolve that is mid-dial when the settings change
    /// finishes first and its client is removed here, never reused.
    pub async fn evict(&self, id: i64) {
        let gate = self.dial_gates.lock().entry(id).or_default().clone();
        let _guard = gate.lock().await;

        let client = self.clients.lock().remove(&id);
        if let Some(client) = client {
            debug!("evicting client for connection {id}");
            client.close().await;
        }
    }

    /// Closes and removes every pooled client. Used at shutdown.
    pub async fn evict_all(&self) {
        // Every cached client was inserted under its gate, so the gate map
        // covers all ids worth evicting.
        let ids: Vec<i64> = self.dial_gates.lock().keys().copied().collect();
        for id in ids {
            self.evict(id).await;
        }
    }
}

// -----------------------------------------------------------------------------
// -----------------------------------------------------------------------------
