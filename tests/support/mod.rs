#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use etcrab::config::registry::ConnectionRecord;
use etcrab::errors::{ConnectionError, StoreError};
use etcrab::store::KeyValueRecord;
use etcrab::store::client::{Dialer, StoreClient};

pub type SharedData = Arc<Mutex<BTreeMap<String, String>>>;

// -----------------------------------------------------------------------------
// ----- MemoryDialer ----------------------------------------------------------

/// In-memory stand-in for a fleet of etcd clusters.
///
/// Each connection id gets its own keyspace. Dials, probes, and closes are
/// counted so pool lifecycle behavior is observable; status failures, dial
/// failures, and per-operation latency can be injected.
#[derive(Default)]
pub struct MemoryDialer {
    clusters: Mutex<HashMap<i64, SharedData>>,
    dial_count: AtomicUsize,
    probe_count: Arc<AtomicUsize>,
    fail_dial: AtomicBool,
    fail_status: Arc<AtomicBool>,
    dial_delay: Mutex<Option<Duration>>,
    op_delay: Arc<Mutex<Option<Duration>>>,
    closed_flags: Mutex<Vec<Arc<AtomicBool>>>,
}

impl MemoryDialer {
    /// Keyspace backing the given connection id.
    pub fn cluster(&self, id: i64) -> SharedData {
        self.clusters.lock().entry(id).or_default().clone()
    }

    pub fn seed(&self, id: i64, entries: &[(&str, &str)]) {
        let data = self.cluster(id);
        let mut guard = data.lock();
        for (key, value) in entries {
            guard.insert(key.to_string(), value.to_string());
        }
    }

    pub fn dials(&self) -> usize {
        self.dial_count.load(Ordering::SeqCst)
    }

    pub fn probes(&self) -> usize {
        self.probe_count.load(Ordering::SeqCst)
    }

    pub fn closed_clients(&self) -> usize {
        self.closed_flags
            .lock()
            .iter()
            .filter(|flag| flag.load(Ordering::SeqCst))
            .count()
    }

    pub fn fail_dial(&self, fail: bool) {
        self.fail_dial.store(fail, Ordering::SeqCst);
    }

    pub fn fail_status(&self, fail: bool) {
        self.fail_status.store(fail, Ordering::SeqCst);
    }

    pub fn set_dial_delay(&self, delay: Option<Duration>) {
        *self.dial_delay.lock() = delay;
    }

    pub fn set_op_delay(&self, delay: Option<Duration>) {
        *self.op_delay.lock() = delay;
    }
}

#[async_trait]
impl Dialer for MemoryDialer {
    async fn dial(
        &self,
        record: &ConnectionRecord,
        _endpoints: &[String],
    ) -> Result<Arc<dyn StoreClient>, ConnectionError> {
        if self.fail_dial.load(Ordering::SeqCst) {
            return Err(ConnectionError::DialFailed(
                "injected dial failure".to_string(),
            ));
        }

        let delay = *self.dial_delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        self.dial_count.fetch_add(1, Ordering::SeqCst);
        let closed = Arc::new(AtomicBool::new(false));
        self.closed_flags.lock().push(closed.clone());

        Ok(Arc::new(MemoryClient {
            data: self.cluster(record.id),
            probes: self.probe_count.clone(),
            fail_status: self.fail_status.clone(),
            op_delay: self.op_delay.clone(),
            closed,
        }))
    }
}

// -----------------------------------------------------------------------------
// ----- MemoryClient ----------------------------------------------------------

#[derive(Debug)]
pub struct MemoryClient {
    data: SharedData,
    probes: Arc<AtomicUsize>,
    fail_status: Arc<AtomicBool>,
    op_delay: Arc<Mutex<Option<Duration>>>,
    closed: Arc<AtomicBool>,
}

impl MemoryClient {
    async fn pause(&self) {
        let delay = *self.op_delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl StoreClient for MemoryClient {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.pause().await;
        Ok(self.data.lock().get(key).cloned())
    }

    async fn get_prefix(
        &self,
        prefix: &str,
        keys_only: bool,
    ) -> Result<Vec<KeyValueRecord>, StoreError> {
        self.pause().await;
        Ok(self
            .data
            .lock()
            .iter()
            .filter(|(key, _)| key.starts_with(prefix))
            .map(|(key, value)| KeyValueRecord {
                key: key.clone(),
                value: if keys_only {
                    String::new()
                } else {
                    value.clone()
                },
            })
            .collect())
    }

    async fn put(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.pause().await;
        self.data.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.pause().await;
        self.data.lock().remove(key);
        Ok(())
    }

    async fn status(&self) -> Result<(), StoreError> {
        self.probes.fetch_add(1, Ordering::SeqCst);
        if self.fail_status.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("injected probe failure".to_string()));
        }
        Ok(())
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

// -----------------------------------------------------------------------------
// ----- Fixtures --------------------------------------------------------------

pub fn record(id: i64, name: &str) -> ConnectionRecord {
    record_with_endpoints(id, name, r#"["127.0.0.1:2379"]"#)
}

pub fn record_with_endpoints(id: i64, name: &str, endpoints: &str) -> ConnectionRecord {
    ConnectionRecord {
        id,
        name: name.to_string(),
        endpoints: endpoints.to_string(),
        username: None,
        password: None,
        tls_enabled: false,
        cert_file: None,
        key_file: None,
        ca_file: None,
        read_only: false,
        description: None,
    }
}
