pub mod client;
pub mod endpoints;
pub mod etcd;
pub mod pool;

pub use client::{Dialer, StoreClient};
pub use etcd::EtcdDialer;
pub use pool::ClientPool;

use serde::Serialize;

// -----------------------------------------------------------------------------
// ----- KeyValueRecord --------------------------------------------------------

/// One key and its opaque value.
///
/// Values are raw strings; nothing below the gateway assumes any structure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeyValueRecord {
    pub key: String,
    pub value: String,
}

// -----------------------------------------------------------------------------
// -----------------------------------------------------------------------------
