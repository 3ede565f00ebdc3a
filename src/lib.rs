pub mod backup;
pub mod config;
pub mod errors;
pub mod gateway;
pub mod store;
pub mod transfer;

pub use backup::{BackupCodec, Snapshot};
pub use config::registry::{ConnectionRecord, Registry, RegistryError};
pub use errors::{ConnectionError, StoreError, TransferError};
pub use gateway::{GatewayTimeouts, KvGateway};
pub use store::{ClientPool, Dialer, EtcdDialer, KeyValueRecord, StoreClient};
pub use transfer::{BulkOutcome, TransferEngine, TransferRequest};
