use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::{collections::HashMap, path::Path, path::PathBuf};
use thiserror::Error;
use tokio::fs;

// -----------------------------------------------------------------------------
// ----- Registry --------------------------------------------------------------

/// Durable store of connection descriptors, loaded from a TOML file.
///
/// The registry is read-only to the rest of the crate: the pool and gateway
/// receive `ConnectionRecord`s but never mutate them.
#[derive(Debug, Clone)]
pub struct Registry {
    by_id: HashMap<i64, ConnectionRecord>,
}

// -----------------------------------------------------------------------------
// ----- Registry: Static ------------------------------------------------------

impl Registry {
    pub async fn load(path: &Path) -> Result<Registry, RegistryError> {
        let raw = fs::read_to_string(path).await.map_err(|e| RegistryError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::parse(&raw)
    }

    fn parse(raw: &str) -> Result<Registry, RegistryError> {
        let mut doc: RegistryFile =
            toml::from_str(raw).map_err(|e| RegistryError::Toml { source: e })?;

        let mut by_id = HashMap::with_capacity(doc.connections.len());

        for entry in doc.connections.drain(..) {
            let record = ConnectionRecord {
                id: entry.id,
                name: entry.name,
                endpoints: entry.endpoints,
                username: entry.username,
                password: entry
                    .password
                    .map(|p| SecretString::new(p.into_boxed_str())),
                tls_enabled: entry.tls_enabled,
                cert_file: entry.cert_file,
                key_file: entry.key_file,
                ca_file: entry.ca_file,
                read_only: entry.read_only,
                description: entry.description,
            };

            if let Some(previous) = by_id.insert(record.id, record) {
                return Err(RegistryError::DuplicateConnection { id: previous.id });
            }
        }

        Ok(Registry { by_id })
    }
}

// -----------------------------------------------------------------------------
// ----- Registry: Public ------------------------------------------------------

impl Registry {
    pub fn get(&self, id: i64) -> Result<&ConnectionRecord, RegistryError> {
        self.by_id
            .get(&id)
            .ok_or(RegistryError::NotFound { id })
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    pub fn records(&self) -> impl Iterator<Item = &ConnectionRecord> {
        self.by_id.values()
    }
}

// -----------------------------------------------------------------------------
// ----- ConnectionRecord ------------------------------------------------------

/// One registered etcd cluster.
///
/// `endpoints` stays in its raw on-disk form (JSON array or comma list);
/// normalization happens when the pool dials, so a malformed value surfaces
/// as a connection error rather than a registry load failure.
#[derive(Debug, Clone)]
pub struct ConnectionRecord {
    pub id: i64,
    pub name: String,
    pub endpoints: String,
    pub username: Option<String>,
    pub password: Option<SecretString>,
    pub tls_enabled: bool,
    pub cert_file: Option<PathBuf>,
    pub key_file: Option<PathBuf>,
    pub ca_file: Option<PathBuf>,
    pub read_only: bool,
    pub description: Option<String>,
}

impl ConnectionRecord {
    pub fn password_exposed(&self) -> Option<&str> {
        self.password.as_ref().map(|p| p.expose_secret())
    }
}

// -----------------------------------------------------------------------------
// ----- Internal: On-disk format ----------------------------------------------

#[derive(Debug, Clone, Deserialize)]
struct RegistryFile {
    #[serde(default)]
    connections: Vec<ConnectionFileEntry>,
}

#[derive(Debug, Clone, Deserialize)]
struct ConnectionFileEntry {
    id: i64,
    name: String,
    endpoints: String,
    username: Option<String>,
    password: Option<String>,
    #[serde(default)]
    tls_enabled: bool,
    cert_file: Option<PathBuf>,
    key_file: Option<PathBuf>,
    ca_file: Option<PathBuf>,
    #[serde(default)]
    read_only: bool,
    description: Option<String>,
}

// -----------------------------------------------------------------------------
// ----- Errors ----------------------------------------------------------------

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("duplicate [[connections]] entry for id {id}")]
    DuplicateConnection { id: i64 },

    #[error("connection {id} not found")]
    NotFound { id: i64 },

    #[error("read error for {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("toml parse error: {source}")]
    Toml { source: toml::de::Error },
}

// -----------------------------------------------------------------------------
// ----- Tests -----------------------------------------------------------------


// -----------------------------------------------------------------------------
// -----------------------------------------------------------------------------
