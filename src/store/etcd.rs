use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as B64;
use reqwest::{Certificate, Identity};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tokio::fs;
use tracing::debug;

use crate::config::registry::ConnectionRecord;
use crate::errors::{ConnectionError, StoreError};
use crate::store::KeyValueRecord;
use crate::store::client::{Dialer, StoreClient};
use crate::store::pool::DIAL_TIMEOUT;

// -----------------------------------------------------------------------------
// ----- EtcdDialer ------------------------------------------------------------

/// Production dialer: speaks the etcd v3 gRPC-JSON gateway over HTTP.
#[derive(Debug, Default)]
pub struct EtcdDialer;

#[async_trait]
impl Dialer for EtcdDialer {
    async fn dial(
        &self,
        record: &ConnectionRecord,
        endpoints: &[String],
    ) -> Result<Arc<dyn StoreClient>, ConnectionError> {
        let client = EtcdClient::connect(record, endpoints).await?;
        Ok(Arc::new(client))
    }
}

// -----------------------------------------------------------------------------
// ----- EtcdClient ------------------------------------------------------------

/// Client for one etcd cluster via the v3 JSON gateway.
///
/// Keys and values travel base64-encoded. Requests fail over across the
/// configured endpoints on transport errors; application-level errors are
/// returned from the first endpoint that answers.
#[derive(Debug)]
pub struct EtcdClient {
    http: reqwest::Client,
    bases: Vec<String>,
    token: Option<String>,
}

impl EtcdClient {
    pub async fn connect(
        record: &ConnectionRecord,
        endpoints: &[String],
    ) -> Result<Self, ConnectionError> {
        let http = build_http_client(record).await?;
        let bases = endpoints
            .iter()
            .map(|endpoint| base_url(endpoint, record.tls_enabled))
            .collect();

        let mut client = EtcdClient {
            http,
            bases,
            token: None,
        };

        if let (Some(user), Some(password)) =
            (record.username.as_deref(), record.password_exposed())
        {
            client.token = Some(client.authenticate(user, password).await?);
        }

        Ok(client)
    }

    async fn authenticate(&self, user: &str, password: &str) -> Result<String, ConnectionError> {
        let body = AuthRequest {
            name: user,
            password,
        };
        let response: AuthResponse = self
            .call("/v3/auth/authenticate", &body)
            .await
            .map_err(|e| ConnectionError::DialFailed(format!("authentication failed: {e}")))?;
        Ok(response.token)
    }

    async fn call<B, R>(&self, path: &str, body: &B) -> Result<R, StoreError>
    where
        B: Serialize + Sync,
        R: DeserializeOwned,
    {
        let mut last: Option<StoreError> = None;

        for base in &self.bases {
            let mut request = self.http.post(format!("{base}{path}")).json(body);
            if let Some(token) = &self.token {
                request = request.header("Authorization", token);
            }

            let response = match request.send().await {
                Ok(response) => response,
                Err(err) => {
                    // Transport failure: fail over to the next endpoint.
                    debug!("endpoint {base} failed: {err}");
                    last = Some(StoreError::Backend(err.to_string()));
                    continue;
                }
            };

            let status = response.status();
            if !status.is_success() {
                let detail = response.text().await.unwrap_or_default();
                return Err(StoreError::Backend(format!(
                    "etcd returned {status}: {detail}"
                )));
            }

            return response
                .json::<R>()
                .await
                .map_err(|e| StoreError::Backend(format!("malformed etcd response: {e}")));
        }

        Err(last.unwrap_or_else(|| StoreError::Backend("no endpoints available".to_string())))
    }
}

// -----------------------------------------------------------------------------
// ----- EtcdClient: StoreClient -----------------------------------------------

#[async_trait]
impl StoreClient for EtcdClient {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let body = RangeRequest {
            key: B64.encode(key),
            ..Default::default()
        };
        let response: RangeResponse = self.call("/v3/kv/range", &body).await?;
        match response.kvs.into_iter().next() {
            Some(kv) => Ok(Some(kv.decoded_value()?)),
            None => Ok(None),
        }
    }

    async fn get_prefix(
        &self,
        prefix: &str,
        keys_only: bool,
    ) -> Result<Vec<KeyValueRecord>, StoreError> {
        let (key, range_end) = prefix_range(prefix);
        let body = RangeRequest {
            key,
            range_end: Some(range_end),
            keys_only: keys_only.then_some(true),
        };
        let response: RangeResponse = self.call("/v3/kv/range", &body).await?;

        let mut records = Vec::with_capacity(response.kvs.len());
        for kv in response.kvs {
            records.push(KeyValueRecord {
                key: kv.decoded_key()?,
                value: if keys_only {
                    String::new()
                } else {
                    kv.decoded_value()?
                },
            });
        }
        Ok(records)
    }

    async fn put(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let body = PutRequest {
            key: B64.encode(key),
            value: B64.encode(value),
        };
        let _: serde_json::Value = self.call("/v3/kv/put", &body).await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        let body = DeleteRequest {
            key: B64.encode(key),
        };
        let _: serde_json::Value = self.call("/v3/kv/deleterange", &body).await?;
        Ok(())
    }

    async fn status(&self) -> Result<(), StoreError> {
        // Probe the first endpoint only; the others are dial fallbacks.
        let base = self
            .bases
            .first()
            .ok_or_else(|| StoreError::Backend("no endpoints available".to_string()))?;

        let mut request = self
            .http
            .post(format!("{base}/v3/maintenance/status"))
            .json(&serde_json::json!({}));
        if let Some(token) = &self.token {
            request = request.header("Authorization", token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        if !response.status().is_success() {
            return Err(StoreError::Backend(format!(
                "status probe returned {}",
                response.status()
            )));
        }
        Ok(())
    }
}

// -----------------------------------------------------------------------------
// ----- Internal: HTTP setup --------------------------------------------------

async fn build_http_client(record: &ConnectionRecord) -> Result<reqwest::Client, ConnectionError> {
    let mut builder = reqwest::Client::builder()
        .use_rustls_tls()
        .connect_timeout(DIAL_TIMEOUT);

    if record.tls_enabled {
        if let Some(ca) = &record.ca_file {
            let pem = read_pem(ca).await?;
            let cert = Certificate::from_pem(&pem)
                .map_err(|e| ConnectionError::DialFailed(format!("invalid CA certificate: {e}")))?;
            builder = builder.add_root_certificate(cert);
        }

        if let (Some(cert_file), Some(key_file)) = (&record.cert_file, &record.key_file) {
            let mut pem = read_pem(cert_file).await?;
            pem.extend(read_pem(key_file).await?);
            let identity = Identity::from_pem(&pem).map_err(|e| {
                ConnectionError::DialFailed(format!("invalid client identity: {e}"))
            })?;
            builder = builder.identity(identity);
        }
    }

    builder
        .build()
        .map_err(|e| ConnectionError::DialFailed(e.to_string()))
}

async fn read_pem(path: &Path) -> Result<Vec<u8>, ConnectionError> {
    fs::read(path).await.map_err(|e| {
        ConnectionError::DialFailed(format!("failed to read {}: {e}", path.display()))
    })
}

fn base_url(endpoint: &str, tls: bool) -> String {
    let trimmed = endpoint.trim().trim_end_matches('/');
    if trimmed.contains("://") {
        trimmed.to_string()
    } else if tls {
        format!("https://{trimmed}")
    } else {
        format!("http://{trimmed}")
    }
}

/// Computes the etcd range covering every key under `prefix`.
///
/// The range end is the prefix with its last byte incremented; trailing 0xff
/// bytes are dropped first. `"\0".."\0"` selects the whole keyspace.
fn prefix_range(prefix: &str) -> (String, String) {
    if prefix.is_empty() {
        return (B64.encode([0u8]), B64.encode([0u8]));
    }

    let mut end = prefix.as_bytes().to_vec();
    while let Some(last) = end.pop() {
        if last < 0xff {
            end.push(last + 1);
            break;
        }
    }
    if end.is_empty() {
        end.push(0);
    }

    (B64.encode(prefix), B64.encode(end))
}

// -----------------------------------------------------------------------------
// ----- Internal: Wire format -------------------------------------------------

#[derive(Debug, Default, Serialize)]
struct RangeRequest {
    key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    range_end: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    keys_only: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct RangeResponse {
    #[serde(default)]
    kvs: Vec<WireKv>,
}

#[derive(Debug, Deserialize)]
struct WireKv {
    key: String,
    #[serde(default)]
    value: Option<String>,
}

impl WireKv {
    fn decoded_key(&self) -> Result<String, StoreError> {
        decode_b64(&self.key)
    }

    fn decoded_value(&self) -> Result<String, StoreError> {
        match &self.value {
            Some(value) => decode_b64(value),
            // proto3 JSON omits empty bytes fields.
            None => Ok(String::new()),
        }
    }
}

fn decode_b64(raw: &str) -> Result<String, StoreError> {
    let bytes = B64
        .decode(raw)
        .map_err(|e| StoreError::Backend(format!("invalid base64 in response: {e}")))?;
    String::from_utf8(bytes)
        .map_err(|e| StoreError::Backend(format!("non-utf8 data in response: {e}")))
}

#[derive(Debug, Serialize)]
struct PutRequest {
    key: String,
    value: String,
}

#[derive(Debug, Serialize)]
struct DeleteRequest {
    key: String,
}

#[derive(Debug, Serialize)]
struct AuthRequest<'a> {
    name: &'a str,
    password: &'a str,
}

#[derive(Debug, Deserialize)]
struct AuthResponse {
    token: String,
}

// -----------------------------------------------------------------------------
// ----- Tests -----------------------------------------------------------------


// -----------------------------------------------------------------------------
// -----------------------------------------------------------------------------
