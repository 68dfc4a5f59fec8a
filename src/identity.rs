//! User key resolution
//!
//! Progress is keyed by a best-effort identifier rather than an account. The
//! public network address is tried first; when it cannot be determined a
//! random device id is generated once and kept in local state. Two browsers
//! can end up with the same key (shared address) and one person on two
//! devices gets two keys. Both are accepted: availability beats identity
//! accuracy here.

use async_trait::async_trait;
use rand::Rng;
use rand::distr::Alphanumeric;
use reqwest::Client;
use serde::Deserialize;

use crate::progress::now_millis;
use crate::storage::{KeyValueStore, load_json, save_json};

/// Local state key for the generated fallback id
pub const DEVICE_ID_KEY: &str = "device_id";

/// Source of a device or network identifier
#[async_trait]
pub trait DeviceProbe: Send + Sync {
    /// Return an identifier, or `None` when unavailable
    async fn identify(&self) -> Option<String>;
}

#[derive(Deserialize)]
struct AddressResponse {
    ip: String,
}

/// Looks up the public address through an HTTP endpoint returning `{"ip": "..."}`
pub struct HttpDeviceProbe {
    client: Client,
    url: String,
}

impl HttpDeviceProbe {
    pub fn new(url: impl Into<String>) -> Self {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(5))
            .build()
            .unwrap_or_default();
        Self { client, url: url.into() }
    }
}

#[async_trait]
impl DeviceProbe for HttpDeviceProbe {
    async fn identify(&self) -> Option<String> {
        let response = match self.client.get(&self.url).send().await {
            Ok(response) => response,
            Err(e) => {
                tracing::debug!("Address lookup failed: {}", e);
                return None;
            }
        };
        match response.error_for_status() {
            Ok(response) => response.json::<AddressResponse>().await.ok().map(|r| r.ip),
            Err(e) => {
                tracing::debug!("Address lookup returned an error: {}", e);
                None
            }
        }
    }
}

/// Turn a probed address into a user key
fn key_from_address(address: &str) -> Option<String> {
    let address = address.trim();
    if address.is_empty() {
        return None;
    }
    Some(format!("ip_{}", address))
}

/// Generate a fallback id of the form `device_<unix ms>_<9 random chars>`
pub fn generate_device_id() -> String {
    let suffix: String = rand::rng()
        .sample_iter(&Alphanumeric)
        .take(9)
        .map(|b| char::from(b).to_ascii_lowercase())
        .collect();
    format!("device_{}_{}", now_millis(), suffix)
}

/// The persisted fallback id, created on first use
pub fn fallback_device_id(local: &dyn KeyValueStore) -> String {
    if let Some(id) = load_json::<String>(local, DEVICE_ID_KEY).filter(|id| !id.is_empty()) {
        return id;
    }

    let id = generate_device_id();
    if let Err(e) = save_json(local, DEVICE_ID_KEY, &id) {
        tracing::warn!("Could not persist device id, it will change next session: {}", e);
    }
    tracing::info!("Generated device id {}", id);
    id
}

/// Resolve the key progress is stored under
pub async fn resolve_user_key(probe: Option<&dyn DeviceProbe>, local: &dyn KeyValueStore) -> String {
    if let Some(probe) = probe {
        if let Some(key) = probe.identify().await.as_deref().and_then(key_from_address) {
            return key;
        }
    }
    fallback_device_id(local)
}
