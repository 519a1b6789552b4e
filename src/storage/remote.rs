//! HTTP object store backend.
//!
//! Objects are addressed as `{url}/{collection}/{name}`:
//!
//! * `GET` reads an object (404 means not found)
//! * `PUT` writes an object with the raw bytes as body
//! * `GET {url}/{collection}/` lists a collection, answering either a JSON
//!   array of names or a JSON object keyed by name
//!
//! When a key is configured it is sent as a bearer token. Every request is
//! bounded by the client timeouts in [`RemoteConfig`].

use std::time::Duration;

use reqwest::blocking::{Client, Response};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

use super::{check_name, Storage, StorageError, StorageResult, CONFIG_BLOB_NAME};

/// Collection that holds the configuration blob.
pub const CONFIG_COLLECTION: &str = "cfg";

/// Connection settings for [`RemoteStorage`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    /// Base URL of the object store.
    pub url: String,
    /// Optional access key.
    pub key: Option<String>,
    /// Request timeout in milliseconds (0 to disable).
    pub timeout_ms: u64,
    /// Connect timeout in milliseconds (0 to disable).
    pub connect_timeout_ms: u64,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            key: None,
            timeout_ms: 30_000,
            connect_timeout_ms: 3_000,
        }
    }
}

fn build_http_client(config: &RemoteConfig) -> Client {
    let mut builder = Client::builder();
    if config.timeout_ms > 0 {
        builder = builder.timeout(Duration::from_millis(config.timeout_ms));
    }
    if config.connect_timeout_ms > 0 {
        builder = builder.connect_timeout(Duration::from_millis(config.connect_timeout_ms));
    }

    builder.build().unwrap_or_else(|err| {
        log::warn!("Failed to build remote storage HTTP client: {err}");
        Client::new()
    })
}

/// Listing body returned by the object store.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Listing {
    Names(Vec<String>),
    Map(serde_json::Map<String, serde_json::Value>),
}

impl Listing {
    fn into_names(self) -> Vec<String> {
        match self {
            Self::Names(names) => names,
            Self::Map(map) => map.into_iter().map(|(k, _)| k).collect(),
        }
    }
}

/// Object store reached over HTTP.
#[derive(Debug, Clone)]
pub struct RemoteStorage {
    base: String,
    key: Option<String>,
    client: Client,
}

impl RemoteStorage {
    /// Create a client for the store described by `config`.
    #[must_use]
    pub fn new(config: &RemoteConfig) -> Self {
        Self {
            base: config.url.trim_end_matches('/').to_string(),
            key: config.key.clone().filter(|k| !k.is_empty()),
            client: build_http_client(config),
        }
    }

    /// Base URL without trailing slash.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base
    }

    fn object_url(&self, collection: &str, name: &str) -> String {
        format!("{}/{}/{}", self.base, collection, name)
    }

    fn authorize(
        &self,
        request: reqwest::blocking::RequestBuilder,
    ) -> reqwest::blocking::RequestBuilder {
        match &self.key {
            Some(key) => request.bearer_auth(key),
            None => request,
        }
    }

    fn send(
        &self,
        request: reqwest::blocking::RequestBuilder,
        operation: &str,
    ) -> StorageResult<Response> {
        self.authorize(request).send().map_err(|e| {
            log::error!(
                "[remote] {} failed (timeout: {}, connect: {}): {}",
                operation,
                e.is_timeout(),
                e.is_connect(),
                e
            );
            StorageError::Http {
                operation: operation.to_string(),
                source: e,
            }
        })
    }

    fn get_object(&self, collection: &str, name: &str) -> StorageResult<Vec<u8>> {
        let operation = format!("get {}/{}", collection, name);
        let response = self.send(self.client.get(self.object_url(collection, name)), &operation)?;

        match response.status() {
            StatusCode::NOT_FOUND => Err(StorageError::NotFound {
                collection: collection.to_string(),
                name: name.to_string(),
            }),
            status if status.is_success() => response
                .bytes()
                .map(|b| b.to_vec())
                .map_err(|e| StorageError::Http { operation, source: e }),
            status => Err(StorageError::Status {
                operation,
                status: status.as_u16(),
            }),
        }
    }

    fn put_object(&self, collection: &str, name: &str, bytes: &[u8]) -> StorageResult<()> {
        let operation = format!("put {}/{}", collection, name);
        let request = self
            .client
            .put(self.object_url(collection, name))
            .body(bytes.to_vec());
        let response = self.send(request, &operation)?;

        let status = response.status();
        if !status.is_success() {
            return Err(StorageError::Status {
                operation,
                status: status.as_u16(),
            });
        }
        log::trace!("[remote] stored {} bytes as {}/{}", bytes.len(), collection, name);
        Ok(())
    }
}

impl Storage for RemoteStorage {
    fn get_bytes(&self, collection: &str, name: &str) -> StorageResult<Vec<u8>> {
        check_name(collection)?;
        check_name(name)?;
        self.get_object(collection, name)
    }

    fn put_bytes(&self, collection: &str, name: &str, bytes: &[u8]) -> StorageResult<()> {
        check_name(collection)?;
        check_name(name)?;
        self.put_object(collection, name, bytes)
    }

    fn scan_all(&self, collection: &str) -> StorageResult<Vec<String>> {
        check_name(collection)?;
        let operation = format!("list {}", collection);
        let url = format!("{}/{}/", self.base, collection);
        let response = self.send(self.client.get(url), &operation)?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(Vec::new());
        }
        if !status.is_success() {
            return Err(StorageError::Status {
                operation,
                status: status.as_u16(),
            });
        }

        let body = response
            .bytes()
            .map_err(|e| StorageError::Http { operation, source: e })?;
        let listing: Listing =
            serde_json::from_slice(&body).map_err(|e| StorageError::InvalidListing {
                collection: collection.to_string(),
                source: e,
            })?;

        let mut names = listing.into_names();
        names.sort();
        Ok(names)
    }

    fn save_config(&self, data: &[u8]) -> StorageResult<()> {
        self.put_object(CONFIG_COLLECTION, CONFIG_BLOB_NAME, data)
    }

    fn load_config(&self) -> StorageResult<Vec<u8>> {
        self.get_object(CONFIG_COLLECTION, CONFIG_BLOB_NAME)
    }

    fn kind(&self) -> &'static str {
        "remote"
    }
}
