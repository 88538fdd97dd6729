//! Deluge backend (web JSON-RPC).
//!
//! Authenticates against the WebUI password; the cookie jar carries the
//! session. Labels are applied through the label plugin when a category
//! is requested.

use std::time::Duration;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::config::DelugeConfig;

use super::{
    extract_hash_from_magnet, InjectRequest, InjectResult, TorrentClient, TorrentClientError,
    TorrentSource,
};

/// Deluge web JSON-RPC client.
pub struct DelugeClient {
    client: Client,
    config: DelugeConfig,
    authenticated: RwLock<bool>,
    request_id: std::sync::atomic::AtomicU64,
}

impl DelugeClient {
    pub fn new(config: DelugeConfig, timeout: Option<Duration>) -> Self {
        let mut builder = Client::builder().cookie_store(true);
        if let Some(t) = timeout {
            builder = builder.timeout(t);
        }
        let client = builder.build().expect("Failed to create HTTP client");
        Self {
            client,
            config,
            authenticated: RwLock::new(false),
            request_id: std::sync::atomic::AtomicU64::new(1),
        }
    }

    fn next_id(&self) -> u64 {
        self.request_id
            .fetch_add(1, std::sync::atomic::Ordering::Relaxed)
    }

    async fn call(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> Result<serde_json::Value, TorrentClientError> {
        let payload = json!({
            "method": method,
            "params": params,
            "id": self.next_id(),
        });

        let response = self
            .client
            .post(&self.config.url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    TorrentClientError::Timeout
                } else if e.is_connect() {
                    TorrentClientError::ConnectionFailed(e.to_string())
                } else {
                    TorrentClientError::ApiError(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(TorrentClientError::ApiError(format!("HTTP {}", status)));
        }

        let rpc: RpcResponse = response
            .json()
            .await
            .map_err(|e| TorrentClientError::ApiError(format!("Failed to parse response: {}", e)))?;

        if let Some(error) = rpc.error {
            // Code 1 is "not authenticated"
            if error.code == 1 {
                return Err(TorrentClientError::AuthenticationFailed(error.message));
            }
            if error.message.to_lowercase().contains("already") {
                return Err(TorrentClientError::Duplicate(error.message));
            }
            return Err(TorrentClientError::ApiError(error.message));
        }

        Ok(rpc.result.unwrap_or(serde_json::Value::Null))
    }

    async fn login(&self) -> Result<(), TorrentClientError> {
        let result = self
            .call("auth.login", json!([self.config.password]))
            .await?;

        if result.as_bool() != Some(true) {
            return Err(TorrentClientError::AuthenticationFailed(
                "Deluge rejected the WebUI password".to_string(),
            ));
        }

        debug!("Deluge login successful");
        *self.authenticated.write().await = true;
        Ok(())
    }

    async fn ensure_authenticated(&self) -> Result<(), TorrentClientError> {
        if *self.authenticated.read().await {
            return Ok(());
        }
        self.login().await
    }

    /// Run a call, logging in again once if the session lapsed.
    async fn call_authenticated(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> Result<serde_json::Value, TorrentClientError> {
        self.ensure_authenticated().await?;

        match self.call(method, params.clone()).await {
            Err(TorrentClientError::AuthenticationFailed(_)) => {
                warn!("Deluge session expired, re-authenticating");
                *self.authenticated.write().await = false;
                self.login().await?;
                self.call(method, params).await
            }
            other => other,
        }
    }

    fn add_options(request: &InjectRequest) -> serde_json::Value {
        let mut options = serde_json::Map::new();
        if let Some(ref path) = request.save_path {
            options.insert("download_location".to_string(), json!(path));
        }
        options.insert("add_paused".to_string(), json!(false));
        if request.skip_recheck {
            // seed_mode assumes the data is complete and skips the check
            options.insert("seed_mode".to_string(), json!(true));
        }
        serde_json::Value::Object(options)
    }
}

#[async_trait]
impl TorrentClient for DelugeClient {
    fn name(&self) -> &str {
        "deluge"
    }

    fn supports_categories(&self) -> bool {
        true
    }

    async fn inject(&self, request: InjectRequest) -> Result<InjectResult, TorrentClientError> {
        let options = Self::add_options(&request);

        let result = match request.source {
            TorrentSource::File { ref data, ref filename } => {
                let name = filename
                    .clone()
                    .unwrap_or_else(|| "release.torrent".to_string());
                self.call_authenticated(
                    "core.add_torrent_file",
                    json!([name, BASE64.encode(data), options]),
                )
                .await?
            }
            TorrentSource::Magnet { ref uri } => {
                self.call_authenticated("core.add_torrent_magnet", json!([uri, options]))
                    .await?
            }
        };

        let hash = result
            .as_str()
            .map(|s| s.to_lowercase())
            .or_else(|| match request.source {
                TorrentSource::Magnet { ref uri } => extract_hash_from_magnet(uri),
                _ => None,
            });

        if let Some(ref category) = request.category {
            if let Some(ref torrent_id) = hash {
                if let Err(e) = self
                    .call_authenticated("label.set_torrent", json!([torrent_id, category]))
                    .await
                {
                    warn!("Failed to apply Deluge label {}: {}", category, e);
                }
            }
        }

        Ok(InjectResult { hash })
    }
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    result: Option<serde_json::Value>,
    error: Option<RpcError>,
}

#[derive(Debug, Deserialize)]
struct RpcError {
    message: String,
    code: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_success_response() {
        let json = r#"{"result": "abc123def", "error": null, "id": 2}"#;
        let response: RpcResponse = serde_json::from_str(json).unwrap();
        assert!(response.error.is_none());
        assert_eq!(response.result.unwrap().as_str(), Some("abc123def"));
    }

    #[test]
    fn test_parse_error_response() {
        let json = r#"{
            "result": null,
            "error": {"message": "Torrent already in session", "code": 4},
            "id": 3
        }"#;
        let response: RpcResponse = serde_json::from_str(json).unwrap();
        let error = response.error.unwrap();
        assert_eq!(error.code, 4);
        assert!(error.message.contains("already"));
    }

    #[test]
    fn test_add_options() {
        let request = InjectRequest::from_magnet("magnet:?xt=urn:btih:abc")
            .with_save_path("/data/links/x")
            .with_skip_recheck(true);
        let options = DelugeClient::add_options(&request);

        assert_eq!(options["download_location"], "/data/links/x");
        assert_eq!(options["add_paused"], false);
        assert_eq!(options["seed_mode"], true);
    }

    #[test]
    fn test_name_and_categories() {
        let client = DelugeClient::new(
            DelugeConfig {
                url: "http://localhost:8112/json".to_string(),
                password: "deluge".to_string(),
            },
            None,
        );
        assert_eq!(client.name(), "deluge");
        assert!(client.supports_categories());
    }
}
