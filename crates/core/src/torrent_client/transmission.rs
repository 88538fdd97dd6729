//! Transmission backend (JSON-RPC).
//!
//! Transmission guards its RPC endpoint with a session id header; a 409
//! response carries the fresh id and the request is replayed once.

use std::time::Duration;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::config::TransmissionConfig;

use super::{InjectRequest, InjectResult, TorrentClient, TorrentClientError, TorrentSource};

const SESSION_HEADER: &str = "X-Transmission-Session-Id";

/// Transmission RPC client.
pub struct TransmissionClient {
    client: Client,
    config: TransmissionConfig,
    session_id: RwLock<Option<String>>,
}

impl TransmissionClient {
    pub fn new(config: TransmissionConfig, timeout: Option<Duration>) -> Self {
        let mut builder = Client::builder();
        if let Some(t) = timeout {
            builder = builder.timeout(t);
        }
        let client = builder.build().expect("Failed to create HTTP client");
        Self {
            client,
            config,
            session_id: RwLock::new(None),
        }
    }

    async fn post(&self, payload: &serde_json::Value) -> Result<RpcResponse, TorrentClientError> {
        let response = self.send_once(payload).await?;

        // 409 hands us the session id to replay with
        if response.status().as_u16() == 409 {
            let new_id = response
                .headers()
                .get(SESSION_HEADER)
                .and_then(|v| v.to_str().ok())
                .map(|s| s.to_string())
                .ok_or_else(|| {
                    TorrentClientError::ApiError(
                        "409 without a session id header".to_string(),
                    )
                })?;
            debug!("Transmission session id refreshed");
            *self.session_id.write().await = Some(new_id);

            let response = self.send_once(payload).await?;
            return Self::parse(response).await;
        }

        Self::parse(response).await
    }

    async fn send_once(
        &self,
        payload: &serde_json::Value,
    ) -> Result<reqwest::Response, TorrentClientError> {
        let mut request = self.client.post(&self.config.url).json(payload);

        if let Some(ref id) = *self.session_id.read().await {
            request = request.header(SESSION_HEADER, id);
        }
        if let Some(ref username) = self.config.username {
            request = request.basic_auth(username, self.config.password.as_ref());
        }

        request.send().await.map_err(|e| {
            if e.is_timeout() {
                TorrentClientError::Timeout
            } else if e.is_connect() {
                TorrentClientError::ConnectionFailed(e.to_string())
            } else {
                TorrentClientError::ApiError(e.to_string())
            }
        })
    }

    async fn parse(response: reqwest::Response) -> Result<RpcResponse, TorrentClientError> {
        let status = response.status();
        if status.as_u16() == 401 {
            return Err(TorrentClientError::AuthenticationFailed(
                "Transmission rejected the credentials".to_string(),
            ));
        }
        if status.as_u16() == 409 {
            return Err(TorrentClientError::ApiError(
                "Session id rejected twice".to_string(),
            ));
        }
        if !status.is_success() {
            return Err(TorrentClientError::ApiError(format!("HTTP {}", status)));
        }

        response
            .json()
            .await
            .map_err(|e| TorrentClientError::ApiError(format!("Failed to parse response: {}", e)))
    }
}

#[async_trait]
impl TorrentClient for TransmissionClient {
    fn name(&self) -> &str {
        "transmission"
    }

    fn supports_categories(&self) -> bool {
        false
    }

    async fn inject(&self, request: InjectRequest) -> Result<InjectResult, TorrentClientError> {
        if request.category.is_some() {
            warn!("Transmission has no labels; ignoring category");
        }

        let mut arguments = serde_json::Map::new();
        match request.source {
            TorrentSource::File { ref data, .. } => {
                arguments.insert("metainfo".to_string(), json!(BASE64.encode(data)));
            }
            TorrentSource::Magnet { ref uri } => {
                arguments.insert("filename".to_string(), json!(uri));
            }
        }
        if let Some(ref path) = request.save_path {
            arguments.insert("download-dir".to_string(), json!(path));
        }
        arguments.insert("paused".to_string(), json!(false));

        let payload = json!({
            "method": "torrent-add",
            "arguments": arguments,
        });

        let response = self.post(&payload).await?;

        if response.result != "success" {
            return Err(TorrentClientError::ApiError(response.result));
        }

        let arguments = response.arguments.unwrap_or_default();
        if let Some(duplicate) = arguments.torrent_duplicate {
            return Err(TorrentClientError::Duplicate(duplicate.name));
        }

        Ok(InjectResult {
            hash: arguments.torrent_added.map(|t| t.hash_string.to_lowercase()),
        })
    }
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    result: String,
    #[serde(default)]
    arguments: Option<AddArguments>,
}

#[derive(Debug, Default, Deserialize)]
struct AddArguments {
    #[serde(rename = "torrent-added")]
    torrent_added: Option<AddedTorrent>,
    #[serde(rename = "torrent-duplicate")]
    torrent_duplicate: Option<AddedTorrent>,
}

#[derive(Debug, Deserialize)]
struct AddedTorrent {
    #[serde(rename = "hashString")]
    hash_string: String,
    name: String,
}
