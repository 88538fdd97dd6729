//! qBittorrent backend (REST over HTTP).

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{multipart, Client};
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::config::QBittorrentConfig;

use super::{
    extract_hash_from_magnet, InjectRequest, InjectResult, TorrentClient, TorrentClientError,
    TorrentSource,
};

/// qBittorrent WebUI client.
pub struct QBittorrentClient {
    client: Client,
    config: QBittorrentConfig,
    /// Session marker (cookie jar holds the actual SID).
    session: Arc<RwLock<Option<String>>>,
}

impl QBittorrentClient {
    pub fn new(config: QBittorrentConfig, timeout: Option<Duration>) -> Self {
        let mut builder = Client::builder().cookie_store(true);
        if let Some(t) = timeout {
            builder = builder.timeout(t);
        }
        let client = builder.build().expect("Failed to create HTTP client");

        Self {
            client,
            config,
            session: Arc::new(RwLock::new(None)),
        }
    }

    fn base_url(&self) -> &str {
        self.config.url.trim_end_matches('/')
    }

    /// Login and mark the session established.
    async fn login(&self) -> Result<(), TorrentClientError> {
        let url = format!("{}/api/v2/auth/login", self.base_url());

        let params = [
            ("username", self.config.username.as_str()),
            ("password", self.config.password.as_str()),
        ];

        let response = self
            .client
            .post(&url)
            .form(&params)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        if body.contains("Ok.") {
            debug!("qBittorrent login successful");
            let mut session = self.session.write().await;
            *session = Some("authenticated".to_string());
            Ok(())
        } else if body.contains("Fails.") || status.as_u16() == 403 {
            Err(TorrentClientError::AuthenticationFailed(
                "Invalid credentials".to_string(),
            ))
        } else {
            Err(TorrentClientError::AuthenticationFailed(format!(
                "Unexpected response: {}",
                body.chars().take(100).collect::<String>()
            )))
        }
    }

    async fn ensure_authenticated(&self) -> Result<(), TorrentClientError> {
        let session = self.session.read().await;
        if session.is_some() {
            return Ok(());
        }
        drop(session);
        self.login().await
    }

    /// POST a multipart form, re-authenticating once on a stale session.
    async fn post_multipart(
        &self,
        endpoint: &str,
        build_form: impl Fn() -> multipart::Form,
    ) -> Result<String, TorrentClientError> {
        self.ensure_authenticated().await?;

        let url = format!("{}{}", self.base_url(), endpoint);
        let response = self
            .client
            .post(&url)
            .multipart(build_form())
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        if status.as_u16() == 403 {
            warn!("qBittorrent session expired, re-authenticating");
            {
                let mut session = self.session.write().await;
                *session = None;
            }
            self.login().await?;

            let response = self
                .client
                .post(&url)
                .multipart(build_form())
                .send()
                .await
                .map_err(map_reqwest_error)?;

            let status = response.status();
            if !status.is_success() {
                return Err(TorrentClientError::ApiError(format!("HTTP {}", status)));
            }
            return response
                .text()
                .await
                .map_err(|e| TorrentClientError::ApiError(e.to_string()));
        }

        if !status.is_success() {
            return Err(TorrentClientError::ApiError(format!("HTTP {}", status)));
        }

        response
            .text()
            .await
            .map_err(|e| TorrentClientError::ApiError(e.to_string()))
    }
}

fn map_reqwest_error(e: reqwest::Error) -> TorrentClientError {
    if e.is_timeout() {
        TorrentClientError::Timeout
    } else if e.is_connect() {
        TorrentClientError::ConnectionFailed(e.to_string())
    } else {
        TorrentClientError::ApiError(e.to_string())
    }
}

#[async_trait]
impl TorrentClient for QBittorrentClient {
    fn name(&self) -> &str {
        "qbittorrent"
    }

    fn supports_categories(&self) -> bool {
        true
    }

    async fn inject(&self, request: InjectRequest) -> Result<InjectResult, TorrentClientError> {
        let hash = match request.source {
            TorrentSource::Magnet { ref uri } => extract_hash_from_magnet(uri),
            TorrentSource::File { .. } => None,
        };

        let body = self
            .post_multipart("/api/v2/torrents/add", || {
                let mut form = multipart::Form::new();

                match &request.source {
                    TorrentSource::Magnet { uri } => {
                        form = form.text("urls", uri.clone());
                    }
                    TorrentSource::File { data, filename } => {
                        let part = multipart::Part::bytes(data.clone())
                            .file_name(
                                filename
                                    .clone()
                                    .unwrap_or_else(|| "release.torrent".to_string()),
                            )
                            .mime_str("application/x-bittorrent")
                            .expect("static mime type is valid");
                        form = form.part("torrents", part);
                    }
                }

                if let Some(ref path) = request.save_path {
                    form = form.text("savepath", path.clone());
                    // An explicit save path must win over category paths
                    form = form.text("autoTMM", "false");
                }
                if let Some(ref category) = request.category {
                    form = form.text("category", category.clone());
                }
                if request.skip_recheck {
                    form = form.text("skip_checking", "true");
                }
                form
            })
            .await?;

        // The add endpoint answers 200 with "Fails." for rejected uploads
        if body.contains("Fails.") {
            return Err(TorrentClientError::Duplicate(
                "qBittorrent rejected the torrent (already present or invalid)".to_string(),
            ));
        }

        Ok(InjectResult { hash })
    }
}
