//! Torznab-compatible indexer client.
//!
//! Queries the JSON results form of a Torznab endpoint (Jackett and
//! Prowlarr both serve it). One client instance per configured URL.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use super::{CandidateFile, IndexerCandidate, IndexerClient, IndexerError};

/// Torznab search client for a single endpoint.
pub struct TorznabClient {
    client: Client,
    endpoint: String,
    id: String,
}

impl TorznabClient {
    /// Create a client for one endpoint URL.
    ///
    /// No request timeout is set here; the query layer bounds requests
    /// with the configured search timeout.
    pub fn new(endpoint: impl Into<String>) -> Self {
        let endpoint = endpoint.into();
        let client = Client::builder()
            .build()
            .expect("Failed to create HTTP client");
        let id = indexer_id(&endpoint);
        Self {
            client,
            endpoint,
            id,
        }
    }

    fn build_url(&self, query: Option<&str>) -> String {
        let sep = if self.endpoint.contains('?') { '&' } else { '?' };
        match query {
            Some(q) => format!(
                "{}{}t=search&format=json&q={}",
                self.endpoint,
                sep,
                urlencoding::encode(q)
            ),
            None => format!("{}{}t=search&format=json", self.endpoint, sep),
        }
    }

    async fn fetch(&self, url: &str) -> Result<Vec<IndexerCandidate>, IndexerError> {
        debug!(indexer = %self.id, "Querying indexer");

        let response = self.client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                IndexerError::Timeout
            } else if e.is_connect() {
                IndexerError::ConnectionFailed(e.to_string())
            } else {
                IndexerError::ApiError(e.to_string())
            }
        })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(IndexerError::ApiError(format!(
                "HTTP {}: {}",
                status,
                body.chars().take(200).collect::<String>()
            )));
        }

        let parsed: TorznabResponse = response
            .json()
            .await
            .map_err(|e| IndexerError::ParseError(e.to_string()))?;

        debug!(
            indexer = %self.id,
            results = parsed.Results.len(),
            "Indexer query complete"
        );

        Ok(parsed
            .Results
            .into_iter()
            .filter_map(|r| {
                // A candidate without any retrieval link is useless
                let link = r.MagnetUri.or(r.Link)?;
                Some(IndexerCandidate {
                    title: r.Title,
                    size_bytes: r.Size.unwrap_or(0).max(0) as u64,
                    link,
                    indexer: self.id.clone(),
                    publish_date: r.PublishDate.and_then(|d| parse_torznab_date(&d)),
                    files: r.Files.map(|files| {
                        files
                            .into_iter()
                            .map(|f| CandidateFile {
                                path: f.Name,
                                size_bytes: f.Size.max(0) as u64,
                            })
                            .collect()
                    }),
                })
            })
            .collect())
    }
}

#[async_trait]
impl IndexerClient for TorznabClient {
    fn id(&self) -> &str {
        &self.id
    }

    async fn search(&self, query: &str) -> Result<Vec<IndexerCandidate>, IndexerError> {
        self.fetch(&self.build_url(Some(query))).await
    }

    async fn recent(&self) -> Result<Vec<IndexerCandidate>, IndexerError> {
        self.fetch(&self.build_url(None)).await
    }
}

/// Torznab JSON results envelope.
#[derive(Debug, Deserialize)]
#[allow(non_snake_case)]
struct TorznabResponse {
    #[serde(default)]
    Results: Vec<TorznabResult>,
}

#[derive(Debug, Deserialize)]
#[allow(non_snake_case)]
struct TorznabResult {
    Title: String,
    Size: Option<i64>,
    Link: Option<String>,
    MagnetUri: Option<String>,
    PublishDate: Option<String>,
    Files: Option<Vec<TorznabFile>>,
}

#[derive(Debug, Deserialize)]
#[allow(non_snake_case)]
struct TorznabFile {
    Name: String,
    Size: i64,
}

/// Parse a Torznab publish date (RFC 3339 with an RFC 2822 fallback).
fn parse_torznab_date(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .or_else(|_| DateTime::parse_from_rfc2822(s))
        .map(|d| d.with_timezone(&Utc))
        .ok()
}

/// Derive a stable indexer id from an endpoint URL: host plus path,
/// without scheme or query (query strings carry API keys).
fn indexer_id(url: &str) -> String {
    let without_scheme = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))
        .unwrap_or(url);
    without_scheme
        .split('?')
        .next()
        .unwrap_or(without_scheme)
        .trim_end_matches('/')
        .to_string()
}
