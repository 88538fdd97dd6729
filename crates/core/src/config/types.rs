use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::path::PathBuf;

use crate::injector::{Action, LinkType};
use crate::matcher::MatchMode;
use crate::scheduler::SchedulerConfig;

use super::duration::Span;

/// Root configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub auth: AuthConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    pub sources: SourcesConfig,
    #[serde(rename = "match", default)]
    pub matching: MatchConfig,
    pub indexers: IndexersConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub action: ActionConfig,
    #[serde(default)]
    pub client: Option<ClientConfig>,
    #[serde(default)]
    pub notification: Option<NotificationConfig>,
}

/// Authentication configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AuthConfig {
    pub method: AuthMethod,
    #[serde(default)]
    pub api_key: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthMethod {
    None,
    ApiKey,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> IpAddr {
    "0.0.0.0".parse().unwrap()
}

fn default_port() -> u16 {
    2468
}

/// Database configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("reseed.db")
}

/// Where local content is discovered.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SourcesConfig {
    /// Directory containing .torrent files (client session/backup dir).
    #[serde(default)]
    pub torrent_dir: Option<PathBuf>,
    /// Data directories scanned for already-downloaded content.
    #[serde(default)]
    pub data_dirs: Vec<PathBuf>,
    /// How many directory levels below each data dir produce searchees.
    #[serde(default = "default_max_data_depth")]
    pub max_data_depth: usize,
    /// Include episodes that come from season packs. Overrides
    /// `include_single_episodes` when set.
    #[serde(default)]
    pub include_episodes: bool,
    /// Include standalone single-episode releases.
    #[serde(default)]
    pub include_single_episodes: bool,
    /// Include releases that contain no video files.
    #[serde(default)]
    pub include_non_videos: bool,
    /// Drop entities first seen longer ago than this.
    #[serde(default)]
    pub exclude_older: Option<Span>,
    /// Skip entities searched more recently than this.
    #[serde(default)]
    pub exclude_recent_search: Option<Span>,
}

fn default_max_data_depth() -> usize {
    2
}

/// Matching policy configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MatchConfig {
    #[serde(default)]
    pub mode: MatchMode,
    /// Relative size tolerance used by risky mode (0.02 = 2%).
    #[serde(default = "default_fuzzy_size_threshold")]
    pub fuzzy_size_threshold: f64,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            mode: MatchMode::default(),
            fuzzy_size_threshold: default_fuzzy_size_threshold(),
        }
    }
}

fn default_fuzzy_size_threshold() -> f64 {
    0.02
}

/// Indexer endpoints and query pacing.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct IndexersConfig {
    /// Torznab endpoint URLs, one per indexer.
    pub urls: Vec<String>,
    /// Minimum interval between successive indexer requests.
    #[serde(default = "default_delay")]
    pub delay: Span,
    /// Per-request timeout. Absent means requests may block indefinitely.
    #[serde(default)]
    pub search_timeout: Option<Span>,
}

fn default_delay() -> Span {
    Span::from_secs(30)
}

/// What to do with a confirmed match.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ActionConfig {
    #[serde(default)]
    pub action: Action,
    /// Where saved torrents/magnets are written (action = "save").
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    /// Where link trees for data-based matches are materialized.
    #[serde(default)]
    pub link_dir: Option<PathBuf>,
    #[serde(default)]
    pub link_type: LinkType,
    /// Skip the client's integrity recheck after injection.
    #[serde(default)]
    pub skip_recheck: bool,
    /// Category assigned to data-based injections.
    #[serde(default = "default_data_category")]
    pub data_category: String,
    /// Derive the injected category from the source category instead of
    /// `data_category` (clients with label support only).
    #[serde(default)]
    pub duplicate_categories: bool,
    /// Timeout for snatches and client RPCs. Absent means no timeout.
    #[serde(default)]
    pub snatch_timeout: Option<Span>,
}

impl Default for ActionConfig {
    fn default() -> Self {
        Self {
            action: Action::default(),
            output_dir: default_output_dir(),
            link_dir: None,
            link_type: LinkType::default(),
            skip_recheck: false,
            data_category: default_data_category(),
            duplicate_categories: false,
            snatch_timeout: None,
        }
    }
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("cross-seeds")
}

fn default_data_category() -> String {
    "cross-seed-data".to_string()
}

/// Torrent client backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ClientConfig {
    pub backend: ClientBackend,
    #[serde(default)]
    pub qbittorrent: Option<QBittorrentConfig>,
    #[serde(default)]
    pub rtorrent: Option<RTorrentConfig>,
    #[serde(default)]
    pub transmission: Option<TransmissionConfig>,
    #[serde(default)]
    pub deluge: Option<DelugeConfig>,
}

/// Available torrent client backends
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ClientBackend {
    QBittorrent,
    RTorrent,
    Transmission,
    Deluge,
}

/// qBittorrent WebUI configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct QBittorrentConfig {
    /// WebUI URL (e.g., "http://localhost:8080")
    pub url: String,
    pub username: String,
    pub password: String,
}

/// rTorrent XML-RPC configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RTorrentConfig {
    /// XML-RPC endpoint (e.g., "http://localhost:1234/RPC2")
    pub url: String,
}

/// Transmission RPC configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TransmissionConfig {
    /// RPC endpoint, usually ending in "/transmission/rpc"
    pub url: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

/// Deluge web JSON-RPC configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DelugeConfig {
    /// JSON-RPC endpoint, usually ending in "/json"
    pub url: String,
    /// WebUI password
    pub password: String,
}

/// Notification webhook configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NotificationConfig {
    /// POST target for `{title, body}` payloads (apprise-compatible).
    pub webhook_url: String,
}

/// Sanitized config for API responses (secrets redacted)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub auth: SanitizedAuthConfig,
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub sources: SourcesConfig,
    pub matching: MatchConfig,
    pub indexers: SanitizedIndexersConfig,
    pub scheduler: SchedulerConfig,
    pub action: ActionConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client: Option<SanitizedClientConfig>,
    pub notification_configured: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct SanitizedAuthConfig {
    pub method: String,
    pub api_key_configured: bool,
}

/// Indexer URLs carry embedded API keys, so only the count is exposed.
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedIndexersConfig {
    pub count: usize,
    pub delay: Span,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search_timeout: Option<Span>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SanitizedClientConfig {
    pub backend: String,
    pub url: String,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        Self {
            auth: SanitizedAuthConfig {
                method: match config.auth.method {
                    AuthMethod::None => "none".to_string(),
                    AuthMethod::ApiKey => "api_key".to_string(),
                },
                api_key_configured: config
                    .auth
                    .api_key
                    .as_ref()
                    .map(|k| !k.is_empty())
                    .unwrap_or(false),
            },
            server: config.server.clone(),
            database: config.database.clone(),
            sources: config.sources.clone(),
            matching: config.matching.clone(),
            indexers: SanitizedIndexersConfig {
                count: config.indexers.urls.len(),
                delay: config.indexers.delay.clone(),
                search_timeout: config.indexers.search_timeout.clone(),
            },
            scheduler: config.scheduler.clone(),
            action: config.action.clone(),
            client: config.client.as_ref().map(|c| {
                let (backend, url) = match c.backend {
                    ClientBackend::QBittorrent => (
                        "qbittorrent",
                        c.qbittorrent.as_ref().map(|q| q.url.clone()),
                    ),
                    ClientBackend::RTorrent => {
                        ("rtorrent", c.rtorrent.as_ref().map(|r| r.url.clone()))
                    }
                    ClientBackend::Transmission => (
                        "transmission",
                        c.transmission.as_ref().map(|t| t.url.clone()),
                    ),
                    ClientBackend::Deluge => {
                        ("deluge", c.deluge.as_ref().map(|d| d.url.clone()))
                    }
                };
                SanitizedClientConfig {
                    backend: backend.to_string(),
                    url: url.unwrap_or_default(),
                }
            }),
            notification_configured: config.notification.is_some(),
        }
    }
}
