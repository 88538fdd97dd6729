//! Torrent client backends.
//!
//! Four wire protocols (qBittorrent REST, rTorrent XML-RPC, Transmission
//! and Deluge JSON-RPC) behind one `TorrentClient` capability trait.

mod deluge;
mod qbittorrent;
mod rtorrent;
mod transmission;
mod types;

pub use deluge::DelugeClient;
pub use qbittorrent::QBittorrentClient;
pub use rtorrent::RTorrentClient;
pub use transmission::TransmissionClient;
pub use types::{
    extract_hash_from_magnet, InjectRequest, InjectResult, TorrentClient, TorrentClientError,
    TorrentSource,
};

use std::sync::Arc;
use std::time::Duration;

use crate::config::{ClientBackend, ClientConfig};

/// Build the configured client backend.
pub fn client_from_config(
    config: &ClientConfig,
    timeout: Option<Duration>,
) -> Result<Arc<dyn TorrentClient>, TorrentClientError> {
    match config.backend {
        ClientBackend::QBittorrent => {
            let backend_config = config.qbittorrent.clone().ok_or_else(|| {
                TorrentClientError::ApiError("missing [client.qbittorrent] table".to_string())
            })?;
            Ok(Arc::new(QBittorrentClient::new(backend_config, timeout)))
        }
        ClientBackend::RTorrent => {
            let backend_config = config.rtorrent.clone().ok_or_else(|| {
                TorrentClientError::ApiError("missing [client.rtorrent] table".to_string())
            })?;
            Ok(Arc::new(RTorrentClient::new(backend_config, timeout)))
        }
        ClientBackend::Transmission => {
            let backend_config = config.transmission.clone().ok_or_else(|| {
                TorrentClientError::ApiError("missing [client.transmission] table".to_string())
            })?;
            Ok(Arc::new(TransmissionClient::new(backend_config, timeout)))
        }
        ClientBackend::Deluge => {
            let backend_config = config.deluge.clone().ok_or_else(|| {
                TorrentClientError::ApiError("missing [client.deluge] table".to_string())
            })?;
            Ok(Arc::new(DelugeClient::new(backend_config, timeout)))
        }
    }
}
