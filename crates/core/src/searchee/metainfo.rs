//! Torrent metainfo parsing - extracts name, info hash and file listings
//! from .torrent files.
//!
//! Uses librqbit-core to parse bencoded data without touching the network.

use librqbit_core::torrent_metainfo::{torrent_from_bytes, TorrentMetaV1Owned};
use std::path::PathBuf;
use thiserror::Error;

use super::SearcheeFile;

/// Errors that can occur when parsing torrent metainfo.
#[derive(Debug, Error)]
pub enum MetainfoError {
    #[error("Failed to parse torrent: {0}")]
    ParseError(String),

    #[error("Empty torrent (no files)")]
    EmptyTorrent,
}

/// Parsed view of a .torrent file.
#[derive(Debug, Clone)]
pub struct TorrentMeta {
    /// Release name (root folder for multi-file, file name for single-file).
    pub name: String,
    /// Info hash, lowercase hex.
    pub info_hash: String,
    /// File listing with paths relative to the save path.
    pub files: Vec<SearcheeFile>,
}

/// Parse a .torrent file into name, info hash and file listing.
///
/// Supports both single-file and multi-file torrents.
pub fn parse_metainfo(bytes: &[u8]) -> Result<TorrentMeta, MetainfoError> {
    let torrent: TorrentMetaV1Owned =
        torrent_from_bytes(bytes).map_err(|e| MetainfoError::ParseError(e.to_string()))?;

    let info = &torrent.info;

    let name = info
        .name
        .as_ref()
        .map(|b| bytes_to_string(b.as_ref()))
        .unwrap_or_else(|| "unknown".to_string());

    let files = if let Some(ref files) = info.files {
        // Multi-file torrent: paths live under the root folder
        let mut result = Vec::with_capacity(files.len());
        for file in files {
            let mut path = PathBuf::from(&name);
            for part in &file.path {
                path.push(bytes_to_string(part.as_ref()));
            }
            result.push(SearcheeFile {
                path,
                size_bytes: file.length,
            });
        }
        if result.is_empty() {
            return Err(MetainfoError::EmptyTorrent);
        }
        result
    } else if let Some(length) = info.length {
        vec![SearcheeFile {
            path: PathBuf::from(&name),
            size_bytes: length,
        }]
    } else {
        return Err(MetainfoError::EmptyTorrent);
    };

    Ok(TorrentMeta {
        name,
        info_hash: torrent.info_hash.as_string(),
        files,
    })
}

/// Convert bencoded bytes to a UTF-8 string, falling back to lossy
/// conversion for badly-encoded torrents.
fn bytes_to_string(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => String::from_utf8_lossy(bytes).into_owned(),
    }
}
