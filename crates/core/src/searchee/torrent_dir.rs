//! Torrent-file origin: every parsed .torrent in the torrent directory
//! becomes one candidate entity.

use std::path::Path;
use tokio::fs;
use tracing::warn;

use super::filter::classify;
use super::metainfo::parse_metainfo;
use super::{ScannedEntity, SearcheeError};

/// Scan a directory of .torrent files.
///
/// Unparseable files are skipped with a warning; they never fail the scan.
pub(super) async fn scan_torrent_dir(dir: &Path) -> Result<Vec<ScannedEntity>, SearcheeError> {
    let mut entities = Vec::new();

    let mut entries = fs::read_dir(dir).await.map_err(|source| SearcheeError::Io {
        path: dir.to_path_buf(),
        source,
    })?;

    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|source| SearcheeError::Io {
            path: dir.to_path_buf(),
            source,
        })?
    {
        let path = entry.path();
        let is_torrent = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.eq_ignore_ascii_case("torrent"))
            .unwrap_or(false);
        if !is_torrent {
            continue;
        }

        let bytes = fs::read(&path).await.map_err(|source| SearcheeError::Io {
            path: path.clone(),
            source,
        })?;

        match parse_metainfo(&bytes) {
            Ok(meta) => {
                let kind = classify(&meta.name, &meta.files, None);
                entities.push(ScannedEntity {
                    id: meta.info_hash.clone(),
                    name: meta.name,
                    files: meta.files,
                    info_hash: Some(meta.info_hash),
                    category: None,
                    save_path: dir.to_path_buf(),
                    kind,
                });
            }
            Err(e) => {
                warn!("Skipping unparseable torrent file {}: {}", path.display(), e);
            }
        }
    }

    Ok(entities)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn single_file_torrent(name: &str, size: u64) -> Vec<u8> {
        let pieces = [0u8; 20];
        let mut out = Vec::new();
        out.extend_from_slice(
            format!(
                "d4:infod6:lengthi{}e4:name{}:{}12:piece lengthi16384e6:pieces20:",
                size,
                name.len(),
                name
            )
            .as_bytes(),
        );
        out.extend_from_slice(&pieces);
        out.extend_from_slice(b"ee");
        out
    }

    #[tokio::test]
    async fn test_scan_empty_dir() {
        let temp = TempDir::new().unwrap();
        let entities = scan_torrent_dir(temp.path()).await.unwrap();
        assert!(entities.is_empty());
    }

    #[tokio::test]
    async fn test_scan_finds_torrents_and_skips_garbage() {
        let temp = TempDir::new().unwrap();
        fs::write(
            temp.path().join("release.torrent"),
            single_file_torrent("Some.Release.mkv", 1000),
        )
        .await
        .unwrap();
        fs::write(temp.path().join("broken.torrent"), b"garbage")
            .await
            .unwrap();
        fs::write(temp.path().join("notes.txt"), b"not a torrent")
            .await
            .unwrap();

        let entities = scan_torrent_dir(temp.path()).await.unwrap();
        assert_eq!(entities.len(), 1);
        assert_eq!(entities[0].name, "Some.Release.mkv");
        assert!(entities[0].info_hash.is_some());
        assert_eq!(entities[0].files.len(), 1);
        assert_eq!(entities[0].files[0].size_bytes, 1000);
    }

    #[tokio::test]
    async fn test_scan_missing_dir_fails() {
        let result = scan_torrent_dir(Path::new("/nonexistent/torrents")).await;
        assert!(matches!(result, Err(SearcheeError::Io { .. })));
    }
}
