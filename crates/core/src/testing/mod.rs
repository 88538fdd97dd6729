//! Testing utilities and mock implementations.
//!
//! Mock implementations of the external service traits, allowing full
//! cycle tests without real indexers, clients or databases.

mod mock_history;
mod mock_indexer;
mod mock_torrent_client;

pub use mock_history::MockHistory;
pub use mock_indexer::MockIndexerClient;
pub use mock_torrent_client::MockTorrentClient;

/// Test fixtures and helper functions.
pub mod fixtures {
    use chrono::Utc;
    use std::path::{Path, PathBuf};

    use crate::indexer::IndexerCandidate;
    use crate::searchee::{Searchee, SearcheeFile};

    fn files(parts: &[(&str, u64)]) -> Vec<SearcheeFile> {
        parts
            .iter()
            .map(|(p, s)| SearcheeFile {
                path: PathBuf::from(p),
                size_bytes: *s,
            })
            .collect()
    }

    /// A data-based searchee rooted at a placeholder path.
    pub fn searchee(name: &str, file_parts: &[(&str, u64)]) -> Searchee {
        Searchee::new(
            format!("data:/data/{}", name),
            name,
            files(file_parts),
            None,
            None,
            "/data",
            Utc::now(),
            None,
        )
        .unwrap()
    }

    /// A torrent-file-derived searchee with the given info hash.
    pub fn torrent_searchee(name: &str, file_parts: &[(&str, u64)], info_hash: &str) -> Searchee {
        Searchee::new(
            info_hash,
            name,
            files(file_parts),
            Some(info_hash.to_string()),
            None,
            "/torrents",
            Utc::now(),
            None,
        )
        .unwrap()
    }

    /// A data-based searchee rooted at a real directory (for link tests).
    pub fn data_searchee(name: &str, save_path: &Path, file_parts: &[(&str, u64)]) -> Searchee {
        Searchee::new(
            format!("data:{}/{}", save_path.display(), name),
            name,
            files(file_parts),
            None,
            None,
            save_path,
            Utc::now(),
            None,
        )
        .unwrap()
    }

    /// An indexer candidate with a .torrent download link.
    pub fn candidate(title: &str, size_bytes: u64, indexer: &str) -> IndexerCandidate {
        IndexerCandidate {
            title: title.to_string(),
            size_bytes,
            link: format!(
                "http://{}/dl/{}.torrent",
                indexer,
                title.to_lowercase().replace(' ', "-")
            ),
            indexer: indexer.to_string(),
            publish_date: None,
            files: None,
        }
    }

    /// An indexer candidate with a magnet link.
    pub fn magnet_candidate(title: &str, size_bytes: u64, indexer: &str) -> IndexerCandidate {
        let mut c = candidate(title, size_bytes, indexer);
        c.link = format!(
            "magnet:?xt=urn:btih:{:040x}&dn={}",
            size_bytes,
            urlencoding::encode(title)
        );
        c
    }
}
