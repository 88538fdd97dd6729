//! Searchee enumeration.
//!
//! Local content comes from two origins merged into one stream: parsed
//! .torrent files and scanned data directories. Both are normalized into
//! the `Searchee` shape, then run through the content policy and the
//! age/recent-search windows before a cycle sees them.

mod data_dirs;
mod filter;
mod metainfo;
mod torrent_dir;
mod types;

pub use filter::{classify, ContentPolicy, ReleaseKind};
pub use metainfo::{parse_metainfo, MetainfoError, TorrentMeta};
pub use types::{data_entity_id, Searchee, SearcheeError, SearcheeFile};

use chrono::Utc;
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

use crate::config::SourcesConfig;
use crate::history::HistoryStore;

/// An entity discovered on disk, before history and policy are applied.
#[derive(Debug, Clone)]
pub(crate) struct ScannedEntity {
    pub id: String,
    pub name: String,
    pub files: Vec<SearcheeFile>,
    pub info_hash: Option<String>,
    pub category: Option<String>,
    pub save_path: PathBuf,
    pub kind: ReleaseKind,
}

impl ScannedEntity {
    #[cfg(test)]
    pub fn total_size(&self) -> u64 {
        self.files.iter().map(|f| f.size_bytes).sum()
    }
}

/// Enumerates eligible searchees at the start of each cycle.
///
/// The list is recomputed on every call; nothing is kept between cycles
/// except what the history store records.
pub struct SearcheeSource {
    config: SourcesConfig,
    history: Arc<dyn HistoryStore>,
}

impl SearcheeSource {
    pub fn new(config: SourcesConfig, history: Arc<dyn HistoryStore>) -> Self {
        Self { config, history }
    }

    /// Enumerate all eligible searchees for this cycle.
    pub async fn enumerate(&self) -> Result<Vec<Searchee>, SearcheeError> {
        let policy = ContentPolicy {
            include_episodes: self.config.include_episodes,
            include_single_episodes: self.config.include_single_episodes,
            include_non_videos: self.config.include_non_videos,
        };

        let mut scanned = Vec::new();
        if let Some(ref dir) = self.config.torrent_dir {
            scanned.extend(torrent_dir::scan_torrent_dir(dir).await?);
        }
        for dir in &self.config.data_dirs {
            scanned.extend(data_dirs::scan_data_dir(dir, self.config.max_data_depth).await?);
        }

        let now = Utc::now();
        let mut seen_ids = HashSet::new();
        let mut searchees = Vec::new();

        for entity in scanned {
            if !seen_ids.insert(entity.id.clone()) {
                continue;
            }

            if !policy.allows(entity.kind) {
                debug!(
                    "Excluding {} ({:?}): not eligible under content policy",
                    entity.name, entity.kind
                );
                continue;
            }

            let first_seen = self
                .history
                .ensure_seen(&entity.id, &entity.name)
                .map_err(|e| SearcheeError::History(e.to_string()))?;

            if let Some(ref max_age) = self.config.exclude_older {
                let age = now.signed_duration_since(first_seen);
                let limit = chrono::Duration::from_std(max_age.as_duration())
                    .unwrap_or_else(|_| chrono::Duration::MAX);
                if age > limit {
                    debug!(
                        "Excluding {}: first seen {} ago, older than {}",
                        entity.name, age, max_age
                    );
                    continue;
                }
            }

            let last_searched = self
                .history
                .last_searched(&entity.id)
                .map_err(|e| SearcheeError::History(e.to_string()))?;

            if let (Some(window), Some(searched_at)) =
                (&self.config.exclude_recent_search, last_searched)
            {
                let since = now.signed_duration_since(searched_at);
                let limit = chrono::Duration::from_std(window.as_duration())
                    .unwrap_or_else(|_| chrono::Duration::MAX);
                if since < limit {
                    debug!(
                        "Skipping {} for this cycle: searched {} ago",
                        entity.name, since
                    );
                    continue;
                }
            }

            searchees.push(Searchee::new(
                entity.id,
                entity.name,
                entity.files,
                entity.info_hash,
                entity.category,
                entity.save_path,
                first_seen,
                last_searched,
            )?);
        }

        info!("Enumerated {} eligible searchees", searchees.len());
        Ok(searchees)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Span;
    use crate::testing::MockHistory;
    use tempfile::TempDir;
    use tokio::fs;

    fn sources_config(temp: &TempDir) -> SourcesConfig {
        SourcesConfig {
            torrent_dir: None,
            data_dirs: vec![temp.path().to_path_buf()],
            max_data_depth: 1,
            include_episodes: false,
            include_single_episodes: false,
            include_non_videos: true,
            exclude_older: None,
            exclude_recent_search: None,
        }
    }

    async fn write_release(temp: &TempDir, name: &str, file: &str, size: usize) {
        let dir = temp.path().join(name);
        fs::create_dir_all(&dir).await.unwrap();
        fs::write(dir.join(file), vec![0u8; size]).await.unwrap();
    }

    #[tokio::test]
    async fn test_enumerate_data_dir() {
        let temp = TempDir::new().unwrap();
        write_release(&temp, "Movie.2021.1080p", "movie.mkv", 100).await;

        let history = Arc::new(MockHistory::new());
        let source = SearcheeSource::new(sources_config(&temp), history);

        let searchees = source.enumerate().await.unwrap();
        assert_eq!(searchees.len(), 1);
        assert_eq!(searchees[0].name, "Movie.2021.1080p");
        assert_eq!(searchees[0].total_size, 100);
        assert!(searchees[0].is_data_based());
    }

    #[tokio::test]
    async fn test_exclude_older_removes_entity_entirely() {
        let temp = TempDir::new().unwrap();
        write_release(&temp, "Old.Movie.1999", "movie.mkv", 100).await;

        let history = Arc::new(MockHistory::new());
        let id = data_entity_id(&temp.path().join("Old.Movie.1999"));
        history.set_first_seen(&id, Utc::now() - chrono::Duration::weeks(12));

        let mut config = sources_config(&temp);
        config.exclude_older = Some("9w".parse::<Span>().unwrap());

        let source = SearcheeSource::new(config, history);
        let searchees = source.enumerate().await.unwrap();
        assert!(searchees.is_empty());
    }

    #[tokio::test]
    async fn test_exclude_recent_search_skips_then_returns() {
        let temp = TempDir::new().unwrap();
        write_release(&temp, "Movie.2021", "movie.mkv", 100).await;

        let history = Arc::new(MockHistory::new());
        let id = data_entity_id(&temp.path().join("Movie.2021"));

        let mut config = sources_config(&temp);
        config.exclude_recent_search = Some("3w".parse::<Span>().unwrap());
        let source = SearcheeSource::new(config, Arc::clone(&history) as Arc<dyn HistoryStore>);

        // Searched yesterday: skipped this cycle
        history
            .set_last_searched(&id, Utc::now() - chrono::Duration::days(1))
            .unwrap();
        assert!(source.enumerate().await.unwrap().is_empty());

        // Searched a month ago: eligible again
        history
            .set_last_searched(&id, Utc::now() - chrono::Duration::weeks(4))
            .unwrap();
        assert_eq!(source.enumerate().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_content_policy_applied() {
        let temp = TempDir::new().unwrap();
        write_release(&temp, "Show.S01E01.1080p", "episode.mkv", 100).await;
        write_release(&temp, "Movie.2021.1080p", "movie.mkv", 100).await;

        let mut config = sources_config(&temp);
        config.include_single_episodes = false;
        let source = SearcheeSource::new(config, Arc::new(MockHistory::new()));

        let searchees = source.enumerate().await.unwrap();
        assert_eq!(searchees.len(), 1);
        assert_eq!(searchees[0].name, "Movie.2021.1080p");
    }

    #[tokio::test]
    async fn test_first_seen_is_stable_across_enumerations() {
        let temp = TempDir::new().unwrap();
        write_release(&temp, "Movie.2021", "movie.mkv", 100).await;

        let history = Arc::new(MockHistory::new());
        let source = SearcheeSource::new(sources_config(&temp), history);

        let first = source.enumerate().await.unwrap();
        let second = source.enumerate().await.unwrap();
        assert_eq!(first[0].first_seen, second[0].first_seen);
    }
}
