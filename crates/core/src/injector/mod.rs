//! Match application.
//!
//! A positive match either gets recorded to the output directory
//! (`save`) or handed to the configured client backend (`inject`).
//! Data-based matches are injected through a link tree so the client
//! sees a save path that actually contains the data. Every failure is
//! caught here and reported as a failed record; nothing in this module
//! aborts a search cycle.

mod linker;
mod types;

pub use linker::{materialize_link_tree, LinkType};
pub use types::{Action, InjectionOutcome, InjectionRecord, InjectorError};

use chrono::Utc;
use reqwest::Client;
use std::sync::Arc;
use tokio::fs;
use tracing::{info, warn};

use crate::config::ActionConfig;
use crate::history::HistoryStore;
use crate::indexer::IndexerCandidate;
use crate::matcher::MatchResult;
use crate::metrics;
use crate::notify::Notifier;
use crate::searchee::Searchee;
use crate::torrent_client::{InjectRequest, TorrentClient};

/// Suffix appended to the source category when `duplicate_categories`
/// is enabled.
const CATEGORY_SUFFIX: &str = ".cross-seed";

/// Applies confirmed matches.
pub struct Injector {
    config: ActionConfig,
    client: Option<Arc<dyn TorrentClient>>,
    history: Arc<dyn HistoryStore>,
    notifier: Notifier,
    http: Client,
}

impl Injector {
    pub fn new(
        config: ActionConfig,
        client: Option<Arc<dyn TorrentClient>>,
        history: Arc<dyn HistoryStore>,
        notifier: Notifier,
    ) -> Self {
        let mut builder = Client::builder();
        if let Some(ref timeout) = config.snatch_timeout {
            builder = builder.timeout(timeout.as_duration());
        }
        let http = builder.build().expect("Failed to create HTTP client");

        Self {
            config,
            client,
            history,
            notifier,
            http,
        }
    }

    /// Apply one match and return the record of what happened.
    ///
    /// Failures are folded into the record; the caller only has to keep
    /// going.
    pub async fn apply(
        &self,
        searchee: &Searchee,
        candidate: &IndexerCandidate,
        matched: &MatchResult,
    ) -> InjectionRecord {
        let result = match self.config.action {
            Action::Save => self.save(candidate).await.map(|()| (InjectionOutcome::Saved, None, None)),
            Action::Inject => self.inject(searchee, candidate).await,
        };

        let record = match result {
            Ok((outcome, client, category)) => InjectionRecord {
                id: uuid::Uuid::new_v4().to_string(),
                searchee_id: searchee.id.clone(),
                searchee_name: searchee.name.clone(),
                candidate_title: candidate.title.clone(),
                indexer: candidate.indexer.clone(),
                outcome,
                client,
                category,
                error: None,
                timestamp: Utc::now(),
            },
            Err(e) => InjectionRecord {
                id: uuid::Uuid::new_v4().to_string(),
                searchee_id: searchee.id.clone(),
                searchee_name: searchee.name.clone(),
                candidate_title: candidate.title.clone(),
                indexer: candidate.indexer.clone(),
                outcome: InjectionOutcome::Failed,
                client: match self.config.action {
                    Action::Save => None,
                    Action::Inject => self.client.as_ref().map(|c| c.name().to_string()),
                },
                category: None,
                error: Some(e.to_string()),
                timestamp: Utc::now(),
            },
        };

        metrics::INJECTIONS_TOTAL
            .with_label_values(&[record.outcome.as_str()])
            .inc();
        metrics::MATCHES_FOUND
            .with_label_values(&[matched.confidence.as_str()])
            .inc();

        if let Err(e) = self.history.record_injection(&record) {
            warn!("Failed to persist injection record: {}", e);
        }

        match record.outcome {
            InjectionOutcome::Failed => {
                warn!(
                    "Failed to apply match {} -> {}: {}",
                    searchee.name,
                    candidate.title,
                    record.error.as_deref().unwrap_or("unknown")
                );
                self.notifier.notify(
                    "reseed: injection failed",
                    &format!(
                        "{} matched {} on {} but could not be applied: {}",
                        searchee.name,
                        candidate.title,
                        candidate.indexer,
                        record.error.as_deref().unwrap_or("unknown")
                    ),
                );
            }
            outcome => {
                info!(
                    "Cross-seed {}: {} -> {} ({}, {})",
                    outcome.as_str(),
                    searchee.name,
                    candidate.title,
                    candidate.indexer,
                    matched.confidence.as_str()
                );
                self.notifier.notify(
                    "reseed: cross-seed found",
                    &format!(
                        "{} matched {} on {} ({})",
                        searchee.name,
                        candidate.title,
                        candidate.indexer,
                        outcome.as_str()
                    ),
                );
            }
        }

        record
    }

    /// Write the matched torrent (or magnet link) to the output
    /// directory for manual handling.
    async fn save(&self, candidate: &IndexerCandidate) -> Result<(), InjectorError> {
        fs::create_dir_all(&self.config.output_dir)
            .await
            .map_err(|source| InjectorError::Io {
                path: self.config.output_dir.clone(),
                source,
            })?;

        let stem = sanitize_filename(&candidate.title);

        if candidate.is_magnet() {
            let path = self.config.output_dir.join(format!("{}.magnet", stem));
            fs::write(&path, &candidate.link)
                .await
                .map_err(|source| InjectorError::Io { path, source })?;
        } else {
            let data = self.snatch(&candidate.link).await?;
            let path = self.config.output_dir.join(format!("{}.torrent", stem));
            fs::write(&path, &data)
                .await
                .map_err(|source| InjectorError::Io { path, source })?;
        }

        Ok(())
    }

    /// Hand the matched torrent to the configured client.
    async fn inject(
        &self,
        searchee: &Searchee,
        candidate: &IndexerCandidate,
    ) -> Result<(InjectionOutcome, Option<String>, Option<String>), InjectorError> {
        let client = self.client.as_ref().ok_or(InjectorError::ClientMissing)?;

        // Data-based matches need a link tree as their save path;
        // torrent-based matches let the client use its own layout.
        let save_path = if searchee.is_data_based() {
            let link_dir = self
                .config
                .link_dir
                .as_ref()
                .ok_or(InjectorError::LinkDirMissing)?;
            let tree =
                materialize_link_tree(searchee, link_dir, self.config.link_type).await?;
            Some(tree.to_string_lossy().to_string())
        } else {
            None
        };

        let category = self.category_for(searchee, client.as_ref());

        let mut request = if candidate.is_magnet() {
            InjectRequest::from_magnet(candidate.link.clone())
        } else {
            let data = self.snatch(&candidate.link).await?;
            InjectRequest::from_file(data)
                .with_filename(format!("{}.torrent", sanitize_filename(&candidate.title)))
        };

        if let Some(path) = save_path {
            request = request.with_save_path(path);
        }
        if let Some(ref cat) = category {
            request = request.with_category(cat.clone());
        }
        request = request.with_skip_recheck(self.config.skip_recheck);

        client.inject(request).await?;

        Ok((
            InjectionOutcome::Injected,
            Some(client.name().to_string()),
            category,
        ))
    }

    /// Decide the category for an injection.
    fn category_for(&self, searchee: &Searchee, client: &dyn TorrentClient) -> Option<String> {
        if !client.supports_categories() {
            return None;
        }

        if self.config.duplicate_categories {
            if let Some(ref category) = searchee.category {
                return Some(format!("{}{}", category, CATEGORY_SUFFIX));
            }
        }

        if searchee.is_data_based() {
            return Some(self.config.data_category.clone());
        }

        None
    }

    /// Download a .torrent file, bounded by the snatch timeout.
    async fn snatch(&self, url: &str) -> Result<Vec<u8>, InjectorError> {
        let response = self.http.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                InjectorError::SnatchTimeout(url.to_string())
            } else {
                InjectorError::SnatchFailed {
                    url: url.to_string(),
                    reason: e.to_string(),
                }
            }
        })?;

        if !response.status().is_success() {
            return Err(InjectorError::SnatchFailed {
                url: url.to_string(),
                reason: format!("HTTP {}", response.status()),
            });
        }

        let bytes = response.bytes().await.map_err(|e| InjectorError::SnatchFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

        Ok(bytes.to_vec())
    }
}

/// Make a release title safe to use as a file name.
fn sanitize_filename(title: &str) -> String {
    title
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c => c,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matcher::{MatchConfidence, MatchMode};
    use crate::testing::{fixtures, MockHistory, MockTorrentClient};
    use tempfile::TempDir;

    fn match_result() -> MatchResult {
        MatchResult {
            mode: MatchMode::Risky,
            confidence: MatchConfidence::SizeOnly,
            file_map: None,
        }
    }

    fn action_config(temp: &TempDir, action: Action) -> ActionConfig {
        ActionConfig {
            action,
            output_dir: temp.path().join("out"),
            link_dir: Some(temp.path().join("links")),
            link_type: LinkType::Hardlink,
            skip_recheck: true,
            data_category: "cross-seed-data".to_string(),
            duplicate_categories: false,
            snatch_timeout: None,
        }
    }

    #[tokio::test]
    async fn test_save_magnet_writes_file_and_skips_client() {
        let temp = TempDir::new().unwrap();
        let client = Arc::new(MockTorrentClient::new());
        let history = Arc::new(MockHistory::new());

        let injector = Injector::new(
            action_config(&temp, Action::Save),
            Some(Arc::clone(&client) as Arc<dyn TorrentClient>),
            Arc::clone(&history) as Arc<dyn HistoryStore>,
            Notifier::disabled(),
        );

        let searchee = fixtures::searchee("Some.Movie", &[("movie.mkv", 1000)]);
        let candidate = fixtures::magnet_candidate("Some Movie", 1000, "idx");

        let record = injector.apply(&searchee, &candidate, &match_result()).await;

        assert_eq!(record.outcome, InjectionOutcome::Saved);
        assert!(record.client.is_none());
        // A save never touches the client backend
        assert_eq!(client.inject_count().await, 0);

        let saved = temp.path().join("out").join("Some Movie.magnet");
        assert!(saved.exists());
        assert!(history.recorded_injections().len() == 1);
    }

    #[tokio::test]
    async fn test_inject_torrent_based_match() {
        let temp = TempDir::new().unwrap();
        let client = Arc::new(MockTorrentClient::new());
        let history = Arc::new(MockHistory::new());

        let injector = Injector::new(
            action_config(&temp, Action::Inject),
            Some(Arc::clone(&client) as Arc<dyn TorrentClient>),
            history,
            Notifier::disabled(),
        );

        let searchee = fixtures::torrent_searchee("Some.Movie", &[("movie.mkv", 1000)], "abc123");
        let candidate = fixtures::magnet_candidate("Some Movie", 1000, "idx");

        let record = injector.apply(&searchee, &candidate, &match_result()).await;

        assert_eq!(record.outcome, InjectionOutcome::Injected);
        assert_eq!(record.client.as_deref(), Some("mock"));

        let requests = client.recorded_requests().await;
        assert_eq!(requests.len(), 1);
        // Torrent-based matches have no link tree and no path override
        assert!(requests[0].save_path.is_none());
        assert!(requests[0].skip_recheck);
    }

    #[tokio::test]
    async fn test_inject_data_based_match_builds_link_tree() {
        let temp = TempDir::new().unwrap();
        let data = temp.path().join("data");
        tokio::fs::create_dir_all(data.join("Movie.2021"))
            .await
            .unwrap();
        tokio::fs::write(data.join("Movie.2021/movie.mkv"), vec![0u8; 64])
            .await
            .unwrap();

        let client = Arc::new(MockTorrentClient::new());
        let injector = Injector::new(
            action_config(&temp, Action::Inject),
            Some(Arc::clone(&client) as Arc<dyn TorrentClient>),
            Arc::new(MockHistory::new()),
            Notifier::disabled(),
        );

        let searchee = fixtures::data_searchee(
            "Movie.2021",
            &data,
            &[("Movie.2021/movie.mkv", 64)],
        );
        let candidate = fixtures::magnet_candidate("Movie 2021", 64, "idx");

        let record = injector.apply(&searchee, &candidate, &match_result()).await;
        assert_eq!(record.outcome, InjectionOutcome::Injected);
        assert_eq!(record.category.as_deref(), Some("cross-seed-data"));

        let requests = client.recorded_requests().await;
        let save_path = requests[0].save_path.as_ref().unwrap();
        assert!(save_path.starts_with(temp.path().join("links").to_str().unwrap()));
        // The link tree actually exists and holds the file
        assert!(std::path::Path::new(save_path)
            .join("Movie.2021/movie.mkv")
            .exists());
    }

    #[tokio::test]
    async fn test_duplicate_categories_derives_from_source() {
        let temp = TempDir::new().unwrap();
        let data = temp.path().join("movies");
        tokio::fs::create_dir_all(data.join("Movie.2021"))
            .await
            .unwrap();
        tokio::fs::write(data.join("Movie.2021/movie.mkv"), vec![0u8; 8])
            .await
            .unwrap();

        let mut config = action_config(&temp, Action::Inject);
        config.duplicate_categories = true;

        let client = Arc::new(MockTorrentClient::new());
        let injector = Injector::new(
            config,
            Some(Arc::clone(&client) as Arc<dyn TorrentClient>),
            Arc::new(MockHistory::new()),
            Notifier::disabled(),
        );

        let mut searchee =
            fixtures::data_searchee("Movie.2021", &data, &[("Movie.2021/movie.mkv", 8)]);
        searchee.category = Some("movies".to_string());
        let candidate = fixtures::magnet_candidate("Movie 2021", 8, "idx");

        let record = injector.apply(&searchee, &candidate, &match_result()).await;
        assert_eq!(record.category.as_deref(), Some("movies.cross-seed"));
    }

    #[tokio::test]
    async fn test_category_ignored_without_label_support() {
        let temp = TempDir::new().unwrap();
        let data = temp.path().join("movies");
        tokio::fs::create_dir_all(data.join("Movie.2021"))
            .await
            .unwrap();
        tokio::fs::write(data.join("Movie.2021/movie.mkv"), vec![0u8; 8])
            .await
            .unwrap();

        let client = Arc::new(MockTorrentClient::new());
        client.set_supports_categories(false).await;

        let injector = Injector::new(
            action_config(&temp, Action::Inject),
            Some(Arc::clone(&client) as Arc<dyn TorrentClient>),
            Arc::new(MockHistory::new()),
            Notifier::disabled(),
        );

        let searchee =
            fixtures::data_searchee("Movie.2021", &data, &[("Movie.2021/movie.mkv", 8)]);
        let candidate = fixtures::magnet_candidate("Movie 2021", 8, "idx");

        let record = injector.apply(&searchee, &candidate, &match_result()).await;
        assert_eq!(record.outcome, InjectionOutcome::Injected);
        assert!(record.category.is_none());
    }

    #[tokio::test]
    async fn test_client_failure_yields_failed_record() {
        let temp = TempDir::new().unwrap();
        let client = Arc::new(MockTorrentClient::new());
        client
            .set_next_error(crate::torrent_client::TorrentClientError::ConnectionFailed(
                "refused".to_string(),
            ))
            .await;

        let history = Arc::new(MockHistory::new());
        let injector = Injector::new(
            action_config(&temp, Action::Inject),
            Some(Arc::clone(&client) as Arc<dyn TorrentClient>),
            Arc::clone(&history) as Arc<dyn HistoryStore>,
            Notifier::disabled(),
        );

        let searchee = fixtures::torrent_searchee("X", &[("x.mkv", 10)], "hash");
        let candidate = fixtures::magnet_candidate("X", 10, "idx");

        let record = injector.apply(&searchee, &candidate, &match_result()).await;
        assert_eq!(record.outcome, InjectionOutcome::Failed);
        assert!(record.error.as_deref().unwrap().contains("refused"));
        // The failure is recorded, not raised
        assert_eq!(history.recorded_injections().len(), 1);
    }

    #[tokio::test]
    async fn test_data_match_without_link_dir_fails() {
        let temp = TempDir::new().unwrap();
        let mut config = action_config(&temp, Action::Inject);
        config.link_dir = None;

        let client = Arc::new(MockTorrentClient::new());
        let injector = Injector::new(
            config,
            Some(Arc::clone(&client) as Arc<dyn TorrentClient>),
            Arc::new(MockHistory::new()),
            Notifier::disabled(),
        );

        let searchee = fixtures::searchee("X", &[("x.mkv", 10)]);
        let candidate = fixtures::magnet_candidate("X", 10, "idx");

        let record = injector.apply(&searchee, &candidate, &match_result()).await;
        assert_eq!(record.outcome, InjectionOutcome::Failed);
        assert_eq!(client.inject_count().await, 0);
    }

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(
            sanitize_filename("A/B\\C:D*E?F\"G<H>I|J"),
            "A_B_C_D_E_F_G_H_I_J"
        );
        assert_eq!(sanitize_filename("Normal.Name"), "Normal.Name");
    }
}
