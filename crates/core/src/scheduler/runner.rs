//! Scheduler implementation.
//!
//! Two independently-cadenced tasks share one set of components: the
//! activity poll matches recent indexer listings against local content,
//! the full search queries every indexer for every eligible searchee.
//! Each task is serialized against itself (a run cannot start while the
//! previous run of the same task is in flight) but the two tasks may
//! overlap each other. The search budget is the only state they share.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, info, warn};

use crate::history::HistoryStore;
use crate::indexer::IndexerPool;
use crate::injector::{InjectionOutcome, Injector};
use crate::matcher;
use crate::config::MatchConfig;
use crate::metrics;
use crate::searchee::SearcheeSource;

use super::budget::SearchBudget;
use super::config::SchedulerConfig;
use super::types::{CycleSummary, SchedulerError, SchedulerStatus, TaskKind};

/// Everything one cycle needs, shared by the loops and the on-demand
/// triggers.
struct CycleContext {
    source: SearcheeSource,
    pool: IndexerPool,
    injector: Injector,
    history: Arc<dyn HistoryStore>,
    match_config: MatchConfig,
    budget: SearchBudget,
    search_lock: Mutex<()>,
    rss_lock: Mutex<()>,
    search_runs: AtomicU64,
    rss_runs: AtomicU64,
}

/// Drives the periodic cross-seed tasks.
pub struct Scheduler {
    config: SchedulerConfig,
    ctx: Arc<CycleContext>,
    running: Arc<AtomicBool>,
    shutdown_tx: broadcast::Sender<()>,
}

impl Scheduler {
    pub fn new(
        config: SchedulerConfig,
        source: SearcheeSource,
        pool: IndexerPool,
        injector: Injector,
        history: Arc<dyn HistoryStore>,
        match_config: MatchConfig,
    ) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        let budget = SearchBudget::new(config.search_limit);

        Self {
            config,
            ctx: Arc::new(CycleContext {
                source,
                pool,
                injector,
                history,
                match_config,
                budget,
                search_lock: Mutex::new(()),
                rss_lock: Mutex::new(()),
                search_runs: AtomicU64::new(0),
                rss_runs: AtomicU64::new(0),
            }),
            running: Arc::new(AtomicBool::new(false)),
            shutdown_tx,
        }
    }

    /// Start the periodic tasks. A disabled cadence simply omits that
    /// task.
    pub async fn start(&self) {
        if self.running.swap(true, Ordering::SeqCst) {
            warn!("Scheduler already running");
            return;
        }

        info!("Starting scheduler");

        if let Some(ref cadence) = self.config.rss_cadence {
            self.spawn_periodic(TaskKind::Rss, cadence.as_duration());
        } else {
            info!("Activity poll disabled (no rss_cadence)");
        }

        if let Some(ref cadence) = self.config.search_cadence {
            self.spawn_periodic(TaskKind::Search, cadence.as_duration());
        } else {
            info!("Full search disabled (no search_cadence)");
        }

        info!("Scheduler started");
    }

    /// Stop the periodic tasks gracefully.
    pub async fn stop(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            warn!("Scheduler not running");
            return;
        }

        info!("Stopping scheduler");
        let _ = self.shutdown_tx.send(());

        // Give loops a moment to observe the signal
        tokio::time::sleep(Duration::from_millis(100)).await;
        info!("Scheduler stopped");
    }

    /// Current scheduler state.
    pub fn status(&self) -> SchedulerStatus {
        SchedulerStatus {
            running: self.running.load(Ordering::Relaxed),
            search_runs: self.ctx.search_runs.load(Ordering::Relaxed),
            rss_runs: self.ctx.rss_runs.load(Ordering::Relaxed),
            searches_used: self.ctx.budget.used(),
            search_limit: self.ctx.budget.limit(),
        }
    }

    /// Run a full search cycle on demand.
    ///
    /// Refused synchronously when a full search is already in flight or
    /// the budget is exhausted; no partial work is performed.
    pub async fn trigger_search(&self) -> Result<CycleSummary, SchedulerError> {
        self.ctx.budget.check()?;
        Self::run_search_cycle(&self.ctx).await
    }

    /// Run an activity poll on demand.
    pub async fn trigger_rss(&self) -> Result<CycleSummary, SchedulerError> {
        Self::run_rss_cycle(&self.ctx).await
    }

    /// Zero the search budget counter (operator action).
    pub fn reset_budget(&self) {
        info!("Search budget reset");
        self.ctx.budget.reset();
    }

    fn spawn_periodic(&self, task: TaskKind, cadence: Duration) {
        let ctx = Arc::clone(&self.ctx);
        let running = Arc::clone(&self.running);
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        tokio::spawn(async move {
            info!("{} loop started (cadence {:?})", task.as_str(), cadence);
            loop {
                tokio::select! {
                    _ = shutdown_rx.recv() => {
                        info!("{} loop received shutdown signal", task.as_str());
                        break;
                    }
                    _ = tokio::time::sleep(cadence) => {
                        if !running.load(Ordering::Relaxed) {
                            break;
                        }
                        let result = match task {
                            TaskKind::Search => Self::run_search_cycle(&ctx).await,
                            TaskKind::Rss => Self::run_rss_cycle(&ctx).await,
                        };
                        match result {
                            Ok(summary) => {
                                info!(
                                    "{} cycle done: {} searchees, {} matches, {} applied",
                                    task.as_str(), summary.searchees, summary.matches, summary.applied
                                );
                            }
                            Err(SchedulerError::AlreadyRunning { .. }) => {
                                debug!("{} cycle skipped: previous run still in flight", task.as_str());
                            }
                            Err(e) => {
                                warn!("{} cycle failed: {}", task.as_str(), e);
                            }
                        }
                    }
                }
            }
            info!("{} loop stopped", task.as_str());
        });
    }

    /// One full search cycle: enumerate, query each searchee under the
    /// budget, match, apply, write back the search timestamp.
    async fn run_search_cycle(ctx: &CycleContext) -> Result<CycleSummary, SchedulerError> {
        let _guard = ctx
            .search_lock
            .try_lock()
            .map_err(|_| SchedulerError::AlreadyRunning { task: "search" })?;

        metrics::CYCLES_TOTAL.with_label_values(&["search"]).inc();
        let timer = metrics::CYCLE_DURATION
            .with_label_values(&["search"])
            .start_timer();

        let searchees = ctx.source.enumerate().await?;
        let mut summary = CycleSummary {
            task: "search".to_string(),
            searchees: searchees.len(),
            searches: 0,
            matches: 0,
            applied: 0,
            budget_exhausted: false,
        };

        for searchee in &searchees {
            if let Err(e) = ctx.budget.try_acquire() {
                warn!("Stopping search cycle: {}", e);
                summary.budget_exhausted = true;
                break;
            }
            summary.searches += 1;
            metrics::SEARCHES_TOTAL.with_label_values(&["search"]).inc();

            let candidates = ctx.pool.query(searchee).await;
            debug!(
                "Searchee {}: {} candidates from {} indexers",
                searchee.name,
                candidates.len(),
                ctx.pool.indexer_count()
            );

            for candidate in &candidates {
                let Some(matched) = matcher::evaluate(
                    searchee,
                    candidate,
                    ctx.match_config.mode,
                    ctx.match_config.fuzzy_size_threshold,
                ) else {
                    continue;
                };

                summary.matches += 1;
                let record = ctx.injector.apply(searchee, candidate, &matched).await;
                if record.outcome != InjectionOutcome::Failed {
                    summary.applied += 1;
                }
            }

            if let Err(e) = ctx.history.set_last_searched(&searchee.id, Utc::now()) {
                warn!("Failed to record search time for {}: {}", searchee.name, e);
            }
        }

        ctx.search_runs.fetch_add(1, Ordering::Relaxed);
        timer.observe_duration();
        Ok(summary)
    }

    /// One activity poll: fetch recent listings once, evaluate them
    /// against the enumerated searchees.
    async fn run_rss_cycle(ctx: &CycleContext) -> Result<CycleSummary, SchedulerError> {
        let _guard = ctx
            .rss_lock
            .try_lock()
            .map_err(|_| SchedulerError::AlreadyRunning { task: "rss" })?;

        metrics::CYCLES_TOTAL.with_label_values(&["rss"]).inc();
        let timer = metrics::CYCLE_DURATION
            .with_label_values(&["rss"])
            .start_timer();

        let candidates = ctx.pool.recent().await;
        let searchees = ctx.source.enumerate().await?;

        let mut summary = CycleSummary {
            task: "rss".to_string(),
            searchees: searchees.len(),
            searches: 0,
            matches: 0,
            applied: 0,
            budget_exhausted: false,
        };

        for candidate in &candidates {
            // First matching searchee wins; the same candidate is not
            // injected twice
            let matched = searchees.iter().find_map(|searchee| {
                matcher::evaluate(
                    searchee,
                    candidate,
                    ctx.match_config.mode,
                    ctx.match_config.fuzzy_size_threshold,
                )
                .map(|m| (searchee, m))
            });

            if let Some((searchee, matched)) = matched {
                summary.matches += 1;
                let record = ctx.injector.apply(searchee, candidate, &matched).await;
                if record.outcome != InjectionOutcome::Failed {
                    summary.applied += 1;
                }
            }
        }

        ctx.rss_runs.fetch_add(1, Ordering::Relaxed);
        timer.observe_duration();
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ActionConfig, Span};
    use crate::indexer::IndexerClient;
    use crate::injector::Action;
    use crate::notify::Notifier;
    use crate::testing::{fixtures, MockHistory, MockIndexerClient, MockTorrentClient};
    use crate::matcher::MatchMode;
    use tempfile::TempDir;
    use tokio::fs;

    struct Harness {
        scheduler: Scheduler,
        indexer: Arc<MockIndexerClient>,
        client: Arc<MockTorrentClient>,
        history: Arc<MockHistory>,
        _temp: TempDir,
    }

    async fn harness(search_limit: Option<u32>) -> Harness {
        let temp = TempDir::new().unwrap();
        let data_dir = temp.path().join("data");
        fs::create_dir_all(data_dir.join("Movie.2021.1080p"))
            .await
            .unwrap();
        fs::write(data_dir.join("Movie.2021.1080p/movie.mkv"), vec![0u8; 1000])
            .await
            .unwrap();

        let history = Arc::new(MockHistory::new());
        let source = SearcheeSource::new(
            crate::config::SourcesConfig {
                torrent_dir: None,
                data_dirs: vec![data_dir],
                max_data_depth: 1,
                include_episodes: false,
                include_single_episodes: false,
                include_non_videos: true,
                exclude_older: None,
                exclude_recent_search: None,
            },
            Arc::clone(&history) as Arc<dyn HistoryStore>,
        );

        let indexer = Arc::new(MockIndexerClient::new("mock-indexer"));
        let pool = IndexerPool::new(
            vec![Arc::clone(&indexer) as Arc<dyn IndexerClient>],
            Duration::from_millis(1),
            None,
        );

        let client = Arc::new(MockTorrentClient::new());
        let injector = Injector::new(
            ActionConfig {
                action: Action::Inject,
                output_dir: temp.path().join("out"),
                link_dir: Some(temp.path().join("links")),
                ..Default::default()
            },
            Some(Arc::clone(&client) as Arc<dyn crate::torrent_client::TorrentClient>),
            Arc::clone(&history) as Arc<dyn HistoryStore>,
            Notifier::disabled(),
        );

        let scheduler = Scheduler::new(
            SchedulerConfig {
                rss_cadence: Some(Span::from_secs(600)),
                search_cadence: Some(Span::from_secs(86_400)),
                search_limit,
            },
            source,
            pool,
            injector,
            Arc::clone(&history) as Arc<dyn HistoryStore>,
            MatchConfig {
                mode: MatchMode::Risky,
                fuzzy_size_threshold: 0.02,
            },
        );

        Harness {
            scheduler,
            indexer,
            client,
            history,
            _temp: temp,
        }
    }

    #[tokio::test]
    async fn test_trigger_search_finds_and_injects() {
        let h = harness(None).await;
        h.indexer
            .set_results(vec![fixtures::magnet_candidate(
                "Totally Different Name",
                1000,
                "mock-indexer",
            )])
            .await;

        let summary = h.scheduler.trigger_search().await.unwrap();
        assert_eq!(summary.searchees, 1);
        assert_eq!(summary.searches, 1);
        assert_eq!(summary.matches, 1);
        assert_eq!(summary.applied, 1);
        assert_eq!(h.client.inject_count().await, 1);
    }

    #[tokio::test]
    async fn test_search_writes_last_searched() {
        let h = harness(None).await;
        h.scheduler.trigger_search().await.unwrap();

        let searched = h.history.all_last_searched();
        assert_eq!(searched.len(), 1);
    }

    #[tokio::test]
    async fn test_budget_is_a_hard_ceiling_across_cycles() {
        let h = harness(Some(2)).await;

        let first = h.scheduler.trigger_search().await.unwrap();
        assert_eq!(first.searches, 1);

        let second = h.scheduler.trigger_search().await.unwrap();
        assert_eq!(second.searches, 1);

        // Third cycle is refused outright, before any work
        let refused = h.scheduler.trigger_search().await;
        assert!(matches!(
            refused,
            Err(SchedulerError::BudgetExhausted { limit: 2 })
        ));

        // The indexer saw exactly two requests in total
        assert_eq!(h.indexer.request_times().await.len(), 2);
    }

    #[tokio::test]
    async fn test_budget_reset_reopens_searches() {
        let h = harness(Some(1)).await;
        h.scheduler.trigger_search().await.unwrap();
        assert!(h.scheduler.trigger_search().await.is_err());

        h.scheduler.reset_budget();
        assert!(h.scheduler.trigger_search().await.is_ok());
    }

    #[tokio::test]
    async fn test_rss_cycle_matches_recent_listings() {
        let h = harness(None).await;
        h.indexer
            .set_recent(vec![
                fixtures::magnet_candidate("Fresh Cross Seed", 1010, "mock-indexer"),
                fixtures::magnet_candidate("Unrelated Size", 5_000_000, "mock-indexer"),
            ])
            .await;

        let summary = h.scheduler.trigger_rss().await.unwrap();
        assert_eq!(summary.matches, 1);
        assert_eq!(h.client.inject_count().await, 1);
        // RSS polls do not consume the search budget
        assert_eq!(h.scheduler.status().searches_used, 0);
    }

    #[tokio::test]
    async fn test_rss_does_not_touch_last_searched() {
        let h = harness(None).await;
        h.scheduler.trigger_rss().await.unwrap();
        assert!(h.history.all_last_searched().is_empty());
    }

    #[tokio::test]
    async fn test_status_counts_runs() {
        let h = harness(None).await;
        h.scheduler.trigger_search().await.unwrap();
        h.scheduler.trigger_rss().await.unwrap();
        h.scheduler.trigger_rss().await.unwrap();

        let status = h.scheduler.status();
        assert_eq!(status.search_runs, 1);
        assert_eq!(status.rss_runs, 2);
        assert_eq!(status.searches_used, 1);
    }

    #[tokio::test]
    async fn test_start_stop() {
        let h = harness(None).await;
        h.scheduler.start().await;
        assert!(h.scheduler.status().running);

        h.scheduler.stop().await;
        assert!(!h.scheduler.status().running);
    }

    #[tokio::test]
    async fn test_injection_failure_does_not_abort_cycle() {
        let h = harness(None).await;
        h.indexer
            .set_results(vec![
                fixtures::magnet_candidate("First Match", 1000, "mock-indexer"),
                fixtures::magnet_candidate("Second Match", 1005, "mock-indexer"),
            ])
            .await;
        h.client
            .set_next_error(crate::torrent_client::TorrentClientError::ConnectionFailed(
                "refused".to_string(),
            ))
            .await;

        let summary = h.scheduler.trigger_search().await.unwrap();
        assert_eq!(summary.matches, 2);
        // First apply failed, second went through
        assert_eq!(summary.applied, 1);
        assert_eq!(h.client.inject_count().await, 1);
    }
}
