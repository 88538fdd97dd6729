//! Cross-seed discovery and injection engine.
//!
//! Periodically searches configured indexers for torrents that describe
//! content already on disk and, on a confident match, either records the
//! find or injects it into a torrent client so the data seeds under a
//! second tracker.

pub mod auth;
pub mod config;
pub mod history;
pub mod indexer;
pub mod injector;
pub mod matcher;
pub mod metrics;
pub mod notify;
pub mod scheduler;
pub mod searchee;
pub mod testing;
pub mod torrent_client;

pub use auth::{
    create_authenticator, ApiKeyAuthenticator, AuthError, AuthRequest, Authenticator, Identity,
    NoneAuthenticator,
};
pub use config::{
    load_config, load_config_from_str, validate_config, AuthMethod, Config, ConfigError,
    SanitizedConfig, Span,
};
pub use history::{HistoryError, HistoryStore, SqliteHistory};
pub use indexer::{
    pool_from_config, CandidateFile, IndexerCandidate, IndexerClient, IndexerError, IndexerPool,
    TorznabClient,
};
pub use injector::{
    materialize_link_tree, Action, InjectionOutcome, InjectionRecord, Injector, InjectorError,
    LinkType,
};
pub use matcher::{evaluate, MatchConfidence, MatchMode, MatchResult};
pub use notify::Notifier;
pub use scheduler::{
    CycleSummary, Scheduler, SchedulerConfig, SchedulerError, SchedulerStatus, SearchBudget,
};
pub use searchee::{Searchee, SearcheeError, SearcheeFile, SearcheeSource};
pub use torrent_client::{
    client_from_config, DelugeClient, InjectRequest, InjectResult, QBittorrentClient,
    RTorrentClient, TorrentClient, TorrentClientError, TransmissionClient,
};
