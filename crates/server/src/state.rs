//! Shared application state for the API layer.

use chrono::{DateTime, Utc};
use prometheus::Registry;
use std::sync::Arc;

use reseed_core::{Authenticator, Config, HistoryStore, SanitizedConfig, Scheduler};

pub struct AppState {
    config: Config,
    authenticator: Arc<dyn Authenticator>,
    scheduler: Arc<Scheduler>,
    history: Arc<dyn HistoryStore>,
    registry: Registry,
    started_at: DateTime<Utc>,
}

impl AppState {
    pub fn new(
        config: Config,
        authenticator: Arc<dyn Authenticator>,
        scheduler: Arc<Scheduler>,
        history: Arc<dyn HistoryStore>,
        registry: Registry,
    ) -> Self {
        Self {
            config,
            authenticator,
            scheduler,
            history,
            registry,
            started_at: Utc::now(),
        }
    }

    pub fn authenticator(&self) -> &Arc<dyn Authenticator> {
        &self.authenticator
    }

    pub fn scheduler(&self) -> &Arc<Scheduler> {
        &self.scheduler
    }

    pub fn history(&self) -> &Arc<dyn HistoryStore> {
        &self.history
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn sanitized_config(&self) -> SanitizedConfig {
        SanitizedConfig::from(&self.config)
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }
}
