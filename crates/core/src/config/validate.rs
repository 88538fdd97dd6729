use crate::injector::Action;
use crate::scheduler::{MIN_RSS_CADENCE_SECS, MIN_SEARCH_CADENCE_SECS};

use super::{
    types::{AuthMethod, ClientBackend, Config},
    ConfigError,
};

/// Validate configuration beyond what serde enforces.
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "server.port cannot be 0".to_string(),
        ));
    }

    if matches!(config.auth.method, AuthMethod::ApiKey)
        && config
            .auth
            .api_key
            .as_ref()
            .map(|k| k.is_empty())
            .unwrap_or(true)
    {
        return Err(ConfigError::ValidationError(
            "auth.api_key must be set when auth.method is api_key".to_string(),
        ));
    }

    if config.sources.torrent_dir.is_none() && config.sources.data_dirs.is_empty() {
        return Err(ConfigError::ValidationError(
            "at least one of sources.torrent_dir or sources.data_dirs must be configured"
                .to_string(),
        ));
    }

    if config.indexers.urls.is_empty() {
        return Err(ConfigError::ValidationError(
            "indexers.urls must list at least one endpoint".to_string(),
        ));
    }

    let threshold = config.matching.fuzzy_size_threshold;
    if !(threshold > 0.0 && threshold <= 1.0) {
        return Err(ConfigError::ValidationError(format!(
            "match.fuzzy_size_threshold must be in (0, 1], got {}",
            threshold
        )));
    }

    if let Some(ref cadence) = config.scheduler.rss_cadence {
        if cadence.as_secs() < MIN_RSS_CADENCE_SECS {
            return Err(ConfigError::ValidationError(format!(
                "scheduler.rss_cadence {} is below the 10 minute minimum",
                cadence
            )));
        }
    }

    if let Some(ref cadence) = config.scheduler.search_cadence {
        if cadence.as_secs() < MIN_SEARCH_CADENCE_SECS {
            return Err(ConfigError::ValidationError(format!(
                "scheduler.search_cadence {} is below the 1 day minimum",
                cadence
            )));
        }
    }

    if config.action.action == Action::Inject {
        let Some(ref client) = config.client else {
            return Err(ConfigError::ValidationError(
                "action.action = \"inject\" requires a [client] section".to_string(),
            ));
        };

        let backend_config_present = match client.backend {
            ClientBackend::QBittorrent => client.qbittorrent.is_some(),
            ClientBackend::RTorrent => client.rtorrent.is_some(),
            ClientBackend::Transmission => client.transmission.is_some(),
            ClientBackend::Deluge => client.deluge.is_some(),
        };
        if !backend_config_present {
            return Err(ConfigError::ValidationError(format!(
                "client.backend {:?} selected but its configuration table is missing",
                client.backend
            )));
        }

        if !config.sources.data_dirs.is_empty() && config.action.link_dir.is_none() {
            return Err(ConfigError::ValidationError(
                "action.link_dir is required to inject data-based matches".to_string(),
            ));
        }
    }

    Ok(())
}
