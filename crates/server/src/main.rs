mod api;
mod metrics;
mod state;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use reseed_core::{
    client_from_config, create_authenticator, load_config, pool_from_config, validate_config,
    Action, Authenticator, HistoryStore, Injector, Notifier, Scheduler, SearcheeSource,
    SqliteHistory, TorrentClient,
};

use api::create_router;
use metrics::register_server_metrics;
use state::AppState;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Determine config path
    let config_path = std::env::var("RESEED_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config.toml"));

    info!("Loading configuration from {:?}", config_path);
    let config = load_config(&config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;

    validate_config(&config).context("Configuration validation failed")?;

    info!("Configuration loaded successfully");
    info!("Auth method: {:?}", config.auth.method);
    info!("Indexers configured: {}", config.indexers.urls.len());

    // Create authenticator
    let authenticator: Arc<dyn Authenticator> = Arc::from(
        create_authenticator(&config.auth).context("Failed to create authenticator")?,
    );
    info!("Using authenticator: {}", authenticator.method_name());

    // History store (first-seen/last-searched state + injection records)
    let history: Arc<dyn HistoryStore> = Arc::new(
        SqliteHistory::new(&config.database.path).context("Failed to open history store")?,
    );
    info!("History store initialized at {:?}", config.database.path);

    // Searchee enumeration over the configured sources
    let source = SearcheeSource::new(config.sources.clone(), Arc::clone(&history));

    // Indexer pool, one client per endpoint
    let pool = pool_from_config(&config.indexers);
    info!(
        "Indexer pool ready ({} endpoints, delay {})",
        config.indexers.urls.len(),
        config.indexers.delay
    );

    // Torrent client backend, only needed for action = "inject"
    let snatch_timeout = config
        .action
        .snatch_timeout
        .as_ref()
        .map(|t| t.as_duration());
    let client: Option<Arc<dyn TorrentClient>> = match (&config.action.action, &config.client) {
        (Action::Inject, Some(client_config)) => {
            let client = client_from_config(client_config, snatch_timeout)
                .context("Failed to create torrent client")?;
            info!("Torrent client backend: {}", client.name());
            Some(client)
        }
        (Action::Inject, None) => {
            anyhow::bail!("action is \"inject\" but no [client] section is configured");
        }
        (Action::Save, _) => {
            info!(
                "Action is \"save\"; matches are written to {:?}",
                config.action.output_dir
            );
            None
        }
    };

    // Notification webhook (fire-and-forget)
    let notifier = Notifier::new(config.notification.as_ref());
    if notifier.is_enabled() {
        info!("Notification webhook enabled");
    }

    let injector = Injector::new(
        config.action.clone(),
        client,
        Arc::clone(&history),
        notifier,
    );

    // Scheduler driving the periodic tasks
    let scheduler = Arc::new(Scheduler::new(
        config.scheduler.clone(),
        source,
        pool,
        injector,
        Arc::clone(&history),
        config.matching.clone(),
    ));
    scheduler.start().await;

    // Metrics registry
    let registry = prometheus::Registry::new();
    reseed_core::metrics::register_core_metrics(&registry);
    register_server_metrics(&registry);

    // Create app state and router
    let state = Arc::new(AppState::new(
        config.clone(),
        authenticator,
        Arc::clone(&scheduler),
        history,
        registry,
    ));
    let app = create_router(state);

    // Start server
    let addr = SocketAddr::new(config.server.host, config.server.port);
    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutting down...");
    scheduler.stop().await;

    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
