//! # salom-server
//!
//! Binary entry point: loads configuration, opens the database, provisions
//! the global room and serves the HTTP API until Ctrl+C.

use tracing::info;
use tracing_subscriber::EnvFilter;

use salom_server::api::{self, AppState};
use salom_server::config::ServerConfig;
use salom_store::Database;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // -----------------------------------------------------------------------
    // 1. Initialize tracing (respects RUST_LOG env var)
    // -----------------------------------------------------------------------
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,salom_server=debug")),
        )
        .init();

    info!("Starting Salom server v{}", env!("CARGO_PKG_VERSION"));

    // -----------------------------------------------------------------------
    // 2. Load configuration
    // -----------------------------------------------------------------------
    let config = ServerConfig::from_env();
    info!(?config, "Loaded configuration");
    info!(
        instance = %config.instance_name,
        registration_open = config.registration_open,
        presence_lease_secs = config.presence_lease.as_secs(),
        "Instance settings"
    );

    // -----------------------------------------------------------------------
    // 3. Open storage and wire services
    // -----------------------------------------------------------------------
    let db = Database::open_at(&config.database_path)?;
    info!(path = %config.database_path.display(), "Database ready");

    let http_addr = config.http_addr;
    let lease = config.presence_lease;
    let sweep_every = config.presence_sweep_every;
    let app_state = AppState::new(salom_server::shared(db), config);

    // The global room exists before the first request arrives.
    let global = app_state.directory.provision().await?;
    info!(chat = %global, "Global chat provisioned");

    // -----------------------------------------------------------------------
    // 4. Spawn background tasks
    // -----------------------------------------------------------------------
    let sweeper = if lease.is_zero() {
        None
    } else {
        info!(lease_secs = lease.as_secs(), "Presence lease enabled");
        Some(app_state.presence.clone().spawn_sweeper(lease, sweep_every))
    };

    // -----------------------------------------------------------------------
    // 5. Run the HTTP API server (blocks until shutdown)
    // -----------------------------------------------------------------------
    let result = tokio::select! {
        result = api::serve(app_state, http_addr) => result,
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down");
            Ok(())
        }
    };

    if let Some(handle) = sweeper {
        handle.abort();
    }

    if let Err(e) = &result {
        tracing::error!(error = %e, "HTTP server failed");
    }
    result
}
