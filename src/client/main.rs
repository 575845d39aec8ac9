/**
 * HealthSync Agent Entry Point
 *
 * Headless runner for the adaptive sync core. Wires the real HTTP client
 * and SQLite store, keeps periodic sync running and logs sync events until
 * Ctrl-C.
 */

#[cfg(feature = "agent")]
use healthsync::client::network::{CellularGeneration, NetworkSnapshot};

/// Parse `HEALTHSYNC_NETWORK` (`wifi`, `ethernet`, `offline`, `cellular-3g`, ...)
#[cfg(feature = "agent")]
fn snapshot_from_label(label: &str) -> Option<NetworkSnapshot> {
    match label {
        "wifi" => Some(NetworkSnapshot::wifi()),
        "ethernet" => Some(NetworkSnapshot::ethernet()),
        "offline" => Some(NetworkSnapshot::offline()),
        "cellular" => Some(NetworkSnapshot::cellular(None, None)),
        other => {
            let generation = match other.strip_prefix("cellular-")? {
                "2g" => CellularGeneration::TwoG,
                "3g" => CellularGeneration::ThreeG,
                "4g" => CellularGeneration::FourG,
                "5g" => CellularGeneration::FiveG,
                _ => return None,
            };
            Some(NetworkSnapshot::cellular(Some(generation), None))
        }
    }
}

#[cfg(feature = "agent")]
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    use healthsync::client::http::ReqwestHttpClient;
    use healthsync::client::local_db::open_store;
    use healthsync::client::network::WatchNetworkSource;
    use healthsync::client::{Config, HealthSync};
    use healthsync::shared::{AppConfig, SyncEvent};
    use std::sync::Arc;

    // Load environment variables from .env file if present
    dotenv::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(&env_filter))
        .init();

    let base = match std::env::args().nth(1) {
        Some(path) => AppConfig::from_file(&path)?,
        None => AppConfig::default(),
    };
    let config = Config::from_env(base)?;

    let label = std::env::var("HEALTHSYNC_NETWORK").unwrap_or_else(|_| "wifi".to_string());
    let snapshot = snapshot_from_label(&label).unwrap_or_else(|| {
        tracing::warn!(label = %label, "Unknown HEALTHSYNC_NETWORK, assuming wifi");
        NetworkSnapshot::wifi()
    });

    let store = open_store(&config.database_path()).await;
    let network = Arc::new(WatchNetworkSource::new(snapshot));
    let app = HealthSync::new(config, network, Arc::new(ReqwestHttpClient::new()), store).await;

    let _events = app.add_sync_listener(|event| match event {
        SyncEvent::Started => tracing::info!("Sync started"),
        SyncEvent::Completed { timestamp } => tracing::info!(%timestamp, "Sync completed"),
        SyncEvent::Error { error } => tracing::warn!(%error, "Sync failed"),
    });
    app.init().await;

    let connection = app.check_connection();
    tracing::info!(
        status = ?connection.status(),
        method = ?connection.fetch_method,
        "Agent started"
    );

    match app.sync_now().await {
        Ok(outcome) => tracing::info!(?outcome, "Initial sync finished"),
        Err(e) => tracing::warn!(error = %e, "Initial sync not possible"),
    }

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutting down");
    app.dispose().await;

    Ok(())
}

#[cfg(not(feature = "agent"))]
fn main() {
    eprintln!("The sync agent requires the 'agent' feature to be enabled.");
    eprintln!("Run with: cargo run --bin healthsync-agent --features agent");
    std::process::exit(1);
}
