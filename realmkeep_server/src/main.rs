use std::sync::Arc;

use realmkeep_server::{
    RealmServer,
    config::{DEFAULT_CONFIG_FILE, ServerConfig},
    event::EventBus,
};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CONFIG_FILE.to_string());
    let config = ServerConfig::load_or_default(&path)?;

    let server = RealmServer::start(config, Arc::new(EventBus::default()))?;
    tracing::info!(
        loaded = ?server.worlds.loaded_world_names(),
        known = ?server.worlds.existing_worlds(),
        "server started, press ctrl-c to stop"
    );

    tokio::signal::ctrl_c().await?;
    tracing::info!("shutting down");

    let remaining = server.shutdown();
    if !remaining.is_empty() {
        return Err(format!("could not unload worlds: {}", remaining.join(", ")).into());
    }
    Ok(())
}
