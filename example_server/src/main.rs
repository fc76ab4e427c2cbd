use std::{sync::Arc, time::Duration};

use realmkeep_lib::{WorldGenerator, register_dimension_types};
use realmkeep_server::{
    RealmServer,
    config::{ServerConfig, WorldsConfig},
    event::{
        EventBus,
        world_events::{WorldLoaded, WorldUnloaded},
    },
    player::Player,
    world::ManagedWorld,
};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")),
        )
        .init();

    let event_bus = Arc::new(EventBus::default());
    event_bus
        .listen::<WorldLoaded, _, _>(true, |event| async move {
            tracing::info!(
                world = %event.world.fq_name(),
                seed = event.world.seed(),
                "world is up"
            );
            None
        })
        .await;
    event_bus
        .listen::<WorldUnloaded, _, _>(false, |event| async move {
            tracing::info!(
                world = %event.world.fq_name(),
                dir = %event.world.directory().display(),
                "world went down"
            );
            None
        })
        .await;

    let config = ServerConfig {
        worlds: WorldsConfig {
            directory: "demo_worlds".into(),
            backups: "demo_worldsbackups".into(),
            default_world: "lobby".to_string(),
        },
        ..ServerConfig::default()
    };
    let server = RealmServer::start(config, Arc::clone(&event_bus))?;

    register_dimension_types!(server.dimension_types, {
        "SKYLANDS" => 2,
        "AETHER" => 3,
    })?;

    let skylands = server
        .dimension_types
        .from_name("SKYLANDS")
        .ok_or("SKYLANDS is not registered")?;
    let arena = server.worlds.create_world_with_generator(
        "arena",
        0x5eed,
        &skylands,
        WorldGenerator::Amplified,
    )?;

    let player = Arc::new(Player::new("steve"));
    arena.add_player(Arc::clone(&player));

    server.worlds.request_unload("arena_SKYLANDS", false);
    tracing::info!(loaded = ?server.worlds.loaded_world_names(), "after polite unload");

    server.worlds.request_unload("arena_SKYLANDS", true);
    tracing::info!(
        loaded = ?server.worlds.loaded_world_names(),
        kicked = ?player.disconnect_reason(),
        "after forced unload"
    );

    let remaining = server.shutdown();
    // Let the posted unload events drain before the runtime stops.
    tokio::time::sleep(Duration::from_millis(50)).await;

    if !remaining.is_empty() {
        return Err(format!("could not unload worlds: {}", remaining.join(", ")).into());
    }
    Ok(())
}
