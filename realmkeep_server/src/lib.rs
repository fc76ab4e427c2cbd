pub mod config;
pub mod error;
pub mod event;
pub mod player;
pub mod world;

use std::sync::Arc;

use realmkeep_lib::{DimensionType, DimensionTypeRegistry};

use crate::{
    config::ServerConfig,
    error::ServerError,
    event::EventBus,
    world::{WorldRegistry, disk::DiskWorldBackend},
};

pub type ServerWorlds = WorldRegistry<DiskWorldBackend>;

pub struct RealmServer {
    pub config: ServerConfig,
    pub event_bus: Arc<EventBus>,
    pub dimension_types: Arc<DimensionTypeRegistry>,
    pub worlds: ServerWorlds,
}

impl RealmServer {
    /// Registers the configured dimension types, opens the world registry and
    /// brings up the default world.
    pub fn start(
        config: ServerConfig,
        event_bus: Arc<EventBus>,
    ) -> Result<RealmServer, ServerError> {
        let dimension_types = Arc::new(DimensionTypeRegistry::new());
        for entry in &config.dimension_types {
            let dimension = dimension_types.register(&entry.name, entry.id)?;
            tracing::info!(%dimension, "registered dimension type");
        }

        let backend = DiskWorldBackend::new(&config.worlds.directory, Arc::clone(&event_bus));
        let worlds = WorldRegistry::open(&config.worlds, Arc::clone(&dimension_types), backend)?;

        if !config.worlds.default_world.is_empty() {
            worlds.get_world_in(&config.worlds.default_world, &DimensionType::normal(), true)?;
        }

        Ok(RealmServer {
            config,
            event_bus,
            dimension_types,
            worlds,
        })
    }

    /// Force-unloads every world, kicking whoever is still in them.
    ///
    /// Returns the names of worlds that could not be unloaded.
    pub fn shutdown(&self) -> Vec<String> {
        for fq_name in self.worlds.loaded_world_names() {
            self.worlds.request_unload(&fq_name, true);
        }

        let remaining = self.worlds.loaded_world_names();
        if !remaining.is_empty() {
            tracing::error!(?remaining, "worlds still loaded after shutdown");
        }
        remaining
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DimensionTypeEntry, WorldsConfig};

    fn config(root: &std::path::Path) -> ServerConfig {
        ServerConfig {
            worlds: WorldsConfig {
                directory: root.join("worlds"),
                backups: root.join("worldsbackups"),
                default_world: "world".to_string(),
            },
            dimension_types: vec![DimensionTypeEntry {
                name: "SKYLANDS".to_string(),
                id: 2,
            }],
        }
    }

    #[test]
    fn start_loads_default_world_and_extra_types() {
        let dir = tempfile::tempdir().unwrap();
        let server = RealmServer::start(config(dir.path()), Arc::new(EventBus::default())).unwrap();

        assert_eq!(server.worlds.loaded_world_names(), vec!["world_NORMAL"]);
        let sky = server.dimension_types.from_id(2).unwrap();
        server.worlds.get_world_in("world", &sky, true).unwrap();
        assert!(server.worlds.is_loaded("world_SKYLANDS"));

        assert!(server.shutdown().is_empty());
        assert!(server.worlds.worlds().is_empty());
        assert_eq!(
            server.worlds.existing_worlds(),
            vec!["world_NORMAL", "world_SKYLANDS"]
        );
    }

    #[test]
    fn start_rejects_conflicting_dimension_types() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config(dir.path());
        config.dimension_types.push(DimensionTypeEntry {
            name: "NETHER".to_string(),
            id: 9,
        });

        let err = RealmServer::start(config, Arc::new(EventBus::default())).err().unwrap();
        assert!(matches!(err, ServerError::Dimension(_)));
    }
}
