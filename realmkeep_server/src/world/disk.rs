//! Directory-per-world backend.
//!
//! Each world lives in `<worlds>/<base>/<base>_<DIMENSION>/` next to a small
//! `level.toml` holding what is needed to bring it back: seed and generator.

use std::{
    fs,
    path::{Path, PathBuf},
    sync::{Arc, Mutex, PoisonError},
};

use realmkeep_lib::{DimensionType, WorldGenerator, naming};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{ManagedWorld, WorldBackend};
use crate::{
    error::BackendError,
    event::{
        EventBus,
        world_events::{WorldLoaded, WorldUnloaded},
    },
    player::Player,
};

pub const LEVEL_FILE: &str = "level.toml";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct LevelMeta {
    name: String,
    dimension: String,
    dimension_id: i32,
    seed: i64,
    generator: WorldGenerator,
}

#[derive(Debug)]
pub struct ServerWorld {
    name: String,
    dimension: DimensionType,
    seed: i64,
    generator: WorldGenerator,
    directory: PathBuf,
    players: Mutex<Vec<Arc<Player>>>,
}

impl ServerWorld {
    pub fn seed(&self) -> i64 {
        self.seed
    }

    pub fn generator(&self) -> WorldGenerator {
        self.generator
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn add_player(&self, player: Arc<Player>) {
        self.players
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(player);
    }

    pub fn remove_player(&self, uuid: Uuid) -> Option<Arc<Player>> {
        let mut players = self.players.lock().unwrap_or_else(PoisonError::into_inner);
        let index = players.iter().position(|p| p.uuid() == uuid)?;
        Some(players.remove(index))
    }

    fn meta(&self) -> LevelMeta {
        LevelMeta {
            name: self.name.clone(),
            dimension: self.dimension.name().to_string(),
            dimension_id: self.dimension.id(),
            seed: self.seed,
            generator: self.generator,
        }
    }
}

impl ManagedWorld for ServerWorld {
    type Player = Player;

    fn name(&self) -> &str {
        &self.name
    }

    fn dimension(&self) -> &DimensionType {
        &self.dimension
    }

    fn players(&self) -> Vec<Arc<Player>> {
        self.players
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|p| p.is_connected())
            .cloned()
            .collect()
    }

    fn save(&self) -> Result<(), BackendError> {
        let text = toml::to_string_pretty(&self.meta())?;
        fs::write(self.directory.join(LEVEL_FILE), text)?;
        tracing::debug!(world = %self.fq_name(), "saved level metadata");
        Ok(())
    }
}

pub struct DiskWorldBackend {
    worlds_dir: PathBuf,
    event_bus: Arc<EventBus>,
}

impl DiskWorldBackend {
    pub fn new(worlds_dir: impl Into<PathBuf>, event_bus: Arc<EventBus>) -> Self {
        Self {
            worlds_dir: worlds_dir.into(),
            event_bus,
        }
    }
}

impl WorldBackend for DiskWorldBackend {
    type World = ServerWorld;

    fn create_or_load(
        &self,
        name: &str,
        seed: i64,
        dimension: &DimensionType,
        generator: Option<WorldGenerator>,
    ) -> Result<Arc<ServerWorld>, BackendError> {
        let fq_name = naming::fq_name(name, dimension);
        let directory = self.worlds_dir.join(name).join(&fq_name);
        let level = directory.join(LEVEL_FILE);

        let fresh = !level.is_file();
        let (seed, generator) = if fresh {
            fs::create_dir_all(&directory)?;
            (seed, generator.unwrap_or_default())
        } else {
            let meta: LevelMeta = toml::from_str(&fs::read_to_string(&level)?)?;
            if meta.dimension != dimension.name() {
                return Err(BackendError::Rejected(format!(
                    "{} belongs to dimension {}, not {}",
                    level.display(),
                    meta.dimension,
                    dimension.name()
                )));
            }
            (meta.seed, meta.generator)
        };
        tracing::debug!(world = %fq_name, seed, %generator, fresh, "opened world directory");

        let world = Arc::new(ServerWorld {
            name: name.to_string(),
            dimension: dimension.clone(),
            seed,
            generator,
            directory,
            players: Mutex::new(Vec::new()),
        });
        if fresh {
            world.save()?;
        }
        Ok(world)
    }

    fn world_loaded(&self, world: &Arc<ServerWorld>) {
        self.event_bus.post(WorldLoaded {
            world: Arc::clone(world),
        });
    }

    fn world_unloaded(&self, world: &Arc<ServerWorld>) {
        self.event_bus.post(WorldUnloaded {
            world: Arc::clone(world),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::WorldsConfig, world::PlayerHandle, world::WorldRegistry};
    use realmkeep_lib::DimensionTypeRegistry;

    fn backend(root: &Path) -> DiskWorldBackend {
        DiskWorldBackend::new(root.join("worlds"), Arc::new(EventBus::default()))
    }

    #[test]
    fn fresh_world_writes_level_file() {
        let dir = tempfile::tempdir().unwrap();
        let world = backend(dir.path())
            .create_or_load("alpha", 42, &DimensionType::nether(), None)
            .unwrap();

        assert_eq!(world.directory(), dir.path().join("worlds/alpha/alpha_NETHER"));
        let text = fs::read_to_string(world.directory().join(LEVEL_FILE)).unwrap();
        let meta: LevelMeta = toml::from_str(&text).unwrap();
        assert_eq!(
            meta,
            LevelMeta {
                name: "alpha".into(),
                dimension: "NETHER".into(),
                dimension_id: -1,
                seed: 42,
                generator: WorldGenerator::Default,
            }
        );
    }

    #[test]
    fn reload_keeps_stored_seed_and_generator() {
        let dir = tempfile::tempdir().unwrap();
        let backend = backend(dir.path());
        let normal = DimensionType::normal();
        backend
            .create_or_load("beta", 42, &normal, Some(WorldGenerator::Flat))
            .unwrap();

        let again = backend.create_or_load("beta", 7, &normal, None).unwrap();
        assert_eq!(again.seed(), 42);
        assert_eq!(again.generator(), WorldGenerator::Flat);
    }

    #[test]
    fn level_from_another_dimension_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let backend = backend(dir.path());
        let world = backend
            .create_or_load("gamma", 1, &DimensionType::end(), None)
            .unwrap();
        let nether_dir = dir.path().join("worlds/gamma/gamma_NETHER");
        fs::create_dir_all(&nether_dir).unwrap();
        fs::copy(world.directory().join(LEVEL_FILE), nether_dir.join(LEVEL_FILE)).unwrap();

        let err = backend
            .create_or_load("gamma", 1, &DimensionType::nether(), None)
            .unwrap_err();
        assert!(matches!(err, BackendError::Rejected(_)));
    }

    #[test]
    fn disconnected_players_are_not_listed() {
        let dir = tempfile::tempdir().unwrap();
        let world = backend(dir.path())
            .create_or_load("delta", 1, &DimensionType::normal(), None)
            .unwrap();
        let steve = Arc::new(Player::new("steve"));
        let alex = Arc::new(Player::new("alex"));
        world.add_player(Arc::clone(&steve));
        world.add_player(Arc::clone(&alex));

        steve.disconnect("bye");
        let names: Vec<String> = world.players().iter().map(|p| p.name().to_string()).collect();
        assert_eq!(names, vec!["alex"]);

        assert!(world.remove_player(alex.uuid()).is_some());
        assert!(world.remove_player(alex.uuid()).is_none());
        assert!(world.players().is_empty());
    }

    #[tokio::test]
    async fn unload_swept_from_a_plain_thread_is_announced() {
        let dir = tempfile::tempdir().unwrap();
        let bus = Arc::new(EventBus::new());
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        bus.listen::<WorldUnloaded, _, _>(false, move |event| {
            let _ = tx.send(event.world.fq_name());
            async { None }
        })
        .await;

        let config = WorldsConfig {
            directory: dir.path().join("worlds"),
            backups: dir.path().join("worldsbackups"),
            default_world: String::new(),
        };
        let registry = Arc::new(
            WorldRegistry::open(
                &config,
                Arc::new(DimensionTypeRegistry::new()),
                DiskWorldBackend::new(&config.directory, Arc::clone(&bus)),
            )
            .unwrap(),
        );

        let ticker = Arc::clone(&registry);
        std::thread::spawn(move || {
            ticker.create_world("tick", &DimensionType::normal()).unwrap();
            ticker.request_unload("tick_NORMAL", true);
            assert!(ticker.worlds().is_empty());
        })
        .join()
        .unwrap();

        let announced = tokio::time::timeout(std::time::Duration::from_secs(5), rx.recv()).await;
        assert_eq!(announced.unwrap().as_deref(), Some("tick_NORMAL"));
    }

    #[tokio::test]
    async fn registry_posts_lifecycle_events() {
        let dir = tempfile::tempdir().unwrap();
        let bus = Arc::new(EventBus::default());
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();

        let loaded_tx = tx.clone();
        bus.listen::<WorldLoaded, _, _>(false, move |event| {
            let _ = loaded_tx.send(format!("loaded {}", event.world.fq_name()));
            async { None }
        })
        .await;
        bus.listen::<WorldUnloaded, _, _>(false, move |event| {
            let _ = tx.send(format!("unloaded {}", event.world.fq_name()));
            async { None }
        })
        .await;

        let config = WorldsConfig {
            directory: dir.path().join("worlds"),
            backups: dir.path().join("worldsbackups"),
            default_world: String::new(),
        };
        let registry = WorldRegistry::open(
            &config,
            Arc::new(DimensionTypeRegistry::new()),
            DiskWorldBackend::new(&config.directory, Arc::clone(&bus)),
        )
        .unwrap();

        let world = registry.create_world_with_seed("epsilon", 5, &DimensionType::end()).unwrap();
        let player = Arc::new(Player::new("steve"));
        world.add_player(Arc::clone(&player));
        assert_eq!(rx.recv().await.unwrap(), "loaded epsilon_END");

        registry.request_unload("epsilon_END", true);
        assert!(registry.worlds().is_empty());
        assert_eq!(rx.recv().await.unwrap(), "unloaded epsilon_END");
        assert_eq!(
            player.disconnect_reason().as_deref(),
            Some(crate::world::SHUTDOWN_REASON)
        );

        // A fresh registry over the same directory finds it and keeps the seed.
        drop(registry);
        let registry = WorldRegistry::open(
            &config,
            Arc::new(DimensionTypeRegistry::new()),
            DiskWorldBackend::new(&config.directory, Arc::clone(&bus)),
        )
        .unwrap();
        assert_eq!(registry.existing_worlds(), vec!["epsilon_END"]);
        let reloaded = registry.get_world("epsilon_END", true).unwrap();
        assert_eq!(reloaded.seed(), 5);
    }
}
