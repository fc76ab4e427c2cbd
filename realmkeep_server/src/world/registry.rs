use std::{
    collections::{HashMap, HashSet},
    fs, io,
    path::{Path, PathBuf},
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use realmkeep_lib::{DimensionType, DimensionTypeRegistry, WorldGenerator, naming};

use super::{ManagedWorld, PlayerHandle, SHUTDOWN_REASON, WorldBackend};
use crate::{config::WorldsConfig, error::WorldError};

/// Worlds known to exist on disk, in discovery order, without duplicates.
#[derive(Default)]
struct KnownWorlds {
    order: Vec<String>,
    index: HashSet<String>,
}

impl KnownWorlds {
    fn contains(&self, fq_name: &str) -> bool {
        self.index.contains(fq_name)
    }

    fn insert(&mut self, fq_name: &str) {
        if self.index.insert(fq_name.to_string()) {
            self.order.push(fq_name.to_string());
        }
    }

    fn retain(&mut self, mut keep: impl FnMut(&str) -> bool) {
        let index = &mut self.index;
        self.order.retain(|fq_name| {
            let kept = keep(fq_name);
            if !kept {
                index.remove(fq_name);
            }
            kept
        });
    }

    fn to_vec(&self) -> Vec<String> {
        self.order.clone()
    }
}

impl FromIterator<String> for KnownWorlds {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        let mut known = KnownWorlds::default();
        for fq_name in iter {
            known.insert(&fq_name);
        }
        known
    }
}

struct WorldTable<W> {
    loaded: HashMap<String, Arc<W>>,
    known: KnownWorlds,
    /// Unload requests not applied yet, with their force flag.
    pending: HashMap<String, bool>,
}

impl<W> WorldTable<W> {
    fn is_known(&self, fq_name: &str) -> bool {
        self.known.contains(fq_name)
    }

    fn remember(&mut self, fq_name: &str) {
        self.known.insert(fq_name);
    }
}

/// Owns every resident world and decides when worlds are built or retired.
///
/// Worlds are keyed by their fully-qualified name (`<base>_<DIMENSION>`).
/// Unloading is two-phase: [`WorldRegistry::request_unload`] only marks a
/// world, and the next enumeration sweeps the marks before taking its
/// snapshot. Snapshots handed out earlier are never mutated.
///
/// All state sits behind one mutex, which is also held while the backend
/// builds, saves or retires a world.
pub struct WorldRegistry<B: WorldBackend> {
    backend: B,
    dimension_types: Arc<DimensionTypeRegistry>,
    worlds_dir: PathBuf,
    backups_dir: PathBuf,
    table: Mutex<WorldTable<B::World>>,
}

impl<B: WorldBackend> WorldRegistry<B> {
    /// Opens the registry over `config.directory`, creating it if missing and
    /// recording every `<base>/<base>_<TYPE>` directory found as known.
    pub fn open(
        config: &WorldsConfig,
        dimension_types: Arc<DimensionTypeRegistry>,
        backend: B,
    ) -> Result<Self, WorldError> {
        fs::create_dir_all(&config.directory)?;
        let known = scan_worlds(&config.directory)?;
        tracing::info!(
            count = known.len(),
            dir = %config.directory.display(),
            "discovered worlds on disk"
        );

        Ok(Self {
            backend,
            dimension_types,
            worlds_dir: config.directory.clone(),
            backups_dir: config.backups.clone(),
            table: Mutex::new(WorldTable {
                loaded: HashMap::new(),
                known: known.into_iter().collect(),
                pending: HashMap::new(),
            }),
        })
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn dimension_types(&self) -> &Arc<DimensionTypeRegistry> {
        &self.dimension_types
    }

    fn lock(&self) -> MutexGuard<'_, WorldTable<B::World>> {
        self.table.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Looks a world up by name, with or without a dimension suffix.
    ///
    /// A name ending in `_<TYPE>` for a registered type is treated as
    /// `get_world_in(base, TYPE, autoload)`. Any other name is tried verbatim
    /// and then in the `NORMAL` dimension. With `autoload`, a world known to
    /// exist on disk is loaded.
    pub fn get_world(&self, name: &str, autoload: bool) -> Result<Arc<B::World>, WorldError> {
        if let Some((base, dimension)) = naming::split_fq_name(name, &self.dimension_types) {
            return self.get_world_in(base, &dimension, autoload);
        }

        let normal = DimensionType::normal();
        let normal_name = naming::fq_name(name, &normal);

        let mut table = self.lock();
        if let Some(world) = table
            .loaded
            .get(name)
            .or_else(|| table.loaded.get(&normal_name))
        {
            return Ok(Arc::clone(world));
        }

        if !autoload {
            return Err(WorldError::NotLoaded {
                name: name.to_string(),
            });
        }
        if table.is_known(name) || table.is_known(&normal_name) {
            return self.load_locked(&mut table, name, &normal);
        }
        Err(WorldError::Unknown {
            name: name.to_string(),
        })
    }

    /// Returns the world `name` in `dimension`, loading or creating it when
    /// `autoload` is set.
    pub fn get_world_in(
        &self,
        name: &str,
        dimension: &DimensionType,
        autoload: bool,
    ) -> Result<Arc<B::World>, WorldError> {
        let fq_name = naming::fq_name(name, dimension);

        let mut table = self.lock();
        if let Some(world) = table.loaded.get(&fq_name) {
            return Ok(Arc::clone(world));
        }

        if !autoload {
            return Err(WorldError::NotLoaded { name: fq_name });
        }
        if table.is_known(&fq_name) {
            tracing::debug!(world = %fq_name, "world exists but is not loaded, loading");
            self.load_locked(&mut table, name, dimension)
        } else {
            tracing::debug!(world = %fq_name, "world does not exist, creating");
            self.create_locked(&mut table, name, rand::random(), dimension, None)
        }
    }

    pub fn create_world(
        &self,
        name: &str,
        dimension: &DimensionType,
    ) -> Result<Arc<B::World>, WorldError> {
        self.create_locked(&mut self.lock(), name, rand::random(), dimension, None)
    }

    pub fn create_world_with_seed(
        &self,
        name: &str,
        seed: i64,
        dimension: &DimensionType,
    ) -> Result<Arc<B::World>, WorldError> {
        self.create_locked(&mut self.lock(), name, seed, dimension, None)
    }

    pub fn create_world_with_generator(
        &self,
        name: &str,
        seed: i64,
        dimension: &DimensionType,
        generator: WorldGenerator,
    ) -> Result<Arc<B::World>, WorldError> {
        self.create_locked(&mut self.lock(), name, seed, dimension, Some(generator))
    }

    /// Loads `name` in `dimension`, or returns the resident instance.
    ///
    /// The world does not have to be known; whatever the backend makes of the
    /// directory is accepted.
    pub fn load_world(
        &self,
        name: &str,
        dimension: &DimensionType,
    ) -> Result<Arc<B::World>, WorldError> {
        self.load_locked(&mut self.lock(), name, dimension)
    }

    fn create_locked(
        &self,
        table: &mut WorldTable<B::World>,
        name: &str,
        seed: i64,
        dimension: &DimensionType,
        generator: Option<WorldGenerator>,
    ) -> Result<Arc<B::World>, WorldError> {
        let fq_name = naming::fq_name(name, dimension);
        if table.loaded.contains_key(&fq_name) {
            return Err(WorldError::AlreadyLoaded { name: fq_name });
        }

        tracing::info!(world = %fq_name, seed, ?generator, "creating world");
        let world = self.construct(&fq_name, name, seed, dimension, generator)?;
        Ok(self.admit(table, fq_name, world))
    }

    fn load_locked(
        &self,
        table: &mut WorldTable<B::World>,
        name: &str,
        dimension: &DimensionType,
    ) -> Result<Arc<B::World>, WorldError> {
        let fq_name = naming::fq_name(name, dimension);
        if let Some(world) = table.loaded.get(&fq_name) {
            return Ok(Arc::clone(world));
        }

        tracing::info!(world = %fq_name, "loading world");
        let world = self.construct(&fq_name, name, rand::random(), dimension, None)?;
        Ok(self.admit(table, fq_name, world))
    }

    fn construct(
        &self,
        fq_name: &str,
        name: &str,
        seed: i64,
        dimension: &DimensionType,
        generator: Option<WorldGenerator>,
    ) -> Result<Arc<B::World>, WorldError> {
        self.backend
            .create_or_load(name, seed, dimension, generator)
            .map_err(|source| WorldError::Backend {
                name: fq_name.to_string(),
                source,
            })
    }

    fn admit(
        &self,
        table: &mut WorldTable<B::World>,
        fq_name: String,
        world: Arc<B::World>,
    ) -> Arc<B::World> {
        tracing::debug!(world = %fq_name, "adding world to registry");
        table.remember(&fq_name);
        // A request recorded while the key was not resident is stale.
        table.pending.remove(&fq_name);
        table.loaded.insert(fq_name, Arc::clone(&world));
        self.backend.world_loaded(&world);
        world
    }

    /// Marks `name` in `dimension` for unloading at the next enumeration.
    pub fn unload_world(&self, name: &str, dimension: &DimensionType, force: bool) {
        self.request_unload(&naming::fq_name(name, dimension), force);
    }

    /// Marks a world for unloading. Nothing is removed until the next call to
    /// [`WorldRegistry::worlds`] or one of the name listings; the last request
    /// for a key wins.
    pub fn request_unload(&self, fq_name: &str, force: bool) {
        tracing::debug!(world = %fq_name, force, "scheduling world for unload");
        self.lock().pending.insert(fq_name.to_string(), force);
    }

    fn evict_pending(&self, table: &mut WorldTable<B::World>) {
        if table.pending.is_empty() {
            return;
        }
        tracing::debug!(count = table.pending.len(), "processing worlds for unload");

        let mut requests: Vec<(String, bool)> = table
            .pending
            .iter()
            .map(|(fq_name, force)| (fq_name.clone(), *force))
            .collect();
        requests.sort();

        for (fq_name, force) in requests {
            let Some(world) = table.loaded.get(&fq_name).cloned() else {
                table.pending.remove(&fq_name);
                continue;
            };

            let players = world.players();
            if !players.is_empty() {
                if !force {
                    tracing::warn!(
                        world = %fq_name,
                        players = players.len(),
                        "world scheduled for unload still has players, not unloading"
                    );
                    continue;
                }
                for player in &players {
                    player.disconnect(SHUTDOWN_REASON);
                }
                tracing::info!(
                    world = %fq_name,
                    players = players.len(),
                    "kicked players for world shutdown"
                );
            }

            if let Err(err) = world.save() {
                tracing::error!(world = %fq_name, %err, "failed to save world, unload postponed");
                continue;
            }
            self.backend.world_unloaded(&world);
            table.loaded.remove(&fq_name);
            table.pending.remove(&fq_name);
            tracing::info!(world = %fq_name, "world unloaded");
        }
    }

    /// Snapshot of every loaded world, ordered by fully-qualified name.
    pub fn worlds(&self) -> Vec<Arc<B::World>> {
        let mut table = self.lock();
        self.evict_pending(&mut table);

        let mut entries: Vec<_> = table.loaded.iter().collect();
        entries.sort_by(|a, b| a.0.cmp(b.0));
        entries.into_iter().map(|(_, world)| Arc::clone(world)).collect()
    }

    pub fn loaded_world_names(&self) -> Vec<String> {
        let mut table = self.lock();
        self.evict_pending(&mut table);

        let mut names: Vec<String> = table.loaded.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn loaded_world_names_of(&self, dimension: &DimensionType) -> Vec<String> {
        let mut table = self.lock();
        self.evict_pending(&mut table);

        let mut names: Vec<String> = table
            .loaded
            .iter()
            .filter(|(_, world)| world.dimension() == dimension)
            .map(|(fq_name, _)| fq_name.clone())
            .collect();
        names.sort();
        names
    }

    pub fn existing_worlds(&self) -> Vec<String> {
        self.lock().known.to_vec()
    }

    /// Keys still waiting to be evicted, sorted.
    pub fn pending_unloads(&self) -> Vec<String> {
        let mut names: Vec<String> = self.lock().pending.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn is_loaded(&self, fq_name: &str) -> bool {
        self.lock().loaded.contains_key(fq_name)
    }

    pub fn is_loaded_in(&self, name: &str, dimension: &DimensionType) -> bool {
        self.is_loaded(&naming::fq_name(name, dimension))
    }

    /// Whether `worlds/<base>/<fq_name>` is a directory.
    pub fn exists(&self, fq_name: &str) -> bool {
        self.worlds_dir
            .join(naming::base_name(fq_name))
            .join(fq_name)
            .is_dir()
    }

    /// Moves `worlds/<name>` into the backups directory and forgets its
    /// dimensions. Returns the backup path.
    ///
    /// Every dimension of `name` must be unloaded first. While any of them is
    /// resident the call fails with [`WorldError::Busy`] and nothing is moved,
    /// since a world whose directory is gone can no longer be saved or evicted.
    pub fn destroy_world(&self, name: &str) -> Result<PathBuf, WorldError> {
        let source = self.worlds_dir.join(name);
        let target = self.backups_dir.join(name);

        let mut table = self.lock();
        let resident: Vec<&String> = table
            .loaded
            .keys()
            .filter(|fq_name| naming::base_name(fq_name) == name)
            .collect();
        if !resident.is_empty() {
            tracing::warn!(
                world = name,
                ?resident,
                "refusing to destroy a world that is still loaded"
            );
            return Err(WorldError::Busy {
                path: source,
                source: io::Error::new(
                    io::ErrorKind::ResourceBusy,
                    format!("{} still loaded", resident.len()),
                ),
            });
        }

        if target.exists() {
            return Err(WorldError::Busy {
                path: source,
                source: io::Error::new(
                    io::ErrorKind::AlreadyExists,
                    format!("backup {} already exists", target.display()),
                ),
            });
        }
        fs::create_dir_all(&self.backups_dir)?;
        if let Err(source_err) = fs::rename(&source, &target) {
            tracing::error!(
                world = name,
                err = %source_err,
                "attempted to move world but it appeared to be still in use"
            );
            return Err(WorldError::Busy {
                path: source,
                source: source_err,
            });
        }

        table
            .known
            .retain(|fq_name| naming::base_name(fq_name) != name);
        tracing::info!(world = name, backup = %target.display(), "moved world to backups");
        Ok(target)
    }
}

fn scan_worlds(dir: &Path) -> io::Result<Vec<String>> {
    let mut known = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        for child in fs::read_dir(entry.path())? {
            let child = child?;
            if !child.file_type()?.is_dir() {
                continue;
            }
            match child.file_name().into_string() {
                Ok(name) if name.contains(naming::SEPARATOR) => known.push(name),
                Ok(_) => {}
                Err(raw) => tracing::warn!(?raw, "skipping world directory with non UTF-8 name"),
            }
        }
    }
    known.sort();
    known.dedup();
    Ok(known)
}
