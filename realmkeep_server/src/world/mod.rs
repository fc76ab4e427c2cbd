pub mod disk;
pub mod registry;

use std::sync::Arc;

use realmkeep_lib::{DimensionType, WorldGenerator, naming};

use crate::error::BackendError;

pub use registry::WorldRegistry;

/// Reason given to players removed by a forced unload.
pub const SHUTDOWN_REASON: &str = "Server scheduled world shutdown";

pub trait PlayerHandle: Send + Sync {
    fn name(&self) -> &str;

    /// Kicks the player. Called with the registry lock held, so it must not
    /// block or call back into the registry.
    fn disconnect(&self, reason: &str);
}

/// What the registry needs from a resident world.
pub trait ManagedWorld: Send + Sync + 'static {
    type Player: PlayerHandle;

    fn name(&self) -> &str;

    fn dimension(&self) -> &DimensionType;

    fn fq_name(&self) -> String {
        naming::fq_name(self.name(), self.dimension())
    }

    /// Players currently connected to this world.
    fn players(&self) -> Vec<Arc<Self::Player>>;

    fn save(&self) -> Result<(), BackendError>;
}

/// Builds worlds for the registry and hears about their lifecycle.
///
/// Every method runs under the registry lock.
pub trait WorldBackend: Send + Sync {
    type World: ManagedWorld;

    /// Creates the world if nothing is on disk yet, otherwise loads it.
    fn create_or_load(
        &self,
        name: &str,
        seed: i64,
        dimension: &DimensionType,
        generator: Option<WorldGenerator>,
    ) -> Result<Arc<Self::World>, BackendError>;

    fn world_loaded(&self, _world: &Arc<Self::World>) {}

    fn world_unloaded(&self, world: &Arc<Self::World>);
}
