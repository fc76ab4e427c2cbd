use std::sync::Arc;

use crate::world::disk::ServerWorld;

/// Posted after a world has been inserted into the registry.
#[derive(Clone)]
pub struct WorldLoaded {
    pub world: Arc<ServerWorld>,
}
impl super::Event for WorldLoaded {
    type Output = ();
}

/// Posted after a world has been saved and removed from the registry.
#[derive(Clone)]
pub struct WorldUnloaded {
    pub world: Arc<ServerWorld>,
}
impl super::Event for WorldUnloaded {
    type Output = ();
}
