use std::path::PathBuf;

use realmkeep_lib::DimensionError;

use crate::config::ConfigError;

/// Failures reported by a world backend while constructing or saving a world.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("could not encode level metadata: {0}")]
    Encode(#[from] toml::ser::Error),
    #[error("could not decode level metadata: {0}")]
    Decode(#[from] toml::de::Error),
    #[error("{0}")]
    Rejected(String),
}

#[derive(Debug, thiserror::Error)]
pub enum WorldError {
    #[error("world {name} is unknown; autoload was enabled for this call")]
    Unknown { name: String },
    #[error("world {name} is not loaded; autoload was disabled for this call")]
    NotLoaded { name: String },
    #[error("world {name} is already loaded")]
    AlreadyLoaded { name: String },
    #[error("could not move world directory {}; it may still be in use", path.display())]
    Busy {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("world backend failed for {name}: {source}")]
    Backend {
        name: String,
        #[source]
        source: BackendError,
    },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl WorldError {
    /// True for both lookup misses, whether or not autoload was requested.
    pub fn is_unknown_world(&self) -> bool {
        matches!(self, WorldError::Unknown { .. } | WorldError::NotLoaded { .. })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Dimension(#[from] DimensionError),
    #[error(transparent)]
    World(#[from] WorldError),
}
