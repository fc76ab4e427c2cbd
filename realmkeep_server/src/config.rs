use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

pub const DEFAULT_CONFIG_FILE: &str = "realmkeep.toml";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("could not read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid configuration in {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub worlds: WorldsConfig,
    /// Extra dimension types registered at startup, after the built-ins.
    pub dimension_types: Vec<DimensionTypeEntry>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldsConfig {
    pub directory: PathBuf,
    pub backups: PathBuf,
    /// Base name loaded (or created) in the `NORMAL` dimension at startup.
    /// Empty disables it.
    pub default_world: String,
}

impl Default for WorldsConfig {
    fn default() -> WorldsConfig {
        WorldsConfig {
            directory: PathBuf::from("worlds"),
            backups: PathBuf::from("worldsbackups"),
            default_world: "world".to_string(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DimensionTypeEntry {
    pub name: String,
    pub id: i32,
}

impl ServerConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<ServerConfig, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Like [`ServerConfig::load`], but a missing file yields the defaults.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<ServerConfig, ConfigError> {
        let path = path.as_ref();
        if path.exists() {
            Self::load(path)
        } else {
            tracing::info!("no config at {}, using defaults", path.display());
            Ok(ServerConfig::default())
        }
    }
}
