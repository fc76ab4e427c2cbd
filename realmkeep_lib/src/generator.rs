use std::fmt;

use serde::{Deserialize, Serialize};

/// Terrain generation algorithm requested when a world is first created.
///
/// The registry only forwards this tag to the world backend; it never
/// interprets it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorldGenerator {
    #[default]
    Default,
    Flat,
    LargeBiomes,
    Amplified,
}

impl WorldGenerator {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorldGenerator::Default => "default",
            WorldGenerator::Flat => "flat",
            WorldGenerator::LargeBiomes => "large_biomes",
            WorldGenerator::Amplified => "amplified",
        }
    }
}

impl fmt::Display for WorldGenerator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
