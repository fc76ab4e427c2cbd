pub mod dimension;
pub mod generator;
pub mod naming;

pub use dimension::{DimensionError, DimensionType, DimensionTypeRegistry};
pub use generator::WorldGenerator;
