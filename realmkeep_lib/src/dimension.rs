use std::collections::HashMap;
use std::fmt;
use std::sync::{PoisonError, RwLock};

use serde::{Deserialize, Serialize};

pub const NORMAL: &str = "NORMAL";
pub const NETHER: &str = "NETHER";
pub const END: &str = "END";

/// A dimension variant that tells apart worlds sharing the same base name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DimensionType {
    name: String,
    id: i32,
}

impl DimensionType {
    pub fn new(name: impl Into<String>, id: i32) -> Self {
        Self {
            name: name.into(),
            id,
        }
    }

    pub fn normal() -> Self {
        Self::new(NORMAL, 0)
    }

    pub fn nether() -> Self {
        Self::new(NETHER, -1)
    }

    pub fn end() -> Self {
        Self::new(END, 1)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn id(&self) -> i32 {
        self.id
    }

    pub fn validate(&self) -> Result<(), DimensionError> {
        if self.name.is_empty()
            || self.name.contains('_')
            || self.name.chars().any(char::is_whitespace)
        {
            return Err(DimensionError::InvalidName {
                name: self.name.clone(),
            });
        }
        Ok(())
    }
}

impl fmt::Display for DimensionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.name, self.id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DimensionError {
    #[error("dimension type '{name}' already registered")]
    NameTaken { name: String },
    #[error("dimension id {id} already registered as '{existing}'")]
    IdTaken { id: i32, existing: String },
    #[error("invalid dimension type name '{name}': must be non-empty with no '_' or whitespace")]
    InvalidName { name: String },
}

#[derive(Default)]
struct Tables {
    by_name: HashMap<String, DimensionType>,
    by_id: HashMap<i32, String>,
}

/// Process-wide table of dimension types, looked up by name or by id.
///
/// Every registry starts out with `NORMAL`, `NETHER` and `END`. Registering a
/// name or an id that is already bound is rejected; entries are never
/// replaced or removed.
pub struct DimensionTypeRegistry {
    tables: RwLock<Tables>,
}

impl Default for DimensionTypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl DimensionTypeRegistry {
    pub fn new() -> Self {
        let mut tables = Tables::default();
        for dim in [
            DimensionType::normal(),
            DimensionType::nether(),
            DimensionType::end(),
        ] {
            tables.by_id.insert(dim.id, dim.name.clone());
            tables.by_name.insert(dim.name.clone(), dim);
        }

        Self {
            tables: RwLock::new(tables),
        }
    }

    pub fn register(&self, name: &str, id: i32) -> Result<DimensionType, DimensionError> {
        let dim = DimensionType::new(name, id);
        dim.validate()?;

        let mut tables = self.tables.write().unwrap_or_else(PoisonError::into_inner);
        if tables.by_name.contains_key(name) {
            return Err(DimensionError::NameTaken {
                name: name.to_string(),
            });
        }
        if let Some(existing) = tables.by_id.get(&id) {
            return Err(DimensionError::IdTaken {
                id,
                existing: existing.clone(),
            });
        }

        tables.by_id.insert(id, dim.name.clone());
        tables.by_name.insert(dim.name.clone(), dim.clone());
        Ok(dim)
    }

    pub fn from_name(&self, name: &str) -> Option<DimensionType> {
        self.tables
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .by_name
            .get(name)
            .cloned()
    }

    pub fn from_id(&self, id: i32) -> Option<DimensionType> {
        let tables = self.tables.read().unwrap_or_else(PoisonError::into_inner);
        tables
            .by_id
            .get(&id)
            .and_then(|name| tables.by_name.get(name))
            .cloned()
    }

    /// All registered types, ordered by id.
    pub fn all(&self) -> Vec<DimensionType> {
        let tables = self.tables.read().unwrap_or_else(PoisonError::into_inner);
        let mut types: Vec<_> = tables.by_name.values().cloned().collect();
        types.sort_by_key(DimensionType::id);
        types
    }
}

/// Registers a batch of dimension types, stopping at the first rejection.
///
/// ```ignore
/// register_dimension_types!(registry, {
///     "SKYLANDS" => 2,
///     "AETHER" => 3,
/// })?;
/// ```
#[macro_export]
macro_rules! register_dimension_types {
    ($registry:expr, { $($name:expr => $id:expr),* $(,)? }) => {{
        let registry: &$crate::dimension::DimensionTypeRegistry = &$registry;
        (|| -> ::core::result::Result<(), $crate::dimension::DimensionError> {
            $(
                registry.register($name, $id)?;
            )*
            Ok(())
        })()
    }};
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtins_are_seeded() {
        let registry = DimensionTypeRegistry::new();
        assert_eq!(registry.from_name("NORMAL"), Some(DimensionType::normal()));
        assert_eq!(registry.from_id(-1), Some(DimensionType::nether()));
        assert_eq!(registry.from_id(1).unwrap().name(), "END");
        assert_eq!(registry.all().len(), 3);
    }

    #[test]
    fn register_is_bidirectional() {
        let registry = DimensionTypeRegistry::new();
        let sky = registry.register("SKYLANDS", 7).unwrap();
        assert_eq!(registry.from_name("SKYLANDS"), Some(sky.clone()));
        assert_eq!(registry.from_id(7), Some(sky));
    }

    #[test]
    fn reregistering_a_name_is_rejected() {
        let registry = DimensionTypeRegistry::new();
        let err = registry.register("NETHER", 42).unwrap_err();
        assert_eq!(
            err,
            DimensionError::NameTaken {
                name: "NETHER".into()
            }
        );
        // The original binding is untouched.
        assert_eq!(registry.from_name("NETHER").unwrap().id(), -1);
        assert!(registry.from_id(42).is_none());
    }

    #[test]
    fn reusing_an_id_is_rejected() {
        let registry = DimensionTypeRegistry::new();
        let err = registry.register("MIRROR", 0).unwrap_err();
        assert!(matches!(
            err,
            DimensionError::IdTaken { id: 0, ref existing } if existing == "NORMAL"
        ));
        assert!(registry.from_name("MIRROR").is_none());
    }

    #[test]
    fn names_with_separator_are_invalid() {
        let registry = DimensionTypeRegistry::new();
        for name in ["", "DEEP_DARK", "two words"] {
            assert!(matches!(
                registry.register(name, 99),
                Err(DimensionError::InvalidName { .. })
            ));
        }
    }

    #[test]
    fn lookups_are_case_sensitive() {
        let registry = DimensionTypeRegistry::new();
        assert!(registry.from_name("nether").is_none());
    }

    #[test]
    fn macro_registers_in_order() {
        let registry = DimensionTypeRegistry::new();
        crate::register_dimension_types!(registry, {
            "SKYLANDS" => 2,
            "AETHER" => 3,
        })
        .unwrap();
        let ids: Vec<i32> = registry.all().iter().map(DimensionType::id).collect();
        assert_eq!(ids, vec![-1, 0, 1, 2, 3]);

        let result = crate::register_dimension_types!(registry, {
            "TWILIGHT" => 4,
            "AETHER" => 5,
        });
        assert!(matches!(result, Err(DimensionError::NameTaken { .. })));
        assert!(registry.from_name("TWILIGHT").is_some());
    }
}
