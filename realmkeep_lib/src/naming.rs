//! Fully-qualified world names.
//!
//! A world is keyed by `<base>_<DIMENSION>`, e.g. `world_NETHER`. Dimension
//! type names never contain `_`, so the last separator always splits the
//! key; base names may contain underscores freely.

use crate::dimension::{DimensionType, DimensionTypeRegistry};

pub const SEPARATOR: char = '_';

pub fn fq_name(base: &str, dimension: &DimensionType) -> String {
    format!("{base}{SEPARATOR}{}", dimension.name())
}

/// Splits `name` into its base and a registered dimension type.
///
/// Returns `None` when the trailing token is not a registered type or the
/// base would be empty.
pub fn split_fq_name<'a>(
    name: &'a str,
    types: &DimensionTypeRegistry,
) -> Option<(&'a str, DimensionType)> {
    let (base, token) = name.rsplit_once(SEPARATOR)?;
    if base.is_empty() {
        return None;
    }
    types.from_name(token).map(|dim| (base, dim))
}

/// The base-name directory an fq-name lives under.
pub fn base_name(fq_name: &str) -> &str {
    fq_name
        .rsplit_once(SEPARATOR)
        .map_or(fq_name, |(base, _)| base)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joins_with_separator() {
        assert_eq!(fq_name("alpha", &DimensionType::nether()), "alpha_NETHER");
    }

    #[test]
    fn splits_on_last_separator() {
        let types = DimensionTypeRegistry::new();
        let (base, dim) = split_fq_name("my_old_world_END", &types).unwrap();
        assert_eq!(base, "my_old_world");
        assert_eq!(dim, DimensionType::end());
    }

    #[test]
    fn unregistered_suffix_does_not_split() {
        let types = DimensionTypeRegistry::new();
        assert!(split_fq_name("my_world", &types).is_none());
        assert!(split_fq_name("NETHER", &types).is_none());
        assert!(split_fq_name("_NETHER", &types).is_none());
    }

    #[test]
    fn every_registered_type_round_trips() {
        let types = DimensionTypeRegistry::new();
        types.register("SKYLANDS", 2).unwrap();
        for dim in types.all() {
            let name = fq_name("alpha", &dim);
            assert_eq!(split_fq_name(&name, &types), Some(("alpha", dim)));
        }
    }

    #[test]
    fn base_name_strips_dimension() {
        assert_eq!(base_name("world_NORMAL"), "world");
        assert_eq!(base_name("plain"), "plain");
    }
}
