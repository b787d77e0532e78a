//! Content factory for building a catalog from a data directory.

use std::path::{Path, PathBuf};

use battle_core::{CombatantDefinition, StatusEffectDefinition};

use crate::catalog::StaticCatalog;
use crate::loaders::{LoadResult, StatusEffectLoader, UnitLoader};

/// Loads all battle content from a data directory.
///
/// # Directory Structure
///
/// ```text
/// data_dir/
/// ├── units/
/// │   └── *.json
/// └── status_effects/
///     └── *.json
/// ```
pub struct ContentFactory {
    data_dir: PathBuf,
}

impl ContentFactory {
    /// Creates a new content factory pointing to a data directory.
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    /// Load every combatant definition from `units/`.
    pub fn load_units(&self) -> LoadResult<Vec<CombatantDefinition>> {
        UnitLoader::load_dir(&self.data_dir.join("units"))
    }

    /// Load every status-effect definition from `status_effects/`.
    pub fn load_status_effects(&self) -> LoadResult<Vec<StatusEffectDefinition>> {
        StatusEffectLoader::load_dir(&self.data_dir.join("status_effects"))
    }

    /// Load everything into a ready-to-use catalog.
    pub fn build_catalog(&self) -> LoadResult<StaticCatalog> {
        let mut catalog = StaticCatalog::new();
        for unit in self.load_units()? {
            catalog.insert_unit(unit)?;
        }
        for effect in self.load_status_effects()? {
            catalog.insert_status_effect(effect)?;
        }
        Ok(catalog)
    }

    /// Returns the data directory path.
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }
}
