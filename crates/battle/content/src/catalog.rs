//! In-memory catalog over loaded definitions.

use std::collections::HashMap;

use battle_core::{Catalog, CatalogError, CombatantDefinition, StatusEffectDefinition};

use crate::loaders::LoadResult;

/// Name-keyed definition registry implementing the engine's catalog seam.
#[derive(Debug, Default)]
pub struct StaticCatalog {
    units: HashMap<String, CombatantDefinition>,
    effects: HashMap<String, StatusEffectDefinition>,
}

impl StaticCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a combatant definition. Duplicate names are rejected at
    /// build time rather than shadowing silently.
    pub fn insert_unit(&mut self, definition: CombatantDefinition) -> LoadResult<()> {
        let name = definition.name.clone();
        if self.units.insert(name.clone(), definition).is_some() {
            anyhow::bail!("duplicate unit definition '{name}'");
        }
        Ok(())
    }

    /// Registers a status-effect definition. Duplicate names are rejected.
    pub fn insert_status_effect(&mut self, definition: StatusEffectDefinition) -> LoadResult<()> {
        let name = definition.name.clone();
        if self.effects.insert(name.clone(), definition).is_some() {
            anyhow::bail!("duplicate status effect definition '{name}'");
        }
        Ok(())
    }

    pub fn unit_count(&self) -> usize {
        self.units.len()
    }

    pub fn status_effect_count(&self) -> usize {
        self.effects.len()
    }

    /// Names of all registered units, sorted.
    pub fn unit_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.units.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl Catalog for StaticCatalog {
    fn unit_definition(&self, name: &str) -> Result<&CombatantDefinition, CatalogError> {
        self.units
            .get(name)
            .ok_or_else(|| CatalogError::UnitNotFound(name.to_string()))
    }

    fn status_effect_definition(
        &self,
        name: &str,
    ) -> Result<&StatusEffectDefinition, CatalogError> {
        self.effects
            .get(name)
            .ok_or_else(|| CatalogError::StatusEffectNotFound(name.to_string()))
    }
}
