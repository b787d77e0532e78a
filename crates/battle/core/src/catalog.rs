//! Data Catalog seam.
//!
//! The engine consumes immutable definitions by name and never owns their
//! storage or loading. `battle-content` provides the production
//! implementation; tests implement the trait over plain maps.

use crate::state::CombatantDefinition;
use crate::status::StatusEffectDefinition;

/// Errors surfaced by catalog lookups.
///
/// A missing name is fatal to the operation that requested it: a battle
/// cannot start with an unknown roster entry, and an ability referencing an
/// unknown status effect aborts.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum CatalogError {
    #[error("unknown unit definition '{0}'")]
    UnitNotFound(String),

    #[error("unknown status effect definition '{0}'")]
    StatusEffectNotFound(String),
}

/// Read-only provider of combatant and status-effect definitions.
pub trait Catalog {
    /// Looks up a combatant definition by name.
    fn unit_definition(&self, name: &str) -> Result<&CombatantDefinition, CatalogError>;

    /// Looks up a status effect definition by name.
    fn status_effect_definition(&self, name: &str)
    -> Result<&StatusEffectDefinition, CatalogError>;
}
