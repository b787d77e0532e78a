//! Presentation seam.
//!
//! The engine pushes display-relevant changes through this trait and never
//! waits on it. Every method has a no-op default so hosts implement only
//! what they draw.

use crate::ability::Pattern;
use crate::board::TileTarget;
use crate::state::{ActiveAbility, CombatantId, TileCoord};

/// Sink for presentation callbacks.
#[allow(unused_variables)]
pub trait Presenter {
    /// A combatant's health or armor (or their maxima) changed.
    fn on_health_armor_changed(
        &mut self,
        id: CombatantId,
        health: f32,
        max_health: f32,
        armor: f32,
        max_armor: f32,
    ) {
    }

    /// A combatant's turn meter changed.
    fn on_turn_meter_changed(&mut self, id: CombatantId, value: f32) {}

    /// The acting combatant's ability palette should be shown.
    fn on_abilities_available(&mut self, user: CombatantId, abilities: &[ActiveAbility]) {}

    /// The ability palette should be hidden.
    fn on_abilities_hidden(&mut self) {}

    /// Legal target tiles for a pending tile-input ability.
    fn on_targetable_tiles_changed(&mut self, tiles: &[TileTarget]) {}

    /// Target tile highlights should be hidden.
    fn on_targetable_tiles_hidden(&mut self) {}

    /// Preview of the attack pattern anchored at a hovered tile.
    fn on_attack_pattern_preview(&mut self, pattern: &Pattern, anchor: TileCoord) {}

    /// The pattern preview should be hidden.
    fn on_attack_pattern_hidden(&mut self) {}
}

/// Presenter that ignores everything; the default for headless battles.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullPresenter;

impl Presenter for NullPresenter {}
