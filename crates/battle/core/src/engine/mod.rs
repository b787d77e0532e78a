//! The combat executor: all state mutation behind the session API.
//!
//! Every operation runs against a [`BattleCtx`] that bundles the mutable
//! battle state with the bus, catalog, roll oracle, config, and presenter.
//! There is exactly one logical thread of control: publishing an event
//! collects the matching subscriptions and runs their action lists to
//! completion (depth-guarded) before the publishing operation continues.

pub(crate) mod attack;
pub(crate) mod effects;
pub(crate) mod executor;
pub(crate) mod scheduler;

use crate::ability::AbilityResult;
use crate::catalog::{Catalog, CatalogError};
use crate::config::BattleConfig;
use crate::events::{EventBus, EventContext, EventKind};
use crate::presenter::Presenter;
use crate::roll::{RollOracle, compute_seed};
use crate::state::{BattleState, CombatantId, TileCoord};

/// Errors raised by the executor.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ExecuteError {
    /// The trigger cascade exceeded the configured maximum depth. Raised
    /// as an engine fault so cyclic definitions terminate instead of
    /// recursing forever.
    #[error("trigger cascade exceeded maximum depth {depth}")]
    CascadeOverflow { depth: u32 },

    /// An action referenced execution context that does not exist, e.g. an
    /// event party outside a trigger. Aborts only the referencing action.
    #[error("action referenced {0} outside its execution context")]
    ResultAccess(&'static str),

    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

/// Per-action execution environment: the player-selected tile (top-level
/// tile-input abilities only) and the triggering event (reactions only).
#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct ActionEnv<'a> {
    pub target_tile: Option<TileCoord>,
    pub event: Option<&'a EventContext>,
}

/// Mutable execution context threaded through every engine operation.
pub(crate) struct BattleCtx<'a> {
    pub state: &'a mut BattleState,
    pub bus: &'a mut EventBus,
    pub catalog: &'a dyn Catalog,
    pub roll: &'a dyn RollOracle,
    pub config: &'a BattleConfig,
    pub presenter: &'a mut dyn Presenter,
}

impl BattleCtx<'_> {
    /// One percentage roll in `[0, 100)`, consuming a nonce.
    pub fn roll_percent(&mut self, context: u32) -> i32 {
        let nonce = self.state.next_nonce();
        self.roll
            .roll_percent(compute_seed(self.state.seed, nonce, context))
    }

    /// One uniform index roll in `[0, len)`, consuming a nonce.
    pub fn roll_index(&mut self, context: u32, len: usize) -> usize {
        let nonce = self.state.next_nonce();
        self.roll
            .roll_index(compute_seed(self.state.seed, nonce, context), len)
    }

    /// Adds signed health, clamped to `[0, max_health]`, and notifies the
    /// presenter.
    pub fn add_health(&mut self, id: CombatantId, amount: f32) {
        let stats = self.state.current_stats(id);
        let Some(combatant) = self.state.combatant_mut(id) else {
            return;
        };
        combatant.health = (combatant.health + amount).clamp(0.0, stats.max_health);
        let (health, armor) = (combatant.health, combatant.armor);
        self.presenter
            .on_health_armor_changed(id, health, stats.max_health, armor, stats.max_armor);
    }

    /// Adds signed armor, clamped to `[0, max_armor]`, and notifies the
    /// presenter.
    pub fn add_armor(&mut self, id: CombatantId, amount: f32) {
        let stats = self.state.current_stats(id);
        let Some(combatant) = self.state.combatant_mut(id) else {
            return;
        };
        combatant.armor = (combatant.armor + amount).clamp(0.0, stats.max_armor);
        let (health, armor) = (combatant.health, combatant.armor);
        self.presenter
            .on_health_armor_changed(id, health, stats.max_health, armor, stats.max_armor);
    }

    /// Adds signed turn meter, floored at zero, and notifies the presenter.
    /// There is no upper clamp: regeneration may push the meter past 100
    /// and the scheduler keeps the overflow after the turn's cost.
    pub fn add_turn_meter(&mut self, id: CombatantId, amount: f32) {
        let Some(combatant) = self.state.combatant_mut(id) else {
            return;
        };
        combatant.turn_meter = (combatant.turn_meter + amount).max(0.0);
        let value = combatant.turn_meter;
        self.presenter.on_turn_meter_changed(id, value);
    }
}

/// Publishes one event: logs it, snapshots the matching subscriptions in
/// subscription order, and runs each passing reaction's action list at
/// `depth + 1`.
pub(crate) fn publish(
    ctx: &mut BattleCtx<'_>,
    kind: EventKind,
    event: &EventContext,
    depth: u32,
) -> Result<(), ExecuteError> {
    tracing::debug!(
        event = %kind,
        source = ctx.state.name(event.source),
        recipient = event.recipient.map(|id| ctx.state.name(id)),
        amount = event.amount.map(f64::from),
        effect = event.effect.as_deref(),
        "battle event"
    );

    let reactions = ctx.bus.reactions_for(kind);
    for reaction in reactions {
        if !ctx.state.is_active(reaction.user) {
            continue;
        }
        if let Some(filter) = &reaction.filter
            && !filter.passes(ctx.state, reaction.user, event)
        {
            continue;
        }

        // Each reaction accumulates its own result; event parties are the
        // only context it inherits from the triggering interaction.
        let mut result = AbilityResult::default();
        let env = ActionEnv {
            target_tile: None,
            event: Some(event),
        };
        for spec in &reaction.actions {
            match executor::execute_action(ctx, reaction.user, spec, &mut result, env, depth + 1) {
                Err(ExecuteError::ResultAccess(what)) => {
                    tracing::warn!(
                        user = ctx.state.name(reaction.user),
                        what,
                        "reaction action aborted"
                    );
                }
                other => other?,
            }
        }
    }
    Ok(())
}

#[cfg(test)]
pub(crate) mod testutil {
    use std::collections::HashMap;

    use super::*;
    use crate::state::CombatantDefinition;
    use crate::status::StatusEffectDefinition;

    /// Map-backed catalog for engine and session tests.
    #[derive(Default)]
    pub struct TestCatalog {
        pub units: HashMap<String, CombatantDefinition>,
        pub effects: HashMap<String, StatusEffectDefinition>,
    }

    impl TestCatalog {
        pub fn with_effects(effects: impl IntoIterator<Item = StatusEffectDefinition>) -> Self {
            let mut catalog = Self::default();
            for effect in effects {
                catalog.effects.insert(effect.name.clone(), effect);
            }
            catalog
        }

        pub fn add_unit(&mut self, definition: CombatantDefinition) {
            self.units.insert(definition.name.clone(), definition);
        }
    }

    impl Catalog for TestCatalog {
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
}
