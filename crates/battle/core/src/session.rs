//! Battle session: the context object that owns every component and wires
//! them together in response to external ticks and input selections.
//!
//! The session is the only public mutation surface. It drives setup
//! (roster construction from the catalog), the idle-tick turn routine,
//! and the two input entry points: ability selection and target-tile
//! selection. All presentation flows out through the owned
//! [`Presenter`]; all definition lookups flow in through the shared
//! [`Catalog`].

use std::sync::Arc;

use crate::ability::AbilityResult;
use crate::board::{self, TileTarget};
use crate::catalog::{Catalog, CatalogError};
use crate::config::BattleConfig;
use crate::engine::scheduler::{self, ActiveTurn};
use crate::engine::{BattleCtx, ExecuteError, executor};
use crate::events::EventBus;
use crate::presenter::{NullPresenter, Presenter};
use crate::roll::PcgRoll;
use crate::state::{ActiveAbility, BattleState, CombatantId, Side, TileCoord};

/// Errors surfaced by the session API.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error("board cell ({row}, {col}) is out of bounds")]
    OutOfBounds { row: i32, col: i32 },

    #[error("board cell ({row}, {col}) is already occupied")]
    TileOccupied { row: i32, col: i32 },

    #[error("no turn is currently active")]
    NoActiveTurn,

    #[error("no ability at index {0}")]
    UnknownAbility(usize),

    #[error("ability '{0}' is on cooldown")]
    OnCooldown(String),

    #[error("ability '{0}' requires a target tile but declares no attack")]
    NotAnAttack(String),

    #[error("no pending tile selection")]
    NoPendingSelection,

    #[error(transparent)]
    Execute(#[from] ExecuteError),
}

/// Where the session is in the turn routine.
enum TurnPhase {
    /// No active turn; ticks generate turn meter.
    Idle,
    /// A combatant's turn is in progress, possibly waiting on input.
    Active {
        turn: ActiveTurn,
        /// Ability index awaiting a target tile, if any.
        pending: Option<usize>,
    },
}

/// Owns the battle and exposes the external interface.
pub struct BattleSession {
    state: BattleState,
    bus: EventBus,
    config: BattleConfig,
    roll: PcgRoll,
    catalog: Arc<dyn Catalog>,
    presenter: Box<dyn Presenter>,
    phase: TurnPhase,
}

macro_rules! battle_ctx {
    ($session:expr) => {
        BattleCtx {
            state: &mut $session.state,
            bus: &mut $session.bus,
            catalog: $session.catalog.as_ref(),
            roll: &$session.roll,
            config: &$session.config,
            presenter: $session.presenter.as_mut(),
        }
    };
}

impl BattleSession {
    /// Creates an empty session over the given catalog. The seed fixes
    /// every chance outcome of the battle.
    pub fn new(catalog: Arc<dyn Catalog>, config: BattleConfig, seed: u64) -> Self {
        Self {
            state: BattleState::new(seed),
            bus: EventBus::new(),
            config,
            roll: PcgRoll,
            catalog,
            presenter: Box::new(NullPresenter),
            phase: TurnPhase::Idle,
        }
    }

    /// Replaces the presentation sink.
    pub fn set_presenter(&mut self, presenter: Box<dyn Presenter>) {
        self.presenter = presenter;
    }

    pub fn state(&self) -> &BattleState {
        &self.state
    }

    pub fn config(&self) -> &BattleConfig {
        &self.config
    }

    /// The combatant whose turn is in progress, if any.
    pub fn current_turn(&self) -> Option<CombatantId> {
        match &self.phase {
            TurnPhase::Idle => None,
            TurnPhase::Active { turn, .. } => Some(turn.combatant),
        }
    }

    // ========================================================================
    // Setup
    // ========================================================================

    /// Adds a combatant by catalog name at the given board cell. An
    /// unknown name is fatal: the battle cannot start with an invalid
    /// roster entry.
    pub fn add_combatant(
        &mut self,
        name: &str,
        side: Side,
        row: i32,
        col: i32,
    ) -> Result<CombatantId, SessionError> {
        if !self.config.in_bounds(row, col) {
            return Err(SessionError::OutOfBounds { row, col });
        }
        if self.state.occupant_at(side, row, col).is_some() {
            return Err(SessionError::TileOccupied { row, col });
        }

        let definition = self.catalog.unit_definition(name)?.clone();
        let id = self.state.add_combatant(definition, side, row, col);

        let stats = self.state.current_stats(id);
        if let Some(combatant) = self.state.combatant(id) {
            self.presenter.on_health_armor_changed(
                id,
                combatant.health,
                stats.max_health,
                combatant.armor,
                stats.max_armor,
            );
            self.presenter.on_turn_meter_changed(id, combatant.turn_meter);
        }
        Ok(id)
    }

    /// Subscribes every roster member's passive triggers. Call once after
    /// the roster is complete.
    pub fn start_battle(&mut self) {
        for id in self.state.all_active() {
            let triggers: Vec<(usize, Vec<crate::events::PassiveTriggerSpec>)> = self
                .state
                .combatant(id)
                .map(|c| {
                    c.passives
                        .iter()
                        .enumerate()
                        .map(|(index, p)| (index, p.definition.triggers.clone()))
                        .collect()
                })
                .unwrap_or_default();

            for (index, specs) in triggers {
                let subscriptions = specs
                    .iter()
                    .map(|spec| self.bus.subscribe_passive(id, spec))
                    .collect();
                if let Some(combatant) = self.state.combatant_mut(id)
                    && let Some(passive) = combatant.passives.get_mut(index)
                {
                    passive.subscriptions = subscriptions;
                }
            }
        }
    }

    // ========================================================================
    // Turn Routine
    // ========================================================================

    /// Advances the battle by one simulation tick.
    ///
    /// While a turn is active this is a no-op: the scheduler is
    /// non-reentrant. Otherwise every combatant generates natural turn
    /// meter, and if any reach 100 one of them (uniformly chosen) begins
    /// its turn. A combatant whose folded state says skip has its turn
    /// begun and immediately ended.
    pub fn tick(&mut self) -> Result<(), SessionError> {
        if !matches!(self.phase, TurnPhase::Idle) {
            return Ok(());
        }

        let chosen = {
            let mut ctx = battle_ctx!(self);
            scheduler::advance_meters(&mut ctx);
            let candidates = scheduler::ready_candidates(ctx.state);
            if candidates.is_empty() {
                return Ok(());
            }
            scheduler::pick_ready(&mut ctx, &candidates)
        };

        let (turn, skip) = {
            let mut ctx = battle_ctx!(self);
            scheduler::begin_turn(&mut ctx, chosen)?
        };

        if skip {
            let mut ctx = battle_ctx!(self);
            scheduler::end_turn(&mut ctx, turn)?;
            self.hide_input_prompts();
            return Ok(());
        }

        let abilities = self.abilities_of(chosen);
        self.presenter.on_abilities_available(chosen, &abilities);
        self.phase = TurnPhase::Active {
            turn,
            pending: None,
        };
        Ok(())
    }

    // ========================================================================
    // Ability Inputs
    // ========================================================================

    /// Selects an ability for the acting combatant.
    ///
    /// If the ability requires a target tile, the selection is stored,
    /// targetable tiles go out through the presenter, and `Ok(None)` is
    /// returned; the turn continues when [`Self::select_target_tile`]
    /// completes it. Otherwise the ability executes immediately, the turn
    /// ends, and the result is returned.
    pub fn select_ability(
        &mut self,
        index: usize,
    ) -> Result<Option<AbilityResult>, SessionError> {
        let TurnPhase::Active { turn, .. } = &self.phase else {
            return Err(SessionError::NoActiveTurn);
        };
        let user = turn.combatant;

        let ability = self
            .state
            .combatant(user)
            .and_then(|c| c.abilities.get(index))
            .ok_or(SessionError::UnknownAbility(index))?;
        if !ability.is_ready() {
            return Err(SessionError::OnCooldown(ability.definition.name.clone()));
        }

        if ability.definition.required_input.is_some() {
            let profile = ability
                .definition
                .nested_attack_profile()
                .ok_or_else(|| SessionError::NotAnAttack(ability.definition.name.clone()))?
                .clone();

            // Close whatever selection was previously pending.
            self.hide_input_prompts();

            let tiles: Vec<TileTarget> =
                board::targetable_tiles(&self.state, &self.config, user, &profile);
            self.presenter.on_targetable_tiles_changed(&tiles);
            if let TurnPhase::Active { pending, .. } = &mut self.phase {
                *pending = Some(index);
            }
            return Ok(None);
        }

        self.execute_and_end_turn(index, None).map(Some)
    }

    /// Completes a pending tile-input ability: executes it at the given
    /// tile and ends the turn.
    pub fn select_target_tile(
        &mut self,
        side: Side,
        row: i32,
        col: i32,
    ) -> Result<AbilityResult, SessionError> {
        if !self.config.in_bounds(row, col) {
            return Err(SessionError::OutOfBounds { row, col });
        }
        let TurnPhase::Active {
            pending: Some(index),
            ..
        } = &self.phase
        else {
            return Err(SessionError::NoPendingSelection);
        };
        let index = *index;

        self.execute_and_end_turn(index, Some(TileCoord { side, row, col }))
    }

    /// Previews the pending ability's attack pattern anchored at a hovered
    /// tile. No-op without a pending tile selection.
    pub fn hover_target_tile(&mut self, side: Side, row: i32, col: i32) {
        let TurnPhase::Active {
            turn,
            pending: Some(index),
        } = &self.phase
        else {
            return;
        };
        let pattern = self
            .state
            .combatant(turn.combatant)
            .and_then(|c| c.abilities.get(*index))
            .and_then(|a| a.definition.nested_attack_profile())
            .map(|p| p.pattern.clone());
        if let Some(pattern) = pattern {
            self.presenter
                .on_attack_pattern_preview(&pattern, TileCoord { side, row, col });
        }
    }

    // ========================================================================
    // Internals
    // ========================================================================

    fn execute_and_end_turn(
        &mut self,
        ability_index: usize,
        target_tile: Option<TileCoord>,
    ) -> Result<AbilityResult, SessionError> {
        let TurnPhase::Active { turn, .. } =
            std::mem::replace(&mut self.phase, TurnPhase::Idle)
        else {
            return Err(SessionError::NoActiveTurn);
        };
        let user = turn.combatant;

        let result = {
            let mut ctx = battle_ctx!(self);
            let result = executor::execute_ability(&mut ctx, user, ability_index, target_tile)?;
            scheduler::end_turn(&mut ctx, turn)?;
            result
        };

        self.presenter.on_abilities_hidden();
        self.hide_input_prompts();
        Ok(result)
    }

    fn hide_input_prompts(&mut self) {
        self.presenter.on_targetable_tiles_hidden();
        self.presenter.on_attack_pattern_hidden();
    }

    fn abilities_of(&self, id: CombatantId) -> Vec<ActiveAbility> {
        self.state
            .combatant(id)
            .map(|c| c.abilities.clone())
            .unwrap_or_default()
    }
}
