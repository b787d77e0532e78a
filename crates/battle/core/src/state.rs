//! Battle participants and the mutable battle state they live in.
//!
//! [`BattleState`] is the single owner of every combatant: an arena indexed
//! by [`CombatantId`], plus per-side active and defeated rosters. All
//! derived data (current stats, behavior state, groupings, occupancy) is
//! recomputed on demand from the arena; nothing aliases the immutable
//! definitions.

use std::fmt;

use crate::ability::AbilityDefinition;
use crate::events::{PassiveTriggerSpec, SubscriptionId};
use crate::modifier::Modifier;
use crate::query::{Group, Tag};
use crate::stats::Stats;
use crate::status::StatusEffectInstance;

// ============================================================================
// Identifiers
// ============================================================================

/// Unique identifier of a battle participant. Stable for the whole battle,
/// including after defeat.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CombatantId(pub u32);

impl fmt::Display for CombatantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Unique identifier of one status-effect instance, used by the begin-turn
/// snapshot so effects added mid-turn are not decremented.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct EffectInstanceId(pub u64);

/// One of the two opposing sides of the battle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Side {
    A,
    B,
}

impl Side {
    pub fn opponent(self) -> Side {
        match self {
            Side::A => Side::B,
            Side::B => Side::A,
        }
    }

    pub fn index(self) -> usize {
        match self {
            Side::A => 0,
            Side::B => 1,
        }
    }
}

/// A board cell: side half-grid plus row/column on that half. Row 0 is the
/// frontier row.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TileCoord {
    pub side: Side,
    pub row: i32,
    pub col: i32,
}

// ============================================================================
// Definitions
// ============================================================================

/// Terrain a combatant occupies; attacks declare which terrains they can
/// strike.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum::Display)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Terrain {
    Ground,
    Aerial,
}

/// Battlefield role. Informational only; no engine rule keys off it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum::Display)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Role {
    Attacker,
    Support,
    Tank,
    Healer,
}

bitflags::bitflags! {
    /// Behavior-state flags folded with OR across all active status
    /// effects.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    pub struct StateFlags: u8 {
        /// The combatant's turns begin and immediately end.
        const SKIP_TURN = 1 << 0;
        /// Forces otherwise-valid attacks in range onto this combatant.
        const TAUNTING = 1 << 1;
    }
}

/// Immutable description of a passive ability.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PassiveAbilityDefinition {
    pub name: String,
    #[cfg_attr(feature = "serde", serde(default))]
    pub modifiers: Vec<Modifier>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub triggers: Vec<PassiveTriggerSpec>,
}

/// Immutable description of a combatant type, loaded from the catalog.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CombatantDefinition {
    pub name: String,
    pub terrain: Terrain,
    pub role: Role,
    /// Blocks `Direct` line-of-fire attacks aimed past this unit.
    #[cfg_attr(feature = "serde", serde(default))]
    pub cover: bool,
    #[cfg_attr(feature = "serde", serde(default))]
    pub tags: Vec<Tag>,
    pub stats: Stats,
    #[cfg_attr(feature = "serde", serde(default))]
    pub active_abilities: Vec<AbilityDefinition>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub passive_abilities: Vec<PassiveAbilityDefinition>,
}

// ============================================================================
// Instances
// ============================================================================

/// An ability instance: immutable definition plus the mutable cooldown.
#[derive(Clone, Debug)]
pub struct ActiveAbility {
    pub definition: AbilityDefinition,
    /// Turns until usable again, in `[0, max_cooldown]`.
    pub cooldown: u32,
}

impl ActiveAbility {
    pub fn new(definition: AbilityDefinition) -> Self {
        let cooldown = if definition.start_on_cooldown {
            definition.max_cooldown
        } else {
            0
        };
        Self {
            definition,
            cooldown,
        }
    }

    pub fn is_ready(&self) -> bool {
        self.cooldown == 0
    }

    /// Puts the ability on full cooldown (called when it is used).
    pub fn begin_cooldown(&mut self) {
        self.cooldown = self.definition.max_cooldown;
    }

    /// Adds signed turns to the cooldown, clamped to `[0, max_cooldown]`.
    pub fn add_cooldown(&mut self, amount: i32) {
        let value = self.cooldown as i32 + amount;
        self.cooldown = value.clamp(0, self.definition.max_cooldown as i32) as u32;
    }
}

/// A passive ability instance with its live trigger subscriptions.
#[derive(Clone, Debug)]
pub struct PassiveAbility {
    pub definition: PassiveAbilityDefinition,
    pub subscriptions: Vec<SubscriptionId>,
}

impl PassiveAbility {
    pub fn new(definition: PassiveAbilityDefinition) -> Self {
        Self {
            definition,
            subscriptions: Vec::new(),
        }
    }
}

/// One battle participant.
#[derive(Clone, Debug)]
pub struct Combatant {
    pub id: CombatantId,
    pub side: Side,
    pub row: i32,
    pub col: i32,
    pub health: f32,
    pub armor: f32,
    /// Percentage points; a turn starts at 100 and costs exactly 100.
    pub turn_meter: f32,
    pub defeated: bool,
    pub definition: CombatantDefinition,
    pub abilities: Vec<ActiveAbility>,
    pub passives: Vec<PassiveAbility>,
    pub effects: Vec<StatusEffectInstance>,
}

impl Combatant {
    pub fn tile(&self) -> TileCoord {
        TileCoord {
            side: self.side,
            row: self.row,
            col: self.col,
        }
    }
}

// ============================================================================
// Battle State
// ============================================================================

/// Mutable state of one battle: the combatant arena, per-side rosters, and
/// the roll nonce/seed pair that addresses deterministic randomness.
#[derive(Clone, Debug)]
pub struct BattleState {
    combatants: Vec<Combatant>,
    active: [Vec<CombatantId>; 2],
    defeated: [Vec<CombatantId>; 2],
    pub seed: u64,
    pub nonce: u64,
    next_effect_id: u64,
}

impl BattleState {
    pub fn new(seed: u64) -> Self {
        Self {
            combatants: Vec::new(),
            active: [Vec::new(), Vec::new()],
            defeated: [Vec::new(), Vec::new()],
            seed,
            nonce: 0,
            next_effect_id: 0,
        }
    }

    /// Adds a combatant built from a definition at the given board cell.
    /// Health and armor start at the current-stat maxima (passives
    /// included), the turn meter at zero.
    pub fn add_combatant(
        &mut self,
        definition: CombatantDefinition,
        side: Side,
        row: i32,
        col: i32,
    ) -> CombatantId {
        let id = CombatantId(self.combatants.len() as u32);
        let abilities = definition
            .active_abilities
            .iter()
            .cloned()
            .map(ActiveAbility::new)
            .collect();
        let passives = definition
            .passive_abilities
            .iter()
            .cloned()
            .map(PassiveAbility::new)
            .collect();

        self.combatants.push(Combatant {
            id,
            side,
            row,
            col,
            health: 0.0,
            armor: 0.0,
            turn_meter: 0.0,
            defeated: false,
            definition,
            abilities,
            passives,
            effects: Vec::new(),
        });
        self.active[side.index()].push(id);

        let stats = self.current_stats(id);
        if let Some(combatant) = self.combatant_mut(id) {
            combatant.health = stats.max_health;
            combatant.armor = stats.max_armor;
        }
        id
    }

    pub fn combatant(&self, id: CombatantId) -> Option<&Combatant> {
        self.combatants.get(id.0 as usize)
    }

    pub fn combatant_mut(&mut self, id: CombatantId) -> Option<&mut Combatant> {
        self.combatants.get_mut(id.0 as usize)
    }

    /// Definition name for log lines; tolerates stale ids.
    pub fn name(&self, id: CombatantId) -> &str {
        self.combatant(id)
            .map(|c| c.definition.name.as_str())
            .unwrap_or("<unknown>")
    }

    /// Active (not defeated) combatants of one side, in placement order.
    pub fn side_active(&self, side: Side) -> &[CombatantId] {
        &self.active[side.index()]
    }

    /// Defeated combatants of one side.
    pub fn side_defeated(&self, side: Side) -> &[CombatantId] {
        &self.defeated[side.index()]
    }

    pub fn is_active(&self, id: CombatantId) -> bool {
        self.combatant(id).is_some_and(|c| !c.defeated)
    }

    /// All active combatants, side A first.
    pub fn all_active(&self) -> Vec<CombatantId> {
        let mut ids = self.active[0].clone();
        ids.extend_from_slice(&self.active[1]);
        ids
    }

    /// Resolves a relative group from one unit's perspective.
    pub fn group(&self, user: CombatantId, group: Group) -> Vec<CombatantId> {
        let Some(combatant) = self.combatant(user) else {
            return Vec::new();
        };
        match group {
            Group::SelfOnly => vec![user],
            Group::Allies => self.active[combatant.side.index()].clone(),
            Group::Enemies => self.active[combatant.side.opponent().index()].clone(),
            Group::OtherAllies => {
                let mut allies = self.active[combatant.side.index()].clone();
                allies.retain(|&id| id != user);
                allies
            }
            Group::All => self.all_active(),
        }
    }

    /// Active occupant of a board cell, if any.
    pub fn occupant_at(&self, side: Side, row: i32, col: i32) -> Option<CombatantId> {
        self.active[side.index()]
            .iter()
            .copied()
            .find(|&id| {
                self.combatant(id)
                    .is_some_and(|c| c.row == row && c.col == col)
            })
    }

    /// Current stats: base definition stats plus every active status-effect
    /// and passive modifier, recomputed from scratch on every call.
    pub fn current_stats(&self, id: CombatantId) -> Stats {
        let Some(combatant) = self.combatant(id) else {
            return Stats::default();
        };

        let mut stats = combatant.definition.stats.clone();
        for effect in &combatant.effects {
            for modifier in &effect.definition.modifiers {
                modifier.apply_stats(self, id, &mut stats);
            }
        }
        for passive in &combatant.passives {
            for modifier in &passive.definition.modifiers {
                modifier.apply_stats(self, id, &mut stats);
            }
        }
        stats
    }

    /// Current behavior state: OR-fold of all active effects' state flags.
    pub fn current_state(&self, id: CombatantId) -> StateFlags {
        let Some(combatant) = self.combatant(id) else {
            return StateFlags::empty();
        };
        combatant
            .effects
            .iter()
            .fold(StateFlags::empty(), |acc, e| acc | e.definition.state)
    }

    /// Moves a combatant to its side's defeated roster and drains every
    /// bus subscription its passives and effects held. The caller releases
    /// the returned handles.
    pub fn set_defeated(&mut self, id: CombatantId) -> Vec<SubscriptionId> {
        let Some(combatant) = self.combatant_mut(id) else {
            return Vec::new();
        };
        if combatant.defeated {
            return Vec::new();
        }
        combatant.defeated = true;

        let mut subscriptions = Vec::new();
        for passive in &mut combatant.passives {
            subscriptions.append(&mut passive.subscriptions);
        }
        for effect in &mut combatant.effects {
            subscriptions.append(&mut effect.subscriptions);
        }

        let side = combatant.side.index();
        self.active[side].retain(|&other| other != id);
        self.defeated[side].push(id);
        subscriptions
    }

    /// Allocates a battle-unique status-effect instance id.
    pub fn alloc_effect_id(&mut self) -> EffectInstanceId {
        let id = EffectInstanceId(self.next_effect_id);
        self.next_effect_id += 1;
        id
    }

    /// Consumes and returns the next roll nonce.
    pub fn next_nonce(&mut self) -> u64 {
        let nonce = self.nonce;
        self.nonce += 1;
        nonce
    }
}

// ============================================================================
// Test Fixtures
// ============================================================================

#[cfg(test)]
pub mod testutil {
    use super::*;

    pub fn empty_state() -> BattleState {
        BattleState::new(0x5eed)
    }

    /// A plain ground unit with no abilities and round-number stats.
    pub fn basic_definition(name: &str) -> CombatantDefinition {
        CombatantDefinition {
            name: name.to_string(),
            terrain: Terrain::Ground,
            role: Role::Attacker,
            cover: false,
            tags: Vec::new(),
            stats: Stats {
                max_health: 100.0,
                max_armor: 0.0,
                speed: 10.0,
                ..Stats::default()
            },
            active_abilities: Vec::new(),
            passive_abilities: Vec::new(),
        }
    }

    pub fn add_unit(
        state: &mut BattleState,
        definition: CombatantDefinition,
        side: Side,
        row: i32,
        col: i32,
    ) -> CombatantId {
        state.add_combatant(definition, side, row, col)
    }
}
