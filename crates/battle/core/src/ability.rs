//! Ability, action, and attack-profile definitions, plus the typed
//! per-ability execution result.
//!
//! An ability is an ordered list of [`ActionSpec`]s. Each action carries
//! exactly the payload its kind needs ([`ActionKind`] is a closed sum
//! type), a chance gate, a recipient selector, and optional follow-up
//! triggers that are live only while the action executes.

use crate::events::EventKind;
use crate::modifier::AttackModifier;
use crate::query::{Group, Query};
use crate::state::{CombatantId, Terrain};
use crate::stats::{AttackStats, DamageType};
use crate::status::StatusEffectApplier;

// ============================================================================
// Attack Profile
// ============================================================================

/// Weighted damage pattern, projected onto the board around an anchor cell.
///
/// `weights` is row-major; a zero weight leaves the projected cell
/// untouched. Ragged rows are tolerated and read as zero.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Pattern {
    pub weights: Vec<Vec<f32>>,
}

impl Pattern {
    /// Single-cell pattern with the given weight.
    pub fn single(weight: f32) -> Self {
        Self {
            weights: vec![vec![weight]],
        }
    }

    pub fn height(&self) -> i32 {
        self.weights.len() as i32
    }

    pub fn width(&self) -> i32 {
        self.weights.iter().map(|row| row.len()).max().unwrap_or(0) as i32
    }

    /// Weight at pattern-local coordinates; zero outside the matrix.
    pub fn weight(&self, row: i32, col: i32) -> f32 {
        if row < 0 || col < 0 {
            return 0.0;
        }
        self.weights
            .get(row as usize)
            .and_then(|r| r.get(col as usize))
            .copied()
            .unwrap_or(0.0)
    }
}

/// Which cell of the pattern matrix lands on the selected board cell.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PatternAnchor {
    pub row: i32,
    pub col: i32,
}

/// Attack targeting constraint along the fire lane.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum::Display)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum LineOfFire {
    /// Blocked by any unit in the lane.
    Contact,
    /// Blocked only by units providing cover.
    Direct,
    /// Never blocked.
    Indirect,
}

/// Modifiers on the line-of-fire distance metric.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum::Display)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum LineOfFireModifier {
    /// Target must share the attacker's column.
    Fixed,
    /// Range is measured from the far edge of the target's half-grid.
    Rear,
}

/// Everything an attack needs: pattern, reach rules, base stats, and
/// conditional bonuses.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AttackProfile {
    pub pattern: Pattern,
    #[cfg_attr(feature = "serde", serde(default))]
    pub anchor: PatternAnchor,
    pub stats: AttackStats,
    pub damage_type: DamageType,
    pub range: i32,
    pub line_of_fire: LineOfFire,
    #[cfg_attr(feature = "serde", serde(default))]
    pub line_of_fire_modifiers: Vec<LineOfFireModifier>,
    pub targetable_terrains: Vec<Terrain>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub modifiers: Vec<AttackModifier>,
}

impl AttackProfile {
    pub fn has_modifier(&self, modifier: LineOfFireModifier) -> bool {
        self.line_of_fire_modifiers.contains(&modifier)
    }
}

// ============================================================================
// Actions
// ============================================================================

/// Typed fields of an [`AbilityResult`] that later actions may read back
/// as their recipient list.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum::Display)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ResultField {
    DamagedTargets,
    CriticallyHitTargets,
    EvadedTargets,
    HealedTargets,
}

/// How an action picks its recipients, before the optional query filter.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RecipientSelector {
    /// A fixed group, resolved from the acting unit's perspective.
    Group(Group),
    /// A typed list from an earlier action's result in the same ability.
    FromResult(ResultField),
    /// The source of the triggering event. Only valid inside a trigger's
    /// action list.
    EventSource,
    /// The recipient of the triggering event. Only valid inside a
    /// trigger's action list; resolves to nobody when the event has no
    /// recipient.
    EventRecipient,
}

/// Follow-up trigger scoped to a single action's execution: enabled before
/// the action runs, torn down right after.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FollowUpTrigger {
    pub on_events: Vec<EventKind>,
    pub actions: Vec<ActionSpec>,
}

/// Variant-specific payload of an action.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ActionKind {
    /// Resolve an attack: against the player-selected tile when the
    /// ability asked for one, otherwise against each resolved recipient at
    /// full (weight 1) exposure.
    Attack { profile: AttackProfile },
    /// Attempt each applier against each recipient.
    AddStatusEffects { effects: Vec<StatusEffectApplier> },
    /// Remove the named effects from each recipient. `natural` marks
    /// removals that are part of the effect's own design (no clear
    /// broadcast, ignores the clearable flag).
    RemoveStatusEffects { names: Vec<String>, natural: bool },
    /// Restore health to each recipient.
    RegenerateHealth { amount: f32 },
    /// Grant turn meter to each recipient. May push the meter past 100;
    /// the scheduler picks that up on the next idle tick.
    RegenerateTurnMeter { amount: f32 },
}

/// One atomic step of an ability.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ActionSpec {
    /// Trigger chance in [0, 100]. A failed roll skips the payload but
    /// still enables/disables the follow-up triggers.
    #[cfg_attr(feature = "serde", serde(default = "default_chance"))]
    pub chance: i32,
    pub recipients: RecipientSelector,
    #[cfg_attr(feature = "serde", serde(default))]
    pub query: Option<Query>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub triggers: Vec<FollowUpTrigger>,
    pub kind: ActionKind,
}

#[cfg(feature = "serde")]
fn default_chance() -> i32 {
    100
}

// ============================================================================
// Abilities
// ============================================================================

/// Player input an ability needs before it can execute.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum InputKind {
    /// An enemy-side tile for the ability's attack pattern.
    TargetTile,
}

/// Immutable description of an active ability.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AbilityDefinition {
    pub name: String,
    #[cfg_attr(feature = "serde", serde(default))]
    pub max_cooldown: u32,
    #[cfg_attr(feature = "serde", serde(default))]
    pub start_on_cooldown: bool,
    #[cfg_attr(feature = "serde", serde(default))]
    pub required_input: Option<InputKind>,
    pub actions: Vec<ActionSpec>,
}

impl AbilityDefinition {
    /// Attack profile of the first attack action, used for targetable-tile
    /// computation and the pattern preview of tile-input abilities.
    pub fn nested_attack_profile(&self) -> Option<&AttackProfile> {
        self.actions.iter().find_map(|spec| match &spec.kind {
            ActionKind::Attack { profile } => Some(profile),
            _ => None,
        })
    }
}

// ============================================================================
// Ability Result
// ============================================================================

/// Typed accumulator of one ability execution.
///
/// Later actions in the same ability reference these fields through
/// [`RecipientSelector::FromResult`]; the session reports it to the caller.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AbilityResult {
    pub damaged_targets: Vec<CombatantId>,
    pub critically_hit_targets: Vec<CombatantId>,
    pub evaded_targets: Vec<CombatantId>,
    pub healed_targets: Vec<CombatantId>,
    pub total_damage: f32,
}

impl AbilityResult {
    /// Reads one of the typed target lists.
    pub fn targets(&self, field: ResultField) -> &[CombatantId] {
        match field {
            ResultField::DamagedTargets => &self.damaged_targets,
            ResultField::CriticallyHitTargets => &self.critically_hit_targets,
            ResultField::EvadedTargets => &self.evaded_targets,
            ResultField::HealedTargets => &self.healed_targets,
        }
    }
}
