//! Status effect definitions and per-combatant instances.
//!
//! A definition is immutable, name-keyed data from the catalog; an instance
//! pairs it with the mutable remaining duration and the bus subscriptions
//! created for its embedded triggers. Application, stacking, and removal
//! rules live in [`crate::engine::effects`].

use crate::events::{PassiveTriggerSpec, SubscriptionId};
use crate::modifier::Modifier;
use crate::state::{CombatantId, EffectInstanceId, StateFlags};

/// Whether an effect counts as beneficial or hostile. Debuffs are subject
/// to the potency/resistance check on application.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum::Display)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum EffectClass {
    Buff,
    Debuff,
}

/// How an effect instance leaves its holder.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Expiry {
    /// Remaining duration decrements at the holder's turn end and the
    /// instance is removed at zero.
    Duration,
    /// Never expires on its own; requires explicit removal by name.
    Indefinite,
}

/// Immutable description of a status effect type.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StatusEffectDefinition {
    pub name: String,
    pub class: EffectClass,

    /// Stat/attack modifiers contributed while the effect is active.
    #[cfg_attr(feature = "serde", serde(default))]
    pub modifiers: Vec<Modifier>,

    /// Behavior-state flags contributed while the effect is active, folded
    /// with OR across all active effects.
    #[cfg_attr(feature = "serde", serde(default))]
    pub state: StateFlags,

    /// Passive triggers subscribed for the lifetime of each instance.
    #[cfg_attr(feature = "serde", serde(default))]
    pub triggers: Vec<PassiveTriggerSpec>,

    pub expiry: Expiry,

    /// Multiple instances with this name may coexist on one combatant.
    #[cfg_attr(feature = "serde", serde(default))]
    pub stackable: bool,

    /// Whether non-natural removal sweeps (dispels) may remove it.
    #[cfg_attr(feature = "serde", serde(default = "default_clearable"))]
    pub clearable: bool,

    /// Hidden bookkeeping effect: no Buff/Debuff broadcast on apply and
    /// invisible to active-effect queries.
    #[cfg_attr(feature = "serde", serde(default))]
    pub anonymous: bool,
}

#[cfg(feature = "serde")]
fn default_clearable() -> bool {
    true
}

/// One attempt to apply a status effect to one recipient.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StatusEffectApplier {
    pub name: String,
    pub duration: i32,
    /// Application chance in [0, 100].
    #[cfg_attr(feature = "serde", serde(default = "default_chance"))]
    pub chance: i32,
    /// Skips the potency/resistance check for debuffs.
    #[cfg_attr(feature = "serde", serde(default))]
    pub irresistible: bool,
}

#[cfg(feature = "serde")]
fn default_chance() -> i32 {
    100
}

/// An active status effect on a combatant.
#[derive(Clone, Debug)]
pub struct StatusEffectInstance {
    pub id: EffectInstanceId,
    pub definition: StatusEffectDefinition,
    /// The combatant that applied the effect.
    pub source: CombatantId,
    /// Remaining duration in the holder's turns. Meaningless for
    /// `Expiry::Indefinite`.
    pub duration: i32,
    /// Bus subscriptions owned by this instance, released on removal.
    pub subscriptions: Vec<SubscriptionId>,
}
