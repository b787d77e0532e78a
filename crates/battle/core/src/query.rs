//! Combatant predicates used for recipient filtering and modifier gating.

use crate::state::{BattleState, CombatantId};

/// Relative combatant grouping, resolved from the perspective of one unit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum::Display)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Group {
    /// The unit itself.
    SelfOnly,
    /// Every active unit on the unit's side, including itself.
    Allies,
    /// Every active unit on the opposing side.
    Enemies,
    /// Allies, excluding the unit itself.
    OtherAllies,
    /// Every active unit on both sides.
    All,
}

/// Faction/species tags carried by combatant definitions.
///
/// Kept in its own type because new tags are added far more often than new
/// stats or mechanics.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum::Display)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Tag {
    Organic,
    Construct,
    Militia,
    Legion,
    Wardens,
    Raiders,
    Arcanist,
    Beastkin,
    Outlaw,
    Mercenary,
}

/// Boolean predicate over a combatant: the conjunction of "has all required
/// tags" and "has all required active status effects".
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Query {
    /// Tags the combatant's definition must carry, all of them.
    pub tags: Vec<Tag>,
    /// Status effect names that must all be active on the combatant.
    /// Anonymous effect instances are invisible to this predicate.
    pub active_effects: Vec<String>,
}

impl Query {
    /// Evaluates this query against one combatant.
    pub fn matches(&self, state: &BattleState, id: CombatantId) -> bool {
        let Some(combatant) = state.combatant(id) else {
            return false;
        };

        if !self
            .tags
            .iter()
            .all(|tag| combatant.definition.tags.contains(tag))
        {
            return false;
        }

        self.active_effects.iter().all(|name| {
            combatant
                .effects
                .iter()
                .any(|e| !e.definition.anonymous && e.definition.name == *name)
        })
    }

    /// Filters a combatant list in place, keeping matches in their original
    /// order.
    pub fn filter(&self, state: &BattleState, ids: &mut Vec<CombatantId>) {
        ids.retain(|&id| self.matches(state, id));
    }
}
