//! Stat and attack-stat modifiers carried by status effects, passives, and
//! attack profiles.

use crate::query::{Group, Query};
use crate::state::{BattleState, CombatantId};
use crate::stats::{AttackStats, Stats};

/// Scales a modifier by the number of units matching a group/query pair,
/// evaluated from the owning combatant's perspective.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ForEvery {
    pub group: Group,
    #[cfg_attr(feature = "serde", serde(default))]
    pub query: Option<Query>,
}

impl ForEvery {
    /// Counts the matching units.
    pub fn count(&self, state: &BattleState, owner: CombatantId) -> i32 {
        let mut units = state.group(owner, self.group);
        if let Some(query) = &self.query {
            query.filter(state, &mut units);
        }
        units.len() as i32
    }
}

/// A unit-level modifier: an additive stat bonus and/or attack-stat bonus,
/// optionally multiplied by a "for every matching unit" count.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Modifier {
    pub stats: Option<Stats>,
    pub attack: Option<AttackStats>,
    pub for_every: Option<ForEvery>,
}

impl Modifier {
    fn multiplier(&self, state: &BattleState, owner: CombatantId) -> i32 {
        match &self.for_every {
            Some(for_every) => for_every.count(state, owner),
            None => 1,
        }
    }

    /// Folds the stat bonus (if any) onto `target`.
    pub fn apply_stats(&self, state: &BattleState, owner: CombatantId, target: &mut Stats) {
        if let Some(bonus) = &self.stats {
            target.apply(bonus, self.multiplier(state, owner));
        }
    }

    /// Folds the attack bonus (if any) onto `target`.
    pub fn apply_attack(&self, state: &BattleState, owner: CombatantId, target: &mut AttackStats) {
        if let Some(bonus) = &self.attack {
            target.apply(bonus, self.multiplier(state, owner));
        }
    }
}

/// A conditional attack-stat bonus attached to an attack profile, applied
/// only when its source/target queries pass.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AttackModifier {
    pub bonus: AttackStats,
    #[cfg_attr(feature = "serde", serde(default))]
    pub source_query: Option<Query>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub target_query: Option<Query>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub for_every: Option<ForEvery>,
}

impl AttackModifier {
    /// Folds the bonus onto `target` if both gate queries pass.
    pub fn apply(
        &self,
        state: &BattleState,
        source: CombatantId,
        recipient: CombatantId,
        target: &mut AttackStats,
    ) {
        if let Some(query) = &self.source_query
            && !query.matches(state, source)
        {
            return;
        }
        if let Some(query) = &self.target_query
            && !query.matches(state, recipient)
        {
            return;
        }

        let multiplier = match &self.for_every {
            Some(for_every) => for_every.count(state, source),
            None => 1,
        };
        target.apply(&self.bonus, multiplier);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::Tag;
    use crate::state::testutil::{add_unit, basic_definition, empty_state};
    use crate::state::Side;

    #[test]
    fn for_every_scales_by_matching_ally_count() {
        let mut state = empty_state();
        let owner = add_unit(&mut state, basic_definition("Owner"), Side::A, 0, 0);
        add_unit(&mut state, basic_definition("Ally"), Side::A, 0, 1);
        add_unit(&mut state, basic_definition("Ally"), Side::A, 0, 2);

        let modifier = Modifier {
            stats: Some(Stats {
                speed: 2.0,
                ..Stats::default()
            }),
            for_every: Some(ForEvery {
                group: Group::OtherAllies,
                query: None,
            }),
            ..Modifier::default()
        };

        let mut stats = Stats {
            max_health: 10.0,
            ..Stats::default()
        };
        modifier.apply_stats(&state, owner, &mut stats);

        assert_eq!(stats.speed, 4.0);
    }

    #[test]
    fn attack_modifier_gates_on_target_query() {
        let mut state = empty_state();
        let source = add_unit(&mut state, basic_definition("Source"), Side::A, 0, 0);
        let mut construct = basic_definition("Construct");
        construct.tags = vec![Tag::Construct];
        let target = add_unit(&mut state, construct, Side::B, 0, 0);
        let other = add_unit(&mut state, basic_definition("Other"), Side::B, 0, 1);

        let modifier = AttackModifier {
            bonus: AttackStats {
                damage: 25.0,
                ..AttackStats::default()
            },
            source_query: None,
            target_query: Some(Query {
                tags: vec![Tag::Construct],
                ..Query::default()
            }),
            for_every: None,
        };

        let mut vs_construct = AttackStats::default();
        modifier.apply(&state, source, target, &mut vs_construct);
        assert_eq!(vs_construct.damage, 25.0);

        let mut vs_other = AttackStats::default();
        modifier.apply(&state, source, other, &mut vs_other);
        assert_eq!(vs_other.damage, 0.0);
    }
}
