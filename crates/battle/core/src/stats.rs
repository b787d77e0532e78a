//! Combatant and attack stat blocks.
//!
//! Stats are plain additive data. Folding modifiers into a base block never
//! mutates the base: [`Stats::apply`] and [`AttackStats::apply`] add a
//! scaled bonus in place on an owned working copy, flooring each field at
//! its documented minimum after every addition.

// ============================================================================
// Damage Type
// ============================================================================

/// Damage type, matched against the defender's defense stat of the same
/// flavor during mitigation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum::Display)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DamageType {
    /// Physical damage, mitigated by physical defense.
    Physical,
    /// Special (energy/ability) damage, mitigated by special defense.
    Special,
}

// ============================================================================
// Combatant Stats
// ============================================================================

/// Full combatant stat block.
///
/// Base values live on the immutable [`crate::state::CombatantDefinition`];
/// derived "current" stats are recomputed on demand by folding every active
/// status-effect and passive modifier onto a copy of the base.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Stats {
    // Core stats
    pub max_health: f32,
    pub max_armor: f32,
    pub physical_defense: f32,
    pub special_defense: f32,
    pub speed: f32,
    pub evasion: i32,
    pub resistance: i32,
    pub potency: i32,

    // Additional stats
    pub health_steal: f32,
    pub health_regen: f32,
    pub counter_chance: i32,
    pub crit_avoidance: i32,
}

impl Stats {
    /// Add `bonus * multiplier` onto self, then floor every field.
    ///
    /// Max health floors at 1 so a combatant always has a health bar; every
    /// other stat floors at 0.
    pub fn apply(&mut self, bonus: &Stats, multiplier: i32) {
        let m = multiplier as f32;

        self.max_health += bonus.max_health * m;
        self.max_armor += bonus.max_armor * m;
        self.physical_defense += bonus.physical_defense * m;
        self.special_defense += bonus.special_defense * m;
        self.speed += bonus.speed * m;
        self.evasion += bonus.evasion * multiplier;
        self.resistance += bonus.resistance * multiplier;
        self.potency += bonus.potency * multiplier;
        self.health_steal += bonus.health_steal * m;
        self.health_regen += bonus.health_regen * m;
        self.counter_chance += bonus.counter_chance * multiplier;
        self.crit_avoidance += bonus.crit_avoidance * multiplier;

        self.max_health = self.max_health.max(1.0);
        self.max_armor = self.max_armor.max(0.0);
        self.physical_defense = self.physical_defense.max(0.0);
        self.special_defense = self.special_defense.max(0.0);
        self.speed = self.speed.max(0.0);
        self.evasion = self.evasion.max(0);
        self.resistance = self.resistance.max(0);
        self.potency = self.potency.max(0);
        self.health_steal = self.health_steal.max(0.0);
        self.health_regen = self.health_regen.max(0.0);
        self.counter_chance = self.counter_chance.max(0);
        self.crit_avoidance = self.crit_avoidance.max(0);
    }

    /// Returns the defense stat matching the given damage type.
    pub fn defense(&self, damage_type: DamageType) -> f32 {
        match damage_type {
            DamageType::Physical => self.physical_defense,
            DamageType::Special => self.special_defense,
        }
    }
}

// ============================================================================
// Attack Stats
// ============================================================================

/// Stat block of a single attack.
///
/// `offense` is zero-anchored: the damage formula multiplies by
/// `offense + 1`, so an unmodified attack deals exactly its `damage`.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct AttackStats {
    pub offense: f32,
    pub damage: f32,
    pub accuracy: i32,
    /// Fraction of post-mitigation damage that bypasses armor, in [0, 1].
    pub armor_penetration: f32,
    pub crit_chance: i32,
    pub crit_damage: f32,
}

impl AttackStats {
    /// Add `bonus * multiplier` onto self, then floor every field.
    /// Armor penetration clamps to [0, 1].
    pub fn apply(&mut self, bonus: &AttackStats, multiplier: i32) {
        let m = multiplier as f32;

        self.offense += bonus.offense * m;
        self.damage += bonus.damage * m;
        self.accuracy += bonus.accuracy * multiplier;
        self.armor_penetration += bonus.armor_penetration * m;
        self.crit_chance += bonus.crit_chance * multiplier;
        self.crit_damage += bonus.crit_damage * m;

        self.offense = self.offense.max(0.0);
        self.damage = self.damage.max(0.0);
        self.accuracy = self.accuracy.max(0);
        self.armor_penetration = self.armor_penetration.clamp(0.0, 1.0);
        self.crit_chance = self.crit_chance.max(0);
        self.crit_damage = self.crit_damage.max(0.0);
    }
}
