//! Per-target attack resolution: live stats, hit/crit rolls, mitigation,
//! armor/health split, and the events that fall out of it.

use crate::ability::{AbilityResult, AttackProfile};
use crate::events::{EventContext, EventKind};
use crate::roll::roll_context;
use crate::state::{BattleState, CombatantId};
use crate::stats::AttackStats;

use super::{BattleCtx, ExecuteError, publish};

/// Resolves one attack against one target at the given pattern weight.
///
/// A target whose terrain the attack cannot strike is skipped entirely: no
/// roll, no event.
pub(crate) fn receive_attack(
    ctx: &mut BattleCtx<'_>,
    source: CombatantId,
    profile: &AttackProfile,
    target: CombatantId,
    weight: f32,
    result: &mut AbilityResult,
    depth: u32,
) -> Result<(), ExecuteError> {
    if !ctx.state.is_active(target) {
        return Ok(());
    }
    let Some(target_unit) = ctx.state.combatant(target) else {
        return Ok(());
    };
    if !profile
        .targetable_terrains
        .contains(&target_unit.definition.terrain)
    {
        return Ok(());
    }

    let stats = live_attack_stats(ctx.state, source, target, profile);
    let target_stats = ctx.state.current_stats(target);

    let chance_to_hit = stats.accuracy - target_stats.evasion;
    if ctx.roll_percent(roll_context::HIT) >= chance_to_hit {
        result.evaded_targets.push(target);
        publish(
            ctx,
            EventKind::Evasion,
            &EventContext::with_recipient(source, target),
            depth,
        )?;
        return Ok(());
    }

    let mut raw_damage = stats.damage * (stats.offense + 1.0) * weight;

    let chance_to_crit = stats.crit_chance - target_stats.crit_avoidance;
    if ctx.roll_percent(roll_context::CRIT) < chance_to_crit {
        raw_damage *= stats.crit_damage;
        result.critically_hit_targets.push(target);
        publish(
            ctx,
            EventKind::CriticalHit,
            &EventContext::with_recipient(source, target),
            depth,
        )?;
    }

    // Crit reactions may have removed the target already.
    if !ctx.state.is_active(target) {
        return Ok(());
    }

    // Mitigation reads the defender's stats fresh, after any reactions.
    let target_stats = ctx.state.current_stats(target);
    let amount = raw_damage * (1.0 - target_stats.defense(profile.damage_type) / 100.0);

    let Some(target_unit) = ctx.state.combatant(target) else {
        return Ok(());
    };
    let health_before = target_unit.health;
    let armor_before = target_unit.armor;

    let to_armor = (amount * (1.0 - stats.armor_penetration)).min(armor_before);
    let to_health = (amount - to_armor).min(health_before);

    ctx.add_armor(target, -to_armor);
    ctx.add_health(target, -to_health);

    let realized = to_armor + to_health;
    result.damaged_targets.push(target);
    result.total_damage += realized;

    let half = target_stats.max_health * 0.5;
    let crossed_half = health_before >= half && health_before - to_health < half;

    publish(
        ctx,
        EventKind::Damage,
        &EventContext::with_recipient(source, target).amount(realized),
        depth,
    )?;
    if crossed_half {
        publish(
            ctx,
            EventKind::HalfHealth,
            &EventContext::with_recipient(source, target),
            depth,
        )?;
    }

    // Defeat reads post-reaction values: a damage-triggered heal can save
    // the target.
    let down = ctx
        .state
        .combatant(target)
        .is_some_and(|c| c.health <= 0.0 && c.armor <= 0.0);
    if down && ctx.state.is_active(target) {
        defeat(ctx, source, target, depth)?;
    }
    Ok(())
}

/// Moves a combatant to the defeated roster, releases every subscription
/// its passives and effects held, and broadcasts the defeat.
pub(crate) fn defeat(
    ctx: &mut BattleCtx<'_>,
    source: CombatantId,
    target: CombatantId,
    depth: u32,
) -> Result<(), ExecuteError> {
    let subscriptions = ctx.state.set_defeated(target);
    for subscription in subscriptions {
        ctx.bus.release(subscription);
    }
    publish(
        ctx,
        EventKind::Defeat,
        &EventContext::with_recipient(source, target),
        depth,
    )
}

/// Folds the live attack stats for one source/target pair: profile base,
/// plus the source's status-effect and passive attack modifiers, plus each
/// profile modifier whose gate queries pass.
fn live_attack_stats(
    state: &BattleState,
    source: CombatantId,
    target: CombatantId,
    profile: &AttackProfile,
) -> AttackStats {
    let mut stats = profile.stats.clone();

    if let Some(unit) = state.combatant(source) {
        for effect in &unit.effects {
            for modifier in &effect.definition.modifiers {
                modifier.apply_attack(state, source, &mut stats);
            }
        }
        for passive in &unit.passives {
            for modifier in &passive.definition.modifiers {
                modifier.apply_attack(state, source, &mut stats);
            }
        }
    }

    for modifier in &profile.modifiers {
        modifier.apply(state, source, target, &mut stats);
    }
    stats
}
