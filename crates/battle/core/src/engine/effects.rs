//! Status effect application and removal.
//!
//! Application runs the chance gate, the potency/resistance check for
//! resistible debuffs, and the non-stackable replace rule, then broadcasts,
//! subscribes the instance's passive triggers, and appends it. Removal
//! distinguishes natural removals (expiry, or effects consumed by their own
//! triggers), which are silent and unconditional, from non-natural dispels,
//! which broadcast and respect the clearable flag.

use crate::events::{EventContext, EventKind};
use crate::roll::roll_context;
use crate::state::CombatantId;
use crate::status::{EffectClass, Expiry, StatusEffectApplier, StatusEffectInstance};

use super::{BattleCtx, ExecuteError, publish};

/// Attempts one status-effect application on one recipient.
pub(crate) fn receive_status_effect(
    ctx: &mut BattleCtx<'_>,
    source: CombatantId,
    target: CombatantId,
    applier: &StatusEffectApplier,
    depth: u32,
) -> Result<(), ExecuteError> {
    if !ctx.state.is_active(target) {
        return Ok(());
    }
    let definition = ctx.catalog.status_effect_definition(&applier.name)?.clone();

    if ctx.roll_percent(roll_context::CHANCE) >= applier.chance {
        return Ok(());
    }

    if definition.class == EffectClass::Debuff && !applier.irresistible {
        let chance_to_land = ctx.state.current_stats(source).potency
            - ctx.state.current_stats(target).resistance;
        if ctx.roll_percent(roll_context::RESIST) >= chance_to_land {
            publish(
                ctx,
                EventKind::Resist,
                &EventContext::with_recipient(source, target).effect(&applier.name),
                depth,
            )?;
            return Ok(());
        }
    }

    if !definition.stackable
        && let Some(existing) = ctx
            .state
            .combatant(target)
            .and_then(|c| c.effects.iter().find(|e| e.definition.name == applier.name))
    {
        // An indefinite instance never loses the duration comparison.
        let keep_existing = existing.definition.expiry == Expiry::Indefinite
            || existing.duration > applier.duration;
        if keep_existing {
            return Ok(());
        }
        let existing_id = existing.id;
        let subscriptions = ctx
            .state
            .combatant_mut(target)
            .map(|c| {
                let mut drained = Vec::new();
                c.effects.retain_mut(|e| {
                    if e.id == existing_id {
                        drained.append(&mut e.subscriptions);
                        false
                    } else {
                        true
                    }
                });
                drained
            })
            .unwrap_or_default();
        for subscription in subscriptions {
            ctx.bus.release(subscription);
        }
    }

    let kind = match definition.class {
        EffectClass::Buff => EventKind::Buff,
        EffectClass::Debuff => EventKind::Debuff,
    };
    if !definition.anonymous {
        publish(
            ctx,
            kind,
            &EventContext::with_recipient(source, target).effect(&applier.name),
            depth,
        )?;
    }

    // Broadcast reactions may have removed the recipient.
    if !ctx.state.is_active(target) {
        return Ok(());
    }

    let id = ctx.state.alloc_effect_id();
    let subscriptions = definition
        .triggers
        .iter()
        .map(|t| ctx.bus.subscribe_passive(target, t))
        .collect();
    if let Some(combatant) = ctx.state.combatant_mut(target) {
        combatant.effects.push(StatusEffectInstance {
            id,
            definition,
            source,
            duration: applier.duration,
            subscriptions,
        });
    }
    Ok(())
}

/// Removes every instance of the named effect from the target.
///
/// Natural removals are silent and unconditional. Non-natural removals
/// respect the clearable flag and broadcast BuffClear/DebuffClear per
/// removed instance (anonymous instances stay silent).
pub(crate) fn remove_status_effect(
    ctx: &mut BattleCtx<'_>,
    source: CombatantId,
    target: CombatantId,
    name: &str,
    natural: bool,
    depth: u32,
) -> Result<(), ExecuteError> {
    let Some(combatant) = ctx.state.combatant_mut(target) else {
        return Ok(());
    };

    let mut removed = Vec::new();
    combatant.effects.retain_mut(|effect| {
        if effect.definition.name == name && (natural || effect.definition.clearable) {
            removed.push((
                effect.definition.class,
                effect.definition.anonymous,
                std::mem::take(&mut effect.subscriptions),
            ));
            false
        } else {
            true
        }
    });

    for (class, anonymous, subscriptions) in removed {
        for subscription in subscriptions {
            ctx.bus.release(subscription);
        }
        if natural || anonymous {
            continue;
        }
        let kind = match class {
            EffectClass::Buff => EventKind::BuffClear,
            EffectClass::Debuff => EventKind::DebuffClear,
        };
        publish(
            ctx,
            kind,
            &EventContext::with_recipient(source, target).effect(name),
            depth,
        )?;
    }
    Ok(())
}
