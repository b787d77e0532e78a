//! Ability and action execution pipeline.
//!
//! An ability runs its actions in declared order against one growing
//! [`AbilityResult`]. Each action: enable follow-up triggers, roll the
//! chance gate, resolve recipients, dispatch on the action kind, tear the
//! triggers down. Trigger-driven reactions re-enter [`execute_action`]
//! through [`super::publish`] at increased cascade depth.

use crate::ability::{AbilityResult, ActionKind, ActionSpec, RecipientSelector};
use crate::board;
use crate::roll::roll_context;
use crate::state::{CombatantId, TileCoord};

use super::{ActionEnv, BattleCtx, ExecuteError, attack, effects};

/// Executes one ability for `user`: puts it on cooldown, then runs its
/// actions in order. A `ResultAccess` failure aborts only the offending
/// action; everything already applied stands.
pub(crate) fn execute_ability(
    ctx: &mut BattleCtx<'_>,
    user: CombatantId,
    ability_index: usize,
    target_tile: Option<TileCoord>,
) -> Result<AbilityResult, ExecuteError> {
    let Some(actions) = begin_ability(ctx, user, ability_index) else {
        return Ok(AbilityResult::default());
    };

    let mut result = AbilityResult::default();
    for spec in &actions {
        let env = ActionEnv {
            target_tile,
            event: None,
        };
        match execute_action(ctx, user, spec, &mut result, env, 0) {
            Err(ExecuteError::ResultAccess(what)) => {
                tracing::warn!(user = ctx.state.name(user), what, "action aborted");
            }
            other => other?,
        }
    }
    Ok(result)
}

/// Starts the cooldown and clones out the action list.
fn begin_ability(
    ctx: &mut BattleCtx<'_>,
    user: CombatantId,
    ability_index: usize,
) -> Option<Vec<ActionSpec>> {
    let combatant = ctx.state.combatant_mut(user)?;
    let ability = combatant.abilities.get_mut(ability_index)?;
    ability.begin_cooldown();
    Some(ability.definition.actions.clone())
}

/// Executes one action. Follow-up triggers are live for the duration of
/// the action (even when the chance roll fails) and released right after.
pub(crate) fn execute_action(
    ctx: &mut BattleCtx<'_>,
    user: CombatantId,
    spec: &ActionSpec,
    result: &mut AbilityResult,
    env: ActionEnv<'_>,
    depth: u32,
) -> Result<(), ExecuteError> {
    if depth > ctx.config.max_cascade_depth {
        tracing::warn!(
            user = ctx.state.name(user),
            depth,
            "trigger cascade depth exceeded"
        );
        return Err(ExecuteError::CascadeOverflow { depth });
    }

    let subscriptions: Vec<_> = spec
        .triggers
        .iter()
        .map(|t| ctx.bus.subscribe(user, t.on_events.clone(), t.actions.clone()))
        .collect();

    let outcome = run_payload(ctx, user, spec, result, env, depth);

    for subscription in subscriptions {
        ctx.bus.release(subscription);
    }
    outcome
}

fn run_payload(
    ctx: &mut BattleCtx<'_>,
    user: CombatantId,
    spec: &ActionSpec,
    result: &mut AbilityResult,
    env: ActionEnv<'_>,
    depth: u32,
) -> Result<(), ExecuteError> {
    if ctx.roll_percent(roll_context::CHANCE) >= spec.chance {
        return Ok(());
    }

    let recipients = resolve_recipients(ctx, user, spec, result, &env)?;

    match &spec.kind {
        ActionKind::Attack { profile } => {
            // A player-selected tile anchors the pattern; otherwise every
            // resolved recipient takes full exposure.
            let targets = match env.target_tile {
                Some(tile) => board::evaluate_attack_pattern(
                    ctx.state,
                    ctx.config,
                    &profile.pattern,
                    profile.anchor,
                    tile.side,
                    tile.row,
                    tile.col,
                ),
                None => recipients.iter().map(|&id| (id, 1.0)).collect(),
            };
            for (target, weight) in targets {
                attack::receive_attack(ctx, user, profile, target, weight, result, depth)?;
            }
        }

        ActionKind::AddStatusEffects {
            effects: appliers,
        } => {
            for &recipient in &recipients {
                for applier in appliers {
                    effects::receive_status_effect(ctx, user, recipient, applier, depth)?;
                }
            }
        }

        ActionKind::RemoveStatusEffects { names, natural } => {
            for &recipient in &recipients {
                for name in names {
                    effects::remove_status_effect(ctx, user, recipient, name, *natural, depth)?;
                }
            }
        }

        ActionKind::RegenerateHealth { amount } => {
            for &recipient in &recipients {
                ctx.add_health(recipient, *amount);
                result.healed_targets.push(recipient);
            }
        }

        ActionKind::RegenerateTurnMeter { amount } => {
            for &recipient in &recipients {
                ctx.add_turn_meter(recipient, *amount);
            }
        }
    }
    Ok(())
}

/// Resolves an action's recipient list: selector first, then the optional
/// query filter. Stale (defeated) ids from earlier results are dropped.
fn resolve_recipients(
    ctx: &mut BattleCtx<'_>,
    user: CombatantId,
    spec: &ActionSpec,
    result: &AbilityResult,
    env: &ActionEnv<'_>,
) -> Result<Vec<CombatantId>, ExecuteError> {
    let mut recipients = match &spec.recipients {
        RecipientSelector::Group(group) => ctx.state.group(user, *group),

        RecipientSelector::FromResult(field) => result
            .targets(*field)
            .iter()
            .copied()
            .filter(|&id| ctx.state.is_active(id))
            .collect(),

        RecipientSelector::EventSource => {
            let event = env.event.ok_or(ExecuteError::ResultAccess("event source"))?;
            vec![event.source]
        }

        RecipientSelector::EventRecipient => {
            let event = env
                .event
                .ok_or(ExecuteError::ResultAccess("event recipient"))?;
            event.recipient.into_iter().collect()
        }
    };

    if let Some(query) = &spec.query {
        query.filter(ctx.state, &mut recipients);
    }
    Ok(recipients)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ability::FollowUpTrigger;
    use crate::config::BattleConfig;
    use crate::engine::testutil::TestCatalog;
    use crate::events::{EventBus, EventContext, EventKind};
    use crate::presenter::NullPresenter;
    use crate::query::Group;
    use crate::roll::PcgRoll;
    use crate::state::testutil::{add_unit, basic_definition, empty_state};
    use crate::state::Side;

    fn regen_action(recipients: RecipientSelector, amount: f32) -> ActionSpec {
        ActionSpec {
            chance: 100,
            recipients,
            query: None,
            triggers: Vec::new(),
            kind: ActionKind::RegenerateHealth { amount },
        }
    }

    #[test]
    fn zero_chance_action_never_fires() {
        let mut state = empty_state();
        let user = add_unit(&mut state, basic_definition("User"), Side::A, 0, 0);
        state.combatant_mut(user).unwrap().health = 50.0;

        let mut bus = EventBus::new();
        let catalog = TestCatalog::default();
        let config = BattleConfig::new();
        let roll = PcgRoll;
        let mut presenter = NullPresenter;
        let mut ctx = BattleCtx {
            state: &mut state,
            bus: &mut bus,
            catalog: &catalog,
            roll: &roll,
            config: &config,
            presenter: &mut presenter,
        };

        let mut spec = regen_action(RecipientSelector::Group(Group::SelfOnly), 10.0);
        spec.chance = 0;
        let mut result = AbilityResult::default();
        execute_action(&mut ctx, user, &spec, &mut result, ActionEnv::default(), 0).unwrap();

        assert_eq!(state.combatant(user).unwrap().health, 50.0);
    }

    #[test]
    fn guaranteed_chance_action_always_fires() {
        let mut state = empty_state();
        let user = add_unit(&mut state, basic_definition("User"), Side::A, 0, 0);
        state.combatant_mut(user).unwrap().health = 50.0;

        let mut bus = EventBus::new();
        let catalog = TestCatalog::default();
        let config = BattleConfig::new();
        let roll = PcgRoll;
        let mut presenter = NullPresenter;
        let mut ctx = BattleCtx {
            state: &mut state,
            bus: &mut bus,
            catalog: &catalog,
            roll: &roll,
            config: &config,
            presenter: &mut presenter,
        };

        let spec = regen_action(RecipientSelector::Group(Group::SelfOnly), 10.0);
        let mut result = AbilityResult::default();
        execute_action(&mut ctx, user, &spec, &mut result, ActionEnv::default(), 0).unwrap();

        assert_eq!(state.combatant(user).unwrap().health, 60.0);
        assert_eq!(result.healed_targets, vec![user]);
    }

    #[test]
    fn event_recipient_outside_trigger_is_result_access_error() {
        let mut state = empty_state();
        let user = add_unit(&mut state, basic_definition("User"), Side::A, 0, 0);

        let mut bus = EventBus::new();
        let catalog = TestCatalog::default();
        let config = BattleConfig::new();
        let roll = PcgRoll;
        let mut presenter = NullPresenter;
        let mut ctx = BattleCtx {
            state: &mut state,
            bus: &mut bus,
            catalog: &catalog,
            roll: &roll,
            config: &config,
            presenter: &mut presenter,
        };

        let spec = regen_action(RecipientSelector::EventRecipient, 10.0);
        let mut result = AbilityResult::default();
        let outcome =
            execute_action(&mut ctx, user, &spec, &mut result, ActionEnv::default(), 0);

        assert!(matches!(outcome, Err(ExecuteError::ResultAccess(_))));
    }

    #[test]
    fn later_action_reads_damaged_targets_from_the_result() {
        use crate::ability::{AttackProfile, LineOfFire, Pattern, PatternAnchor, ResultField};
        use crate::state::Terrain;
        use crate::stats::{AttackStats, DamageType};

        let mut state = empty_state();
        let user = add_unit(&mut state, basic_definition("User"), Side::A, 0, 0);
        let enemy = add_unit(&mut state, basic_definition("Enemy"), Side::B, 0, 0);

        let mut bus = EventBus::new();
        let catalog = TestCatalog::default();
        let config = BattleConfig::new();
        let roll = PcgRoll;
        let mut presenter = NullPresenter;
        let mut ctx = BattleCtx {
            state: &mut state,
            bus: &mut bus,
            catalog: &catalog,
            roll: &roll,
            config: &config,
            presenter: &mut presenter,
        };

        let strike = ActionSpec {
            chance: 100,
            recipients: RecipientSelector::Group(Group::Enemies),
            query: None,
            triggers: Vec::new(),
            kind: ActionKind::Attack {
                profile: AttackProfile {
                    pattern: Pattern::single(1.0),
                    anchor: PatternAnchor::default(),
                    stats: AttackStats {
                        damage: 30.0,
                        accuracy: 100,
                        armor_penetration: 1.0,
                        crit_damage: 1.5,
                        ..AttackStats::default()
                    },
                    damage_type: DamageType::Physical,
                    range: 5,
                    line_of_fire: LineOfFire::Direct,
                    line_of_fire_modifiers: Vec::new(),
                    targetable_terrains: vec![Terrain::Ground],
                    modifiers: Vec::new(),
                },
            },
        };
        let mend = regen_action(
            RecipientSelector::FromResult(ResultField::DamagedTargets),
            10.0,
        );

        let mut result = AbilityResult::default();
        execute_action(&mut ctx, user, &strike, &mut result, ActionEnv::default(), 0).unwrap();
        execute_action(&mut ctx, user, &mend, &mut result, ActionEnv::default(), 0).unwrap();

        // 100 - 30 + 10: the second action healed exactly the units the
        // first one damaged.
        assert_eq!(state.combatant(enemy).unwrap().health, 80.0);
        assert_eq!(result.healed_targets, vec![enemy]);
    }

    #[test]
    fn follow_up_trigger_lives_only_during_its_action() {
        let mut state = empty_state();
        let user = add_unit(&mut state, basic_definition("User"), Side::A, 0, 0);
        state.combatant_mut(user).unwrap().health = 10.0;

        let mut bus = EventBus::new();
        let catalog = TestCatalog::default();
        let config = BattleConfig::new();
        let roll = PcgRoll;
        let mut presenter = NullPresenter;
        let mut ctx = BattleCtx {
            state: &mut state,
            bus: &mut bus,
            catalog: &catalog,
            roll: &roll,
            config: &config,
            presenter: &mut presenter,
        };

        // The action itself does nothing (chance 0) but carries a trigger.
        let spec = ActionSpec {
            chance: 0,
            recipients: RecipientSelector::Group(Group::SelfOnly),
            query: None,
            triggers: vec![FollowUpTrigger {
                on_events: vec![EventKind::Damage],
                actions: vec![regen_action(RecipientSelector::Group(Group::SelfOnly), 5.0)],
            }],
            kind: ActionKind::RegenerateHealth { amount: 0.0 },
        };
        let mut result = AbilityResult::default();
        execute_action(&mut ctx, user, &spec, &mut result, ActionEnv::default(), 0).unwrap();

        // Torn down afterwards: publishing the event now reaches nobody.
        assert!(bus.is_empty());
        super::super::publish(
            &mut BattleCtx {
                state: &mut state,
                bus: &mut bus,
                catalog: &catalog,
                roll: &roll,
                config: &config,
                presenter: &mut presenter,
            },
            EventKind::Damage,
            &EventContext::new(user),
            0,
        )
        .unwrap();
        assert_eq!(state.combatant(user).unwrap().health, 10.0);
    }

    #[test]
    fn cascade_depth_overflow_is_an_engine_fault() {
        let mut state = empty_state();
        let user = add_unit(&mut state, basic_definition("User"), Side::A, 0, 0);

        let mut bus = EventBus::new();
        let catalog = TestCatalog::default();
        let config = BattleConfig::new();
        let roll = PcgRoll;
        let mut presenter = NullPresenter;
        let mut ctx = BattleCtx {
            state: &mut state,
            bus: &mut bus,
            catalog: &catalog,
            roll: &roll,
            config: &config,
            presenter: &mut presenter,
        };

        let spec = regen_action(RecipientSelector::Group(Group::SelfOnly), 1.0);
        let mut result = AbilityResult::default();
        let depth = config.max_cascade_depth + 1;
        let outcome = execute_action(&mut ctx, user, &spec, &mut result, ActionEnv::default(), depth);

        assert_eq!(outcome, Err(ExecuteError::CascadeOverflow { depth }));
    }
}
