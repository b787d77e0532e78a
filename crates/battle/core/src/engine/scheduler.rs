//! Turn-meter scheduling and begin/end-of-turn housekeeping.
//!
//! While no turn is active, each external tick generates natural turn
//! meter for every combatant and picks one ready combatant (uniform
//! tie-break) to act. Beginning a turn snapshots the actor's active
//! effects and on-cooldown abilities; ending it costs exactly 100 meter
//! and decrements only what the snapshot recorded, so effects and
//! cooldowns gained mid-turn keep their full duration.

use crate::config::BattleConfig;
use crate::events::{EventContext, EventKind};
use crate::roll::roll_context;
use crate::state::{BattleState, CombatantId, EffectInstanceId, StateFlags};
use crate::status::Expiry;

use super::{BattleCtx, ExecuteError, publish};

/// Begin-of-turn snapshot consumed by the matching end-of-turn call.
#[derive(Clone, Debug)]
pub(crate) struct ActiveTurn {
    pub combatant: CombatantId,
    /// Status-effect instances present when the turn began.
    effect_snapshot: Vec<EffectInstanceId>,
    /// Indices of abilities that were on cooldown when the turn began.
    cooldown_snapshot: Vec<usize>,
}

/// Generates natural turn meter for every active combatant:
/// `speed * 0.01` percentage points, clamped so one tick never overshoots
/// exactly 100.
pub(crate) fn advance_meters(ctx: &mut BattleCtx<'_>) {
    for id in ctx.state.all_active() {
        let speed = ctx.state.current_stats(id).speed;
        let Some(combatant) = ctx.state.combatant(id) else {
            continue;
        };
        let headroom = (BattleConfig::TURN_METER_FULL - combatant.turn_meter).max(0.0);
        let amount = (speed * BattleConfig::NATURAL_METER_RATE).min(headroom);
        if amount > 0.0 {
            ctx.add_turn_meter(id, amount);
        }
    }
}

/// Combatants whose meter has reached 100, in roster order.
pub(crate) fn ready_candidates(state: &BattleState) -> Vec<CombatantId> {
    state
        .all_active()
        .into_iter()
        .filter(|&id| {
            state
                .combatant(id)
                .is_some_and(|c| c.turn_meter >= BattleConfig::TURN_METER_FULL)
        })
        .collect()
}

/// Picks one ready combatant uniformly at random.
pub(crate) fn pick_ready(ctx: &mut BattleCtx<'_>, candidates: &[CombatantId]) -> CombatantId {
    let index = ctx.roll_index(roll_context::TIE_BREAK, candidates.len());
    candidates[index]
}

/// Begins a turn: snapshots effects and cooldowns, broadcasts TurnBegin,
/// and reports whether the combatant must skip (folded from its active
/// effects).
pub(crate) fn begin_turn(
    ctx: &mut BattleCtx<'_>,
    id: CombatantId,
) -> Result<(ActiveTurn, bool), ExecuteError> {
    let (effect_snapshot, cooldown_snapshot) = match ctx.state.combatant(id) {
        Some(combatant) => (
            combatant.effects.iter().map(|e| e.id).collect(),
            combatant
                .abilities
                .iter()
                .enumerate()
                .filter(|(_, a)| a.cooldown > 0)
                .map(|(index, _)| index)
                .collect(),
        ),
        None => (Vec::new(), Vec::new()),
    };

    let turn = ActiveTurn {
        combatant: id,
        effect_snapshot,
        cooldown_snapshot,
    };

    publish(ctx, EventKind::TurnBegin, &EventContext::new(id), 0)?;

    let skip = ctx.state.current_state(id).contains(StateFlags::SKIP_TURN);
    Ok((turn, skip))
}

/// Ends a turn: costs exactly 100 meter (overflow from regeneration is
/// retained), decrements snapshotted effect durations and ability
/// cooldowns, and broadcasts TurnEnd.
pub(crate) fn end_turn(ctx: &mut BattleCtx<'_>, turn: ActiveTurn) -> Result<(), ExecuteError> {
    let id = turn.combatant;
    ctx.add_turn_meter(id, -BattleConfig::TURN_METER_COST);

    // Duration decrement touches only instances from the snapshot that are
    // still present; expired ones leave silently.
    let mut released = Vec::new();
    if let Some(combatant) = ctx.state.combatant_mut(id) {
        for effect in &mut combatant.effects {
            if turn.effect_snapshot.contains(&effect.id)
                && effect.definition.expiry == Expiry::Duration
            {
                effect.duration -= 1;
            }
        }
        combatant.effects.retain_mut(|effect| {
            let expired =
                effect.definition.expiry == Expiry::Duration && effect.duration <= 0;
            if expired {
                released.append(&mut effect.subscriptions);
            }
            !expired
        });

        for index in &turn.cooldown_snapshot {
            if let Some(ability) = combatant.abilities.get_mut(*index) {
                ability.add_cooldown(-1);
            }
        }
    }
    for subscription in released {
        ctx.bus.release(subscription);
    }

    publish(ctx, EventKind::TurnEnd, &EventContext::new(id), 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::testutil::TestCatalog;
    use crate::events::EventBus;
    use crate::presenter::NullPresenter;
    use crate::roll::PcgRoll;
    use crate::state::testutil::{add_unit, basic_definition, empty_state};
    use crate::state::Side;
    use crate::status::{EffectClass, StatusEffectDefinition, StatusEffectInstance};

    macro_rules! ctx {
        ($state:expr, $bus:expr, $catalog:expr, $config:expr, $roll:expr, $presenter:expr) => {
            BattleCtx {
                state: &mut $state,
                bus: &mut $bus,
                catalog: &$catalog,
                roll: &$roll,
                config: &$config,
                presenter: &mut $presenter,
            }
        };
    }

    fn timed_effect(name: &str, duration: i32) -> StatusEffectInstance {
        StatusEffectInstance {
            id: EffectInstanceId(u64::MAX),
            definition: StatusEffectDefinition {
                name: name.to_string(),
                class: EffectClass::Buff,
                modifiers: Vec::new(),
                state: StateFlags::empty(),
                triggers: Vec::new(),
                expiry: Expiry::Duration,
                stackable: false,
                clearable: true,
                anonymous: false,
            },
            source: CombatantId(0),
            duration,
            subscriptions: Vec::new(),
        }
    }

    #[test]
    fn natural_generation_never_overshoots_full() {
        let mut state = empty_state();
        let mut fast = basic_definition("Fast");
        fast.stats.speed = 20_000.0;
        let id = add_unit(&mut state, fast, Side::A, 0, 0);

        let mut bus = EventBus::new();
        let catalog = TestCatalog::default();
        let config = BattleConfig::new();
        let roll = PcgRoll;
        let mut presenter = NullPresenter;
        let mut ctx = ctx!(state, bus, catalog, config, roll, presenter);

        advance_meters(&mut ctx);
        assert_eq!(state.combatant(id).unwrap().turn_meter, 100.0);

        let mut ctx = ctx!(state, bus, catalog, config, roll, presenter);
        advance_meters(&mut ctx);
        assert_eq!(state.combatant(id).unwrap().turn_meter, 100.0);
    }

    #[test]
    fn faster_units_ready_first() {
        let mut state = empty_state();
        let mut fast = basic_definition("Fast");
        fast.stats.speed = 200.0;
        let mut slow = basic_definition("Slow");
        slow.stats.speed = 100.0;
        let hare = add_unit(&mut state, fast, Side::A, 0, 0);
        let tortoise = add_unit(&mut state, slow, Side::B, 0, 0);

        let mut bus = EventBus::new();
        let catalog = TestCatalog::default();
        let config = BattleConfig::new();
        let roll = PcgRoll;
        let mut presenter = NullPresenter;

        for _ in 0..50 {
            let mut ctx = ctx!(state, bus, catalog, config, roll, presenter);
            advance_meters(&mut ctx);
        }

        let candidates = ready_candidates(&state);
        assert_eq!(candidates, vec![hare]);
        assert!(state.combatant(tortoise).unwrap().turn_meter < 100.0);
    }

    #[test]
    fn end_turn_costs_exactly_one_hundred_and_keeps_overflow() {
        let mut state = empty_state();
        let id = add_unit(&mut state, basic_definition("Unit"), Side::A, 0, 0);
        state.combatant_mut(id).unwrap().turn_meter = 130.0;

        let mut bus = EventBus::new();
        let catalog = TestCatalog::default();
        let config = BattleConfig::new();
        let roll = PcgRoll;
        let mut presenter = NullPresenter;
        let mut ctx = ctx!(state, bus, catalog, config, roll, presenter);

        let (turn, skip) = begin_turn(&mut ctx, id).unwrap();
        assert!(!skip);
        end_turn(&mut ctx, turn).unwrap();

        assert_eq!(state.combatant(id).unwrap().turn_meter, 30.0);
    }

    #[test]
    fn snapshotted_effects_decrement_once_per_turn_pair() {
        let mut state = empty_state();
        let id = add_unit(&mut state, basic_definition("Unit"), Side::A, 0, 0);

        let effect_id = state.alloc_effect_id();
        let mut effect = timed_effect("Focus", 2);
        effect.id = effect_id;
        state.combatant_mut(id).unwrap().turn_meter = 100.0;
        state.combatant_mut(id).unwrap().effects.push(effect);

        let mut bus = EventBus::new();
        let catalog = TestCatalog::default();
        let config = BattleConfig::new();
        let roll = PcgRoll;
        let mut presenter = NullPresenter;
        let mut ctx = ctx!(state, bus, catalog, config, roll, presenter);

        let (turn, _) = begin_turn(&mut ctx, id).unwrap();
        end_turn(&mut ctx, turn).unwrap();
        assert_eq!(state.combatant(id).unwrap().effects[0].duration, 1);

        // Second paired cycle expires it, silently.
        state.combatant_mut(id).unwrap().turn_meter = 100.0;
        let mut ctx = ctx!(state, bus, catalog, config, roll, presenter);
        let (turn, _) = begin_turn(&mut ctx, id).unwrap();
        end_turn(&mut ctx, turn).unwrap();
        assert!(state.combatant(id).unwrap().effects.is_empty());
    }

    #[test]
    fn effects_added_mid_turn_do_not_decrement() {
        let mut state = empty_state();
        let id = add_unit(&mut state, basic_definition("Unit"), Side::A, 0, 0);
        state.combatant_mut(id).unwrap().turn_meter = 100.0;

        let mut bus = EventBus::new();
        let catalog = TestCatalog::default();
        let config = BattleConfig::new();
        let roll = PcgRoll;
        let mut presenter = NullPresenter;
        let mut ctx = ctx!(state, bus, catalog, config, roll, presenter);

        let (turn, _) = begin_turn(&mut ctx, id).unwrap();

        // Applied mid-turn: not in the snapshot.
        let effect_id = state.alloc_effect_id();
        let mut effect = timed_effect("Fresh", 2);
        effect.id = effect_id;
        state.combatant_mut(id).unwrap().effects.push(effect);

        let mut ctx = ctx!(state, bus, catalog, config, roll, presenter);
        end_turn(&mut ctx, turn).unwrap();

        assert_eq!(state.combatant(id).unwrap().effects[0].duration, 2);
    }

    #[test]
    fn indefinite_effects_never_expire_on_their_own() {
        let mut state = empty_state();
        let id = add_unit(&mut state, basic_definition("Unit"), Side::A, 0, 0);

        let effect_id = state.alloc_effect_id();
        let mut effect = timed_effect("Brand", 1);
        effect.id = effect_id;
        effect.definition.expiry = Expiry::Indefinite;
        state.combatant_mut(id).unwrap().turn_meter = 100.0;
        state.combatant_mut(id).unwrap().effects.push(effect);

        let mut bus = EventBus::new();
        let catalog = TestCatalog::default();
        let config = BattleConfig::new();
        let roll = PcgRoll;
        let mut presenter = NullPresenter;

        for _ in 0..3 {
            state.combatant_mut(id).unwrap().turn_meter = 100.0;
            let mut ctx = ctx!(state, bus, catalog, config, roll, presenter);
            let (turn, _) = begin_turn(&mut ctx, id).unwrap();
            end_turn(&mut ctx, turn).unwrap();
        }

        assert_eq!(state.combatant(id).unwrap().effects.len(), 1);
    }

    #[test]
    fn snapshotted_cooldowns_decrement_and_recover() {
        use crate::ability::{AbilityDefinition, ActionKind, ActionSpec, RecipientSelector};
        use crate::query::Group;

        // Scenario: max_cooldown 3, used once, then three paired
        // begin/end cycles bring it back to ready.
        let mut state = empty_state();
        let mut def = basic_definition("Unit");
        def.active_abilities = vec![AbilityDefinition {
            name: "Barrage".into(),
            max_cooldown: 3,
            start_on_cooldown: false,
            required_input: None,
            actions: vec![ActionSpec {
                chance: 100,
                recipients: RecipientSelector::Group(Group::SelfOnly),
                query: None,
                triggers: Vec::new(),
                kind: ActionKind::RegenerateHealth { amount: 0.0 },
            }],
        }];
        let id = add_unit(&mut state, def, Side::A, 0, 0);

        let mut bus = EventBus::new();
        let catalog = TestCatalog::default();
        let config = BattleConfig::new();
        let roll = PcgRoll;
        let mut presenter = NullPresenter;

        let mut ctx = ctx!(state, bus, catalog, config, roll, presenter);
        crate::engine::executor::execute_ability(&mut ctx, id, 0, None).unwrap();
        assert_eq!(state.combatant(id).unwrap().abilities[0].cooldown, 3);

        for expected in [2, 1, 0] {
            state.combatant_mut(id).unwrap().turn_meter = 100.0;
            let mut ctx = ctx!(state, bus, catalog, config, roll, presenter);
            let (turn, _) = begin_turn(&mut ctx, id).unwrap();
            end_turn(&mut ctx, turn).unwrap();
            assert_eq!(state.combatant(id).unwrap().abilities[0].cooldown, expected);
        }
        assert!(state.combatant(id).unwrap().abilities[0].is_ready());
    }

    #[test]
    fn skip_turn_flag_is_reported_at_begin() {
        let mut state = empty_state();
        let id = add_unit(&mut state, basic_definition("Unit"), Side::A, 0, 0);

        let effect_id = state.alloc_effect_id();
        let mut effect = timed_effect("Daze", 1);
        effect.id = effect_id;
        effect.definition.state = StateFlags::SKIP_TURN;
        state.combatant_mut(id).unwrap().turn_meter = 100.0;
        state.combatant_mut(id).unwrap().effects.push(effect);

        let mut bus = EventBus::new();
        let catalog = TestCatalog::default();
        let config = BattleConfig::new();
        let roll = PcgRoll;
        let mut presenter = NullPresenter;
        let mut ctx = ctx!(state, bus, catalog, config, roll, presenter);

        let (_, skip) = begin_turn(&mut ctx, id).unwrap();
        assert!(skip);
    }
}
