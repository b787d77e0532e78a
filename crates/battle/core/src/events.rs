//! Typed publish/subscribe bus for combat events.
//!
//! Subscriptions are explicit handles: enabling a trigger returns a
//! [`SubscriptionId`], and the owning ability or status-effect instance
//! releases it when its own lifetime ends. Publishing snapshots the
//! currently matching subscriptions in subscription order and hands them
//! back as [`Reaction`]s; the executor runs their action lists
//! synchronously, which is where cascades (and the cascade depth guard)
//! happen.

use crate::ability::ActionSpec;
use crate::query::{Group, Query};
use crate::state::{BattleState, CombatantId};

/// The closed set of combat event kinds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum::Display)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum EventKind {
    TurnBegin,
    TurnEnd,
    Damage,
    CriticalHit,
    Evasion,
    Buff,
    Debuff,
    Resist,
    BuffClear,
    DebuffClear,
    HalfHealth,
    Defeat,
}

/// Immutable payload passed to every handler of a published event.
#[derive(Clone, Debug, PartialEq)]
pub struct EventContext {
    /// The combatant that caused the event.
    pub source: CombatantId,
    /// The combatant that received it, for event kinds that have one.
    pub recipient: Option<CombatantId>,
    /// Realized amount (damage events).
    pub amount: Option<f32>,
    /// Status effect name (buff/debuff/resist/clear events).
    pub effect: Option<String>,
}

impl EventContext {
    pub fn new(source: CombatantId) -> Self {
        Self {
            source,
            recipient: None,
            amount: None,
            effect: None,
        }
    }

    pub fn with_recipient(source: CombatantId, recipient: CombatantId) -> Self {
        Self {
            recipient: Some(recipient),
            ..Self::new(source)
        }
    }

    pub fn amount(mut self, amount: f32) -> Self {
        self.amount = Some(amount);
        self
    }

    pub fn effect(mut self, name: impl Into<String>) -> Self {
        self.effect = Some(name.into());
        self
    }
}

// ============================================================================
// Trigger Specifications
// ============================================================================

/// Template for a passive trigger embedded in a status-effect or passive
/// ability definition.
///
/// Passive triggers listen for events battle-wide, so they carry extra
/// source/recipient filters to drop events involving irrelevant units.
/// Each owning instance subscribes its own copy; templates are never
/// shared live.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PassiveTriggerSpec {
    pub on_events: Vec<EventKind>,
    pub actions: Vec<ActionSpec>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub source_group: Option<Group>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub recipient_group: Option<Group>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub source_query: Option<Query>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub recipient_query: Option<Query>,
}

/// Source/recipient conditions attached to a passive subscription.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PassiveFilter {
    pub source_group: Option<Group>,
    pub recipient_group: Option<Group>,
    pub source_query: Option<Query>,
    pub recipient_query: Option<Query>,
}

impl PassiveFilter {
    fn from_spec(spec: &PassiveTriggerSpec) -> Self {
        Self {
            source_group: spec.source_group,
            recipient_group: spec.recipient_group,
            source_query: spec.source_query.clone(),
            recipient_query: spec.recipient_query.clone(),
        }
    }

    /// Evaluates the filter against an event, from the subscribing unit's
    /// perspective. Group and query conditions on a party are only checked
    /// when the event carries that party.
    pub fn passes(&self, state: &BattleState, user: CombatantId, ctx: &EventContext) -> bool {
        if let Some(group) = self.source_group
            && !state.group(user, group).contains(&ctx.source)
        {
            return false;
        }
        if let Some(query) = &self.source_query
            && !query.matches(state, ctx.source)
        {
            return false;
        }

        if let Some(recipient) = ctx.recipient {
            if let Some(group) = self.recipient_group
                && !state.group(user, group).contains(&recipient)
            {
                return false;
            }
            if let Some(query) = &self.recipient_query
                && !query.matches(state, recipient)
            {
                return false;
            }
        }

        true
    }
}

// ============================================================================
// Event Bus
// ============================================================================

/// Handle to one live subscription, released on owner teardown.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub u64);

#[derive(Clone, Debug)]
struct Subscription {
    id: SubscriptionId,
    kinds: Vec<EventKind>,
    user: CombatantId,
    actions: Vec<ActionSpec>,
    filter: Option<PassiveFilter>,
}

/// A subscription that matched a published event, ready for the executor
/// to run.
#[derive(Clone, Debug)]
pub struct Reaction {
    /// The unit from whose perspective the reaction's actions execute.
    pub user: CombatantId,
    pub actions: Vec<ActionSpec>,
    pub filter: Option<PassiveFilter>,
}

/// Registry of live trigger subscriptions.
#[derive(Debug, Default)]
pub struct EventBus {
    subscriptions: Vec<Subscription>,
    next_id: u64,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribes an in-ability follow-up trigger (no passive filter).
    pub fn subscribe(
        &mut self,
        user: CombatantId,
        kinds: Vec<EventKind>,
        actions: Vec<ActionSpec>,
    ) -> SubscriptionId {
        self.insert(user, kinds, actions, None)
    }

    /// Subscribes a copy of a passive trigger template for one owning
    /// instance.
    pub fn subscribe_passive(
        &mut self,
        user: CombatantId,
        spec: &PassiveTriggerSpec,
    ) -> SubscriptionId {
        self.insert(
            user,
            spec.on_events.clone(),
            spec.actions.clone(),
            Some(PassiveFilter::from_spec(spec)),
        )
    }

    fn insert(
        &mut self,
        user: CombatantId,
        kinds: Vec<EventKind>,
        actions: Vec<ActionSpec>,
        filter: Option<PassiveFilter>,
    ) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.subscriptions.push(Subscription {
            id,
            kinds,
            user,
            actions,
            filter,
        });
        id
    }

    /// Releases a subscription. Returns false if the handle was already
    /// released.
    pub fn release(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscriptions.len();
        self.subscriptions.retain(|s| s.id != id);
        self.subscriptions.len() != before
    }

    /// Snapshot of the subscriptions matching `kind`, in subscription
    /// order. Reactions enqueued while the snapshot is being executed do
    /// not see the event that produced it.
    pub fn reactions_for(&self, kind: EventKind) -> Vec<Reaction> {
        self.subscriptions
            .iter()
            .filter(|s| s.kinds.contains(&kind))
            .map(|s| Reaction {
                user: s.user,
                actions: s.actions.clone(),
                filter: s.filter.clone(),
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.subscriptions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscriptions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::testutil::{add_unit, basic_definition, empty_state};
    use crate::state::Side;

    fn noop_action() -> ActionSpec {
        ActionSpec {
            chance: 100,
            recipients: crate::ability::RecipientSelector::Group(Group::SelfOnly),
            query: None,
            triggers: Vec::new(),
            kind: crate::ability::ActionKind::RegenerateHealth { amount: 0.0 },
        }
    }

    #[test]
    fn reactions_come_back_in_subscription_order() {
        let mut state = empty_state();
        let a = add_unit(&mut state, basic_definition("A"), Side::A, 0, 0);
        let b = add_unit(&mut state, basic_definition("B"), Side::A, 0, 1);

        let mut bus = EventBus::new();
        bus.subscribe(b, vec![EventKind::Damage], vec![noop_action()]);
        bus.subscribe(a, vec![EventKind::Damage], vec![noop_action()]);
        bus.subscribe(a, vec![EventKind::Evasion], vec![noop_action()]);

        let reactions = bus.reactions_for(EventKind::Damage);
        assert_eq!(reactions.len(), 2);
        assert_eq!(reactions[0].user, b);
        assert_eq!(reactions[1].user, a);
    }

    #[test]
    fn released_subscription_stops_matching() {
        let mut state = empty_state();
        let a = add_unit(&mut state, basic_definition("A"), Side::A, 0, 0);

        let mut bus = EventBus::new();
        let id = bus.subscribe(a, vec![EventKind::TurnBegin], vec![noop_action()]);
        assert_eq!(bus.reactions_for(EventKind::TurnBegin).len(), 1);

        assert!(bus.release(id));
        assert!(bus.reactions_for(EventKind::TurnBegin).is_empty());
        assert!(!bus.release(id));
    }

    #[test]
    fn passive_filter_checks_source_group() {
        let mut state = empty_state();
        let user = add_unit(&mut state, basic_definition("User"), Side::A, 0, 0);
        let ally = add_unit(&mut state, basic_definition("Ally"), Side::A, 0, 1);
        let enemy = add_unit(&mut state, basic_definition("Enemy"), Side::B, 0, 0);

        let filter = PassiveFilter {
            source_group: Some(Group::Enemies),
            ..PassiveFilter::default()
        };

        assert!(filter.passes(&state, user, &EventContext::new(enemy)));
        assert!(!filter.passes(&state, user, &EventContext::new(ally)));
    }

    #[test]
    fn recipient_conditions_skipped_without_recipient() {
        let mut state = empty_state();
        let user = add_unit(&mut state, basic_definition("User"), Side::A, 0, 0);
        let enemy = add_unit(&mut state, basic_definition("Enemy"), Side::B, 0, 0);

        let filter = PassiveFilter {
            recipient_group: Some(Group::Allies),
            ..PassiveFilter::default()
        };

        // TurnBegin-style context: no recipient, so the condition is moot.
        assert!(filter.passes(&state, user, &EventContext::new(enemy)));
    }
}
