//! Deterministic combat resolution core for grid-based, turn-meter battles.
//!
//! `battle-core` defines the canonical combat rules: the turn scheduler, the
//! data-driven ability/action executor, the targeting and attack resolver,
//! the status-effect/modifier engine, and the event trigger bus. All state
//! mutation flows through [`session::BattleSession`], which wires the
//! components together and exposes the external ability/target selection
//! interface. Data loading and presentation live in supporting crates that
//! implement the [`catalog::Catalog`] and [`presenter::Presenter`] seams.
pub mod ability;
pub mod board;
pub mod catalog;
pub mod config;
pub mod engine;
pub mod events;
pub mod modifier;
pub mod presenter;
pub mod query;
pub mod roll;
pub mod session;
pub mod state;
pub mod stats;
pub mod status;

pub use ability::{
    AbilityDefinition, AbilityResult, ActionKind, ActionSpec, AttackProfile, FollowUpTrigger,
    InputKind, LineOfFire, LineOfFireModifier, Pattern, PatternAnchor, RecipientSelector,
    ResultField,
};
pub use board::TileTarget;
pub use catalog::{Catalog, CatalogError};
pub use config::BattleConfig;
pub use engine::ExecuteError;
pub use events::{EventBus, EventContext, EventKind, PassiveTriggerSpec, SubscriptionId};
pub use modifier::{AttackModifier, ForEvery, Modifier};
pub use presenter::{NullPresenter, Presenter};
pub use query::{Group, Query, Tag};
pub use roll::{PcgRoll, RollOracle, compute_seed};
pub use session::{BattleSession, SessionError};
pub use state::{
    ActiveAbility, BattleState, Combatant, CombatantDefinition, CombatantId, EffectInstanceId,
    PassiveAbility, PassiveAbilityDefinition, Role, Side, StateFlags, Terrain, TileCoord,
};
pub use stats::{AttackStats, DamageType, Stats};
pub use status::{
    EffectClass, Expiry, StatusEffectApplier, StatusEffectDefinition, StatusEffectInstance,
};
