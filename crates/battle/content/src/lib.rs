//! Data catalog for the battle engine.
//!
//! Loads combatant and status-effect definitions from JSON files and
//! exposes them to `battle-core` through its [`battle_core::Catalog`]
//! trait. The on-disk layout is one definition per file:
//!
//! ```text
//! data_dir/
//! ├── units/
//! │   ├── militia_spearman.json
//! │   └── ...
//! └── status_effects/
//!     ├── taunt.json
//!     └── ...
//! ```
pub mod catalog;
pub mod factory;
pub mod loaders;

pub use catalog::StaticCatalog;
pub use factory::ContentFactory;
pub use loaders::{LoadResult, StatusEffectLoader, UnitLoader};
