//! # stathub
//!
//! A runtime attribute engine for games and simulations: cached,
//! dirty-tracked stat values, priority-ordered modifier chains, and a
//! central hub that auto-attaches global modifiers to tag-matched stats
//! as containers load and unload.
//!
//! ## Pipeline
//!
//! A [`Stat`] owns a base value (constant, or a formula over other stats)
//! and an ordered chain of [`ModifierInstance`]s. Reading the stat folds
//! the chain over the base, highest priority first, and caches the
//! result; anything that could change the outcome marks the cache dirty,
//! and the stat's [`UpdatePolicy`] decides when it is recomputed.
//!
//! Stats live in tagged [`StatContainer`]s, and a [`StatHub`] tracks the
//! loaded containers. A modifier registered globally on the hub attaches
//! itself to every stat matched by its two [`TagMatcher`]s, including
//! stats of containers loaded later.
//!
//! ## Example
//!
//! ```rust
//! use stathub::modifier::{ModifierConfig, ModifierOp, SimpleModifier};
//! use stathub::{Stat, StatContainer, StatHub, TagHolder, TagMatcher, UpdatePolicy};
//! use std::rc::Rc;
//!
//! let hub = StatHub::new();
//!
//! // one entity with one stat
//! let player = StatContainer::new(TagHolder::of(["player"]));
//! let hp = Stat::simple("hp", TagHolder::of(["health"]), UpdatePolicy::OnRequest, 100.0);
//! player.add_stat(hp.clone());
//! hub.container_loaded(player);
//!
//! // a hub-wide +20% health blessing
//! let blessing = SimpleModifier::with_config(
//!     ModifierOp::Percent,
//!     20.0,
//!     ModifierConfig {
//!         container_matcher: Some(TagMatcher::any(TagHolder::of(["player"]))),
//!         stat_matcher: Some(TagMatcher::any(TagHolder::of(["health"]))),
//!         ..ModifierConfig::default()
//!     },
//! );
//! let blessing = hub.create_and_add_global_modifier(Rc::new(blessing));
//!
//! assert_eq!(hp.value(), 120.0);
//!
//! hub.remove_global_modifier(&blessing);
//! assert_eq!(hp.value(), 100.0);
//! ```
//!
//! ## Modules
//!
//! - [`tag`]: tag identity and per-entity tag holders
//! - [`matcher`]: tag-matching predicates
//! - [`signal`]: synchronous single-threaded observer registries
//! - [`eval`]: the pluggable formula-evaluator boundary
//! - [`error`]: error types
//! - [`modifier`]: modifier policies and their configuration
//! - [`instance`]: live, leveled modifier instances
//! - [`stat`]: cached stats, update policies, modifier chains
//! - [`container`]: tagged stat groups
//! - [`global`]: global-modifier registrations
//! - [`hub`]: the central registry
//!
//! The engine is single-threaded by design; shared state uses `Rc` and
//! interior mutability, not locks.

pub mod container;
pub mod error;
pub mod eval;
pub mod global;
mod graph;
pub mod hub;
pub mod instance;
pub mod matcher;
pub mod modifier;
pub mod signal;
pub mod stat;
pub mod tag;

pub use container::StatContainer;
pub use error::{EvalError, StatError};
pub use eval::{CompiledFormula, FormulaEvaluator};
pub use global::GlobalModifier;
pub use hub::StatHub;
pub use instance::ModifierInstance;
pub use matcher::TagMatcher;
pub use modifier::{ExpressionModifier, ModifierConfig, ModifierOp, SimpleModifier, StatModifier};
pub use signal::{Signal, Subscription};
pub use stat::{Stat, TickPhase, UpdatePolicy};
pub use tag::{Tag, TagHolder};
