//! Idle-time decisions.
//!
//! When an agent has nothing queued, the engine walks an ordered bundle of
//! [`DecisionModule`]s. Each module is gated by a chance roll and then a
//! criteria check; the first one that passes acts and ends the pass unless
//! it asks to continue.

pub mod bundles;
pub mod engine;
pub mod modules;

pub use bundles::{BundleSet, ModuleInfo};
pub use engine::{Bundle, DecisionEngine, DecisionModule, EvalContext, EvaluationReport};
