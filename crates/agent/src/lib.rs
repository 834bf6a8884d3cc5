//! Agent runtime for Wardens.
//!
//! Each agent owns a [`TaskBoard`] of discrete tasks and a [`Scheduler`]
//! that pops one at a time:
//!
//! 1. **Skip** while the agent is listening for a reply or asleep
//! 2. **Execute** the next task through the [`executor`] to completion
//! 3. **Decide** when nothing is queued, walking the persona bundle and
//!    then the standard bundle of [`decision`] modules
//!
//! World events (damage, death, team calls for help) arrive through
//! [`AgentRuntime`] and are turned into queue mutations by
//! [`Agent::handle_event`].

pub mod agent;
pub mod combat;
pub mod decision;
pub mod executor;
pub mod items;
pub mod navigation;
pub mod queue;
pub mod rate_limit;
pub mod roster;
pub mod scheduler;

#[cfg(test)]
mod test_support;

pub use agent::{Agent, AgentBuilder, AgentSnapshot};
pub use combat::{AttackRequest, CombatController, CombatOutcome, Engagement};
pub use decision::{BundleSet, DecisionEngine, DecisionModule, EvalContext, EvaluationReport};
pub use executor::perform_task;
pub use navigation::{NavRequest, Navigator};
pub use queue::{TaskBoard, TaskQueue};
pub use rate_limit::RateLimiter;
pub use roster::Roster;
pub use scheduler::{AgentRuntime, Scheduler, SchedulerHandle};
