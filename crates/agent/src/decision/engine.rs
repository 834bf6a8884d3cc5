//! Chance- and criteria-gated evaluation of decision modules.

use async_trait::async_trait;
use chrono::Utc;
use futures::FutureExt;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, warn};

use wardens_core::{Block, DomainEvent, Entity, Error, Item, Position, Result, Task};

use crate::agent::Agent;
use crate::scheduler::panic_message;

/// Transient data passed from a module's criteria to its action.
///
/// Built fresh for every module so nothing written by one module is seen
/// by the next.
pub struct EvalContext<'a> {
    pub agent: &'a Agent,
    pub distance_from_home: f64,
    pub target_position: Option<Position>,
    pub target_block: Option<Block>,
    pub target_item: Option<Item>,
    pub target_enemy: Option<Entity>,
}

impl<'a> EvalContext<'a> {
    pub fn new(agent: &'a Agent) -> Self {
        Self {
            agent,
            distance_from_home: agent.distance_from_home(),
            target_position: None,
            target_block: None,
            target_item: None,
            target_enemy: None,
        }
    }
}

/// A named rule the agent may act on while idle.
#[async_trait]
pub trait DecisionModule: Send + Sync {
    fn name(&self) -> &str;

    /// Probability in `[0, 1]` that the module is considered at all.
    fn chance(&self) -> f64 {
        1.0
    }

    /// Keep evaluating later modules after this one fires.
    fn continues(&self) -> bool {
        false
    }

    async fn criteria(&self, _ctx: &mut EvalContext<'_>) -> Result<bool> {
        Ok(true)
    }

    async fn action(&self, ctx: &EvalContext<'_>) -> Result<()>;
}

/// Ordered modules; earlier ones take priority.
pub type Bundle = Vec<Arc<dyn DecisionModule>>;

/// What happened during one pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EvaluationReport {
    pub fired: Vec<String>,
    pub failed: Vec<String>,
}

impl EvaluationReport {
    pub fn merge(&mut self, other: EvaluationReport) {
        self.fired.extend(other.fired);
        self.failed.extend(other.failed);
    }
}

pub struct DecisionEngine {
    rng: Mutex<StdRng>,
}

impl Default for DecisionEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl DecisionEngine {
    pub fn new() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_os_rng()),
        }
    }

    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    fn roll(&self, chance: f64) -> bool {
        if chance >= 1.0 {
            return true;
        }
        let draw: f64 = self
            .rng
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .random();
        draw < chance
    }

    /// Random integer in `[low, high]` from the engine's generator.
    pub fn random_between(&self, low: u64, high: u64) -> u64 {
        self.rng
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .random_range(low..=high)
    }

    /// Random index below `len`. `None` when `len` is zero.
    pub fn pick_index(&self, len: usize) -> Option<usize> {
        (len > 0).then(|| {
            self.rng
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .random_range(0..len)
        })
    }

    /// Run `bundle` in order for `agent`.
    pub async fn evaluate(
        &self,
        agent: &Agent,
        bundle: &[Arc<dyn DecisionModule>],
    ) -> EvaluationReport {
        let mut report = EvaluationReport::default();

        for module in bundle {
            let name = module.name();
            let mut ctx = EvalContext::new(agent);

            if !self.roll(module.chance()) {
                continue;
            }

            let passed = AssertUnwindSafe(module.criteria(&mut ctx))
                .catch_unwind()
                .await
                .unwrap_or_else(|panic| {
                    Err(Error::Internal(format!(
                        "panicked: {}",
                        panic_message(panic.as_ref())
                    )))
                });
            match passed {
                Ok(true) => {}
                Ok(false) => continue,
                Err(e) => {
                    warn!(agent = %agent.name(), module = %name, "Criteria failed: {e}");
                    report.failed.push(name.to_string());
                    continue;
                }
            }

            debug!(agent = %agent.name(), module = %name, "Module fired");
            agent.tasks().set_current(Task::PersonaTask {
                description: name.to_string(),
            });
            let outcome = {
                let _finish = agent.tasks().finish_guard();
                AssertUnwindSafe(module.action(&ctx))
                    .catch_unwind()
                    .await
                    .unwrap_or_else(|panic| {
                        Err(Error::Internal(format!(
                            "panicked: {}",
                            panic_message(panic.as_ref())
                        )))
                    })
            };
            agent.publish(DomainEvent::ModuleFired {
                agent: agent.name().to_string(),
                module: name.to_string(),
                timestamp: Utc::now(),
            });

            report.fired.push(name.to_string());
            if let Err(e) = outcome {
                warn!(agent = %agent.name(), module = %name, "Action failed: {e}");
                report.failed.push(name.to_string());
            }

            if !module.continues() {
                break;
            }
        }

        report
    }
}
