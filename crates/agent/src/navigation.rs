//! Navigation controller.
//!
//! The motion collaborator does not reliably report when a goal is reached,
//! so the controller issues one goal request and then decides the outcome
//! itself by polling the agent's position:
//!
//! - **reached** when within `near_range * 2` of the requested target
//! - **stuck** when the block position has not changed for more than
//!   `stall_polls` consecutive polls
//! - **timed out** once the configured timeout has elapsed, even while moving
//!
//! Failure is a `false` result, never an error.

use chrono::Utc;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::time::Instant;
use tracing::debug;

use wardens_config::NavigationConfig;
use wardens_core::{DomainEvent, EventBus, Goal, Motion, Position, WorldView};

/// One navigation attempt.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NavRequest {
    pub target: Position,
    /// Random horizontal jitter so agents do not stack on one tile.
    pub deviation: f64,
    pub near_range: f64,
    pub ignore_y: bool,
}

impl NavRequest {
    pub fn to(target: Position) -> Self {
        Self {
            target,
            deviation: 0.0,
            near_range: 1.0,
            ignore_y: false,
        }
    }

    pub fn deviation(mut self, deviation: f64) -> Self {
        self.deviation = deviation;
        self
    }

    pub fn near(mut self, near_range: f64) -> Self {
        self.near_range = near_range;
        self
    }

    pub fn ignore_y(mut self, ignore_y: bool) -> Self {
        self.ignore_y = ignore_y;
        self
    }
}

pub struct Navigator {
    agent: String,
    motion: Arc<dyn Motion>,
    world: Arc<dyn WorldView>,
    config: NavigationConfig,
    rng: Mutex<StdRng>,
    event_bus: Option<Arc<EventBus>>,
}

impl Navigator {
    pub fn new(
        agent: impl Into<String>,
        motion: Arc<dyn Motion>,
        world: Arc<dyn WorldView>,
        config: NavigationConfig,
    ) -> Self {
        Self {
            agent: agent.into(),
            motion,
            world,
            config,
            rng: Mutex::new(StdRng::from_os_rng()),
            event_bus: None,
        }
    }

    /// Use a deterministic jitter sequence.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = Mutex::new(StdRng::seed_from_u64(seed));
        self
    }

    pub fn with_event_bus(mut self, bus: Arc<EventBus>) -> Self {
        self.event_bus = Some(bus);
        self
    }

    pub fn config(&self) -> &NavigationConfig {
        &self.config
    }

    pub fn can_reach(&self, target: Position) -> bool {
        self.motion.can_reach(target)
    }

    fn jitter(&self, deviation: f64) -> (f64, f64) {
        let spread = deviation.round() as i64;
        if spread <= 0 {
            return (0.0, 0.0);
        }
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        (
            rng.random_range(-spread..=spread) as f64,
            rng.random_range(-spread..=spread) as f64,
        )
    }

    /// Move toward `request.target`. Returns whether it was reached.
    pub async fn to_coordinate(&self, request: NavRequest) -> bool {
        let started = Instant::now();
        let (dx, dz) = self.jitter(request.deviation);
        let goal = Goal {
            target: request.target.offset(dx, 0.0, dz),
            range: request.near_range,
            ignore_y: request.ignore_y,
        };

        self.motion.look_at(goal.target);

        // The goal future resolves or rejects on its own schedule; a
        // superseded goal is not a failure.
        let motion = Arc::clone(&self.motion);
        let agent = self.agent.clone();
        tokio::spawn(async move {
            if let Err(e) = motion.request_goal(goal).await {
                debug!(agent = %agent, "Goal request ended: {e}");
            }
        });

        let accept = request.near_range * 2.0;
        let mut last_key: Option<String> = None;
        let mut stalled = 0u32;

        let reached = loop {
            tokio::time::sleep(self.config.poll_interval()).await;

            let here = self.motion.current_position();
            let distance = if request.ignore_y {
                here.horizontal_distance_to(&request.target)
            } else {
                here.distance_to(&request.target)
            };
            if distance < accept {
                break true;
            }

            let key = here.key();
            if last_key.as_deref() == Some(key.as_str()) {
                stalled += 1;
            } else {
                stalled = 0;
                last_key = Some(key);
            }
            if stalled > self.config.stall_polls {
                debug!(agent = %self.agent, target = %request.target, "Stuck, giving up");
                break false;
            }

            if started.elapsed() > self.config.timeout() {
                debug!(agent = %self.agent, target = %request.target, "Navigation timed out");
                break false;
            }
        };

        if !reached {
            self.motion.clear_goal();
        }

        if let Some(bus) = &self.event_bus {
            bus.publish(DomainEvent::NavigationEnded {
                agent: self.agent.clone(),
                reached,
                elapsed_ms: started.elapsed().as_millis() as u64,
                timestamp: Utc::now(),
            });
        }

        reached
    }

    /// Walk to a player. `None` when the player is not visible.
    pub async fn to_player(&self, username: &str) -> Option<bool> {
        let position = self.world.player_position(username)?;
        let near = self.config.near_range;
        Some(
            self.to_coordinate(NavRequest::to(position).deviation(near).near(near))
                .await,
        )
    }
}
