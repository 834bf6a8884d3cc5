//! The per-agent tick loop and the runtime that feeds it world events.
//!
//! [`Scheduler::tick`] performs exactly one tick and returns the delay
//! until the next one. [`Scheduler::spawn`] runs ticks on a tokio task
//! until cancelled. [`AgentRuntime`] pairs that loop with a pump that
//! delivers [`AgentEvent`]s and team messages to the agent.

use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};
use tokio::task::{JoinError, JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use wardens_core::{AgentEvent, TeamMessage};

use crate::agent::Agent;
use crate::executor;

pub(crate) fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

pub struct Scheduler {
    agent: Arc<Agent>,
}

impl Scheduler {
    pub fn new(agent: Arc<Agent>) -> Self {
        Self { agent }
    }

    pub fn agent(&self) -> &Arc<Agent> {
        &self.agent
    }

    /// One tick. Never fails; panics inside are caught and logged.
    pub async fn tick(&self) -> Duration {
        let agent = &self.agent;
        let delays = &agent.config().scheduler;

        if agent.is_blocked() {
            debug!(agent = %agent.name(), "Blocked, skipping tick");
            return delays.blocked_delay();
        }

        let work = async {
            let mut delay = delays.idle_delay();
            if let Some(task) = agent.tasks().begin_next() {
                executor::perform_task(agent, task).await;
                delay = delays.busy_delay();
            }
            if agent.tasks().is_empty() {
                let report = agent.decide().await;
                if !report.fired.is_empty() {
                    debug!(agent = %agent.name(), fired = ?report.fired, "Decisions made");
                }
            }
            delay
        };

        match AssertUnwindSafe(work).catch_unwind().await {
            Ok(delay) => delay,
            Err(panic) => {
                error!(
                    agent = %agent.name(),
                    "Tick panicked: {}",
                    panic_message(panic.as_ref())
                );
                delays.idle_delay()
            }
        }
    }

    /// Run ticks until the returned handle is cancelled. The first tick runs
    /// immediately.
    pub fn spawn(self) -> SchedulerHandle {
        self.spawn_with_token(CancellationToken::new())
    }

    pub fn spawn_with_token(self, token: CancellationToken) -> SchedulerHandle {
        let cancel = token.clone();
        let join = tokio::spawn(async move {
            let mut delay = Duration::ZERO;
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep(delay) => {},
                }
                // Cancelling mid-task drops the executor; its guard clears the slot
                delay = tokio::select! {
                    _ = cancel.cancelled() => break,
                    next = self.tick() => next,
                };
            }
            info!(agent = %self.agent.name(), "Scheduler stopped");
        });
        SchedulerHandle { token, join }
    }
}

pub struct SchedulerHandle {
    token: CancellationToken,
    join: JoinHandle<()>,
}

impl SchedulerHandle {
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    pub async fn join(self) -> Result<(), JoinError> {
        self.join.await
    }
}

async fn next_team_message(
    team: &mut Option<broadcast::Receiver<TeamMessage>>,
) -> Result<TeamMessage, broadcast::error::RecvError> {
    match team {
        Some(receiver) => receiver.recv().await,
        None => std::future::pending().await,
    }
}

/// A running agent: scheduler loop plus event pump.
pub struct AgentRuntime {
    agent: Arc<Agent>,
    token: CancellationToken,
    scheduler: SchedulerHandle,
    pump: JoinHandle<()>,
}

impl AgentRuntime {
    /// Start the scheduler and deliver `events` (and `team` messages when
    /// given) to the agent's handlers.
    pub fn start(
        agent: Arc<Agent>,
        mut events: mpsc::Receiver<AgentEvent>,
        mut team: Option<broadcast::Receiver<TeamMessage>>,
    ) -> Self {
        let token = CancellationToken::new();
        let scheduler = Scheduler::new(Arc::clone(&agent)).spawn_with_token(token.child_token());

        let pump_agent = Arc::clone(&agent);
        let cancel = token.clone();
        let pump = tokio::spawn(async move {
            let agent = pump_agent;
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    event = events.recv() => match event {
                        Some(event) => agent.handle_event(event).await,
                        None => {
                            debug!(agent = %agent.name(), "Event channel closed");
                            break;
                        }
                    },
                    message = next_team_message(&mut team) => match message {
                        Ok(message) => agent.handle_event(AgentEvent::Team(message)).await,
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            warn!(agent = %agent.name(), skipped, "Team channel lagged");
                        }
                        Err(broadcast::error::RecvError::Closed) => team = None,
                    },
                }
            }
        });

        info!(agent = %agent.name(), "Agent runtime started");
        Self {
            agent,
            token,
            scheduler,
            pump,
        }
    }

    pub fn agent(&self) -> &Arc<Agent> {
        &self.agent
    }

    pub fn is_running(&self) -> bool {
        !self.token.is_cancelled()
    }

    /// Stop both loops and wait for them.
    pub async fn shutdown(self) {
        self.token.cancel();
        if let Err(e) = self.scheduler.join().await {
            warn!(agent = %self.agent.name(), "Scheduler task ended abnormally: {e}");
        }
        if let Err(e) = self.pump.await {
            warn!(agent = %self.agent.name(), "Event pump ended abnormally: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decision::{BundleSet, DecisionModule, EvalContext};
    use crate::test_support::Fixture;
    use async_trait::async_trait;
    use wardens_config::AppConfig;
    use wardens_core::{Position, Result, Task, TeamChannel};

    struct Explodes;

    #[async_trait]
    impl DecisionModule for Explodes {
        fn name(&self) -> &str {
            "Explodes"
        }

        async fn action(&self, _ctx: &EvalContext<'_>) -> Result<()> {
            panic!("module blew up");
        }
    }

    fn quiet_agent(fixture: &Fixture) -> Arc<Agent> {
        Arc::new(
            Agent::builder("Chris", fixture.collaborators(), Arc::new(AppConfig::default()))
                .with_bundles(BundleSet::empty())
                .with_home(Position::default())
                .build(),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn idle_tick_uses_baseline_delay() {
        let fixture = Fixture::at(Position::default());
        let scheduler = Scheduler::new(quiet_agent(&fixture));
        assert_eq!(scheduler.tick().await, Duration::from_millis(2000));
    }

    #[tokio::test(start_paused = true)]
    async fn busy_tick_runs_one_task() {
        let fixture = Fixture::at(Position::default());
        let agent = quiet_agent(&fixture);
        agent.tasks().add_tasks([Task::SetHome, Task::SetHome], false);
        let scheduler = Scheduler::new(Arc::clone(&agent));

        assert_eq!(scheduler.tick().await, Duration::from_millis(500));
        assert_eq!(agent.tasks().len(), 1);
        assert!(agent.tasks().current().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn blocked_agent_waits_longer() {
        let fixture = Fixture::at(Position::default());
        let agent = quiet_agent(&fixture);
        agent.set_listening(true);
        agent.tasks().add_task(Task::SetHome, false);
        let scheduler = Scheduler::new(Arc::clone(&agent));

        assert_eq!(scheduler.tick().await, Duration::from_millis(4000));
        assert_eq!(agent.tasks().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn panicking_module_does_not_kill_the_loop() {
        let fixture = Fixture::at(Position::default());
        let bundles =
            BundleSet::empty().with_standard(vec![Arc::new(Explodes) as Arc<dyn DecisionModule>]);
        let agent = Arc::new(
            Agent::builder("Vanir", fixture.collaborators(), Arc::new(AppConfig::default()))
                .with_bundles(bundles)
                .build(),
        );
        let scheduler = Scheduler::new(Arc::clone(&agent));

        assert_eq!(scheduler.tick().await, Duration::from_millis(2000));
        assert!(agent.tasks().current().is_none());

        agent.tasks().add_task(Task::SetHome, false);
        scheduler.tick().await;
        assert!(agent.tasks().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn spawned_loop_stops_on_cancel() {
        let fixture = Fixture::at(Position::default());
        let agent = quiet_agent(&fixture);
        let handle = Scheduler::new(Arc::clone(&agent)).spawn();

        agent.tasks().add_task(Task::SetHome, false);
        tokio::time::sleep(Duration::from_secs(3)).await;
        assert!(agent.tasks().is_empty());

        handle.cancel();
        assert!(handle.is_cancelled());
        handle.join().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn runtime_delivers_events() {
        let fixture = Fixture::at(Position::default());
        let agent = quiet_agent(&fixture);
        agent.set_listening(true);
        let (tx, rx) = mpsc::channel(8);
        let runtime =
            AgentRuntime::start(Arc::clone(&agent), rx, Some(fixture.team.subscribe()));

        tx.send(AgentEvent::Respawned).await.unwrap();
        fixture
            .team
            .broadcast(TeamMessage::help("Wiz", Position::new(3.0, 0.0, 0.0)))
            .await;
        tokio::time::sleep(Duration::from_millis(50)).await;

        let kinds: Vec<_> = agent.tasks().snapshot().iter().map(Task::kind).collect();
        assert_eq!(kinds.len(), 5);
        assert!(fixture.body.said("Coming Wiz"));

        runtime.shutdown().await;
    }
}
