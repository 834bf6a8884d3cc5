//! One agent: its collaborators, queue, limiter, controllers, and the
//! handlers that react to world events.

use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info, warn};

use wardens_config::{AgentEntry, AppConfig, limit_keys};
use wardens_core::{
    AgentEvent, AgentRecord, AttackMode, ClaimKind, Collaborators, ContainerSearch, DomainEvent,
    EntityId, EntityKind, EventBus, Persona, Position, Task, TaskKind, TeamMessage,
    TeamMessageKind,
};

use crate::combat::CombatController;
use crate::decision::{BundleSet, DecisionEngine, EvaluationReport};
use crate::navigation::Navigator;
use crate::queue::TaskBoard;
use crate::rate_limit::RateLimiter;

#[derive(Debug, Clone)]
struct AgentState {
    persona: Persona,
    previous_persona: Persona,
    home_point: Option<Position>,
    last_command_from: Option<String>,
    listening: bool,
    sleeping: bool,
    attack_mode: AttackMode,
    claimed_bed: Option<String>,
}

/// Point-in-time view for status output.
#[derive(Debug, Clone, Serialize)]
pub struct AgentSnapshot {
    pub name: String,
    pub persona: Persona,
    pub home_point: Option<Position>,
    pub current: String,
    pub pending: usize,
    pub blocked: bool,
}

pub struct Agent {
    name: String,
    collab: Collaborators,
    config: Arc<AppConfig>,
    tasks: TaskBoard,
    state: Mutex<AgentState>,
    limiter: Mutex<RateLimiter>,
    navigator: Arc<Navigator>,
    combat: Arc<CombatController>,
    engine: DecisionEngine,
    bundles: BundleSet,
    retaliating: Arc<AtomicBool>,
    event_bus: Option<Arc<EventBus>>,
}

/// Builds an [`Agent`].
pub struct AgentBuilder {
    name: String,
    collab: Collaborators,
    config: Arc<AppConfig>,
    persona: Persona,
    home_point: Option<Position>,
    seed: Option<u64>,
    bundles: Option<BundleSet>,
    event_bus: Option<Arc<EventBus>>,
}

impl AgentBuilder {
    pub fn with_persona(mut self, persona: Persona) -> Self {
        self.persona = persona;
        self
    }

    pub fn with_home(mut self, home: Position) -> Self {
        self.home_point = Some(home);
        self
    }

    /// Seed every random choice the agent makes.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_bundles(mut self, bundles: BundleSet) -> Self {
        self.bundles = Some(bundles);
        self
    }

    pub fn with_event_bus(mut self, bus: Arc<EventBus>) -> Self {
        self.event_bus = Some(bus);
        self
    }

    pub fn build(self) -> Agent {
        let mut navigator = Navigator::new(
            self.name.clone(),
            self.collab.motion.clone(),
            self.collab.world.clone(),
            self.config.navigation.clone(),
        );
        if let Some(seed) = self.seed {
            navigator = navigator.with_seed(seed);
        }
        if let Some(bus) = &self.event_bus {
            navigator = navigator.with_event_bus(Arc::clone(bus));
        }
        let navigator = Arc::new(navigator);

        let combat = Arc::new(CombatController::new(
            self.name.clone(),
            self.collab.clone(),
            Arc::clone(&navigator),
            self.config.combat.clone(),
        ));

        let engine = match self.seed {
            Some(seed) => DecisionEngine::with_seed(seed),
            None => DecisionEngine::new(),
        };

        Agent {
            state: Mutex::new(AgentState {
                persona: self.persona,
                previous_persona: Persona::None,
                home_point: self.home_point,
                last_command_from: None,
                listening: false,
                sleeping: false,
                attack_mode: AttackMode::Normal,
                claimed_bed: None,
            }),
            limiter: Mutex::new(RateLimiter::new(self.config.rate_limits.clone())),
            name: self.name,
            collab: self.collab,
            config: self.config,
            tasks: TaskBoard::new(),
            navigator,
            combat,
            engine,
            bundles: self.bundles.unwrap_or_default(),
            retaliating: Arc::new(AtomicBool::new(false)),
            event_bus: self.event_bus,
        }
    }
}

/// Clears the retaliation flag when the detached attack ends, however it ends.
struct RetaliationGuard(Arc<AtomicBool>);

impl Drop for RetaliationGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl Agent {
    pub fn builder(
        name: impl Into<String>,
        collab: Collaborators,
        config: Arc<AppConfig>,
    ) -> AgentBuilder {
        AgentBuilder {
            name: name.into(),
            collab,
            config,
            persona: Persona::None,
            home_point: None,
            seed: None,
            bundles: None,
            event_bus: None,
        }
    }

    /// Builder for one `[[agents]]` roster entry: its persona (falling back
    /// to the configured default) and its home when one is set.
    pub fn from_entry(
        entry: &AgentEntry,
        collab: Collaborators,
        config: Arc<AppConfig>,
    ) -> AgentBuilder {
        let persona = config.persona_for(entry);
        let builder = Self::builder(entry.name.clone(), collab, config).with_persona(persona);
        match entry.home {
            Some(home) => builder.with_home(home),
            None => builder,
        }
    }

    fn state(&self) -> MutexGuard<'_, AgentState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // ── Accessors ──────────────────────────────────────────────────────────

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn tasks(&self) -> &TaskBoard {
        &self.tasks
    }

    pub fn collab(&self) -> &Collaborators {
        &self.collab
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn navigator(&self) -> &Navigator {
        &self.navigator
    }

    pub fn combat(&self) -> &CombatController {
        &self.combat
    }

    pub fn engine(&self) -> &DecisionEngine {
        &self.engine
    }

    pub fn bundles(&self) -> &BundleSet {
        &self.bundles
    }

    pub fn position(&self) -> Position {
        self.collab.motion.current_position()
    }

    // ── Persona and home ───────────────────────────────────────────────────

    pub fn persona(&self) -> Persona {
        self.state().persona
    }

    /// Switch persona. Leaving the follower persona makes the current spot home.
    pub fn set_persona(&self, persona: Persona) {
        let leaving_follower = {
            let mut state = self.state();
            let leaving = state.persona == Persona::Follower && persona != Persona::Follower;
            state.previous_persona = state.persona;
            state.persona = persona;
            leaving
        };
        if leaving_follower {
            self.set_home(None);
        }
        info!(agent = %self.name, persona = %persona, "Persona changed");
    }

    /// Go back to the persona held before the last change.
    pub fn restore_previous_persona(&self) {
        let previous = self.state().previous_persona;
        self.set_persona(previous);
    }

    /// Follow `username` until told otherwise.
    pub fn follow(&self, username: impl Into<String>) {
        self.state().last_command_from = Some(username.into());
        self.set_persona(Persona::Follower);
    }

    pub fn last_command_from(&self) -> Option<String> {
        self.state().last_command_from.clone()
    }

    pub fn set_last_command_from(&self, username: impl Into<String>) {
        self.state().last_command_from = Some(username.into());
    }

    /// Set home to `position`, or to where the agent stands.
    pub fn set_home(&self, position: Option<Position>) {
        let home = position.unwrap_or_else(|| self.position());
        self.state().home_point = Some(home);
        debug!(agent = %self.name, home = %home, "Home point set");
    }

    pub fn home_point(&self) -> Option<Position> {
        self.state().home_point
    }

    /// Distance from home to the agent. Zero when no home is known.
    pub fn distance_from_home(&self) -> f64 {
        self.distance_from_home_to(self.position())
    }

    pub fn distance_from_home_to(&self, position: Position) -> f64 {
        self.home_point()
            .map_or(0.0, |home| home.distance_to(&position))
    }

    pub fn record(&self) -> AgentRecord {
        let state = self.state();
        AgentRecord {
            home_point: state.home_point,
            persona: state.persona,
        }
    }

    pub fn restore(&self, record: AgentRecord) {
        let mut state = self.state();
        state.home_point = record.home_point;
        state.persona = record.persona;
    }

    // ── Flags ──────────────────────────────────────────────────────────────

    pub fn attack_mode(&self) -> AttackMode {
        self.state().attack_mode
    }

    pub fn set_attack_mode(&self, mode: AttackMode) {
        self.state().attack_mode = mode;
    }

    /// Waiting for a reply in a multi-turn dialogue.
    pub fn set_listening(&self, listening: bool) {
        self.state().listening = listening;
    }

    pub fn is_sleeping(&self) -> bool {
        self.state().sleeping
    }

    pub fn set_sleeping(&self, sleeping: bool) {
        self.state().sleeping = sleeping;
    }

    /// The scheduler skips task execution while this holds.
    pub fn is_blocked(&self) -> bool {
        let state = self.state();
        state.listening || state.sleeping
    }

    pub(crate) fn set_claimed_bed(&self, key: Option<String>) {
        self.state().claimed_bed = key;
    }

    fn release_bed(&self) {
        if let Some(key) = self.state().claimed_bed.take() {
            self.collab.team.release(ClaimKind::Bed, &key, &self.name);
        }
    }

    // ── Helpers ────────────────────────────────────────────────────────────

    /// Count a call against one of this agent's rate-limited keys.
    pub fn try_call(&self, key: &str) -> bool {
        self.limiter
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .try_call(key, Some(&self.name))
    }

    pub fn chat(&self, text: &str) {
        if self.config.behavior.chatty {
            self.collab.body.chat(text);
        }
    }

    pub fn publish(&self, event: DomainEvent) {
        if let Some(bus) = &self.event_bus {
            bus.publish(event);
        }
    }

    pub fn snapshot(&self) -> AgentSnapshot {
        let state = self.state().clone();
        AgentSnapshot {
            name: self.name.clone(),
            persona: state.persona,
            home_point: state.home_point,
            current: self.tasks.describe_current(),
            pending: self.tasks.len(),
            blocked: state.listening || state.sleeping,
        }
    }

    /// Run the persona bundle, then the standard bundle.
    pub async fn decide(&self) -> EvaluationReport {
        let persona = self.persona();
        let mut report = self
            .engine
            .evaluate(self, self.bundles.for_persona(persona))
            .await;
        report.merge(self.engine.evaluate(self, self.bundles.standard()).await);
        report
    }

    /// Start point-blank retaliation on a detached task. Only one runs at a time.
    pub fn retaliate(&self, aggressor: EntityId) -> bool {
        if self.retaliating.swap(true, Ordering::SeqCst) {
            return false;
        }
        let guard = RetaliationGuard(Arc::clone(&self.retaliating));
        let combat = Arc::clone(&self.combat);
        let mode = self.attack_mode();
        let name = self.name.clone();
        tokio::spawn(async move {
            let _guard = guard;
            let outcome = combat.attack_wildly(aggressor, mode).await;
            debug!(agent = %name, ?outcome, "Retaliation ended");
        });
        true
    }

    // ── World events ───────────────────────────────────────────────────────

    pub async fn handle_event(&self, event: AgentEvent) {
        match event {
            AgentEvent::Spawned => {
                if self.home_point().is_none() {
                    self.set_home(None);
                }
            }
            AgentEvent::Damaged { attacker } => self.on_damaged(attacker).await,
            AgentEvent::Died { position } => {
                info!(agent = %self.name, at = %position, "Died");
                self.state().claimed_bed = None;
                self.collab.team.release_all(&self.name);
                self.tasks.drop_all_tasks();
                self.tasks.add_task(Task::visit(position), true);
                self.tasks.block_tasks_for(self.config.behavior.death_block());
            }
            AgentEvent::Respawned => {
                self.tasks.add_tasks(
                    [
                        Task::Return,
                        Task::collect(),
                        ContainerSearch::withdrawing(vec![]).multiple().into(),
                    ],
                    false,
                );
            }
            AgentEvent::FellAsleep => self.set_sleeping(true),
            AgentEvent::Woke => {
                self.set_sleeping(false);
                self.release_bed();
                self.tasks.drop_all_tasks();
                self.tasks.add_task(Task::Return, false);
            }
            AgentEvent::ItemCollected => {
                let reserve = self.config.behavior.inventory_reserve;
                if self.collab.inventory.empty_slots() < reserve
                    && !self.tasks.has_task(TaskKind::FindContainer)
                {
                    self.tasks
                        .add_task(ContainerSearch::depositing().into(), false);
                }
            }
            AgentEvent::Team(message) => self.on_team_message(message),
        }
    }

    async fn on_damaged(&self, attacker: Option<EntityId>) {
        let melee_range = self.config.combat.melee_range;
        let here = self.position();
        let world = &self.collab.world;

        let threat = attacker
            .and_then(|id| world.entity(id))
            .filter(|e| e.kind == EntityKind::Hostile)
            .or_else(|| world.nearest_hostile(melee_range, &|_: &wardens_core::Entity| true))
            .filter(|e| here.distance_to(&e.position) <= melee_range);

        match threat {
            Some(mob) if !self.collab.body.is_using_item() => {
                self.retaliate(mob.id);
                return;
            }
            _ if self.tasks.first_task_is(TaskKind::Hunt) => return,
            _ => self.tasks.add_task(Task::hunt(), false),
        }

        let health = self.collab.body.health();
        if health < self.config.behavior.low_health && self.try_call(limit_keys::DEMAND_HELP) {
            warn!(agent = %self.name, health, "Low health, calling for help");
            self.tasks.add_tasks([Task::Return, Task::Eat], false);
            self.chat("help!");
            self.collab
                .team
                .broadcast(TeamMessage::help(self.name.clone(), here))
                .await;
        }
    }

    fn on_team_message(&self, message: TeamMessage) {
        if message.sender == self.name {
            return;
        }
        let distance = self.position().distance_to(&message.sender_position);
        if distance > self.config.team.proximity {
            debug!(agent = %self.name, sender = %message.sender, distance, "Ignoring distant teammate");
            return;
        }
        match message.kind {
            TeamMessageKind::Help => {
                self.tasks.add_tasks(
                    [
                        Task::come(message.sender.clone()),
                        Task::Hunt {
                            target: None,
                            force_melee: true,
                            verbose: false,
                        },
                    ],
                    false,
                );
                self.chat(&format!("Coming {}", message.sender));
                info!(agent = %self.name, sender = %message.sender, "Answering call for help");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::Fixture;
    use std::time::Duration;

    fn agent(fixture: &Fixture) -> Agent {
        Agent::builder("Kazuma", fixture.collaborators(), Arc::new(AppConfig::default()))
            .with_seed(11)
            .with_home(Position::new(0.0, 64.0, 0.0))
            .build()
    }

    #[test]
    fn leaving_follower_sets_new_home() {
        let fixture = Fixture::at(Position::new(40.0, 64.0, 0.0));
        let agent = agent(&fixture);
        agent.follow("alex");
        assert_eq!(agent.persona(), Persona::Follower);
        assert_eq!(agent.last_command_from().as_deref(), Some("alex"));

        agent.set_persona(Persona::Guard);
        assert_eq!(agent.home_point(), Some(Position::new(40.0, 64.0, 0.0)));

        agent.restore_previous_persona();
        assert_eq!(agent.persona(), Persona::Follower);
    }

    #[test]
    fn record_roundtrip() {
        let fixture = Fixture::at(Position::default());
        let agent = agent(&fixture);
        agent.set_persona(Persona::Farmer);
        let record = agent.record();

        let other = Agent::builder("Miko", fixture.collaborators(), Arc::new(AppConfig::default()))
            .build();
        other.restore(record);
        assert_eq!(other.persona(), Persona::Farmer);
        assert_eq!(other.home_point(), Some(Position::new(0.0, 64.0, 0.0)));
    }

    #[test]
    fn distance_from_home_is_zero_without_home() {
        let fixture = Fixture::at(Position::new(50.0, 64.0, 0.0));
        let agent = Agent::builder("Sein", fixture.collaborators(), Arc::new(AppConfig::default()))
            .build();
        assert_eq!(agent.distance_from_home(), 0.0);
    }

    #[tokio::test(start_paused = true)]
    async fn death_blocks_queue_and_returns_to_corpse() {
        let fixture = Fixture::at(Position::default());
        let agent = agent(&fixture);
        agent.tasks().add_tasks([Task::Eat, Task::collect()], false);

        let corpse = Position::new(12.0, 60.0, 3.0);
        agent
            .handle_event(AgentEvent::Died { position: corpse })
            .await;

        assert_eq!(agent.tasks().snapshot(), vec![Task::visit(corpse)]);
        assert_eq!(agent.tasks().next_task(), None);

        tokio::time::advance(Duration::from_millis(5001)).await;
        assert_eq!(agent.tasks().next_task(), Some(Task::visit(corpse)));
    }

    #[test]
    fn roster_entry_sets_persona_and_home() {
        let fixture = Fixture::at(Position::new(9.0, 64.0, 9.0));
        let config = Arc::new(AppConfig {
            default_persona: Persona::Farmer,
            ..AppConfig::default()
        });
        let post = Position::new(-20.0, 70.0, 4.0);

        let guard = Agent::from_entry(
            &AgentEntry {
                name: "Luna".into(),
                persona: Some(Persona::Guard),
                home: Some(post),
            },
            fixture.collaborators(),
            Arc::clone(&config),
        )
        .build();
        assert_eq!(guard.name(), "Luna");
        assert_eq!(guard.persona(), Persona::Guard);
        assert_eq!(guard.home_point(), Some(post));

        let farmer = Agent::from_entry(
            &AgentEntry {
                name: "Yunyun".into(),
                persona: None,
                home: None,
            },
            fixture.collaborators(),
            config,
        )
        .build();
        assert_eq!(farmer.persona(), Persona::Farmer);
        assert_eq!(farmer.home_point(), None);
    }

    #[tokio::test]
    async fn death_gives_up_every_claim() {
        let fixture = Fixture::at(Position::default());
        let agent = agent(&fixture);
        let claims = fixture.team.claims();
        assert!(claims.claim(ClaimKind::Bed, "4,64,0", agent.name()));
        assert!(claims.claim(ClaimKind::Bed, "9,64,0", agent.name()));
        agent.set_claimed_bed(Some("4,64,0".into()));

        agent
            .handle_event(AgentEvent::Died {
                position: Position::default(),
            })
            .await;

        assert!(!claims.is_claimed(ClaimKind::Bed, "4,64,0", "Aqua"));
        assert!(!claims.is_claimed(ClaimKind::Bed, "9,64,0", "Aqua"));
    }

    #[tokio::test]
    async fn respawn_queues_recovery_in_order() {
        let fixture = Fixture::at(Position::default());
        let agent = agent(&fixture);
        agent.handle_event(AgentEvent::Respawned).await;

        let kinds: Vec<_> = agent.tasks().snapshot().iter().map(Task::kind).collect();
        assert_eq!(
            kinds,
            vec![TaskKind::Return, TaskKind::Collect, TaskKind::FindContainer]
        );
    }

    #[tokio::test]
    async fn waking_drops_everything_and_returns() {
        let fixture = Fixture::at(Position::default());
        let agent = agent(&fixture);
        agent.handle_event(AgentEvent::FellAsleep).await;
        assert!(agent.is_blocked());
        agent.tasks().add_task(Task::Eat, false);

        agent.handle_event(AgentEvent::Woke).await;
        assert!(!agent.is_blocked());
        assert_eq!(agent.tasks().snapshot(), vec![Task::Return]);
    }

    #[tokio::test]
    async fn spawn_sets_missing_home() {
        let fixture = Fixture::at(Position::new(5.0, 70.0, 5.0));
        let agent = Agent::builder("Gilbert", fixture.collaborators(), Arc::new(AppConfig::default()))
            .build();
        agent.handle_event(AgentEvent::Spawned).await;
        assert_eq!(agent.home_point(), Some(Position::new(5.0, 70.0, 5.0)));
    }

    #[tokio::test]
    async fn damage_without_adjacent_threat_queues_one_hunt() {
        let fixture = Fixture::at(Position::default());
        let agent = agent(&fixture);

        agent.handle_event(AgentEvent::Damaged { attacker: None }).await;
        agent.handle_event(AgentEvent::Damaged { attacker: None }).await;

        assert_eq!(agent.tasks().snapshot(), vec![Task::hunt()]);
    }

    #[tokio::test(start_paused = true)]
    async fn adjacent_attacker_triggers_retaliation() {
        let fixture = Fixture::at(Position::new(0.0, 64.0, 0.0));
        let zombie = fixture.world.add_hostile(1, Position::new(1.0, 64.0, 0.0));
        fixture.body.dies_after(zombie, 1);
        let agent = agent(&fixture);

        agent
            .handle_event(AgentEvent::Damaged {
                attacker: Some(zombie),
            })
            .await;
        assert!(agent.tasks().is_empty());
        // A second hit while retaliating does not start another loop
        assert!(!agent.retaliate(zombie));

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(fixture.body.attack_count(), 1);
        assert!(agent.retaliate(zombie));
    }

    #[tokio::test(start_paused = true)]
    async fn low_health_calls_for_help_once_per_window() {
        let fixture = Fixture::at(Position::default());
        let mut listener = fixture.team.subscribe();
        fixture.body.set_health(4.0);
        let agent = agent(&fixture);

        agent.handle_event(AgentEvent::Damaged { attacker: None }).await;
        let message = listener.recv().await.unwrap();
        assert_eq!(message.sender, "Kazuma");
        assert!(fixture.body.said("help!"));
        let kinds: Vec<_> = agent.tasks().snapshot().iter().map(Task::kind).collect();
        assert_eq!(kinds, vec![TaskKind::Return, TaskKind::Eat, TaskKind::Hunt]);

        agent.tasks().drop_all_tasks();
        agent.handle_event(AgentEvent::Damaged { attacker: None }).await;
        assert!(listener.try_recv().is_err());

        tokio::time::advance(Duration::from_millis(30_001)).await;
        agent.tasks().drop_all_tasks();
        agent.handle_event(AgentEvent::Damaged { attacker: None }).await;
        assert!(listener.try_recv().is_ok());
    }

    #[tokio::test]
    async fn nearby_teammate_help_is_answered() {
        let fixture = Fixture::at(Position::new(0.0, 64.0, 0.0));
        let agent = agent(&fixture);
        let message = TeamMessage::help("Miko", Position::new(10.0, 64.0, 0.0));

        agent.handle_event(AgentEvent::Team(message)).await;

        let pending = agent.tasks().snapshot();
        assert_eq!(pending[0], Task::come("Miko"));
        assert!(matches!(pending[1], Task::Hunt { force_melee: true, .. }));
        assert!(fixture.body.said("Coming Miko"));
    }

    #[tokio::test]
    async fn distant_or_own_help_is_ignored() {
        let fixture = Fixture::at(Position::new(0.0, 64.0, 0.0));
        let agent = agent(&fixture);

        let far = TeamMessage::help("Miko", Position::new(31.0, 64.0, 0.0));
        agent.handle_event(AgentEvent::Team(far)).await;
        let own = TeamMessage::help("Kazuma", Position::new(1.0, 64.0, 0.0));
        agent.handle_event(AgentEvent::Team(own)).await;

        assert!(agent.tasks().is_empty());
    }

    #[tokio::test]
    async fn full_inventory_after_pickup_queues_deposit() {
        let fixture = Fixture::at(Position::default());
        fixture.inventory.set_empty_slots(2);
        let agent = agent(&fixture);

        agent.handle_event(AgentEvent::ItemCollected).await;
        agent.handle_event(AgentEvent::ItemCollected).await;

        assert_eq!(
            agent.tasks().snapshot(),
            vec![Task::FindContainer(ContainerSearch::depositing())]
        );
    }
}
