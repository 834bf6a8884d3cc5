//! The stock decision modules.

use async_trait::async_trait;
use std::time::Duration;

use wardens_config::limit_keys;
use wardens_core::{ContainerSearch, Entity, Result, Task, TaskKind};

use super::engine::{DecisionModule, EvalContext};
use crate::combat::AttackRequest;
use crate::items::{self, WeaponKind};
use crate::navigation::NavRequest;

/// Hostiles this close are fought outside the queue.
const ADJACENT_RANGE: f64 = 5.0;
/// Field work walks over first when the block is farther than this.
const FIELD_REACH: f64 = 5.0;
const MATURE_WHEAT: u8 = 7;
const FIELD_SCAN_MAX: usize = 64;

async fn approach_field(ctx: &EvalContext<'_>, target: wardens_core::Position) {
    let agent = ctx.agent;
    if agent.position().distance_to(&target) > FIELD_REACH {
        agent
            .navigator()
            .to_coordinate(NavRequest::to(target).near(2.0))
            .await;
    }
}

// ── Standard ───────────────────────────────────────────────────────────────

pub struct AttackAdjacentEnemies;

#[async_trait]
impl DecisionModule for AttackAdjacentEnemies {
    fn name(&self) -> &str {
        "Attack adjacent enemies"
    }

    fn chance(&self) -> f64 {
        0.6
    }

    async fn criteria(&self, ctx: &mut EvalContext<'_>) -> Result<bool> {
        if ctx.agent.tasks().has_task(TaskKind::Hunt) {
            return Ok(false);
        }
        ctx.target_enemy = ctx.agent.combat().nearest_reachable_hostile(ADJACENT_RANGE);
        Ok(ctx.target_enemy.is_some())
    }

    async fn action(&self, ctx: &EvalContext<'_>) -> Result<()> {
        if let Some(enemy) = &ctx.target_enemy {
            if ctx.agent.tasks().len() <= 1 {
                ctx.agent.retaliate(enemy.id);
            }
        }
        Ok(())
    }
}

pub struct TrySleeping;

#[async_trait]
impl DecisionModule for TrySleeping {
    fn name(&self) -> &str {
        "Try sleeping"
    }

    async fn criteria(&self, ctx: &mut EvalContext<'_>) -> Result<bool> {
        let agent = ctx.agent;
        Ok(!agent.collab().world.is_day()
            && agent.try_call(limit_keys::FIND_BED)
            && !agent.collab().body.is_sleeping()
            && !agent.is_sleeping())
    }

    async fn action(&self, ctx: &EvalContext<'_>) -> Result<()> {
        let agent = ctx.agent;
        let guard_range = agent.config().behavior.home_range / 2.0;
        let threat = agent.combat().nearest_reachable_hostile(guard_range);

        match threat {
            Some(enemy) if agent.tasks().len() <= 1 => {
                agent
                    .combat()
                    .attack_nearest(AttackRequest::target(enemy.id, agent.attack_mode()))
                    .await;
            }
            _ => {
                let delay = Duration::from_secs(agent.engine().random_between(1, 60));
                agent.tasks().add_task_after(Task::Sleep, delay);
            }
        }
        Ok(())
    }
}

pub struct ForceEat;

#[async_trait]
impl DecisionModule for ForceEat {
    fn name(&self) -> &str {
        "Eat"
    }

    fn chance(&self) -> f64 {
        0.5
    }

    async fn criteria(&self, ctx: &mut EvalContext<'_>) -> Result<bool> {
        let agent = ctx.agent;
        Ok(agent.collab().body.food() < agent.config().behavior.hunger_threshold)
    }

    async fn action(&self, ctx: &EvalContext<'_>) -> Result<()> {
        ctx.agent.tasks().add_task(Task::Eat, false);
        Ok(())
    }
}

// ── Boredom ────────────────────────────────────────────────────────────────

pub struct LookAtSomething;

#[async_trait]
impl DecisionModule for LookAtSomething {
    fn name(&self) -> &str {
        "Look at something"
    }

    fn chance(&self) -> f64 {
        0.2
    }

    async fn action(&self, ctx: &EvalContext<'_>) -> Result<()> {
        let agent = ctx.agent;
        let floor = agent.position().y - 4.0;
        // Skip things buried below
        let candidates: Vec<Entity> = agent
            .collab()
            .world
            .entities()
            .into_iter()
            .filter(|e| e.position.y > floor)
            .collect();
        if let Some(index) = agent.engine().pick_index(candidates.len()) {
            agent.collab().motion.look_at(candidates[index].position);
        }
        Ok(())
    }
}

pub struct GoHome;

#[async_trait]
impl DecisionModule for GoHome {
    fn name(&self) -> &str {
        "Go home"
    }

    fn chance(&self) -> f64 {
        0.1
    }

    async fn criteria(&self, ctx: &mut EvalContext<'_>) -> Result<bool> {
        let agent = ctx.agent;
        Ok(ctx.distance_from_home > agent.config().behavior.wander_radius
            && agent.persona().returns_home())
    }

    async fn action(&self, ctx: &EvalContext<'_>) -> Result<()> {
        ctx.agent.tasks().add_task(Task::Return, false);
        Ok(())
    }
}

pub struct CheckStorage;

#[async_trait]
impl DecisionModule for CheckStorage {
    fn name(&self) -> &str {
        "Check storage"
    }

    fn chance(&self) -> f64 {
        0.05
    }

    async fn criteria(&self, ctx: &mut EvalContext<'_>) -> Result<bool> {
        Ok(ctx.agent.try_call(limit_keys::CHECK_STORAGE))
    }

    async fn action(&self, ctx: &EvalContext<'_>) -> Result<()> {
        let agent = ctx.agent;
        let here = agent.position();
        agent
            .tasks()
            .add_task(ContainerSearch::withdrawing(vec![]).multiple().into(), false);
        agent.tasks().add_task(Task::visit(here), true);
        Ok(())
    }
}

/// Enqueue a sweep for item drops.
pub struct CollectItems {
    name: &'static str,
    chance: f64,
}

impl CollectItems {
    /// Occasional pickup while idle.
    pub fn idle() -> Self {
        Self {
            name: "Collect items",
            chance: 0.05,
        }
    }

    /// A guard cleaning up after a fight.
    pub fn tidy_up() -> Self {
        Self {
            name: "Tidy up",
            chance: 1.0,
        }
    }
}

#[async_trait]
impl DecisionModule for CollectItems {
    fn name(&self) -> &str {
        self.name
    }

    fn chance(&self) -> f64 {
        self.chance
    }

    async fn action(&self, ctx: &EvalContext<'_>) -> Result<()> {
        ctx.agent.tasks().add_task(Task::collect(), false);
        Ok(())
    }
}

/// Wander over to the nearest block of one kind.
pub struct VisitBlock {
    name: String,
    block: String,
}

impl VisitBlock {
    pub fn new(block: impl Into<String>) -> Self {
        let block = block.into();
        Self {
            name: format!("Visit {block}"),
            block,
        }
    }
}

#[async_trait]
impl DecisionModule for VisitBlock {
    fn name(&self) -> &str {
        &self.name
    }

    fn chance(&self) -> f64 {
        0.03
    }

    async fn action(&self, ctx: &EvalContext<'_>) -> Result<()> {
        let search = ContainerSearch::visiting(vec![self.block.clone()]).ignoring_y();
        ctx.agent.tasks().add_task(search.into(), false);
        Ok(())
    }
}

// ── Farmer ─────────────────────────────────────────────────────────────────

pub struct HarvestField;

#[async_trait]
impl DecisionModule for HarvestField {
    fn name(&self) -> &str {
        "Harvest field"
    }

    async fn criteria(&self, ctx: &mut EvalContext<'_>) -> Result<bool> {
        let agent = ctx.agent;
        agent.collab().inventory.unequip_hand().await?;
        ctx.target_block = agent
            .collab()
            .world
            .find_blocks_by_name(
                &["wheat".to_string()],
                agent.config().combat.range,
                FIELD_SCAN_MAX,
            )
            .into_iter()
            .find(|block| block.age >= MATURE_WHEAT);
        Ok(ctx.target_block.is_some())
    }

    async fn action(&self, ctx: &EvalContext<'_>) -> Result<()> {
        let Some(crop) = &ctx.target_block else {
            return Ok(());
        };
        approach_field(ctx, crop.position).await;
        ctx.agent.collab().body.dig(crop).await?;
        Ok(())
    }
}

pub struct SowField;

#[async_trait]
impl DecisionModule for SowField {
    fn name(&self) -> &str {
        "Sow field"
    }

    async fn criteria(&self, ctx: &mut EvalContext<'_>) -> Result<bool> {
        let agent = ctx.agent;
        let Some(seeds) = items::item_named(agent.collab().inventory.as_ref(), "wheat_seeds")
        else {
            if agent.try_call(limit_keys::FIND_SEEDS) {
                let search = ContainerSearch::withdrawing(vec!["wheat_seeds".into()]).multiple();
                agent.tasks().add_task(search.into(), false);
            }
            return Ok(false);
        };
        ctx.target_item = Some(seeds);

        ctx.target_block = agent
            .collab()
            .world
            .find_blocks_by_name(
                &["farmland".to_string()],
                agent.config().combat.range,
                FIELD_SCAN_MAX,
            )
            .into_iter()
            .find(|block| block.clear_above);
        Ok(ctx.target_block.is_some())
    }

    async fn action(&self, ctx: &EvalContext<'_>) -> Result<()> {
        let (Some(farmland), Some(seeds)) = (&ctx.target_block, &ctx.target_item) else {
            return Ok(());
        };
        approach_field(ctx, farmland.position).await;
        let collab = ctx.agent.collab();
        collab.inventory.equip(seeds).await?;
        collab.body.place_on(farmland).await?;
        Ok(())
    }
}

pub struct DepositItems;

#[async_trait]
impl DecisionModule for DepositItems {
    fn name(&self) -> &str {
        "Deposit items"
    }

    async fn criteria(&self, ctx: &mut EvalContext<'_>) -> Result<bool> {
        let agent = ctx.agent;
        Ok(agent.collab().inventory.empty_slots() < agent.config().behavior.deposit_threshold)
    }

    async fn action(&self, ctx: &EvalContext<'_>) -> Result<()> {
        ctx.agent
            .tasks()
            .add_task(ContainerSearch::depositing().into(), false);
        Ok(())
    }
}

// ── Guard ──────────────────────────────────────────────────────────────────

pub struct UnarmedComplaint;

#[async_trait]
impl DecisionModule for UnarmedComplaint {
    fn name(&self) -> &str {
        "Unarmed complaint"
    }

    fn chance(&self) -> f64 {
        0.5
    }

    fn continues(&self) -> bool {
        true
    }

    async fn criteria(&self, ctx: &mut EvalContext<'_>) -> Result<bool> {
        let agent = ctx.agent;
        let inventory = agent.collab().inventory.as_ref();
        Ok(!items::has_weapon(inventory, WeaponKind::Melee)
            && agent.try_call(limit_keys::UNARMED_GUARD))
    }

    async fn action(&self, ctx: &EvalContext<'_>) -> Result<()> {
        ctx.agent.chat("I have no weapons but I am a guard");
        Ok(())
    }
}

pub struct DefendHome;

#[async_trait]
impl DecisionModule for DefendHome {
    fn name(&self) -> &str {
        "Defend home"
    }

    async fn criteria(&self, ctx: &mut EvalContext<'_>) -> Result<bool> {
        let agent = ctx.agent;
        if agent.tasks().has_task(TaskKind::Hunt) {
            return Ok(false);
        }
        let home_range = agent.config().behavior.home_range;
        ctx.target_enemy = agent
            .collab()
            .world
            .nearest_hostile(agent.config().combat.range, &|_: &Entity| true)
            .filter(|enemy| agent.distance_from_home_to(enemy.position) < home_range);
        Ok(ctx.target_enemy.is_some())
    }

    async fn action(&self, ctx: &EvalContext<'_>) -> Result<()> {
        if let Some(enemy) = &ctx.target_enemy {
            let agent = ctx.agent;
            agent
                .combat()
                .attack_nearest(AttackRequest::target(enemy.id, agent.attack_mode()))
                .await;
        }
        Ok(())
    }
}

pub struct ReturnToPost;

#[async_trait]
impl DecisionModule for ReturnToPost {
    fn name(&self) -> &str {
        "Return to post"
    }

    async fn criteria(&self, ctx: &mut EvalContext<'_>) -> Result<bool> {
        Ok(ctx.distance_from_home > ctx.agent.config().behavior.wander_radius)
    }

    async fn action(&self, ctx: &EvalContext<'_>) -> Result<()> {
        ctx.agent.chat("All done here");
        ctx.agent.tasks().add_task(Task::Return, false);
        Ok(())
    }
}

// ── Loot and follower ──────────────────────────────────────────────────────

pub struct LootDrops;

#[async_trait]
impl DecisionModule for LootDrops {
    fn name(&self) -> &str {
        "Loot drops"
    }

    async fn criteria(&self, ctx: &mut EvalContext<'_>) -> Result<bool> {
        let agent = ctx.agent;
        Ok(!agent
            .collab()
            .world
            .nearby_item_drops(agent.config().combat.range)
            .is_empty())
    }

    async fn action(&self, ctx: &EvalContext<'_>) -> Result<()> {
        let tasks = ctx.agent.tasks();
        tasks.add_task(Task::collect(), false);
        tasks.add_task(ContainerSearch::depositing().into(), true);
        Ok(())
    }
}

pub struct FollowLeader;

#[async_trait]
impl DecisionModule for FollowLeader {
    fn name(&self) -> &str {
        "Follow leader"
    }

    async fn criteria(&self, ctx: &mut EvalContext<'_>) -> Result<bool> {
        Ok(ctx.agent.last_command_from().is_some())
    }

    async fn action(&self, ctx: &EvalContext<'_>) -> Result<()> {
        if let Some(leader) = ctx.agent.last_command_from() {
            ctx.agent.tasks().add_task(Task::come(leader), false);
        }
        Ok(())
    }
}
