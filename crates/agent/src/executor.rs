//! Task executor: one handler per task kind.
//!
//! Handlers share the signature `async fn(&Agent, ..) -> Result<()>`. A
//! failing handler is logged and swallowed; the current slot is cleared by a
//! drop guard whether the handler returns, errors, panics, or is cancelled.

use chrono::Utc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use wardens_core::{
    ActionError, ClaimKind, ContainerSearch, DomainEvent, EntityId, Position, Result,
    SleepRefusal, Task, TaskKind,
};

use crate::agent::Agent;
use crate::combat::{AttackRequest, CombatOutcome};
use crate::items;
use crate::navigation::NavRequest;

/// Beds of every color.
pub const BED_BLOCKS: [&str; 16] = [
    "white_bed",
    "orange_bed",
    "magenta_bed",
    "light_blue_bed",
    "yellow_bed",
    "lime_bed",
    "pink_bed",
    "gray_bed",
    "light_gray_bed",
    "cyan_bed",
    "purple_bed",
    "blue_bed",
    "brown_bed",
    "green_bed",
    "red_bed",
    "black_bed",
];

/// Further attempts after a refusal that is not about monsters or time.
const SLEEP_RETRIES: u32 = 5;
const SLEEP_RETRY_DELAY: Duration = Duration::from_secs(1);
const EAT_DURATION: Duration = Duration::from_millis(2000);
const CONTAINER_SCAN_MAX: usize = 64;
const FULL_FOOD: f32 = 20.0;

/// Run `task` to completion. The task should already be in the current slot.
pub async fn perform_task(agent: &Agent, task: Task) {
    let _finish = agent.tasks().finish_guard();
    let kind = task.kind();
    let started = Instant::now();

    info!(agent = %agent.name(), task = %kind, "Task started");
    agent.publish(DomainEvent::TaskStarted {
        agent: agent.name().to_string(),
        task: kind,
        timestamp: Utc::now(),
    });

    let result = match task {
        Task::Come {
            username,
            one_time,
            set_home,
        } => come(agent, &username, one_time, set_home).await,
        Task::Hunt {
            target,
            force_melee,
            verbose,
        } => hunt(agent, target, force_melee, verbose).await,
        Task::Return => return_home(agent).await,
        Task::Visit { position } => visit(agent, position).await,
        Task::Collect { verbose } => collect(agent, verbose).await,
        Task::FindContainer(search) => find_container(agent, search).await,
        Task::Withdraw {
            position,
            items,
            verbose,
        } => withdraw(agent, position, &items, verbose).await,
        Task::Deposit { position, verbose } => deposit(agent, position, verbose).await,
        Task::SetHome => set_home(agent).await,
        Task::Sleep => sleep(agent).await,
        Task::Eat => eat(agent).await,
        Task::PersonaTask { description } => persona_task(agent, &description).await,
    };

    let success = result.is_ok();
    if let Err(e) = &result {
        warn!(agent = %agent.name(), task = %kind, "Task failed: {e}");
        agent.publish(DomainEvent::ErrorOccurred {
            agent: agent.name().to_string(),
            context: kind.to_string(),
            error_message: e.to_string(),
            timestamp: Utc::now(),
        });
    }

    agent.publish(DomainEvent::TaskFinished {
        agent: agent.name().to_string(),
        task: kind,
        success,
        duration_ms: started.elapsed().as_millis() as u64,
        timestamp: Utc::now(),
    });
}

// ── Movement ───────────────────────────────────────────────────────────────

async fn come(agent: &Agent, username: &str, one_time: bool, set_home: bool) -> Result<()> {
    if one_time {
        agent.chat(&format!("Coming, {username}"));
    }
    if agent.navigator().to_player(username).await.is_none() {
        agent.chat("I have nobody to follow.");
    }
    if set_home {
        agent.set_home(None);
    }
    Ok(())
}

async fn return_home(agent: &Agent) -> Result<()> {
    let Some(home) = agent.home_point() else {
        debug!(agent = %agent.name(), "No home to return to");
        return Ok(());
    };
    agent.navigator().to_coordinate(NavRequest::to(home)).await;
    Ok(())
}

async fn visit(agent: &Agent, position: Position) -> Result<()> {
    if !agent.navigator().can_reach(position) {
        agent.chat("I cannot get there");
        return Ok(());
    }
    agent.navigator().to_coordinate(NavRequest::to(position)).await;
    Ok(())
}

async fn set_home(agent: &Agent) -> Result<()> {
    agent.set_home(None);
    Ok(())
}

async fn persona_task(agent: &Agent, description: &str) -> Result<()> {
    debug!(agent = %agent.name(), description, "Persona task marker");
    Ok(())
}

// ── Combat ─────────────────────────────────────────────────────────────────

async fn hunt(
    agent: &Agent,
    target: Option<EntityId>,
    force_melee: bool,
    verbose: bool,
) -> Result<()> {
    let request = AttackRequest {
        target,
        range: Some(agent.config().combat.range),
        force_melee,
        mode: agent.attack_mode(),
    };
    let outcome = agent.combat().attack_nearest(request).await;
    debug!(agent = %agent.name(), ?outcome, "Hunt ended");

    if verbose {
        let line = match outcome {
            CombatOutcome::NoTarget => "Looks like nothing nearby",
            CombatOutcome::Defeated { .. } => "All too easy",
            CombatOutcome::Disengaged { .. } => "It got away",
            CombatOutcome::Unreachable { .. } => "I can't reach it",
        };
        agent.chat(line);
    }
    Ok(())
}

// ── Items ──────────────────────────────────────────────────────────────────

async fn collect(agent: &Agent, verbose: bool) -> Result<()> {
    let drops = agent
        .collab()
        .world
        .nearby_item_drops(agent.config().combat.range);
    if drops.is_empty() {
        if verbose {
            agent.chat("Nothing to collect");
        }
        return Ok(());
    }
    agent
        .tasks()
        .add_tasks(drops.iter().map(|drop| Task::visit(drop.position)), false);
    Ok(())
}

async fn find_container(agent: &Agent, search: ContainerSearch) -> Result<()> {
    let range = search.range.unwrap_or(agent.config().combat.range);
    let found = agent
        .collab()
        .world
        .find_blocks_by_name(&search.names(), range, CONTAINER_SCAN_MAX)
        .into_iter()
        .find(|block| !search.visited.contains(&block.position.key()));

    let Some(block) = found else {
        if search.verbose && search.visited.is_empty() {
            agent.chat("I see no chests nearby");
        }
        return Ok(());
    };

    agent
        .navigator()
        .to_coordinate(
            NavRequest::to(block.position)
                .near(1.0)
                .ignore_y(search.ignore_y),
        )
        .await;

    let mut next = Vec::new();
    if search.deposit {
        next.push(Task::Deposit {
            position: block.position,
            verbose: search.verbose,
        });
    }
    if let Some(extra) = &search.withdraw {
        next.push(Task::Withdraw {
            position: block.position,
            items: extra.clone(),
            verbose: search.verbose,
        });
        if search.multiple {
            next.push(search.continued_after(&block.position).into());
        }
    }
    agent.tasks().add_tasks(next, false);
    Ok(())
}

async fn deposit(agent: &Agent, position: Position, verbose: bool) -> Result<()> {
    let collab = agent.collab();
    let stored = items::deposit_items(
        collab.inventory.as_ref(),
        collab.motion.as_ref(),
        position,
        agent.config().behavior.container_settle(),
    )
    .await?;
    if verbose {
        agent.chat(&format!("I stored {stored} items"));
    }
    Ok(())
}

async fn withdraw(agent: &Agent, position: Position, extra: &[String], verbose: bool) -> Result<()> {
    let collab = agent.collab();
    let taken = items::withdraw_items(
        collab.inventory.as_ref(),
        collab.motion.as_ref(),
        position,
        extra,
        &agent.config().behavior,
    )
    .await?;
    if verbose {
        agent.chat(&format!("I got {taken} items"));
    }
    Ok(())
}

async fn eat(agent: &Agent) -> Result<()> {
    let collab = agent.collab();
    let Some(food) = items::find_food(collab.inventory.as_ref()) else {
        debug!(agent = %agent.name(), "Nothing to eat");
        return Ok(());
    };
    if collab.body.food() >= FULL_FOOD {
        return Ok(());
    }

    collab.inventory.equip(&food).await?;
    collab.body.activate_item();
    tokio::time::sleep(EAT_DURATION).await;
    collab.body.deactivate_item();
    Ok(())
}

// ── Sleep ──────────────────────────────────────────────────────────────────

async fn sleep(agent: &Agent) -> Result<()> {
    agent.tasks().remove_tasks_of_type(TaskKind::Sleep);

    let collab = agent.collab();
    let beds: Vec<String> = BED_BLOCKS.iter().map(|b| b.to_string()).collect();

    for attempt in 0..=SLEEP_RETRIES {
        if collab.body.is_sleeping() {
            return Ok(());
        }

        let bed = collab
            .world
            .find_blocks_by_name(&beds, agent.config().behavior.bed_search_range, beds.len())
            .into_iter()
            .find(|bed| {
                !bed.occupied
                    && !collab
                        .team
                        .is_claimed(ClaimKind::Bed, &bed.position.key(), agent.name())
            });
        let Some(bed) = bed else {
            agent.chat("No bed nearby...");
            return Ok(());
        };

        let key = bed.position.key();
        if !collab.team.claim(ClaimKind::Bed, &key, agent.name()) {
            continue;
        }
        agent.set_claimed_bed(Some(key.clone()));
        let release = || {
            collab.team.release(ClaimKind::Bed, &key, agent.name());
            agent.set_claimed_bed(None);
        };

        let reached = agent
            .navigator()
            .to_coordinate(NavRequest::to(bed.position).near(1.0))
            .await;
        if !reached || collab.world.is_day() {
            release();
            return Ok(());
        }

        match collab.body.sleep_in(&bed).await {
            Ok(()) => {
                agent.set_sleeping(true);
                info!(agent = %agent.name(), bed = %bed.position, "Sleeping");
                return Ok(());
            }
            Err(ActionError::SleepRefused(SleepRefusal::MonstersNearby)) => {
                release();
                agent
                    .combat()
                    .attack_nearest(
                        AttackRequest::nearest(agent.attack_mode())
                            .range(agent.config().combat.range)
                            .force_melee(true),
                    )
                    .await;
                return Ok(());
            }
            Err(ActionError::SleepRefused(SleepRefusal::NotSleeping)) => {
                release();
                collab.body.wake().await?;
                return Ok(());
            }
            Err(e) => {
                release();
                debug!(agent = %agent.name(), attempt, "Sleep refused: {e}");
                tokio::time::sleep(SLEEP_RETRY_DELAY).await;
            }
        }
    }
    Ok(())
}
