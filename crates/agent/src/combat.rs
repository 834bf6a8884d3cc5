//! Combat controller: target acquisition, melee-vs-ranged arbitration, and
//! the strike loops.
//!
//! Nothing in here fails loudly. Missing targets, weapons, or paths end an
//! engagement with a [`CombatOutcome`] the caller may report in chat.

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use wardens_config::CombatConfig;
use wardens_core::{AttackMode, Collaborators, Entity, EntityId};

use crate::items::{self, MELEE_TOOLS, WeaponKind};
use crate::navigation::{NavRequest, Navigator};

/// How to fight the current target this round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Engagement {
    Melee,
    Shoot,
    /// Walk into shooting range first.
    CloseThenShoot,
}

/// Everything arbitration looks at.
#[derive(Debug, Clone, Copy)]
pub struct EngagementInputs {
    pub distance: f64,
    pub force_melee: bool,
    pub has_ranged: bool,
    pub has_ammo: bool,
    pub mode: AttackMode,
    pub line_of_sight: bool,
}

/// Pick melee or ranged for one round.
///
/// Ranged needs a ranged weapon, ammunition, an attack mode that allows it,
/// and line of sight. Point-blank targets inside `min_shoot_distance` always
/// get melee.
pub fn arbitrate(inputs: &EngagementInputs, config: &CombatConfig) -> Engagement {
    if inputs.force_melee {
        return Engagement::Melee;
    }

    let ranged_eligible = inputs.has_ranged
        && inputs.has_ammo
        && inputs.mode.allows_ranged()
        && inputs.line_of_sight;
    if !ranged_eligible {
        return Engagement::Melee;
    }

    if inputs.distance >= config.shoot_range {
        Engagement::CloseThenShoot
    } else if inputs.distance < config.min_shoot_distance {
        Engagement::Melee
    } else {
        Engagement::Shoot
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CombatOutcome {
    NoTarget,
    /// The target is gone.
    Defeated { target: EntityId, rounds: u32 },
    /// Left pursuit range or the round budget ran out.
    Disengaged { target: EntityId, rounds: u32 },
    /// Could not get close enough to strike.
    Unreachable { target: EntityId },
}

/// Parameters for [`CombatController::attack_nearest`].
#[derive(Debug, Clone, Copy, Default)]
pub struct AttackRequest {
    /// Specific target; otherwise the nearest reachable hostile.
    pub target: Option<EntityId>,
    /// Acquisition range, capped by the configured range.
    pub range: Option<f64>,
    pub force_melee: bool,
    pub mode: AttackMode,
}

impl AttackRequest {
    pub fn nearest(mode: AttackMode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }

    pub fn target(id: EntityId, mode: AttackMode) -> Self {
        Self {
            target: Some(id),
            mode,
            ..Self::default()
        }
    }

    pub fn range(mut self, range: f64) -> Self {
        self.range = Some(range);
        self
    }

    pub fn force_melee(mut self, force_melee: bool) -> Self {
        self.force_melee = force_melee;
        self
    }
}

pub struct CombatController {
    agent: String,
    collab: Collaborators,
    navigator: Arc<Navigator>,
    config: CombatConfig,
}

impl CombatController {
    pub fn new(
        agent: impl Into<String>,
        collab: Collaborators,
        navigator: Arc<Navigator>,
        config: CombatConfig,
    ) -> Self {
        Self {
            agent: agent.into(),
            collab,
            navigator,
            config,
        }
    }

    pub fn config(&self) -> &CombatConfig {
        &self.config
    }

    /// Nearest hostile within `range` (capped at the configured range) that
    /// passes the reachability probe. Closer unreachable ones are skipped.
    pub fn nearest_reachable_hostile(&self, range: f64) -> Option<Entity> {
        let range = range.min(self.config.range);
        let motion = &self.collab.motion;
        self.collab
            .world
            .nearest_hostile(range, &|entity| motion.can_reach(entity.position))
    }

    fn engagement_for(&self, target: &Entity, force_melee: bool, mode: AttackMode) -> Engagement {
        let inventory = self.collab.inventory.as_ref();
        let here = self.collab.motion.current_position();
        arbitrate(
            &EngagementInputs {
                distance: here.distance_to(&target.position),
                force_melee,
                has_ranged: items::has_weapon(inventory, WeaponKind::Ranged),
                has_ammo: items::has_weapon(inventory, WeaponKind::Ammo),
                mode,
                line_of_sight: self.collab.world.line_of_sight(target.position),
            },
            &self.config,
        )
    }

    async fn equip_melee(&self) {
        if let Err(e) = items::equip_best_tool(self.collab.inventory.as_ref(), &MELEE_TOOLS).await
        {
            warn!(agent = %self.agent, "Could not equip melee weapon: {e}");
        }
    }

    fn strike(&self, target: &Entity) {
        self.collab.motion.look_at(target.position);
        self.collab.body.attack(target.id);
    }

    /// Fight until the target is gone, out of range, or the round budget is
    /// spent. Re-arbitrates every round.
    pub async fn attack_nearest(&self, request: AttackRequest) -> CombatOutcome {
        let acquired = match request.target {
            Some(id) => self.collab.world.entity(id),
            None => self.nearest_reachable_hostile(request.range.unwrap_or(self.config.range)),
        };
        let Some(mut target) = acquired else {
            return CombatOutcome::NoTarget;
        };

        debug!(agent = %self.agent, target = %target.id, name = %target.name, "Engaging");
        let approach_deviation = self.navigator.config().near_range;
        let mut rounds = 0u32;

        loop {
            let distance = self
                .collab
                .motion
                .current_position()
                .distance_to(&target.position);
            if distance > self.config.range {
                return CombatOutcome::Disengaged {
                    target: target.id,
                    rounds,
                };
            }

            match self.engagement_for(&target, request.force_melee, request.mode) {
                Engagement::CloseThenShoot => {
                    // Arrival is accepted inside twice the near range
                    let reached = self
                        .navigator
                        .to_coordinate(
                            NavRequest::to(target.position)
                                .deviation(approach_deviation)
                                .near(self.config.shoot_range / 2.0),
                        )
                        .await;
                    let Some(current) = self.collab.world.entity(target.id) else {
                        return CombatOutcome::Defeated {
                            target: target.id,
                            rounds,
                        };
                    };
                    target = current;
                    let gap = self
                        .collab
                        .motion
                        .current_position()
                        .distance_to(&target.position);
                    if gap < self.config.shoot_range {
                        self.shoot(target.id).await;
                    } else if !reached {
                        return CombatOutcome::Unreachable { target: target.id };
                    }
                }
                Engagement::Shoot => self.shoot(target.id).await,
                Engagement::Melee => {
                    self.collab.motion.look_at(target.position);
                    self.equip_melee().await;

                    if distance > self.config.melee_range {
                        let reached = self
                            .navigator
                            .to_coordinate(
                                NavRequest::to(target.position)
                                    .deviation(approach_deviation)
                                    .near(self.config.melee_range),
                            )
                            .await;
                        if !reached {
                            let Some(current) = self.collab.world.entity(target.id) else {
                                return CombatOutcome::Defeated {
                                    target: target.id,
                                    rounds,
                                };
                            };
                            let gap = self
                                .collab
                                .motion
                                .current_position()
                                .distance_to(&current.position);
                            if gap > self.config.melee_range * 2.0 {
                                return CombatOutcome::Unreachable { target: target.id };
                            }
                            target = current;
                        }
                    }

                    self.strike(&target);
                }
            }

            rounds += 1;
            tokio::time::sleep(self.config.strike_interval()).await;

            match self.collab.world.entity(target.id) {
                Some(current) => target = current,
                None => {
                    return CombatOutcome::Defeated {
                        target: target.id,
                        rounds,
                    };
                }
            }

            if rounds >= self.config.max_rounds {
                return CombatOutcome::Disengaged {
                    target: target.id,
                    rounds,
                };
            }
        }
    }

    /// Point-blank retaliation. Skips acquisition and arbitration; falls back
    /// to [`attack_nearest`](Self::attack_nearest) once the aggressor is
    /// outside the retaliation radius.
    pub async fn attack_wildly(&self, id: EntityId, mode: AttackMode) -> CombatOutcome {
        let mut rounds = 0u32;
        loop {
            self.equip_melee().await;

            let Some(mob) = self.collab.world.entity(id) else {
                return CombatOutcome::Defeated { target: id, rounds };
            };
            self.collab.motion.look_at(mob.position);

            let distance = self
                .collab
                .motion
                .current_position()
                .distance_to(&mob.position);
            if distance > self.config.wild_radius {
                return self
                    .attack_nearest(
                        AttackRequest::target(id, mode).range(self.config.wild_fallback_range),
                    )
                    .await;
            }

            self.strike(&mob);
            rounds += 1;
            if rounds >= self.config.max_rounds {
                return CombatOutcome::Disengaged { target: id, rounds };
            }
            tokio::time::sleep(self.config.wild_interval()).await;
        }
    }

    fn aim(&self, id: EntityId) {
        let Some(target) = self.collab.world.entity(id) else {
            return;
        };
        let distance = self
            .collab
            .motion
            .current_position()
            .distance_to(&target.position);
        let height_adjust = target.height * 0.3 + distance * 0.05;
        self.collab
            .motion
            .look_at(target.position.offset(0.0, height_adjust, 0.0));
    }

    /// One shot with whatever ranged weapon is carried.
    async fn shoot(&self, id: EntityId) {
        let body = &self.collab.body;
        let weapon = match items::equip_ranged(self.collab.inventory.as_ref()).await {
            Ok(Some(weapon)) => weapon,
            Ok(None) => return,
            Err(e) => {
                warn!(agent = %self.agent, "Could not equip ranged weapon: {e}");
                return;
            }
        };

        if weapon.name == "crossbow" {
            body.activate_item();
            tokio::time::sleep(Duration::from_millis(1250)).await;
            body.deactivate_item();
            tokio::time::sleep(Duration::from_millis(200)).await;
        }

        // Shots fired on the move miss
        if self.collab.motion.is_moving() {
            return;
        }

        self.aim(id);
        tokio::time::sleep(Duration::from_millis(250)).await;
        body.activate_item();
        if weapon.name == "bow" {
            tokio::time::sleep(Duration::from_millis(1000)).await;
            self.aim(id);
            tokio::time::sleep(Duration::from_millis(250)).await;
        }
        body.deactivate_item();
    }
}
