//! Defender promotion, offensives, harassment and rallying.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use rts_world::{Capabilities, EntityId, EntitySnapshot, UnitCategory, Vec2};

use crate::config::{ArmyConfig, Difficulty, Personality};
use crate::context::TickContext;
use crate::duties::{Duty, DutyMap};
use crate::error::AiError;
use crate::intel::{IntelLedger, SightingCategory};
use crate::orders;

/// Fronts are never split further than this, whatever the config says.
pub const MAX_FRONTS: usize = 3;

/// A clustered target for one attack group.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Objective {
    pub position: Vec2,
    pub weight: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ArmyAction {
    Attacked { fronts: usize, units: usize },
    Rallied { units: usize },
    Idle,
}

/// Value of a sighting, decayed linearly with age.
fn sighting_weight(category: SightingCategory, harvester: bool, age: u64, horizon: u64, cfg: &ArmyConfig) -> f32 {
    let value = if category == SightingCategory::Structure {
        cfg.building_value
    } else if harvester {
        cfg.harvester_value
    } else {
        cfg.unit_value
    };
    let freshness = 1.0 - age as f32 / (horizon as f32 + 1.0);
    value * freshness.max(0.05)
}

/// Clusters recent sightings into at most `max_fronts` objectives, heaviest
/// first. A sighting joins the first cluster whose weighted centroid lies
/// within the cluster radius, so the result depends on id order. With no
/// recent sightings the only objective is `fallback`.
pub fn plan_attack_objectives(
    intel: &IntelLedger,
    now: u64,
    fallback: Vec2,
    cfg: &ArmyConfig,
    max_fronts: usize,
) -> Vec<Objective> {
    let radius_sq = cfg.cluster_radius * cfg.cluster_radius;
    let mut clusters: Vec<Objective> = Vec::new();
    for (_, sighting) in intel.recent(now) {
        let w = sighting_weight(
            sighting.category,
            sighting.harvester,
            sighting.age(now),
            intel.horizon(),
            cfg,
        );
        match clusters
            .iter_mut()
            .find(|c| c.position.distance_sq(&sighting.position) <= radius_sq)
        {
            Some(cluster) => {
                let total = cluster.weight + w;
                cluster.position = (cluster.position * cluster.weight + sighting.position * w) * (1.0 / total);
                cluster.weight = total;
            }
            None => clusters.push(Objective {
                position: sighting.position,
                weight: w,
            }),
        }
    }
    if clusters.is_empty() {
        return vec![Objective {
            position: fallback,
            weight: 0.0,
        }];
    }
    clusters.sort_by(|a, b| b.weight.total_cmp(&a.weight));
    clusters.truncate(max_fronts.clamp(1, MAX_FRONTS));
    clusters
}

/// Splits units among objectives by proximity. Empty objectives take a unit
/// from whichever group is largest while that group can spare one.
pub fn assign_to_objectives(units: &[EntitySnapshot], objectives: &[Objective]) -> Vec<Vec<EntitySnapshot>> {
    let mut groups: Vec<Vec<EntitySnapshot>> = vec![Vec::new(); objectives.len()];
    if objectives.is_empty() {
        return groups;
    }
    for unit in units {
        let nearest = objectives
            .iter()
            .enumerate()
            .min_by(|(_, a), (_, b)| {
                a.position
                    .distance_sq(&unit.position)
                    .total_cmp(&b.position.distance_sq(&unit.position))
            })
            .map(|(i, _)| i)
            .unwrap_or(0);
        groups[nearest].push(*unit);
    }
    loop {
        let Some(empty) = groups.iter().position(|g| g.is_empty()) else {
            break;
        };
        let largest = (0..groups.len())
            .max_by_key(|i| (groups[*i].len(), std::cmp::Reverse(*i)))
            .unwrap_or(0);
        if groups[largest].len() <= 1 {
            break;
        }
        if let Some(unit) = groups[largest].pop() {
            groups[empty].push(unit);
        }
    }
    groups
}

/// Defenders wanted for an army of `army_size` combat units.
pub fn defender_quota(army_size: usize, cfg: &ArmyConfig, difficulty: Difficulty, personality: &Personality) -> usize {
    let wanted = (army_size as f32 * cfg.defender_fraction * personality.defense).ceil() as usize;
    wanted.min(difficulty.pick(&cfg.defender_cap))
}

/// Point on the enemy-facing side of the base where idle units gather.
pub fn rally_point(base: Vec2, target: Vec2, distance: f32) -> Vec2 {
    let dir = (target - base).normalize();
    base + dir * distance
}

#[derive(Debug, Clone, Default)]
pub struct ArmyPlanner {
    last_attack_tick: Option<u64>,
    attacking: BTreeSet<EntityId>,
    harassers: BTreeSet<EntityId>,
    attacks_launched: u32,
}

impl ArmyPlanner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_attack_tick(&self) -> Option<u64> {
        self.last_attack_tick
    }

    /// Restarts the attack cooldown, as after a counterattack.
    pub fn reset_cooldown(&mut self, tick: u64) {
        self.last_attack_tick = Some(tick);
    }

    pub fn attacks_launched(&self) -> u32 {
        self.attacks_launched
    }

    /// Units on an offensive or hunting harvesters.
    pub fn attacking_count(&self) -> usize {
        self.attacking.len() + self.harassers.len()
    }

    /// Records units sent on an offensive from outside the planner.
    pub fn enlist(&mut self, ids: &[EntityId]) {
        self.attacking.extend(ids.iter().copied());
    }

    pub fn forget(&mut self, id: EntityId) {
        self.attacking.remove(&id);
        self.harassers.remove(&id);
    }

    /// One army cycle: retreat the wounded, register specials, promote
    /// defenders, then attack or rally.
    pub fn step(
        &mut self,
        ctx: &mut TickContext<'_>,
        duties: &mut DutyMap,
        intel: &IntelLedger,
        base: Vec2,
    ) -> Result<ArmyAction, AiError> {
        let config = ctx.config;
        let cfg = &config.army;
        let slot = ctx.slot();
        let tier = ctx.difficulty();

        self.retreat_wounded(ctx, base);
        self.register_specials(ctx, duties);

        let near_sq = cfg.near_base_radius * cfg.near_base_radius;
        let army: Vec<EntitySnapshot> = ctx
            .census
            .own_units
            .iter()
            .filter(|u| u.is_combatant() && u.has(Capabilities::MOBILE))
            .filter(|u| !duties.is(u.id, Duty::Scout) && !duties.is(u.id, Duty::Special))
            .copied()
            .collect();
        let mut near: Vec<EntitySnapshot> = Vec::new();
        let mut elsewhere: Vec<EntitySnapshot> = Vec::new();
        for unit in army.iter().filter(|u| u.is_idle() && !duties.has_duty(u.id)) {
            if unit.position.distance_sq(&base) <= near_sq {
                near.push(*unit);
            } else {
                elsewhere.push(*unit);
            }
        }

        // Defenders.
        let quota = defender_quota(army.len(), cfg, tier, ctx.personality());
        near.sort_by_key(|u| u.id);
        let mut pool = Vec::with_capacity(near.len());
        for unit in near {
            if duties.count(Duty::Defender) < quota && duties.assign(unit.id, Duty::Defender) {
                tracing::debug!("{}: unit {} promoted to defender", slot, unit.id);
                continue;
            }
            pool.push(unit);
        }

        // Idle units far from home have finished whatever they were doing.
        let rally = rally_point(base, ctx.target, cfg.rally_distance);
        for unit in &elsewhere {
            self.forget(unit.id);
            orders::move_to(ctx.world, slot, unit.id, rally);
        }

        let threshold = ((tier.pick(&cfg.attack_threshold) as f32 / ctx.personality().aggression.max(0.1)).ceil()
            as usize)
            .max(1);
        let cooled = self
            .last_attack_tick
            .map_or(true, |t| ctx.tick >= t + tier.pick(&cfg.attack_cooldown));

        if pool.len() >= threshold && cooled {
            return self.launch(ctx, intel, pool, threshold);
        }

        let mut rallied = 0;
        for unit in &pool {
            if unit.position.distance(&rally) > cfg.spread * 2.0 && orders::move_to(ctx.world, slot, unit.id, rally) {
                rallied += 1;
            }
        }
        Ok(if rallied > 0 {
            ArmyAction::Rallied { units: rallied }
        } else {
            ArmyAction::Idle
        })
    }

    fn retreat_wounded(&mut self, ctx: &mut TickContext<'_>, base: Vec2) {
        let slot = ctx.slot();
        let cutoff = ctx.config.army.retreat_health * ctx.personality().retreat;
        let mut retreating = Vec::new();
        let tracked: Vec<EntityId> = self.attacking.iter().chain(self.harassers.iter()).copied().collect();
        for id in tracked {
            match orders::owned(ctx.world, slot, id) {
                None => self.forget(id),
                Some(row) if row.health_fraction() < cutoff => {
                    if orders::recall(ctx.world, slot, id, base) {
                        retreating.push(id);
                    }
                    self.forget(id);
                }
                Some(_) => {}
            }
        }
        if !retreating.is_empty() {
            tracing::debug!("{}: {} wounded units falling back", slot, retreating.len());
            ctx.services.clear_attack_move(&retreating);
        }
    }

    fn register_specials(&self, ctx: &TickContext<'_>, duties: &mut DutyMap) {
        for unit in &ctx.census.own_units {
            if unit.has(Capabilities::HARVESTER) || duties.has_duty(unit.id) {
                continue;
            }
            let special = unit.has(Capabilities::SUPPORT)
                || ctx
                    .unit_def(unit)
                    .is_some_and(|d| d.non_combat || d.category == UnitCategory::Special);
            if special {
                duties.assign(unit.id, Duty::Special);
            }
        }
    }

    fn launch(
        &mut self,
        ctx: &mut TickContext<'_>,
        intel: &IntelLedger,
        mut pool: Vec<EntitySnapshot>,
        threshold: usize,
    ) -> Result<ArmyAction, AiError> {
        let config = ctx.config;
        let cfg = &config.army;
        let slot = ctx.slot();
        let tier = ctx.difficulty();

        if tier.is_highest() && pool.len() >= threshold + cfg.harass_size {
            self.harass(ctx, intel, &mut pool);
        }

        let objectives = plan_attack_objectives(intel, ctx.tick, ctx.target, cfg, tier.pick(&cfg.max_fronts));
        let groups = assign_to_objectives(&pool, &objectives);
        let mut sent = Vec::new();
        for (objective, group) in objectives.iter().zip(groups) {
            let Some(centroid) = Vec2::centroid(group.iter().map(|u| u.position)) else {
                continue;
            };
            let heading = (objective.position - centroid).angle()
                + ctx.rng.gen_range(-cfg.approach_jitter..=cfg.approach_jitter);
            let approach = Vec2::from_angle(heading);
            let across = approach.perp();
            let half = (group.len() as f32 - 1.0) * 0.5;
            for (i, unit) in group.iter().enumerate() {
                let offset = (i as f32 - half) * cfg.spread;
                let dest = ctx
                    .map
                    .clamp(objective.position - approach * cfg.spread + across * offset, 0.0);
                if orders::move_to(ctx.world, slot, unit.id, dest) {
                    sent.push(unit.id);
                }
            }
        }
        if sent.is_empty() {
            return Ok(ArmyAction::Idle);
        }
        ctx.services.tag_attack_move(&sent);
        self.attacking.extend(sent.iter().copied());
        self.last_attack_tick = Some(ctx.tick);
        self.attacks_launched += 1;
        tracing::info!(
            "{}: offensive #{} with {} units on {} front(s)",
            slot,
            self.attacks_launched,
            sent.len(),
            objectives.len()
        );
        Ok(ArmyAction::Attacked {
            fronts: objectives.len(),
            units: sent.len(),
        })
    }

    /// Sends the fastest few units after the nearest known enemy harvester.
    fn harass(&mut self, ctx: &mut TickContext<'_>, intel: &IntelLedger, pool: &mut Vec<EntitySnapshot>) {
        let slot = ctx.slot();
        let size = ctx.config.army.harass_size;
        let Some(centroid) = Vec2::centroid(pool.iter().map(|u| u.position)) else {
            return;
        };
        let prey = intel
            .recent(ctx.tick)
            .filter(|(_, s)| s.harvester)
            .min_by(|(_, a), (_, b)| {
                a.position
                    .distance_sq(&centroid)
                    .total_cmp(&b.position.distance_sq(&centroid))
            })
            .map(|(id, s)| (id, s.position));
        let Some((prey, position)) = prey else {
            return;
        };

        let speed_of = |u: &EntitySnapshot| ctx.unit_def(u).map_or(0.0, |d| d.speed);
        pool.sort_by(|a, b| speed_of(b).total_cmp(&speed_of(a)).then(a.id.cmp(&b.id)));
        let squad: Vec<EntitySnapshot> = pool.drain(..size.min(pool.len())).collect();
        let mut sent = Vec::new();
        for unit in squad {
            if orders::attack(ctx.world, slot, unit.id, prey) || orders::move_to(ctx.world, slot, unit.id, position) {
                sent.push(unit.id);
            }
        }
        if !sent.is_empty() {
            tracing::debug!("{}: {} units hunting harvester {}", slot, sent.len(), prey);
            ctx.services.tag_attack_move(&sent);
            self.harassers.extend(sent);
        }
    }
}
