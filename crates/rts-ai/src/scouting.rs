//! Scout recruitment, exploration targets and shared vision.

use rand::Rng;
use std::collections::BTreeMap;

use rts_world::{Capabilities, EntityId, EntitySnapshot, MapDimensions, UnitCategory, UnitDef, Vec2};

use crate::config::{RolesConfig, ScoutingConfig};
use crate::context::TickContext;
use crate::duties::{Duty, DutyMap};
use crate::error::AiError;
use crate::intel::{ExplorationGrid, IntelLedger, Sighting, SightingCategory, WaypointQueue};
use crate::orders;

/// What one scouting pass did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScoutReport {
    pub recruited: usize,
    pub arrived: usize,
    pub dispatched: usize,
}

#[derive(Debug, Clone)]
pub struct ScoutPlanner {
    grid: ExplorationGrid,
    waypoints: WaypointQueue,
    seeded: bool,
    targets: BTreeMap<EntityId, Vec2>,
    patrol_cursor: usize,
}

impl ScoutPlanner {
    pub fn new(map: MapDimensions, config: &ScoutingConfig) -> Self {
        Self {
            grid: ExplorationGrid::new(map, config.tile_size),
            waypoints: WaypointQueue::default(),
            seeded: false,
            targets: BTreeMap::new(),
            patrol_cursor: 0,
        }
    }

    pub fn grid(&self) -> &ExplorationGrid {
        &self.grid
    }

    pub fn waypoints(&self) -> &WaypointQueue {
        &self.waypoints
    }

    /// Rebuilds the grid when the map size changed. Exploration is lost.
    pub fn fit_map(&mut self, map: MapDimensions, config: &ScoutingConfig) {
        if !self.grid.fits(map) {
            *self = Self::new(map, config);
        }
    }

    /// Builds the waypoint queue the first time the base position is known.
    pub fn seed_waypoints(
        &mut self,
        map: MapDimensions,
        config: &ScoutingConfig,
        base: Vec2,
        enemy: Vec2,
        aggressive: bool,
    ) {
        if self.seeded {
            return;
        }
        self.waypoints = WaypointQueue::strategic(map, config.waypoint_margin, base, enemy, aggressive);
        self.seeded = true;
    }

    /// Unexplored waypoint first, then a random unexplored tile, then the
    /// next known enemy position in rotation.
    pub fn next_target<R: Rng>(
        &mut self,
        intel: &IntelLedger,
        now: u64,
        rng: &mut R,
        attempts: usize,
    ) -> Option<Vec2> {
        if let Some(p) = self.waypoints.next_unexplored(&self.grid) {
            return Some(p);
        }
        if let Some(p) = self.grid.random_unexplored(rng, attempts) {
            return Some(p);
        }
        let known: Vec<Vec2> = intel.recent(now).map(|(_, s)| s.position).collect();
        if known.is_empty() {
            return None;
        }
        let p = known[self.patrol_cursor % known.len()];
        self.patrol_cursor = self.patrol_cursor.wrapping_add(1);
        Some(p)
    }

    /// Recruits scouts up to the difficulty cap, handles arrivals and sends
    /// idle scouts to their next destination.
    pub fn step(
        &mut self,
        ctx: &mut TickContext<'_>,
        duties: &mut DutyMap,
        intel: &IntelLedger,
        base: Vec2,
    ) -> Result<ScoutReport, AiError> {
        let (config, map) = (ctx.config, ctx.map);
        let cfg = &config.scouting;
        self.fit_map(map, cfg);
        self.seed_waypoints(map, cfg, base, ctx.target, ctx.difficulty().is_highest());

        let mut report = ScoutReport::default();
        let cap = ctx.difficulty().pick(&cfg.max_scouts);
        let mut candidates: Vec<EntityId> = ctx
            .census
            .own_units
            .iter()
            .filter(|u| u.is_idle() && !duties.has_duty(u.id))
            .filter(|u| {
                ctx.unit_def(u)
                    .is_some_and(|def| is_scout_candidate(u, def, &config.roles))
            })
            .map(|u| u.id)
            .collect();
        candidates.sort();
        for id in candidates {
            if duties.count(Duty::Scout) >= cap {
                break;
            }
            if duties.assign(id, Duty::Scout) {
                report.recruited += 1;
                tracing::debug!("{}: unit {} recruited as scout", ctx.slot(), id);
            }
        }

        self.targets.retain(|id, _| duties.is(*id, Duty::Scout));
        let slot = ctx.slot();
        for id in duties.members(Duty::Scout) {
            let Some(row) = orders::owned(ctx.world, slot, id) else {
                continue;
            };
            if let Some(target) = self.targets.get(&id).copied() {
                if row.position.distance(&target) <= cfg.arrival_distance {
                    self.grid.mark_disk(target, cfg.reveal_radius);
                    self.targets.remove(&id);
                    report.arrived += 1;
                } else if row.is_idle() {
                    // Stopped short; the tile it reached still counts.
                    self.grid.mark_disk(row.position, cfg.reveal_radius);
                    self.targets.remove(&id);
                } else {
                    continue;
                }
            }
            let Some(next) = self.next_target(intel, ctx.tick, &mut *ctx.rng, cfg.random_tile_attempts)
            else {
                continue;
            };
            if orders::move_to(ctx.world, slot, id, next) {
                self.targets.insert(id, next);
                report.dispatched += 1;
            }
        }
        Ok(report)
    }
}

/// Cheap, fast, mobile and unarmed for anything that matters in a fight.
pub fn is_scout_candidate(row: &EntitySnapshot, def: &UnitDef, roles: &RolesConfig) -> bool {
    row.has(Capabilities::MOBILE)
        && !row.caps.intersects(Capabilities::HARVESTER | Capabilities::SUPPORT)
        && !def.harvester
        && def.category != UnitCategory::Special
        && def.cost <= roles.scout_max_cost
        && def.speed >= roles.scout_min_speed
}

/// Upserts every enemy within view range of any owned entity into `intel`
/// and forgets recorded entities that have died. Returns how many were seen.
pub fn gather_vision(ctx: &TickContext<'_>, intel: &mut IntelLedger) -> usize {
    let view_sq = ctx.config.scouting.view_range * ctx.config.scouting.view_range;
    let observers: Vec<Vec2> = ctx
        .census
        .own_units
        .iter()
        .chain(ctx.census.own_buildings.iter())
        .map(|s| s.position)
        .collect();

    let mut seen = 0;
    for enemy in ctx.census.enemies() {
        if !observers
            .iter()
            .any(|p| p.distance_sq(&enemy.position) <= view_sq)
        {
            continue;
        }
        intel.record(
            enemy.id,
            Sighting {
                owner: enemy.owner,
                kind: enemy.kind,
                type_index: enemy.type_index,
                position: enemy.position,
                category: sighting_category(ctx, enemy),
                harvester: enemy.has(Capabilities::HARVESTER),
                tick: ctx.tick,
            },
        );
        seen += 1;
    }

    let dead: Vec<EntityId> = intel
        .recent(ctx.tick)
        .map(|(id, _)| id)
        .filter(|id| !ctx.world.get(*id).is_some_and(|s| s.alive))
        .collect();
    for id in dead {
        intel.forget(id);
    }
    seen
}

fn sighting_category(ctx: &TickContext<'_>, enemy: &EntitySnapshot) -> SightingCategory {
    if enemy.is_building() {
        return SightingCategory::Structure;
    }
    match ctx.unit_def(enemy).map(|d| d.category) {
        Some(UnitCategory::Infantry) => SightingCategory::Infantry,
        _ => SightingCategory::Vehicle,
    }
}
