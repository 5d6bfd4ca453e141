//! Base construction, harvester upkeep and repairs.
//!
//! Construction follows a fixed opening (power, refinery, barracks, factory,
//! tech, then a second power plant and refinery). Once the opening is done
//! each call walks a priority list and starts at most one building.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use rts_world::{BuildingRole, Capabilities, EntityId, EntityKind};

use crate::context::TickContext;
use crate::error::AiError;
use crate::orders;
use crate::placement::PlacementPlanner;

/// Opening build order.
pub const BUILD_PHASES: [BuildingRole; 7] = [
    BuildingRole::Power,
    BuildingRole::Refinery,
    BuildingRole::Barracks,
    BuildingRole::Factory,
    BuildingRole::Tech,
    BuildingRole::Power,
    BuildingRole::Refinery,
];

/// Buildings count as standing when one exists this close to where it was placed.
const SITE_TOLERANCE: f32 = 8.0;

/// Result of one construction attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildOutcome {
    Started(String),
    Upgraded(String),
    /// Not enough credits yet.
    Waiting,
    /// Prerequisites missing or no room; retried next time.
    Stalled,
    /// No definition for this phase; skipped for good.
    Skipped,
    /// Nothing to do, or the building queue is busy.
    Idle,
}

#[derive(Debug, Clone, Default)]
pub struct BuildPlanner {
    cursor: usize,
    last_build_tick: Option<u64>,
}

impl BuildPlanner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn phase_count(&self) -> usize {
        BUILD_PHASES.len()
    }

    pub fn is_opening_done(&self) -> bool {
        self.cursor >= BUILD_PHASES.len()
    }

    pub fn current_phase(&self) -> Option<BuildingRole> {
        BUILD_PHASES.get(self.cursor).copied()
    }

    pub fn last_build_tick(&self) -> Option<u64> {
        self.last_build_tick
    }

    /// Moves the cursor past every leading phase that standing buildings
    /// already satisfy. Never moves it backward.
    pub fn restore(&mut self, counts: &BTreeMap<BuildingRole, usize>, tick: u64) {
        let mut needed: BTreeMap<BuildingRole, usize> = BTreeMap::new();
        let mut satisfied = 0;
        for role in BUILD_PHASES {
            let want = needed.entry(role).or_insert(0);
            *want += 1;
            if counts.get(&role).copied().unwrap_or(0) < *want {
                break;
            }
            satisfied += 1;
        }
        self.cursor = self.cursor.max(satisfied);
        self.last_build_tick = Some(tick);
    }

    pub fn step(
        &mut self,
        ctx: &mut TickContext<'_>,
        placement: &mut PlacementPlanner,
        under_attack: bool,
    ) -> Result<BuildOutcome, AiError> {
        if ctx.services.queue_len(ctx.slot(), true) > 0 {
            return Ok(BuildOutcome::Idle);
        }

        let outcome = if let Some(role) = self.current_phase() {
            self.opening_step(ctx, placement, role)?
        } else {
            self.priority_step(ctx, placement, under_attack)?
        };
        if matches!(outcome, BuildOutcome::Started(_) | BuildOutcome::Upgraded(_)) {
            self.last_build_tick = Some(ctx.tick);
        }
        Ok(outcome)
    }

    fn opening_step(
        &mut self,
        ctx: &mut TickContext<'_>,
        placement: &mut PlacementPlanner,
        role: BuildingRole,
    ) -> Result<BuildOutcome, AiError> {
        let roster = ctx.roster;
        let name = match roster.building_for(role) {
            Some(name) if ctx.rules.building(name).is_some() => name,
            _ => {
                tracing::warn!(
                    "{}: no {:?} building for {}, skipping phase {}",
                    ctx.slot(),
                    role,
                    roster.house(),
                    self.cursor
                );
                self.cursor += 1;
                return Ok(BuildOutcome::Skipped);
            }
        };

        let outcome = place_building(ctx, placement, role, name)?;
        match &outcome {
            BuildOutcome::Started(name) => {
                tracing::info!(
                    "{}: build phase {} ({:?}) started {}",
                    ctx.slot(),
                    self.cursor,
                    role,
                    name
                );
                self.cursor += 1;
            }
            BuildOutcome::Stalled => {
                tracing::debug!("{}: build phase {} stalled on {}", ctx.slot(), self.cursor, name);
            }
            _ => {}
        }
        Ok(outcome)
    }

    fn priority_step(
        &mut self,
        ctx: &mut TickContext<'_>,
        placement: &mut PlacementPlanner,
        under_attack: bool,
    ) -> Result<BuildOutcome, AiError> {
        let (config, roster, rules) = (ctx.config, ctx.roster, ctx.rules);
        let economy = &config.economy;
        let counts = role_counts(ctx, placement);
        let count = |role: BuildingRole| counts.get(&role).copied().unwrap_or(0);
        let total: usize = counts.values().sum();
        let difficulty = ctx.difficulty();
        let turrets = count(BuildingRole::Turret);

        let mut wanted: Vec<BuildingRole> = Vec::new();
        if ctx.services.power_ratio(ctx.slot()) < 1.0 {
            wanted.push(BuildingRole::Power);
        }
        if under_attack && turrets < difficulty.pick(&economy.turrets_under_attack) {
            wanted.push(BuildingRole::Turret);
        }
        if count(BuildingRole::Power) * economy.buildings_per_generator.max(1) < total {
            wanted.push(BuildingRole::Power);
        }
        let refinery_target = (difficulty.pick(&economy.refineries) * ctx.personality().economy)
            .round()
            .max(1.0) as usize;
        if count(BuildingRole::Refinery) < refinery_target {
            wanted.push(BuildingRole::Refinery);
        }
        if difficulty.tier() >= economy.second_factory_tier && count(BuildingRole::Factory) < 2 {
            wanted.push(BuildingRole::Factory);
        }
        if turrets < difficulty.pick(&economy.max_turrets)
            && ctx
                .rng
                .gen_bool(difficulty.pick(&economy.periodic_turret_chance).clamp(0.0, 1.0))
        {
            wanted.push(BuildingRole::Turret);
        }
        if turrets >= economy.wall_min_turrets && count(BuildingRole::Wall) < economy.wall_segments {
            wanted.push(BuildingRole::Wall);
        }

        for role in wanted {
            let options = roster.buildings_for(role);
            if options.is_empty() {
                continue;
            }
            // Rotate through the house's variants (gun and rocket turrets).
            let name = options[count(role) % options.len()].clone();
            match place_building(ctx, placement, role, &name)? {
                BuildOutcome::Stalled => continue,
                outcome => return Ok(outcome),
            }
        }

        if total < difficulty.pick(&economy.building_ceiling) {
            match self.advanced_step(ctx, placement)? {
                BuildOutcome::Idle | BuildOutcome::Stalled => {}
                outcome => return Ok(outcome),
            }
        }

        if ctx.tick >= difficulty.pick(&economy.subhouse_ramp) {
            let owned = owned_names(ctx, placement);
            let missing: Vec<String> = roster
                .ally_buildings()
                .iter()
                .filter(|n| !owned.contains(n.as_str()))
                .cloned()
                .collect();
            for name in missing {
                let Some(role) = rules.building(&name).map(|b| b.role) else {
                    continue;
                };
                match place_building(ctx, placement, role, &name)? {
                    BuildOutcome::Stalled => continue,
                    outcome => return Ok(outcome),
                }
            }
        }
        Ok(BuildOutcome::Idle)
    }

    /// Tech buildings and starports not yet owned, then upgrades on owned
    /// production buildings.
    fn advanced_step(
        &mut self,
        ctx: &mut TickContext<'_>,
        placement: &mut PlacementPlanner,
    ) -> Result<BuildOutcome, AiError> {
        let roster = ctx.roster;
        let owned = owned_names(ctx, placement);
        let candidates: Vec<(BuildingRole, String)> = [BuildingRole::Tech, BuildingRole::Starport]
            .into_iter()
            .flat_map(|role| {
                roster
                    .buildings_for(role)
                    .iter()
                    .map(move |n| (role, n.clone()))
            })
            .filter(|(_, n)| !owned.contains(n.as_str()))
            .collect();
        for (role, name) in candidates {
            match place_building(ctx, placement, role, &name)? {
                BuildOutcome::Stalled => continue,
                outcome => return Ok(outcome),
            }
        }

        let Some(production) = ctx.services.production.clone() else {
            return Ok(BuildOutcome::Idle);
        };
        let mut production_buildings: Vec<&str> = ctx
            .census
            .own_buildings
            .iter()
            .filter(|b| ctx.building_role(b).is_some_and(|r| r.is_production()))
            .filter_map(|b| ctx.type_name(b))
            .collect();
        production_buildings.sort_unstable();
        production_buildings.dedup();

        let slot = ctx.slot();
        let mut production = production
            .try_borrow_mut()
            .map_err(|_| AiError::Busy("production authority"))?;
        for name in production_buildings {
            if production.can_upgrade(slot, name) && production.start_upgrade(slot, name) {
                tracing::info!("{}: upgrading {}", slot, name);
                return Ok(BuildOutcome::Upgraded(name.to_string()));
            }
        }
        Ok(BuildOutcome::Idle)
    }
}

/// Standing plus pending buildings per role.
pub fn role_counts(
    ctx: &TickContext<'_>,
    placement: &PlacementPlanner,
) -> BTreeMap<BuildingRole, usize> {
    let mut counts: BTreeMap<BuildingRole, usize> = BTreeMap::new();
    for building in &ctx.census.own_buildings {
        if let Some(role) = ctx.building_role(building) {
            *counts.entry(role).or_insert(0) += 1;
        }
    }
    let roles: BTreeSet<BuildingRole> = placement.placed().iter().map(|p| p.role).collect();
    for role in roles {
        let pending = placement.pending_with_role(role, &ctx.census.own_buildings, SITE_TOLERANCE);
        if pending > 0 {
            *counts.entry(role).or_insert(0) += pending;
        }
    }
    counts
}

/// Type names standing or placed.
fn owned_names(ctx: &TickContext<'_>, placement: &PlacementPlanner) -> BTreeSet<String> {
    ctx.census
        .own_buildings
        .iter()
        .filter_map(|b| ctx.type_name(b))
        .map(str::to_string)
        .chain(placement.placed().iter().map(|p| p.type_name.clone()))
        .collect()
}

/// Picks a site for `name` and asks for it to be built.
pub fn place_building(
    ctx: &mut TickContext<'_>,
    placement: &mut PlacementPlanner,
    role: BuildingRole,
    name: &str,
) -> Result<BuildOutcome, AiError> {
    let price = ctx
        .price(name)
        .ok_or_else(|| AiError::MissingDefinition(name.to_string()))?;
    let slot = ctx.slot();
    if !ctx
        .services
        .can_afford(slot, price * ctx.config.economy.phase_cost_factor as f64)
    {
        return Ok(BuildOutcome::Waiting);
    }
    if !ctx.services.can_build(slot, name, true) {
        return Ok(BuildOutcome::Stalled);
    }
    let Some(anchor) = placement.anchor() else {
        return Ok(BuildOutcome::Stalled);
    };

    let ordinal = placement.placed_with_role(role);
    let toward_enemy = ctx.target - anchor;
    let Some(ideal) =
        placement.ideal_site(role, ordinal, toward_enemy, &ctx.config.placement, &mut *ctx.rng)
    else {
        return Ok(BuildOutcome::Stalled);
    };
    let obstacles = placement.obstacles(&ctx.census.own_buildings, |b| {
        ctx.building_role(b) == Some(BuildingRole::Wall)
    });
    let Some(site) =
        PlacementPlanner::find_site(ideal, role, &obstacles, ctx.map, &ctx.config.placement)
    else {
        tracing::debug!("{}: no room for {} near {:?}", slot, name, ideal);
        return Ok(BuildOutcome::Stalled);
    };

    if !ctx.services.produce(slot, name, EntityKind::Building, site)? {
        return Ok(BuildOutcome::Stalled);
    }
    placement.record(site, name, role);
    placement.recompute_anchor(&ctx.census.own_buildings);
    Ok(BuildOutcome::Started(name.to_string()))
}

/// What the harvester check did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HarvesterAction {
    Sufficient,
    Trained(String),
    RefineryQueued(String),
    Blocked,
}

/// Keeps the harvester count at its target, training one per call or, when
/// that's impossible, adding a refinery (which comes with its own harvester).
pub fn maintain_harvesters(
    ctx: &mut TickContext<'_>,
    placement: &mut PlacementPlanner,
) -> Result<HarvesterAction, AiError> {
    let refineries = role_counts(ctx, placement)
        .get(&BuildingRole::Refinery)
        .copied()
        .unwrap_or(0);
    if refineries == 0 {
        return Ok(HarvesterAction::Sufficient);
    }
    let per_refinery = ctx
        .difficulty()
        .pick(&ctx.config.economy.harvesters_per_refinery);
    let target = (refineries as f32 * per_refinery * ctx.personality().economy)
        .ceil()
        .max(1.0) as usize;
    let current = ctx
        .census
        .own_units
        .iter()
        .filter(|u| u.has(Capabilities::HARVESTER))
        .count();
    if current >= target {
        return Ok(HarvesterAction::Sufficient);
    }

    let slot = ctx.slot();
    let roster = ctx.roster;
    if let (Some(name), Some(anchor)) = (roster.harvester(), placement.anchor()) {
        let affordable = ctx
            .price(name)
            .is_some_and(|price| ctx.services.can_afford(slot, price));
        if affordable
            && ctx.services.can_build(slot, name, false)
            && ctx.services.produce(slot, name, EntityKind::Unit, anchor)?
        {
            tracing::debug!("{}: training harvester {} ({}/{})", slot, name, current, target);
            return Ok(HarvesterAction::Trained(name.to_string()));
        }
    }

    let Some(refinery) = roster.building_for(BuildingRole::Refinery) else {
        return Ok(HarvesterAction::Blocked);
    };
    match place_building(ctx, placement, BuildingRole::Refinery, refinery)? {
        BuildOutcome::Started(name) => Ok(HarvesterAction::RefineryQueued(name)),
        _ => Ok(HarvesterAction::Blocked),
    }
}

/// Repair order: construction yard first, walls last.
fn repair_rank(role: Option<BuildingRole>) -> u8 {
    match role {
        Some(BuildingRole::ConstructionYard) => 0,
        Some(BuildingRole::Refinery) => 1,
        Some(BuildingRole::Power) => 2,
        Some(BuildingRole::Factory) => 3,
        Some(BuildingRole::Barracks) => 4,
        Some(BuildingRole::Starport) => 5,
        Some(BuildingRole::Tech) => 6,
        Some(BuildingRole::Turret) => 7,
        Some(BuildingRole::Other) | None => 8,
        Some(BuildingRole::Wall) => 9,
    }
}

/// Repairs the most damaged building (ties go to the more important one),
/// paying for it from the ledger. Returns the repaired building.
pub fn repair_one(ctx: &mut TickContext<'_>) -> Result<Option<EntityId>, AiError> {
    let config = ctx.config;
    let economy = &config.economy;
    let Some(target) = ctx
        .census
        .own_buildings
        .iter()
        .filter(|b| b.health_fraction() <= economy.repair_threshold)
        .min_by(|a, b| {
            a.health_fraction()
                .total_cmp(&b.health_fraction())
                .then(repair_rank(ctx.building_role(a)).cmp(&repair_rank(ctx.building_role(b))))
                .then(a.id.cmp(&b.id))
        })
        .copied()
    else {
        return Ok(None);
    };

    let slot = ctx.slot();
    let Some(balance) = ctx.services.balance(slot) else {
        return Ok(None);
    };
    let building_cost = ctx.building_def(&target).map(|d| d.cost).unwrap_or(0.0);
    let cost = (building_cost
        * economy.repair_fraction
        * economy.repair_cost_factor
        * ctx.services.cost_multiplier(slot)) as f64;
    if balance < cost + economy.repair_reserve {
        return Ok(None);
    }

    let Some(current) = orders::owned(ctx.world, slot, target.id) else {
        return Err(AiError::StaleEntity(target.id));
    };
    if !ctx.services.spend(slot, cost)? {
        return Ok(None);
    }
    let healed = current.health + current.max_health * economy.repair_fraction;
    ctx.world.set_health(target.id, healed);
    tracing::debug!(
        "{}: repaired {} to {:.0}/{:.0} for {:.0}",
        slot,
        target.id,
        healed.min(current.max_health),
        current.max_health,
        cost
    );
    Ok(Some(target.id))
}
