//! The per-faction skirmish controller.
//!
//! One `AiController` plays one player slot. The host simulation calls
//! [`AiController::update`] once per tick; the controller takes a census of
//! the registry, then runs whichever behaviors are due, in a fixed order.
//! A behavior that fails is logged and the rest still run.

use rand::rngs::SmallRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::rc::Rc;

use rts_world::{
    BuildingDestroyed, BuildingRole, CombatAuthority, EntityId, EntityRegistry, House,
    MapDimensions, PlayerSlot, ProductionAuthority, ResourceLedger, RulesCatalog, Shared,
    SpawnCallback, TypeTable, Vec2,
};

use crate::army::{rally_point, ArmyAction, ArmyPlanner};
use crate::composition::{adapt_goal, CompositionGoal};
use crate::config::{AiConfig, Difficulty, Personality};
use crate::context::{Census, Identity, Services, TickContext};
use crate::defense::{BaseDefense, DefenseEvent, DefenseState};
use crate::duties::{Duty, DutyMap};
use crate::economy::{maintain_harvesters, repair_one, BuildOutcome, BuildPlanner, HarvesterAction};
use crate::error::AiError;
use crate::intel::{IntelLedger, SightingCategory};
use crate::placement::PlacementPlanner;
use crate::roster::Roster;
use crate::schedule::{Behavior, Scheduler};
use crate::scouting::{gather_vision, ScoutPlanner};
use crate::training::{train_next, TrainOutcome};

/// How close a destroyed building must be to a placement record to clear it.
const DESTROYED_TOLERANCE: f32 = 16.0;

/// Serializable summary of a controller's state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AiStatus {
    pub slot: PlayerSlot,
    pub house: House,
    pub ally: Option<House>,
    pub difficulty: Difficulty,
    pub personality: String,
    pub tick: u64,
    pub elapsed_seconds: f64,
    pub build_cursor: usize,
    pub build_phases: usize,
    pub defense: DefenseState,
    pub defenders: usize,
    pub scouts: usize,
    pub specials: usize,
    pub goal: CompositionGoal,
    pub intel_entries: usize,
    pub explored_fraction: f32,
    pub attacks_launched: u32,
    /// Units currently sent against the enemy.
    pub attacking: usize,
    pub anchor: Option<Vec2>,
    pub behavior_failures: u64,
}

/// Mutable planning state, kept apart from the read-only inputs so both can
/// be borrowed at once while a tick runs.
#[derive(Debug)]
struct Planners {
    duties: DutyMap,
    placement: PlacementPlanner,
    builder: BuildPlanner,
    goal: CompositionGoal,
    intel: IntelLedger,
    scouting: ScoutPlanner,
    army: ArmyPlanner,
    defense: BaseDefense,
}

impl Planners {
    fn new(config: &AiConfig, map: MapDimensions) -> Self {
        Self {
            duties: DutyMap::new(),
            placement: PlacementPlanner::new(),
            builder: BuildPlanner::new(),
            goal: config.composition.default_goal,
            intel: IntelLedger::new(config.scouting.intel_horizon),
            scouting: ScoutPlanner::new(map, &config.scouting),
            army: ArmyPlanner::new(),
            defense: BaseDefense::new(),
        }
    }

    /// Runs one behavior.
    fn run(&mut self, behavior: Behavior, ctx: &mut TickContext<'_>, base: Option<Vec2>) -> Result<(), AiError> {
        let slot = ctx.slot();
        match behavior {
            Behavior::Defense => {
                let Some(base) = base else { return Ok(()) };
                let event = self.defense.step(ctx, &self.duties, &mut self.army, base)?;
                if let DefenseEvent::Engaged { defenders } = event {
                    if defenders > 0 {
                        tracing::debug!("{}: {} defenders engaging", slot, defenders);
                    }
                }
            }
            Behavior::Vision => {
                gather_vision(ctx, &mut self.intel);
            }
            Behavior::PruneIntel => {
                let dropped = self.intel.prune(ctx.tick);
                if dropped > 0 {
                    tracing::debug!("{}: forgot {} stale sightings", slot, dropped);
                }
            }
            Behavior::Scout => {
                let Some(base) = base else { return Ok(()) };
                self.scouting.step(ctx, &mut self.duties, &self.intel, base)?;
            }
            Behavior::AdaptComposition => {
                let samples: Vec<SightingCategory> = self.intel.recent(ctx.tick).map(|(_, s)| s.category).collect();
                let goal = adapt_goal(&samples, &ctx.config.composition);
                if goal != self.goal {
                    tracing::info!("{}: unit mix now {:?} from {} sightings", slot, goal.weights(), samples.len());
                    self.goal = goal;
                }
            }
            Behavior::Build => {
                let under_attack = self.defense.state().is_under_attack();
                match self.builder.step(ctx, &mut self.placement, under_attack)? {
                    BuildOutcome::Started(name) => tracing::debug!("{}: construction of {} started", slot, name),
                    BuildOutcome::Upgraded(name) => tracing::debug!("{}: upgrading {}", slot, name),
                    _ => {}
                }
            }
            Behavior::Harvesters => {
                if let HarvesterAction::RefineryQueued(name) = maintain_harvesters(ctx, &mut self.placement)? {
                    tracing::debug!("{}: no room for more harvesters, building {}", slot, name);
                }
            }
            Behavior::Repair => {
                repair_one(ctx)?;
            }
            Behavior::Train => {
                let Some(base) = base else { return Ok(()) };
                let rally = rally_point(base, ctx.target, ctx.config.army.rally_distance);
                if let TrainOutcome::Queued { unit, .. } = train_next(ctx, &self.goal, &self.duties, rally)? {
                    tracing::trace!("{}: queued {}", slot, unit);
                }
            }
            Behavior::Army => {
                let Some(base) = base else { return Ok(()) };
                if let ArmyAction::Rallied { units } = self.army.step(ctx, &mut self.duties, &self.intel, base)? {
                    tracing::trace!("{}: {} units rallying", slot, units);
                }
            }
        }
        Ok(())
    }
}

/// Skirmish AI for one player slot.
pub struct AiController {
    /// Slot, houses, difficulty and personality
    me: Identity,
    config: AiConfig,
    rules: Rc<RulesCatalog>,
    /// Registry type index to rules name
    types: TypeTable,
    /// Units and buildings available to the current house pairing
    roster: Roster,
    map: MapDimensions,
    /// Explicit offensive target; the mirrored base anchor otherwise
    default_target: Option<Vec2>,
    services: Services,
    rng: SmallRng,
    scheduler: Scheduler,
    /// Internal tick counter, advanced once per update
    tick: u64,
    elapsed: f64,
    planners: Planners,
    failures: u64,
}

impl AiController {
    /// Creates a controller for `slot`. Behaviors are staggered by a
    /// per-slot offset and the random stream is seeded from `seed` and that
    /// offset, so two controllers with the same seed still diverge.
    pub fn new(slot: PlayerSlot, house: House, rules: Rc<RulesCatalog>, config: AiConfig, seed: u64) -> Self {
        let offset = slot.0 as u64 * config.schedule.instance_stride;
        let map = MapDimensions::default();
        let roster = Roster::build(house, None, &rules, &config.roles);
        let types = TypeTable::from_catalog(&rules);
        let planners = Planners::new(&config, map);
        tracing::debug!("{}: controller created as {} (offset {})", slot, house, offset);
        Self {
            me: Identity {
                slot,
                house,
                ally: None,
                difficulty: Difficulty::default(),
                personality: Personality::default(),
            },
            config,
            rules,
            types,
            roster,
            map,
            default_target: None,
            services: Services::default(),
            rng: SmallRng::seed_from_u64(seed ^ offset.wrapping_mul(0x9E37_79B9_7F4A_7C15)),
            scheduler: Scheduler::new(offset),
            tick: 0,
            elapsed: 0.0,
            planners,
            failures: 0,
        }
    }

    pub fn slot(&self) -> PlayerSlot {
        self.me.slot
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn config(&self) -> &AiConfig {
        &self.config
    }

    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    pub fn duties(&self) -> &DutyMap {
        &self.planners.duties
    }

    pub fn intel(&self) -> &IntelLedger {
        &self.planners.intel
    }

    pub fn goal(&self) -> CompositionGoal {
        self.planners.goal
    }

    pub fn defense_state(&self) -> DefenseState {
        self.planners.defense.state()
    }

    pub fn attacker_centroid(&self) -> Option<Vec2> {
        self.planners.defense.attacker_centroid()
    }

    pub fn build_cursor(&self) -> usize {
        self.planners.builder.cursor()
    }

    pub fn base_anchor(&self) -> Option<Vec2> {
        self.planners.placement.anchor()
    }

    pub fn placement(&self) -> &PlacementPlanner {
        &self.planners.placement
    }

    pub fn army(&self) -> &ArmyPlanner {
        &self.planners.army
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn set_production(&mut self, production: Shared<dyn ProductionAuthority>) {
        self.services.production = Some(production);
    }

    pub fn set_resources(&mut self, resources: Shared<dyn ResourceLedger>) {
        self.services.resources = Some(resources);
    }

    pub fn set_combat(&mut self, combat: Shared<dyn CombatAuthority>) {
        self.services.combat = Some(combat);
    }

    pub fn set_spawn_callback(&mut self, spawn: SpawnCallback) {
        self.services.spawn = Some(spawn);
    }

    pub fn set_type_table(&mut self, types: TypeTable) {
        self.types = types;
    }

    pub fn set_map(&mut self, map: MapDimensions) {
        self.map = map;
        self.planners.scouting.fit_map(map, &self.config.scouting);
    }

    pub fn set_difficulty(&mut self, difficulty: Difficulty) {
        self.me.difficulty = difficulty;
    }

    pub fn set_personality(&mut self, personality: Personality) {
        self.me.personality = personality;
    }

    pub fn set_house(&mut self, house: House) {
        self.me.house = house;
        self.refresh_roster();
    }

    pub fn set_ally(&mut self, ally: Option<House>) {
        self.me.ally = ally;
        self.refresh_roster();
    }

    pub fn set_default_target(&mut self, target: Option<Vec2>) {
        self.default_target = target;
    }

    /// Swaps in a new configuration. Learned state (intel, duties, build
    /// progress) is kept.
    pub fn set_config(&mut self, config: AiConfig) {
        self.config = config;
        self.refresh_roster_unchecked();
    }

    fn refresh_roster(&mut self) {
        if !self.roster.matches(self.me.house, self.me.ally) {
            self.refresh_roster_unchecked();
        }
    }

    fn refresh_roster_unchecked(&mut self) {
        self.roster = Roster::build(self.me.house, self.me.ally, &self.rules, &self.config.roles);
    }

    /// Rebuilds internal counters from what stands on the field, as after
    /// loading a saved game at `tick`.
    pub fn reconstruct(&mut self, world: &dyn EntityRegistry, tick: u64) {
        let slot = self.me.slot;
        self.tick = tick;
        let census = Census::take(world, slot);

        let placement = &mut self.planners.placement;
        placement.clear();
        let mut counts: BTreeMap<BuildingRole, usize> = BTreeMap::new();
        for building in &census.own_buildings {
            let Some(name) = self.types.building_name(building.type_index) else {
                continue;
            };
            let Some(def) = self.rules.building(name) else {
                continue;
            };
            placement.record(building.position, name, def.role);
            *counts.entry(def.role).or_insert(0) += 1;
        }
        placement.recompute_anchor(&census.own_buildings);
        self.planners.builder.restore(&counts, tick);

        let living: BTreeSet<EntityId> = census.own_units.iter().map(|u| u.id).collect();
        self.planners.duties.retain(|id| living.contains(&id));
        self.planners.defense = BaseDefense::new();
        self.scheduler.restart(tick);
        tracing::info!(
            "{}: reconstructed at tick {} from {} buildings, build cursor {}",
            slot,
            tick,
            census.own_buildings.len(),
            self.planners.builder.cursor()
        );
    }

    /// Clears the placement record of one of our buildings that was destroyed.
    pub fn on_building_destroyed(&mut self, event: &BuildingDestroyed) {
        if event.owner != self.me.slot {
            return;
        }
        let cleared = self.planners.placement.forget_at(event.position, DESTROYED_TOLERANCE);
        tracing::debug!(
            "{}: lost building at ({:.0}, {:.0}), {} placement records cleared",
            self.me.slot,
            event.position.x,
            event.position.z,
            cleared
        );
    }

    /// Advances the controller one tick.
    ///
    /// 1. Takes a census of the registry
    /// 2. Drops duties held by units that are gone
    /// 3. Recomputes the base anchor and the offensive target
    /// 4. Runs every due behavior in order, logging failures
    pub fn update(&mut self, world: &mut dyn EntityRegistry, delta_time: f32) {
        self.tick += 1;
        self.elapsed += delta_time as f64;
        let tick = self.tick;

        let Self {
            me,
            config,
            rules,
            types,
            roster,
            map,
            default_target,
            services,
            rng,
            scheduler,
            planners,
            failures,
            ..
        } = self;

        // 1. Census
        let census = Census::take(world, me.slot);

        // 2. Duties
        let living: BTreeSet<EntityId> = census.own_units.iter().map(|u| u.id).collect();
        let dropped = planners.duties.retain(|id| living.contains(&id));
        if dropped > 0 {
            tracing::trace!("{}: {} duty holders gone", me.slot, dropped);
        }

        // 3. Anchor and target
        let base = planners
            .placement
            .recompute_anchor(&census.own_buildings)
            .or_else(|| Vec2::centroid(census.own_units.iter().map(|u| u.position)));
        let target = default_target
            .or_else(|| base.map(|b| map.mirror(b)))
            .unwrap_or_else(|| map.center());

        // 4. Behaviors
        let due = scheduler.due(tick);
        if due.is_empty() {
            return;
        }
        let mut ctx = TickContext {
            world,
            census: &census,
            me,
            config,
            rules: &**rules,
            types,
            roster,
            map: *map,
            target,
            tick,
            rng,
            services,
        };
        for behavior in due {
            // An earlier behavior this tick may have pushed this one back.
            if !scheduler.is_due(behavior, tick) {
                continue;
            }
            let last_attack = planners.army.last_attack_tick();
            if let Err(e) = planners.run(behavior, &mut ctx, base) {
                *failures += 1;
                tracing::warn!("{}: {:?} failed at tick {}: {}", me.slot, behavior, tick, e);
            }
            scheduler.mark_ran(behavior, tick, behavior.interval(&config.schedule, me.difficulty));

            // Counterattackers keep their orders for one full army cycle.
            if behavior == Behavior::Defense && planners.army.last_attack_tick() != last_attack {
                let hold = Behavior::Army.interval(&config.schedule, me.difficulty);
                scheduler.defer_until(Behavior::Army, tick + hold);
            }
        }
    }

    pub fn status(&self) -> AiStatus {
        let p = &self.planners;
        AiStatus {
            slot: self.me.slot,
            house: self.me.house,
            ally: self.me.ally,
            difficulty: self.me.difficulty,
            personality: self.me.personality.name.clone(),
            tick: self.tick,
            elapsed_seconds: self.elapsed,
            build_cursor: p.builder.cursor(),
            build_phases: p.builder.phase_count(),
            defense: p.defense.state(),
            defenders: p.duties.count(Duty::Defender),
            scouts: p.duties.count(Duty::Scout),
            specials: p.duties.count(Duty::Special),
            goal: p.goal,
            intel_entries: p.intel.len(),
            explored_fraction: p.scouting.grid().explored_fraction(),
            attacks_launched: p.army.attacks_launched(),
            attacking: p.army.attacking_count(),
            anchor: p.placement.anchor(),
            behavior_failures: self.failures,
        }
    }
}

impl std::fmt::Debug for AiController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AiController")
            .field("me", &self.me)
            .field("tick", &self.tick)
            .field("services", &self.services)
            .field("planners", &self.planners)
            .finish()
    }
}
