//! A two-player match: one AI controller per side on a shared registry,
//! stepped tick by tick until someone has no buildings left or time runs out.

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use std::f32::consts::TAU;
use std::rc::Rc;

use rts_ai::{AiConfig, AiController, Difficulty, Personality};
use rts_world::{
    shared, AttackMoveTags, BuildingDestroyed, BuildingRole, Capabilities, ColumnarRegistry,
    CombatAuthority, EntityId, EntityKind, EntityRegistry, House, MapDimensions, NewEntity,
    PlayerSlot, ResourceLedger, RulesCatalog, Shared, Treasury, TypeTable, UnitCategory, Vec2,
};

use crate::combat::{self, Arsenal, Kill};
use crate::error::SimError;
use crate::production::{Completed, Prerequisite, SkirmishProduction};
use crate::summary::{MatchSummary, PlayerStats, PlayerSummary};

pub const TICKS_PER_SECOND: f32 = 30.0;
const SPATIAL_CELL: f32 = 256.0;
/// Credits a harvester brings in per tick while its owner has a refinery.
const HARVEST_PER_TICK: f64 = 1.0;
const STARTING_INFANTRY: usize = 3;
/// Fraction of the map size between a start position and its corner.
const START_INSET: f32 = 0.15;
const SPAWN_SPREAD: f32 = 90.0;

#[derive(Debug, Clone)]
pub struct MatchConfig {
    pub seed: u64,
    pub ticks: u64,
    pub map: MapDimensions,
    pub houses: [House; 2],
    pub difficulty: Difficulty,
    pub personality: Personality,
    pub starting_credits: f64,
    pub ai: AiConfig,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            ticks: 6000,
            map: MapDimensions::default(),
            houses: [House::Atreides, House::Harkonnen],
            difficulty: Difficulty::Normal,
            personality: Personality::balanced(),
            starting_credits: 5000.0,
            ai: AiConfig::default(),
        }
    }
}

struct Player {
    slot: PlayerSlot,
    house: House,
    ai: AiController,
    stats: PlayerStats,
    eliminated: bool,
}

pub struct Skirmish {
    config: MatchConfig,
    rules: Rc<RulesCatalog>,
    types: TypeTable,
    arsenal: Arsenal,
    world: ColumnarRegistry,
    treasury: Shared<Treasury>,
    production: Shared<SkirmishProduction>,
    tags: Shared<AttackMoveTags>,
    players: Vec<Player>,
    rng: SmallRng,
    tick: u64,
    winner: Option<PlayerSlot>,
}

impl Skirmish {
    pub fn new(config: MatchConfig, rules: RulesCatalog) -> Result<Self, SimError> {
        let rules = Rc::new(rules);
        let types = TypeTable::from_catalog(&rules);
        let arsenal = Arsenal::from_catalog(&rules, &types);
        let slots = [PlayerSlot(1), PlayerSlot(2)];
        let treasury = shared(Treasury::with_starting_credits(&slots, config.starting_credits));
        let production = shared(SkirmishProduction::new(Rc::clone(&rules), treasury.clone()));
        let tags = shared(AttackMoveTags::new());

        let mut players = Vec::new();
        for (slot, house) in slots.into_iter().zip(config.houses) {
            let mut ai = AiController::new(slot, house, Rc::clone(&rules), config.ai.clone(), config.seed);
            ai.set_type_table(types.clone());
            ai.set_map(config.map);
            ai.set_difficulty(config.difficulty);
            ai.set_personality(config.personality.clone());
            ai.set_production(production.clone());
            ai.set_resources(treasury.clone());
            ai.set_combat(tags.clone());
            players.push(Player {
                slot,
                house,
                ai,
                stats: PlayerStats::default(),
                eliminated: false,
            });
        }

        let mut skirmish = Self {
            rng: SmallRng::seed_from_u64(config.seed),
            config,
            rules,
            types,
            arsenal,
            world: ColumnarRegistry::new(),
            treasury,
            production,
            tags,
            players,
            tick: 0,
            winner: None,
        };
        skirmish.deploy_starting_forces()?;
        Ok(skirmish)
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn world(&self) -> &ColumnarRegistry {
        &self.world
    }

    pub fn winner(&self) -> Option<PlayerSlot> {
        self.winner
    }

    pub fn is_finished(&self) -> bool {
        self.winner.is_some() || self.tick >= self.config.ticks
    }

    pub fn controller(&self, slot: PlayerSlot) -> Option<&AiController> {
        self.players.iter().find(|p| p.slot == slot).map(|p| &p.ai)
    }

    fn start_position(&self, index: usize) -> Vec2 {
        let map = self.config.map;
        let corner = Vec2::new(map.width * START_INSET, map.height * START_INSET);
        if index == 0 {
            corner
        } else {
            map.mirror(corner)
        }
    }

    /// Construction yard, a harvester, a scout and a few riflemen per side.
    fn deploy_starting_forces(&mut self) -> Result<(), SimError> {
        for index in 0..self.players.len() {
            let (slot, house) = (self.players[index].slot, self.players[index].house);
            let start = self.start_position(index);

            let yard = self
                .rules
                .buildings()
                .find(|b| b.role == BuildingRole::ConstructionYard && House::from_type_name(&b.name) == Some(house))
                .map(|b| b.name.clone())
                .ok_or(SimError::MissingStart(house, "construction yard"))?;
            self.spawn_building(slot, &yard, start);
            self.production.borrow_mut().grant(slot, &yard);

            let house_units: Vec<_> = self
                .rules
                .units()
                .filter(|u| House::from_type_name(&u.name) == Some(house))
                .cloned()
                .collect();
            let rifleman = house_units
                .iter()
                .filter(|u| u.category == UnitCategory::Infantry && u.turret.is_some() && !u.non_combat)
                .min_by(|a, b| a.cost.total_cmp(&b.cost))
                .ok_or(SimError::MissingStart(house, "armed infantry"))?;
            let mut roster = vec![rifleman.name.clone(); STARTING_INFANTRY];
            if let Some(scout) = house_units.iter().find(|u| u.turret.is_none() && !u.harvester && !u.non_combat) {
                roster.push(scout.name.clone());
            }
            if let Some(harvester) = house_units.iter().find(|u| u.harvester) {
                roster.push(harvester.name.clone());
            }
            for name in roster {
                let at = self.near(start);
                self.spawn_unit(slot, &name, at);
            }
            tracing::info!("{} ({}) starts at ({:.0}, {:.0})", slot, house, start.x, start.z);
        }
        self.world.rebuild_spatial(SPATIAL_CELL);
        Ok(())
    }

    fn near(&mut self, center: Vec2) -> Vec2 {
        let angle = self.rng.gen_range(0.0..TAU);
        let distance = self.rng.gen_range(SPAWN_SPREAD * 0.5..SPAWN_SPREAD);
        self.config.map.clamp(center + Vec2::from_angle(angle) * distance, 32.0)
    }

    fn spawn_unit(&mut self, owner: PlayerSlot, name: &str, at: Vec2) -> Option<EntityId> {
        let def = self.rules.unit(name)?;
        let mut caps = Capabilities::MOBILE;
        if def.turret.is_some() {
            caps |= Capabilities::ARMED;
        }
        if def.harvester {
            caps |= Capabilities::HARVESTER;
        }
        if def.non_combat {
            caps |= Capabilities::SUPPORT;
        }
        if def.category == UnitCategory::Aircraft {
            caps |= Capabilities::AIRBORNE;
        }
        let entity = NewEntity {
            kind: EntityKind::Unit,
            owner,
            type_index: self.types.unit_index(name)?,
            position: at,
            max_health: def.max_health,
            caps,
        };
        Some(self.world.spawn(entity))
    }

    fn spawn_building(&mut self, owner: PlayerSlot, name: &str, at: Vec2) -> Option<EntityId> {
        let def = self.rules.building(name)?;
        let mut caps = Capabilities::empty();
        if def.role == BuildingRole::ConstructionYard {
            caps |= Capabilities::CONSTRUCTION;
        }
        if def.turret.is_some() {
            caps |= Capabilities::ARMED;
        }
        let spec = NewEntity {
            kind: EntityKind::Building,
            owner,
            type_index: self.types.building_index(name)?,
            position: at,
            max_health: def.max_health,
            caps,
        };
        Some(self.world.spawn(spec))
    }

    /// Where a freshly trained unit appears: next to a building that can
    /// produce it, else next to any building of its owner.
    fn exit_point(&mut self, owner: PlayerSlot, type_name: &str) -> Option<Vec2> {
        let producer = match self.production.borrow().prerequisite(type_name, false) {
            Prerequisite::Building(role) => Some(role),
            _ => None,
        };
        let buildings: Vec<_> = self
            .world
            .iter_living()
            .filter(|r| r.kind == EntityKind::Building && r.owner == owner)
            .collect();
        let role_of = |type_index: u32| {
            self.types
                .building_name(type_index)
                .and_then(|n| self.rules.building(n))
                .map(|b| b.role)
        };
        let door = buildings
            .iter()
            .find(|b| producer.is_some() && role_of(b.type_index) == producer)
            .or_else(|| buildings.first())
            .map(|b| b.position)?;
        Some(self.near(door))
    }

    fn place(&mut self, job: Completed) {
        let Some(index) = self.players.iter().position(|p| p.slot == job.owner) else {
            return;
        };
        if job.is_building {
            let fallback = self.start_position(index);
            let site = job.site.unwrap_or(fallback);
            if self.spawn_building(job.owner, &job.type_name, site).is_some() {
                self.players[index].stats.buildings_built += 1;
                tracing::debug!("{}: {} completed", job.owner, job.type_name);
            }
            return;
        }
        let Some(at) = self.exit_point(job.owner, &job.type_name) else {
            return;
        };
        if self.spawn_unit(job.owner, &job.type_name, at).is_some() {
            self.players[index].stats.units_built += 1;
        }
    }

    fn record_kill(&mut self, kill: Kill) {
        let victim = kill.victim;
        if let Some(killer) = self.players.iter_mut().find(|p| p.slot == kill.killer) {
            killer.stats.kills += 1;
        }
        self.tags.borrow_mut().clear_attack_move(&[victim.id]);

        match victim.kind {
            EntityKind::Unit => {
                if let Some(owner) = self.players.iter_mut().find(|p| p.slot == victim.owner) {
                    owner.stats.units_lost += 1;
                }
            }
            EntityKind::Building => {
                if let Some(name) = self.types.building_name(victim.type_index) {
                    self.production.borrow_mut().record_loss(victim.owner, name);
                }
                let event = BuildingDestroyed {
                    owner: victim.owner,
                    position: victim.position,
                };
                for player in &mut self.players {
                    if player.slot == victim.owner {
                        player.stats.buildings_lost += 1;
                    }
                    player.ai.on_building_destroyed(&event);
                }
            }
        }
    }

    fn collect_income(&mut self) {
        let harvesters: Vec<PlayerSlot> = self
            .world
            .iter_living()
            .filter(|r| r.has(Capabilities::HARVESTER))
            .map(|r| r.owner)
            .collect();
        for owner in harvesters {
            if !self.production.borrow().has_role(owner, BuildingRole::Refinery) {
                continue;
            }
            self.treasury.borrow_mut().credit(owner, HARVEST_PER_TICK);
            if let Some(player) = self.players.iter_mut().find(|p| p.slot == owner) {
                player.stats.harvested += HARVEST_PER_TICK;
            }
        }
    }

    fn check_elimination(&mut self) {
        for player in &mut self.players {
            if player.eliminated {
                continue;
            }
            if self.world.living(EntityKind::Building, Some(player.slot)).is_empty() {
                player.eliminated = true;
                tracing::info!("{} eliminated at tick {}", player.slot, self.tick);
            }
        }
        let standing: Vec<PlayerSlot> = self
            .players
            .iter()
            .filter(|p| !p.eliminated)
            .map(|p| p.slot)
            .collect();
        if standing.len() == 1 {
            self.winner = Some(standing[0]);
        }
    }

    /// Advances the match by one tick.
    pub fn step(&mut self) {
        self.tick += 1;
        self.world.rebuild_spatial(SPATIAL_CELL);

        let dt = 1.0 / TICKS_PER_SECOND;
        for player in self.players.iter_mut().filter(|p| !p.eliminated) {
            player.ai.update(&mut self.world, dt);
        }

        let volley = {
            let tags = self.tags.borrow();
            combat::resolve_fire(&mut self.world, &self.arsenal, &tags)
        };
        combat::move_units(&mut self.world, &self.arsenal, &volley.engaged);
        for kill in volley.kills {
            self.record_kill(kill);
        }

        let completed = self.production.borrow_mut().advance();
        for job in completed {
            self.place(job);
        }

        self.collect_income();
        self.check_elimination();
    }

    /// Steps until the match is decided or the tick limit is reached.
    pub fn run(&mut self) -> MatchSummary {
        while !self.is_finished() {
            self.step();
            if self.tick % 1000 == 0 {
                tracing::info!(
                    "tick {}: {} living entities",
                    self.tick,
                    self.world.living_count()
                );
            }
        }
        match self.winner {
            Some(winner) => tracing::info!("{} wins at tick {}", winner, self.tick),
            None => tracing::info!("No winner after {} ticks", self.tick),
        }
        self.summary()
    }

    pub fn summary(&self) -> MatchSummary {
        let treasury = self.treasury.borrow();
        let production = self.production.borrow();
        let players = self
            .players
            .iter()
            .map(|p| PlayerSummary {
                slot: p.slot,
                house: p.house,
                eliminated: p.eliminated,
                credits: treasury.balance(p.slot),
                spent: production.spent(p.slot),
                units: self.world.living(EntityKind::Unit, Some(p.slot)).len(),
                buildings: self.world.living(EntityKind::Building, Some(p.slot)).len(),
                stats: p.stats.clone(),
                ai: p.ai.status(),
            })
            .collect();
        MatchSummary {
            seed: self.config.seed,
            ticks: self.tick,
            winner: self.winner,
            players,
        }
    }
}

impl std::fmt::Debug for Skirmish {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Skirmish")
            .field("tick", &self.tick)
            .field("players", &self.players.len())
            .field("living", &self.world.living_count())
            .field("winner", &self.winner)
            .finish()
    }
}
