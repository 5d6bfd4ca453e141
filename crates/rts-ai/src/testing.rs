//! Test bed for planner unit tests: a registry, the sample catalog and
//! recording collaborators, lent out as a [`TickContext`].

use rand::rngs::SmallRng;
use rand::SeedableRng;

use rts_world::fixtures::{sample_rules, ScriptedProduction};
use rts_world::{
    shared, BuildingRole, Capabilities, ColumnarRegistry, EntityId, EntityKind, House,
    MapDimensions, NewEntity, PlayerSlot, ProductionAuthority, ResourceLedger, RulesCatalog,
    Shared, Treasury, TypeTable, Vec2,
};

use crate::config::{AiConfig, Difficulty, Personality};
use crate::context::{Census, Identity, Services, TickContext};
use crate::roster::Roster;

pub const ME: PlayerSlot = PlayerSlot(1);
pub const FOE: PlayerSlot = PlayerSlot(2);
pub const BASE: Vec2 = Vec2 { x: 500.0, z: 500.0 };

pub struct Bed {
    pub world: ColumnarRegistry,
    pub rules: RulesCatalog,
    pub types: TypeTable,
    pub roster: Roster,
    pub config: AiConfig,
    pub me: Identity,
    pub census: Census,
    pub target: Vec2,
    pub tick: u64,
    pub rng: SmallRng,
    pub services: Services,
    pub production: Shared<ScriptedProduction>,
    pub treasury: Shared<Treasury>,
}

impl Bed {
    /// Atreides at normal difficulty with `credits` in the treasury.
    pub fn new(credits: f64) -> Self {
        Self::with_ally(None, credits)
    }

    pub fn with_ally(ally: Option<House>, credits: f64) -> Self {
        let rules = sample_rules();
        let types = TypeTable::from_catalog(&rules);
        let config = AiConfig::default();
        let roster = Roster::build(House::Atreides, ally, &rules, &config.roles);
        let production = shared(ScriptedProduction::permissive());
        let treasury = shared(Treasury::with_starting_credits(&[ME, FOE], credits));
        let as_production: Shared<dyn ProductionAuthority> = production.clone();
        let as_ledger: Shared<dyn ResourceLedger> = treasury.clone();
        Self {
            world: ColumnarRegistry::new(),
            rules,
            types,
            roster,
            config,
            me: Identity {
                slot: ME,
                house: House::Atreides,
                ally,
                difficulty: Difficulty::Normal,
                personality: Personality::balanced(),
            },
            census: Census::default(),
            target: Vec2::new(3600.0, 3600.0),
            tick: 100,
            rng: SmallRng::seed_from_u64(3),
            services: Services {
                production: Some(as_production),
                resources: Some(as_ledger),
                combat: None,
                spawn: None,
            },
            production,
            treasury,
        }
    }

    pub fn building(&mut self, owner: PlayerSlot, name: &str, at: Vec2) -> EntityId {
        let def = self.rules.building(name).expect("building in sample rules");
        let caps = if def.role == BuildingRole::ConstructionYard {
            Capabilities::CONSTRUCTION
        } else {
            Capabilities::empty()
        };
        let max_health = def.max_health;
        let type_index = self.types.building_index(name).expect("building type index");
        self.world.spawn(NewEntity {
            kind: EntityKind::Building,
            owner,
            type_index,
            position: at,
            max_health,
            caps,
        })
    }

    pub fn unit(&mut self, owner: PlayerSlot, name: &str, at: Vec2) -> EntityId {
        let def = self.rules.unit(name).expect("unit in sample rules");
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
        let max_health = def.max_health;
        let type_index = self.types.unit_index(name).expect("unit type index");
        self.world.spawn(NewEntity {
            kind: EntityKind::Unit,
            owner,
            type_index,
            position: at,
            max_health,
            caps,
        })
    }

    pub fn balance(&self) -> f64 {
        self.treasury.borrow().balance(ME)
    }

    /// Takes a fresh census and lends everything out for one planner call.
    pub fn ctx(&mut self) -> TickContext<'_> {
        self.census = Census::take(&self.world, self.me.slot);
        TickContext {
            world: &mut self.world,
            census: &self.census,
            me: &self.me,
            config: &self.config,
            rules: &self.rules,
            types: &self.types,
            roster: &self.roster,
            map: MapDimensions::default(),
            target: self.target,
            tick: self.tick,
            rng: &mut self.rng,
            services: &mut self.services,
        }
    }
}
