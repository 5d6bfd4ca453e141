//! Shared setup for controller integration tests.

#![allow(dead_code)]

use std::rc::Rc;

use rts_ai::{AiConfig, AiController, Behavior};
use rts_world::fixtures::sample_rules;
use rts_world::{
    BuildingRole, Capabilities, ColumnarRegistry, EntityId, EntityKind, House, NewEntity,
    PlayerSlot, RulesCatalog, TypeTable, Vec2,
};

pub const ME: PlayerSlot = PlayerSlot(1);
pub const FOE: PlayerSlot = PlayerSlot(2);

/// A registry populated from the sample catalog.
pub struct Skirmish {
    pub world: ColumnarRegistry,
    pub rules: Rc<RulesCatalog>,
    pub types: TypeTable,
}

impl Skirmish {
    pub fn new() -> Self {
        let rules = sample_rules();
        let types = TypeTable::from_catalog(&rules);
        Self {
            world: ColumnarRegistry::new(),
            rules: Rc::new(rules),
            types,
        }
    }

    pub fn building(&mut self, owner: PlayerSlot, name: &str, at: Vec2) -> EntityId {
        let def = self.rules.building(name).expect("building in sample rules");
        let max_health = def.max_health;
        let caps = if def.role == BuildingRole::ConstructionYard {
            Capabilities::CONSTRUCTION
        } else {
            Capabilities::empty()
        };
        self.building_with_health(owner, name, at, max_health, caps)
    }

    pub fn building_with_health(
        &mut self,
        owner: PlayerSlot,
        name: &str,
        at: Vec2,
        max_health: f32,
        caps: Capabilities,
    ) -> EntityId {
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

    pub fn controller(&self, slot: PlayerSlot, house: House) -> AiController {
        let mut ai = AiController::new(slot, house, Rc::clone(&self.rules), AiConfig::default(), 7);
        ai.set_type_table(self.types.clone());
        ai
    }
}

/// Updates until `behavior` has run once more. Panics after `limit` ticks.
pub fn run_until_ran(ai: &mut AiController, world: &mut ColumnarRegistry, behavior: Behavior, limit: u64) {
    let before = ai.scheduler().next_tick(behavior);
    for _ in 0..limit {
        ai.update(world, 1.0 / 30.0);
        if ai.scheduler().next_tick(behavior) != before {
            return;
        }
    }
    panic!("{:?} did not run within {} ticks", behavior, limit);
}
