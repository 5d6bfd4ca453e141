//! Weapons, fire resolution and movement for the headless match.
//!
//! Every armed entity deals continuous damage to one target in range. Units
//! with an attack order chase their target; idle units, attack-move tagged
//! units and turrets shoot whatever hostile is closest. Movement is a
//! straight line at the unit's catalog speed.

use std::collections::BTreeSet;

use rts_world::{
    ArmorClass, AttackIntent, AttackMoveTags, BuildingRole, Capabilities, ColumnarRegistry,
    EntityId, EntityKind, EntityRegistry, EntitySnapshot, MoveIntent, PlayerSlot, RulesCatalog,
    TypeTable, WarheadDef,
};

pub const UNIT_RANGE: f32 = 320.0;
pub const TURRET_RANGE: f32 = 420.0;
/// Catalog damage is per shot; one shot per second at 30 ticks per second.
pub const TICKS_PER_SHOT: f32 = 30.0;
/// World units travelled per tick for each point of catalog speed.
pub const SPEED_SCALE: f32 = 1.5;

#[derive(Debug, Clone)]
pub struct Weapon {
    pub damage: f32,
    pub warhead: WarheadDef,
    pub range: f32,
}

impl Weapon {
    fn resolve(rules: &RulesCatalog, turret: Option<&str>, range: f32) -> Option<Self> {
        let turret = rules.turret(turret?)?;
        let projectile = rules.projectile(&turret.projectile)?;
        let warhead = rules.warhead(&projectile.warhead)?;
        Some(Self {
            damage: projectile.damage,
            warhead: warhead.clone(),
            range,
        })
    }

    pub fn damage_per_tick(&self, armor: ArmorClass) -> f32 {
        self.damage * self.warhead.against(armor) / 100.0 / TICKS_PER_SHOT
    }
}

/// Per-type combat data, indexed by the registry's `type_index` column.
#[derive(Debug, Clone, Default)]
pub struct Arsenal {
    unit_weapons: Vec<Option<Weapon>>,
    unit_armor: Vec<ArmorClass>,
    unit_speed: Vec<f32>,
    building_weapons: Vec<Option<Weapon>>,
    building_armor: Vec<ArmorClass>,
}

impl Arsenal {
    pub fn from_catalog(rules: &RulesCatalog, types: &TypeTable) -> Self {
        let mut arsenal = Arsenal::default();
        for name in &types.units {
            let def = rules.unit(name);
            arsenal.unit_weapons.push(def.and_then(|d| {
                Weapon::resolve(rules, d.turret.as_deref(), UNIT_RANGE)
            }));
            arsenal.unit_armor.push(def.map(|d| d.armor).unwrap_or_default());
            arsenal.unit_speed.push(def.map_or(0.0, |d| d.speed));
        }
        for name in &types.buildings {
            let def = rules.building(name);
            arsenal.building_weapons.push(def.and_then(|d| {
                Weapon::resolve(rules, d.turret.as_deref(), TURRET_RANGE)
            }));
            arsenal.building_armor.push(match def.map(|d| d.role) {
                Some(BuildingRole::Wall) => ArmorClass::Concrete,
                _ => ArmorClass::Building,
            });
        }
        arsenal
    }

    pub fn weapon(&self, row: &EntitySnapshot) -> Option<&Weapon> {
        let table = match row.kind {
            EntityKind::Unit => &self.unit_weapons,
            EntityKind::Building => &self.building_weapons,
        };
        table.get(row.type_index as usize)?.as_ref()
    }

    pub fn armor(&self, row: &EntitySnapshot) -> ArmorClass {
        let table = match row.kind {
            EntityKind::Unit => &self.unit_armor,
            EntityKind::Building => &self.building_armor,
        };
        table.get(row.type_index as usize).copied().unwrap_or_default()
    }

    pub fn speed(&self, row: &EntitySnapshot) -> f32 {
        match row.kind {
            EntityKind::Unit => self.unit_speed.get(row.type_index as usize).copied().unwrap_or(0.0),
            EntityKind::Building => 0.0,
        }
    }
}

/// An entity destroyed this tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Kill {
    pub victim: EntitySnapshot,
    pub killer: PlayerSlot,
}

/// Outcome of one round of fire.
#[derive(Debug, Clone, Default)]
pub struct Volley {
    pub kills: Vec<Kill>,
    /// Units that fired this tick and therefore hold position.
    pub engaged: BTreeSet<EntityId>,
}

fn nearest_hostile(world: &ColumnarRegistry, shooter: &EntitySnapshot, range: f32) -> Option<EntitySnapshot> {
    let candidates: Vec<EntityId> = match world.spatial() {
        Some(index) => index.query_radius(shooter.position, range),
        None => world.iter_living().map(|r| r.id).collect(),
    };
    let range_sq = range * range;
    candidates
        .into_iter()
        .filter_map(|id| world.get(id))
        .filter(|r| r.alive && shooter.owner.is_hostile_to(r.owner))
        .filter(|r| r.position.distance_sq(&shooter.position) <= range_sq)
        .min_by(|a, b| {
            a.position
                .distance_sq(&shooter.position)
                .total_cmp(&b.position.distance_sq(&shooter.position))
                .then(a.id.cmp(&b.id))
        })
}

/// Every armed entity picks a target and damages it. Shooters act in id
/// order against the state left by the ones before them.
pub fn resolve_fire(world: &mut ColumnarRegistry, arsenal: &Arsenal, tags: &AttackMoveTags) -> Volley {
    let mut volley = Volley::default();
    let shooters: Vec<EntitySnapshot> = world
        .iter_living()
        .filter(|r| r.has(Capabilities::ARMED) || r.kind == EntityKind::Building)
        .collect();

    for shooter in shooters {
        let Some(weapon) = arsenal.weapon(&shooter) else {
            continue;
        };
        if !world.is_alive(shooter.id) {
            continue;
        }

        let ordered = shooter
            .attack_intent
            .active
            .then_some(shooter.attack_intent.target)
            .flatten();
        let target = match ordered {
            Some(t) => match world.get(t).filter(|r| r.alive) {
                Some(row) if row.position.distance(&shooter.position) <= weapon.range => Some(row),
                // Out of range: the movement step closes in.
                Some(_) => None,
                None => {
                    world.set_attack_intent(shooter.id, AttackIntent::cleared());
                    None
                }
            },
            None if shooter.kind == EntityKind::Building
                || shooter.is_idle()
                || tags.is_tagged(shooter.id) =>
            {
                nearest_hostile(world, &shooter, weapon.range)
            }
            None => None,
        };

        let Some(target) = target else {
            continue;
        };
        volley.engaged.insert(shooter.id);
        let amount = weapon.damage_per_tick(arsenal.armor(&target));
        if amount > 0.0 && world.damage(target.id, amount) {
            volley.kills.push(Kill {
                victim: target,
                killer: shooter.owner,
            });
        }
    }
    volley
}

/// Moves every mobile unit one tick toward its attack target or move
/// destination. Arriving clears the move order.
pub fn move_units(world: &mut ColumnarRegistry, arsenal: &Arsenal, engaged: &BTreeSet<EntityId>) {
    let movers: Vec<EntitySnapshot> = world
        .iter_living()
        .filter(|r| r.kind == EntityKind::Unit && r.has(Capabilities::MOBILE))
        .filter(|r| !engaged.contains(&r.id))
        .collect();

    for unit in movers {
        let chase = unit
            .attack_intent
            .active
            .then_some(unit.attack_intent.target)
            .flatten()
            .and_then(|t| world.get(t))
            .filter(|r| r.alive)
            .map(|r| r.position);
        let destination = match chase {
            Some(p) => p,
            None if unit.move_intent.active => unit.move_intent.target(),
            None => continue,
        };

        let step = arsenal.speed(&unit) * SPEED_SCALE;
        let offset = destination - unit.position;
        let remaining = offset.length();
        if remaining <= step {
            world.set_position(unit.id, destination);
            if chase.is_none() {
                world.set_move_intent(unit.id, MoveIntent::cleared());
            }
        } else {
            world.set_position(unit.id, unit.position + offset.normalize() * step);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rts_world::fixtures::sample_rules;
    use rts_world::{NewEntity, Vec2};

    fn setup() -> (ColumnarRegistry, Arsenal, TypeTable) {
        let rules = sample_rules();
        let types = TypeTable::from_catalog(&rules);
        let arsenal = Arsenal::from_catalog(&rules, &types);
        (ColumnarRegistry::new(), arsenal, types)
    }

    fn unit(world: &mut ColumnarRegistry, types: &TypeTable, owner: u8, name: &str, at: Vec2) -> EntityId {
        world.spawn(NewEntity {
            kind: EntityKind::Unit,
            owner: PlayerSlot(owner),
            type_index: types.unit_index(name).unwrap(),
            position: at,
            max_health: 100.0,
            caps: Capabilities::MOBILE | Capabilities::ARMED,
        })
    }

    #[test]
    fn test_armor_scales_damage() {
        let (_, arsenal, _) = setup();
        let rules = sample_rules();
        let rifle = Weapon::resolve(&rules, Some("RifleTurret"), UNIT_RANGE).unwrap();
        assert!(rifle.damage_per_tick(ArmorClass::None) > rifle.damage_per_tick(ArmorClass::Heavy));
        assert!(arsenal.unit_weapons.iter().any(Option::is_some));
    }

    #[test]
    fn test_idle_units_fire_at_nearest_hostile() {
        let (mut world, arsenal, types) = setup();
        let shooter = unit(&mut world, &types, 1, "ATInfantry", Vec2::new(0.0, 0.0));
        let near = unit(&mut world, &types, 2, "HKLightInf", Vec2::new(100.0, 0.0));
        let far = unit(&mut world, &types, 2, "HKLightInf", Vec2::new(200.0, 0.0));
        let out_of_range = unit(&mut world, &types, 2, "HKLightInf", Vec2::new(2000.0, 0.0));

        let volley = resolve_fire(&mut world, &arsenal, &AttackMoveTags::new());
        assert!(volley.engaged.contains(&shooter));
        assert!(world.get(near).unwrap().health < 100.0);
        assert_eq!(world.get(far).unwrap().health, 100.0);
        assert!(!volley.engaged.contains(&out_of_range));
    }

    #[test]
    fn test_attack_order_chases_then_fires() {
        let (mut world, arsenal, types) = setup();
        let hunter = unit(&mut world, &types, 1, "ATInfantry", Vec2::new(0.0, 0.0));
        let prey = world.spawn(NewEntity {
            kind: EntityKind::Unit,
            owner: PlayerSlot(2),
            type_index: types.unit_index("HKHarvester").unwrap(),
            position: Vec2::new(1000.0, 0.0),
            max_health: 100.0,
            caps: Capabilities::MOBILE | Capabilities::HARVESTER,
        });
        world.set_attack_intent(hunter, AttackIntent::on(prey));

        let volley = resolve_fire(&mut world, &arsenal, &AttackMoveTags::new());
        assert!(volley.engaged.is_empty());
        move_units(&mut world, &arsenal, &volley.engaged);
        let moved = world.get(hunter).unwrap().position;
        assert!(moved.x > 0.0 && moved.x < 1000.0);

        world.set_position(hunter, Vec2::new(900.0, 0.0));
        let volley = resolve_fire(&mut world, &arsenal, &AttackMoveTags::new());
        assert!(volley.engaged.contains(&hunter));
    }

    #[test]
    fn test_dead_target_clears_attack_order() {
        let (mut world, arsenal, types) = setup();
        let hunter = unit(&mut world, &types, 1, "ATInfantry", Vec2::new(0.0, 0.0));
        let prey = unit(&mut world, &types, 2, "HKLightInf", Vec2::new(5000.0, 0.0));
        world.set_attack_intent(hunter, AttackIntent::on(prey));
        world.kill(prey);

        resolve_fire(&mut world, &arsenal, &AttackMoveTags::new());
        assert!(!world.get(hunter).unwrap().attack_intent.active);
    }

    #[test]
    fn test_arrival_clears_move_order() {
        let (mut world, arsenal, types) = setup();
        let walker = unit(&mut world, &types, 1, "ATInfantry", Vec2::new(0.0, 0.0));
        world.set_move_intent(walker, MoveIntent::to(Vec2::new(5.0, 0.0)));

        move_units(&mut world, &arsenal, &BTreeSet::new());
        let row = world.get(walker).unwrap();
        assert_eq!(row.position, Vec2::new(5.0, 0.0));
        assert!(!row.move_intent.active);
    }
}
