//! Per-tick view handed to every planner.

use rand::rngs::SmallRng;

use rts_world::{
    BuildingDef, BuildingRole, CombatAuthority, EntityId, EntityKind, EntityRegistry,
    EntitySnapshot, House, MapDimensions, PlayerSlot, ProductionAuthority, ResourceLedger,
    RulesCatalog, Shared, SpawnCallback, SpawnRequest, TypeTable, UnitDef, Vec2,
};

use crate::config::{AiConfig, Difficulty, Personality};
use crate::error::AiError;
use crate::roster::Roster;

/// Who a controller plays as.
#[derive(Debug, Clone)]
pub struct Identity {
    pub slot: PlayerSlot,
    pub house: House,
    pub ally: Option<House>,
    pub difficulty: Difficulty,
    pub personality: Personality,
}

/// Handles to the simulation systems. Every one is optional; behaviors that
/// need a missing one do nothing.
#[derive(Default)]
pub struct Services {
    pub production: Option<Shared<dyn ProductionAuthority>>,
    pub resources: Option<Shared<dyn ResourceLedger>>,
    pub combat: Option<Shared<dyn CombatAuthority>>,
    pub spawn: Option<SpawnCallback>,
}

impl Services {
    /// Current balance; `None` without a ledger.
    pub fn balance(&self, owner: PlayerSlot) -> Option<f64> {
        let ledger = self.resources.as_ref()?;
        ledger.try_borrow().ok().map(|l| l.balance(owner))
    }

    /// Without a ledger nothing is ever unaffordable.
    pub fn can_afford(&self, owner: PlayerSlot, cost: f64) -> bool {
        self.balance(owner).map_or(true, |b| b >= cost)
    }

    pub fn spend(&self, owner: PlayerSlot, amount: f64) -> Result<bool, AiError> {
        let ledger = self
            .resources
            .as_ref()
            .ok_or(AiError::MissingCollaborator("resource ledger"))?;
        let mut ledger = ledger
            .try_borrow_mut()
            .map_err(|_| AiError::Busy("resource ledger"))?;
        Ok(ledger.spend(owner, amount))
    }

    pub fn cost_multiplier(&self, owner: PlayerSlot) -> f32 {
        self.production
            .as_ref()
            .and_then(|p| p.try_borrow().ok().map(|p| p.cost_multiplier(owner)))
            .unwrap_or(1.0)
    }

    pub fn power_ratio(&self, owner: PlayerSlot) -> f32 {
        self.production
            .as_ref()
            .and_then(|p| p.try_borrow().ok().map(|p| p.power_ratio(owner)))
            .unwrap_or(1.0)
    }

    pub fn queue_len(&self, owner: PlayerSlot, is_building: bool) -> usize {
        self.production
            .as_ref()
            .and_then(|p| p.try_borrow().ok().map(|p| p.queue_len(owner, is_building)))
            .unwrap_or(0)
    }

    /// Whether prerequisites are met. With only a spawn callback, everything is.
    pub fn can_build(&self, owner: PlayerSlot, type_name: &str, is_building: bool) -> bool {
        match &self.production {
            Some(p) => p
                .try_borrow()
                .map(|p| p.can_build(owner, type_name, is_building))
                .unwrap_or(false),
            None => self.spawn.is_some(),
        }
    }

    /// Queues production, or spawns directly through the callback when no
    /// production authority is set. Returns whether the request was accepted.
    pub fn produce(
        &mut self,
        owner: PlayerSlot,
        type_name: &str,
        kind: EntityKind,
        position: Vec2,
    ) -> Result<bool, AiError> {
        let is_building = kind == EntityKind::Building;
        if let Some(production) = &self.production {
            let mut production = production
                .try_borrow_mut()
                .map_err(|_| AiError::Busy("production authority"))?;
            if !production.can_build(owner, type_name, is_building) {
                return Ok(false);
            }
            let site = is_building.then_some(position);
            return Ok(production.start_production(owner, type_name, is_building, site));
        }
        let spawn = self
            .spawn
            .as_mut()
            .ok_or(AiError::MissingCollaborator("production authority or spawn callback"))?;
        Ok(spawn(SpawnRequest {
            owner,
            type_name: type_name.to_string(),
            kind,
            position,
        })
        .is_some())
    }

    pub fn tag_attack_move(&self, ids: &[EntityId]) {
        if ids.is_empty() {
            return;
        }
        if let Some(combat) = &self.combat {
            match combat.try_borrow_mut() {
                Ok(mut combat) => combat.tag_for_attack_move(ids),
                Err(_) => tracing::warn!("Combat authority busy; {} units not tagged", ids.len()),
            }
        }
    }

    pub fn clear_attack_move(&self, ids: &[EntityId]) {
        if ids.is_empty() {
            return;
        }
        if let Some(combat) = &self.combat {
            match combat.try_borrow_mut() {
                Ok(mut combat) => combat.clear_attack_move(ids),
                Err(_) => tracing::warn!("Combat authority busy; {} units not cleared", ids.len()),
            }
        }
    }
}

impl std::fmt::Debug for Services {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Services")
            .field("production", &self.production.is_some())
            .field("resources", &self.resources.is_some())
            .field("combat", &self.combat.is_some())
            .field("spawn", &self.spawn.is_some())
            .finish()
    }
}

/// Snapshot of every living entity, split by side, taken once per tick.
#[derive(Debug, Clone, Default)]
pub struct Census {
    pub own_units: Vec<EntitySnapshot>,
    pub own_buildings: Vec<EntitySnapshot>,
    pub enemy_units: Vec<EntitySnapshot>,
    pub enemy_buildings: Vec<EntitySnapshot>,
}

impl Census {
    pub fn take(world: &dyn EntityRegistry, me: PlayerSlot) -> Self {
        let mut census = Census::default();
        for kind in [EntityKind::Unit, EntityKind::Building] {
            for id in world.living(kind, None) {
                let Some(row) = world.get(id).filter(|r| r.alive) else {
                    continue;
                };
                let bucket = match (kind, row.owner == me) {
                    (EntityKind::Unit, true) => &mut census.own_units,
                    (EntityKind::Building, true) => &mut census.own_buildings,
                    (EntityKind::Unit, false) if me.is_hostile_to(row.owner) => {
                        &mut census.enemy_units
                    }
                    (EntityKind::Building, false) if me.is_hostile_to(row.owner) => {
                        &mut census.enemy_buildings
                    }
                    _ => continue,
                };
                bucket.push(row);
            }
        }
        census
    }

    pub fn own(&self, id: EntityId) -> Option<&EntitySnapshot> {
        self.own_units
            .iter()
            .chain(self.own_buildings.iter())
            .find(|s| s.id == id)
    }

    pub fn enemies(&self) -> impl Iterator<Item = &EntitySnapshot> {
        self.enemy_units.iter().chain(self.enemy_buildings.iter())
    }
}

/// Everything a planner may read or touch during one behavior run.
pub struct TickContext<'a> {
    pub world: &'a mut dyn EntityRegistry,
    pub census: &'a Census,
    pub me: &'a Identity,
    pub config: &'a AiConfig,
    pub rules: &'a RulesCatalog,
    pub types: &'a TypeTable,
    pub roster: &'a Roster,
    pub map: MapDimensions,
    /// Where offensives go when nothing better is known.
    pub target: Vec2,
    pub tick: u64,
    pub rng: &'a mut SmallRng,
    pub services: &'a mut Services,
}

impl<'a> TickContext<'a> {
    pub fn slot(&self) -> PlayerSlot {
        self.me.slot
    }

    pub fn difficulty(&self) -> Difficulty {
        self.me.difficulty
    }

    pub fn personality(&self) -> &Personality {
        &self.me.personality
    }

    pub fn unit_def(&self, row: &EntitySnapshot) -> Option<&'a UnitDef> {
        if !row.is_unit() {
            return None;
        }
        let (types, rules) = (self.types, self.rules);
        types.unit_name(row.type_index).and_then(|name| rules.unit(name))
    }

    pub fn building_def(&self, row: &EntitySnapshot) -> Option<&'a BuildingDef> {
        if !row.is_building() {
            return None;
        }
        let (types, rules) = (self.types, self.rules);
        types
            .building_name(row.type_index)
            .and_then(|name| rules.building(name))
    }

    /// Rules name of an entity.
    pub fn type_name(&self, row: &EntitySnapshot) -> Option<&'a str> {
        let types = self.types;
        if row.is_unit() {
            types.unit_name(row.type_index)
        } else {
            types.building_name(row.type_index)
        }
    }

    pub fn building_role(&self, row: &EntitySnapshot) -> Option<BuildingRole> {
        self.building_def(row).map(|b| b.role)
    }

    /// Catalog price adjusted by the production authority's multiplier.
    pub fn price(&self, type_name: &str) -> Option<f64> {
        let cost = self.rules.cost_of(type_name)?;
        Some((cost * self.services.cost_multiplier(self.me.slot)) as f64)
    }

    /// Living hostile units within `radius` of `center`, via the spatial
    /// index when there is one.
    pub fn hostile_units_near(&self, center: Vec2, radius: f32) -> Vec<EntitySnapshot> {
        let me = self.me.slot;
        match self.world.spatial() {
            Some(index) => index
                .query_radius(center, radius)
                .into_iter()
                .filter_map(|id| self.world.get(id))
                .filter(|s| s.alive && s.is_unit() && me.is_hostile_to(s.owner))
                .collect(),
            None => {
                let radius_sq = radius * radius;
                self.census
                    .enemy_units
                    .iter()
                    .filter(|s| s.position.distance_sq(&center) <= radius_sq)
                    .copied()
                    .collect()
            }
        }
    }
}
