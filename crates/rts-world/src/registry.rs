//! Shared entity registry.
//!
//! The simulation owns every entity; AI controllers only read rows and write
//! the intent/health columns through [`EntityRegistry`]. [`ColumnarRegistry`]
//! is the in-memory implementation used by the headless harness and tests:
//! one `Vec` per attribute, indexed by [`EntityId`].

use crate::entity::{
    AttackIntent, Capabilities, EntityId, EntityKind, EntitySnapshot, MoveIntent, PlayerSlot,
};
use crate::geometry::Vec2;
use crate::spatial::{GridIndex, SpatialIndex};

/// Read/write access to the entity columns the AI needs.
pub trait EntityRegistry {
    /// Ids of living entities of `kind`, optionally restricted to one owner.
    fn living(&self, kind: EntityKind, owner: Option<PlayerSlot>) -> Vec<EntityId>;

    /// Current row for `id`. Dead entities are returned with `alive == false`;
    /// unknown ids return `None`.
    fn get(&self, id: EntityId) -> Option<EntitySnapshot>;

    /// Returns false when the entity is unknown or dead.
    fn set_move_intent(&mut self, id: EntityId, intent: MoveIntent) -> bool;

    /// Returns false when the entity is unknown or dead.
    fn set_attack_intent(&mut self, id: EntityId, intent: AttackIntent) -> bool;

    /// Returns false when the entity is unknown or dead.
    fn set_health(&mut self, id: EntityId, health: f32) -> bool;

    /// Optional acceleration structure for radius queries.
    fn spatial(&self) -> Option<&dyn SpatialIndex> {
        None
    }

    fn is_alive(&self, id: EntityId) -> bool {
        self.get(id).map(|e| e.alive).unwrap_or(false)
    }
}

/// Values for a freshly spawned row.
#[derive(Debug, Clone, Copy)]
pub struct NewEntity {
    pub kind: EntityKind,
    pub owner: PlayerSlot,
    pub type_index: u32,
    pub position: Vec2,
    pub max_health: f32,
    pub caps: Capabilities,
}

/// Struct-of-arrays registry. Ids are never reused within a match.
#[derive(Debug, Default)]
pub struct ColumnarRegistry {
    kind: Vec<EntityKind>,
    owner: Vec<PlayerSlot>,
    type_index: Vec<u32>,
    position: Vec<Vec2>,
    health: Vec<f32>,
    max_health: Vec<f32>,
    move_intent: Vec<MoveIntent>,
    attack_intent: Vec<AttackIntent>,
    caps: Vec<Capabilities>,
    alive: Vec<bool>,
    index: Option<GridIndex>,
}

impl ColumnarRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spawn(&mut self, entity: NewEntity) -> EntityId {
        let id = EntityId(self.kind.len() as u32);
        self.kind.push(entity.kind);
        self.owner.push(entity.owner);
        self.type_index.push(entity.type_index);
        self.position.push(entity.position);
        self.health.push(entity.max_health);
        self.max_health.push(entity.max_health);
        self.move_intent.push(MoveIntent::default());
        self.attack_intent.push(AttackIntent::default());
        self.caps.push(entity.caps);
        self.alive.push(true);
        id
    }

    #[inline]
    fn slot(&self, id: EntityId) -> Option<usize> {
        let i = id.0 as usize;
        (i < self.alive.len()).then_some(i)
    }

    #[inline]
    fn living_slot(&self, id: EntityId) -> Option<usize> {
        self.slot(id).filter(|&i| self.alive[i])
    }

    /// Marks the entity dead and clears its intents.
    pub fn kill(&mut self, id: EntityId) -> bool {
        match self.living_slot(id) {
            Some(i) => {
                self.alive[i] = false;
                self.health[i] = 0.0;
                self.move_intent[i] = MoveIntent::cleared();
                self.attack_intent[i] = AttackIntent::cleared();
                true
            }
            None => false,
        }
    }

    pub fn set_position(&mut self, id: EntityId, position: Vec2) -> bool {
        match self.living_slot(id) {
            Some(i) => {
                self.position[i] = position;
                true
            }
            None => false,
        }
    }

    /// Applies damage and returns true when the hit was lethal.
    pub fn damage(&mut self, id: EntityId, amount: f32) -> bool {
        match self.living_slot(id) {
            Some(i) => {
                self.health[i] -= amount;
                if self.health[i] <= 0.0 {
                    self.kill(id);
                    true
                } else {
                    false
                }
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.alive.len()
    }

    pub fn is_empty(&self) -> bool {
        self.alive.is_empty()
    }

    pub fn living_count(&self) -> usize {
        self.alive.iter().filter(|a| **a).count()
    }

    /// Every living row, in id order.
    pub fn iter_living(&self) -> impl Iterator<Item = EntitySnapshot> + '_ {
        (0..self.alive.len())
            .filter(|&i| self.alive[i])
            .map(|i| self.row(i))
    }

    fn row(&self, i: usize) -> EntitySnapshot {
        EntitySnapshot {
            id: EntityId(i as u32),
            kind: self.kind[i],
            owner: self.owner[i],
            type_index: self.type_index[i],
            position: self.position[i],
            health: self.health[i],
            max_health: self.max_health[i],
            move_intent: self.move_intent[i],
            attack_intent: self.attack_intent[i],
            caps: self.caps[i],
            alive: self.alive[i],
        }
    }

    /// Rebuilds (and enables) the spatial index from current positions.
    pub fn rebuild_spatial(&mut self, cell_size: f32) {
        let mut grid = self
            .index
            .take()
            .unwrap_or_else(|| GridIndex::new(cell_size));
        grid.rebuild(
            (0..self.alive.len())
                .filter(|&i| self.alive[i])
                .map(|i| (EntityId(i as u32), self.position[i])),
        );
        self.index = Some(grid);
    }

    pub fn disable_spatial(&mut self) {
        self.index = None;
    }
}

impl EntityRegistry for ColumnarRegistry {
    fn living(&self, kind: EntityKind, owner: Option<PlayerSlot>) -> Vec<EntityId> {
        (0..self.alive.len())
            .filter(|&i| self.alive[i] && self.kind[i] == kind)
            .filter(|&i| owner.map_or(true, |o| self.owner[i] == o))
            .map(|i| EntityId(i as u32))
            .collect()
    }

    fn get(&self, id: EntityId) -> Option<EntitySnapshot> {
        self.slot(id).map(|i| self.row(i))
    }

    fn set_move_intent(&mut self, id: EntityId, intent: MoveIntent) -> bool {
        match self.living_slot(id) {
            Some(i) => {
                self.move_intent[i] = intent;
                true
            }
            None => false,
        }
    }

    fn set_attack_intent(&mut self, id: EntityId, intent: AttackIntent) -> bool {
        match self.living_slot(id) {
            Some(i) => {
                self.attack_intent[i] = intent;
                true
            }
            None => false,
        }
    }

    fn set_health(&mut self, id: EntityId, health: f32) -> bool {
        match self.living_slot(id) {
            Some(i) => {
                self.health[i] = health.min(self.max_health[i]);
                true
            }
            None => false,
        }
    }

    fn spatial(&self) -> Option<&dyn SpatialIndex> {
        self.index.as_ref().map(|g| g as &dyn SpatialIndex)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit(owner: u8, x: f32) -> NewEntity {
        NewEntity {
            kind: EntityKind::Unit,
            owner: PlayerSlot(owner),
            type_index: 0,
            position: Vec2::new(x, 0.0),
            max_health: 100.0,
            caps: Capabilities::MOBILE | Capabilities::ARMED,
        }
    }

    #[test]
    fn test_spawn_and_query_by_owner() {
        let mut reg = ColumnarRegistry::new();
        let a = reg.spawn(unit(1, 0.0));
        let b = reg.spawn(unit(2, 10.0));
        let c = reg.spawn(NewEntity {
            kind: EntityKind::Building,
            ..unit(1, 20.0)
        });

        assert_eq!(reg.living(EntityKind::Unit, None), vec![a, b]);
        assert_eq!(reg.living(EntityKind::Unit, Some(PlayerSlot(1))), vec![a]);
        assert_eq!(reg.living(EntityKind::Building, Some(PlayerSlot(1))), vec![c]);
        assert_eq!(reg.living_count(), 3);
    }

    #[test]
    fn test_writes_rejected_after_death() {
        let mut reg = ColumnarRegistry::new();
        let a = reg.spawn(unit(1, 0.0));
        assert!(reg.set_move_intent(a, MoveIntent::to(Vec2::new(5.0, 5.0))));
        assert!(reg.damage(a, 150.0));

        let row = reg.get(a).unwrap();
        assert!(!row.alive);
        assert!(!row.move_intent.active);
        assert!(!reg.set_move_intent(a, MoveIntent::to(Vec2::ZERO)));
        assert!(!reg.set_attack_intent(a, AttackIntent::on(EntityId(0))));
        assert!(!reg.is_alive(a));
        assert!(reg.get(EntityId(99)).is_none());
    }

    #[test]
    fn test_set_health_caps_at_max() {
        let mut reg = ColumnarRegistry::new();
        let a = reg.spawn(unit(1, 0.0));
        reg.damage(a, 60.0);
        assert_eq!(reg.get(a).unwrap().health, 40.0);
        reg.set_health(a, 500.0);
        assert_eq!(reg.get(a).unwrap().health, 100.0);
    }

    #[test]
    fn test_spatial_index_is_optional() {
        let mut reg = ColumnarRegistry::new();
        reg.spawn(unit(1, 0.0));
        reg.spawn(unit(1, 500.0));
        assert!(reg.spatial().is_none());

        reg.rebuild_spatial(64.0);
        let hits = reg.spatial().unwrap().query_radius(Vec2::ZERO, 100.0);
        assert_eq!(hits, vec![EntityId(0)]);

        reg.disable_spatial();
        assert!(reg.spatial().is_none());
    }
}
