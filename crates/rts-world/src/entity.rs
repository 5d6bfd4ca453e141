//! Entity identity and the per-entity column values the AI reads and writes.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::geometry::Vec2;

/// Index of an entity in the shared registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityId(pub u32);

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A player slot. Slot 0 is reserved for neutral world objects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PlayerSlot(pub u8);

impl PlayerSlot {
    pub const NEUTRAL: PlayerSlot = PlayerSlot(0);

    pub fn is_neutral(self) -> bool {
        self == Self::NEUTRAL
    }

    /// True when `other` is a non-neutral slot different from this one.
    pub fn is_hostile_to(self, other: PlayerSlot) -> bool {
        !other.is_neutral() && other != self
    }
}

impl fmt::Display for PlayerSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "player_{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Unit,
    Building,
}

bitflags::bitflags! {
    /// Capability tags stored per entity. Replaces "does this thing have
    /// attribute X" probing with one explicit bitset check.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Capabilities: u16 {
        /// Can receive move intents.
        const MOBILE = 1 << 0;
        /// Carries at least one weapon.
        const ARMED = 1 << 1;
        /// Collects resources and returns them to a refinery.
        const HARVESTER = 1 << 2;
        /// Repair, engineer, carryall and other non-combat helpers.
        const SUPPORT = 1 << 3;
        const AIRBORNE = 1 << 4;
        /// Primary construction building.
        const CONSTRUCTION = 1 << 5;
    }
}

impl Default for Capabilities {
    fn default() -> Self {
        Capabilities::empty()
    }
}

/// Destination the movement system should steer toward.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MoveIntent {
    pub x: f32,
    pub z: f32,
    pub active: bool,
}

impl MoveIntent {
    pub fn to(target: Vec2) -> Self {
        Self {
            x: target.x,
            z: target.z,
            active: true,
        }
    }

    pub fn cleared() -> Self {
        Self::default()
    }

    pub fn target(&self) -> Vec2 {
        Vec2::new(self.x, self.z)
    }
}

/// Entity the combat system should engage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AttackIntent {
    pub target: Option<EntityId>,
    pub active: bool,
}

impl AttackIntent {
    pub fn on(target: EntityId) -> Self {
        Self {
            target: Some(target),
            active: true,
        }
    }

    pub fn cleared() -> Self {
        Self::default()
    }
}

/// Copy of one registry row at the moment it was read.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EntitySnapshot {
    pub id: EntityId,
    pub kind: EntityKind,
    pub owner: PlayerSlot,
    pub type_index: u32,
    pub position: Vec2,
    pub health: f32,
    pub max_health: f32,
    pub move_intent: MoveIntent,
    pub attack_intent: AttackIntent,
    pub caps: Capabilities,
    pub alive: bool,
}

impl EntitySnapshot {
    pub fn health_fraction(&self) -> f32 {
        if self.max_health <= 0.0 {
            0.0
        } else {
            (self.health / self.max_health).clamp(0.0, 1.0)
        }
    }

    /// No active move or attack intent.
    pub fn is_idle(&self) -> bool {
        !self.move_intent.active && !self.attack_intent.active
    }

    pub fn is_unit(&self) -> bool {
        self.kind == EntityKind::Unit
    }

    pub fn is_building(&self) -> bool {
        self.kind == EntityKind::Building
    }

    pub fn has(&self, caps: Capabilities) -> bool {
        self.caps.contains(caps)
    }

    /// Armed, not a harvester and not a support unit.
    pub fn is_combatant(&self) -> bool {
        self.is_unit()
            && self.caps.contains(Capabilities::ARMED)
            && !self
                .caps
                .intersects(Capabilities::HARVESTER | Capabilities::SUPPORT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(caps: Capabilities) -> EntitySnapshot {
        EntitySnapshot {
            id: EntityId(1),
            kind: EntityKind::Unit,
            owner: PlayerSlot(1),
            type_index: 0,
            position: Vec2::ZERO,
            health: 50.0,
            max_health: 200.0,
            move_intent: MoveIntent::default(),
            attack_intent: AttackIntent::default(),
            caps,
            alive: true,
        }
    }

    #[test]
    fn test_hostility() {
        assert!(PlayerSlot(1).is_hostile_to(PlayerSlot(2)));
        assert!(!PlayerSlot(1).is_hostile_to(PlayerSlot(1)));
        assert!(!PlayerSlot(1).is_hostile_to(PlayerSlot::NEUTRAL));
    }

    #[test]
    fn test_combatant_excludes_harvesters_and_support() {
        let fighter = snapshot(Capabilities::MOBILE | Capabilities::ARMED);
        assert!(fighter.is_combatant());
        assert_eq!(fighter.health_fraction(), 0.25);

        let harvester = snapshot(Capabilities::MOBILE | Capabilities::ARMED | Capabilities::HARVESTER);
        assert!(!harvester.is_combatant());

        let medic = snapshot(Capabilities::MOBILE | Capabilities::SUPPORT);
        assert!(!medic.is_combatant());
    }

    #[test]
    fn test_intents() {
        let mut s = snapshot(Capabilities::MOBILE);
        assert!(s.is_idle());
        s.move_intent = MoveIntent::to(Vec2::new(4.0, 5.0));
        assert!(!s.is_idle());
        assert_eq!(s.move_intent.target(), Vec2::new(4.0, 5.0));
        assert!(!MoveIntent::cleared().active);
        assert_eq!(AttackIntent::on(EntityId(9)).target, Some(EntityId(9)));
    }
}
