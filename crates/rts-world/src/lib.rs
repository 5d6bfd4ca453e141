//! Shared world types for the skirmish AI.
//!
//! This crate contains the data the AI reads and the contracts of the
//! simulation systems it talks to. It has no decision logic and is a
//! dependency for every other crate in the workspace.

pub mod entity;
pub mod geometry;
pub mod house;
pub mod ledger;
pub mod registry;
pub mod rules;
pub mod services;
pub mod spatial;

#[cfg(feature = "test-fixtures")]
pub mod fixtures;

pub use entity::{
    AttackIntent, Capabilities, EntityId, EntityKind, EntitySnapshot, MoveIntent, PlayerSlot,
};
pub use geometry::{MapDimensions, Vec2};
pub use house::{House, UnknownHouse};
pub use ledger::{AttackMoveTags, Treasury};
pub use registry::{ColumnarRegistry, EntityRegistry, NewEntity};
pub use rules::{
    ArmorClass, BuildingDef, BuildingRole, ProjectileDef, RulesCatalog, RulesError, TurretDef,
    TypeTable, UnitCategory, UnitDef, WarheadDef,
};
pub use services::{
    shared, BuildingDestroyed, CombatAuthority, MarketOffer, ProductionAuthority, ResourceLedger,
    Shared, SpawnCallback, SpawnRequest,
};
pub use spatial::{GridIndex, SpatialIndex};
