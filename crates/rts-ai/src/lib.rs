//! Skirmish AI: a per-faction controller for a real-time strategy match.
//!
//! The controller reads the world through [`rts_world::EntityRegistry`] and
//! acts on it by writing move and attack intents and by asking the
//! production, resource and combat collaborators for work. It never owns the
//! simulation and never blocks.
//!
//! # Modules
//!
//! - [`controller`]: `AiController`, the entry point, and its `AiStatus`
//! - [`config`]: TOML configuration, difficulty tables, personality presets
//! - [`schedule`]: per-behavior next-eligible-tick scheduling
//! - [`roles`], [`roster`]: tactical roles and the units a house can field
//! - [`composition`]: unit-mix goal and its adaptation to sightings
//! - [`intel`], [`scouting`]: exploration grid, waypoints, sightings, scouts
//! - [`placement`], [`economy`]: base layout, build order, harvesters, repair
//! - [`training`]: unit production against the goal
//! - [`army`], [`defense`]: offensives, defenders, the base alarm
//! - [`duties`], [`orders`], [`context`]: shared plumbing

pub mod army;
pub mod composition;
pub mod config;
pub mod context;
pub mod controller;
pub mod defense;
pub mod duties;
pub mod economy;
pub mod error;
pub mod intel;
pub mod orders;
pub mod placement;
pub mod roles;
pub mod roster;
pub mod schedule;
pub mod scouting;
pub mod training;

#[cfg(test)]
mod testing;

pub use army::{plan_attack_objectives, ArmyAction, ArmyPlanner, Objective};
pub use composition::{adapt_goal, most_underrepresented, CompositionGoal, RoleCounts};
pub use config::{
    AiConfig, ArmyConfig, CompositionConfig, DefenseConfig, Difficulty, EconomyConfig,
    Personality, PlacementConfig, RolesConfig, ScheduleConfig, ScoutingConfig,
};
pub use context::{Census, Identity, Services, TickContext};
pub use controller::{AiController, AiStatus};
pub use defense::{BaseDefense, DefenseEvent, DefenseState};
pub use duties::{Duty, DutyMap};
pub use economy::{BuildOutcome, BuildPlanner, HarvesterAction, BUILD_PHASES};
pub use error::{AiError, ConfigError};
pub use intel::{ExplorationGrid, IntelLedger, Sighting, SightingCategory, Waypoint, WaypointQueue};
pub use placement::PlacementPlanner;
pub use roles::{classify, DamageProfile, Role, RoleTable};
pub use roster::{Roster, UnitPools};
pub use schedule::{Behavior, Scheduler};
pub use scouting::ScoutPlanner;
