//! Rules catalog: read-only unit, building and weapon-chain definitions.
//!
//! Loaded from JSON. A unit's weapon is described by a chain of named
//! records: unit → turret → projectile → warhead. Any link may be missing
//! from a given catalog, so every lookup returns `Option`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Armor class a warhead's damage table is keyed by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
pub enum ArmorClass {
    #[default]
    None,
    Light,
    Medium,
    Heavy,
    Building,
    Concrete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitCategory {
    Infantry,
    Vehicle,
    Aircraft,
    Special,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildingRole {
    ConstructionYard,
    Power,
    Refinery,
    Barracks,
    Factory,
    Tech,
    Starport,
    Turret,
    Wall,
    Other,
}

impl BuildingRole {
    /// Production buildings that can queue units.
    pub fn is_production(self) -> bool {
        matches!(
            self,
            BuildingRole::Barracks | BuildingRole::Factory | BuildingRole::Starport
        )
    }
}

fn default_health() -> f32 {
    100.0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitDef {
    pub name: String,
    pub cost: f32,
    pub speed: f32,
    #[serde(default)]
    pub armor: ArmorClass,
    #[serde(default)]
    pub turret: Option<String>,
    pub category: UnitCategory,
    #[serde(default = "default_health")]
    pub max_health: f32,
    /// Collects resources.
    #[serde(default)]
    pub harvester: bool,
    /// Engineers, repair vehicles, carryalls.
    #[serde(default)]
    pub non_combat: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildingDef {
    pub name: String,
    pub cost: f32,
    pub role: BuildingRole,
    #[serde(default = "default_health")]
    pub max_health: f32,
    #[serde(default)]
    pub turret: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurretDef {
    pub name: String,
    pub projectile: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectileDef {
    pub name: String,
    pub warhead: String,
    #[serde(default)]
    pub damage: f32,
}

/// Damage percentages by armor class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WarheadDef {
    pub name: String,
    #[serde(default)]
    pub damage: BTreeMap<ArmorClass, f32>,
}

impl WarheadDef {
    /// Percentage applied against `armor`; classes absent from the table deal nothing.
    pub fn against(&self, armor: ArmorClass) -> f32 {
        self.damage.get(&armor).copied().unwrap_or(0.0)
    }
}

/// On-disk layout: flat lists, indexed by name on load.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct RulesFile {
    #[serde(default)]
    units: Vec<UnitDef>,
    #[serde(default)]
    buildings: Vec<BuildingDef>,
    #[serde(default)]
    turrets: Vec<TurretDef>,
    #[serde(default)]
    projectiles: Vec<ProjectileDef>,
    #[serde(default)]
    warheads: Vec<WarheadDef>,
}

/// Errors that can occur while loading a rules catalog.
#[derive(Debug, thiserror::Error)]
pub enum RulesError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Name-indexed definitions. Iteration order is by name, so anything built
/// from the catalog is deterministic.
#[derive(Debug, Clone, Default)]
pub struct RulesCatalog {
    units: BTreeMap<String, UnitDef>,
    buildings: BTreeMap<String, BuildingDef>,
    turrets: BTreeMap<String, TurretDef>,
    projectiles: BTreeMap<String, ProjectileDef>,
    warheads: BTreeMap<String, WarheadDef>,
}

impl RulesCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json_str(content: &str) -> Result<Self, RulesError> {
        let file: RulesFile = serde_json::from_str(content)?;
        let mut catalog = Self::new();
        file.units.into_iter().for_each(|u| catalog.insert_unit(u));
        file.buildings.into_iter().for_each(|b| catalog.insert_building(b));
        file.turrets.into_iter().for_each(|t| catalog.insert_turret(t));
        file.projectiles.into_iter().for_each(|p| catalog.insert_projectile(p));
        file.warheads.into_iter().for_each(|w| catalog.insert_warhead(w));
        Ok(catalog)
    }

    pub fn from_file(path: &Path) -> Result<Self, RulesError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    pub fn insert_unit(&mut self, def: UnitDef) {
        self.units.insert(def.name.clone(), def);
    }

    pub fn insert_building(&mut self, def: BuildingDef) {
        self.buildings.insert(def.name.clone(), def);
    }

    pub fn insert_turret(&mut self, def: TurretDef) {
        self.turrets.insert(def.name.clone(), def);
    }

    pub fn insert_projectile(&mut self, def: ProjectileDef) {
        self.projectiles.insert(def.name.clone(), def);
    }

    pub fn insert_warhead(&mut self, def: WarheadDef) {
        self.warheads.insert(def.name.clone(), def);
    }

    pub fn unit(&self, name: &str) -> Option<&UnitDef> {
        self.units.get(name)
    }

    pub fn building(&self, name: &str) -> Option<&BuildingDef> {
        self.buildings.get(name)
    }

    pub fn turret(&self, name: &str) -> Option<&TurretDef> {
        self.turrets.get(name)
    }

    pub fn projectile(&self, name: &str) -> Option<&ProjectileDef> {
        self.projectiles.get(name)
    }

    pub fn warhead(&self, name: &str) -> Option<&WarheadDef> {
        self.warheads.get(name)
    }

    pub fn units(&self) -> impl Iterator<Item = &UnitDef> {
        self.units.values()
    }

    pub fn buildings(&self) -> impl Iterator<Item = &BuildingDef> {
        self.buildings.values()
    }

    /// Follows unit → turret → projectile → warhead; `None` if any link is missing.
    pub fn warhead_for_unit(&self, unit: &UnitDef) -> Option<&WarheadDef> {
        let turret = self.turret(unit.turret.as_deref()?)?;
        let projectile = self.projectile(&turret.projectile)?;
        self.warhead(&projectile.warhead)
    }

    /// Cost of a unit or building by name.
    pub fn cost_of(&self, name: &str) -> Option<f32> {
        self.unit(name)
            .map(|u| u.cost)
            .or_else(|| self.building(name).map(|b| b.cost))
    }
}

/// Maps the registry's per-entity `type_index` column to rules names.
///
/// Units and buildings are numbered separately, in catalog (name) order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TypeTable {
    pub units: Vec<String>,
    pub buildings: Vec<String>,
}

impl TypeTable {
    pub fn from_catalog(catalog: &RulesCatalog) -> Self {
        Self {
            units: catalog.units().map(|u| u.name.clone()).collect(),
            buildings: catalog.buildings().map(|b| b.name.clone()).collect(),
        }
    }

    pub fn unit_name(&self, index: u32) -> Option<&str> {
        self.units.get(index as usize).map(String::as_str)
    }

    pub fn building_name(&self, index: u32) -> Option<&str> {
        self.buildings.get(index as usize).map(String::as_str)
    }

    pub fn unit_index(&self, name: &str) -> Option<u32> {
        self.units.iter().position(|n| n == name).map(|i| i as u32)
    }

    pub fn building_index(&self, name: &str) -> Option<u32> {
        self.buildings.iter().position(|n| n == name).map(|i| i as u32)
    }
}
