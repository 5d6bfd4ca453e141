//! What a controller can build.
//!
//! A roster is the house's (and its allied sub-house's) slice of the rules
//! catalog: unit pools by category, the role table over those pools, and the
//! house's building for each building role. Pools and roles are built
//! together and replaced together.

use std::collections::BTreeMap;

use rts_world::{BuildingRole, House, RulesCatalog, UnitCategory, UnitDef};

use crate::config::RolesConfig;
use crate::roles::{Role, RoleTable};

/// Buildable unit names per category, in name order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UnitPools {
    pub infantry: Vec<String>,
    pub vehicle: Vec<String>,
    pub aircraft: Vec<String>,
    pub special: Vec<String>,
}

impl UnitPools {
    pub fn get(&self, category: UnitCategory) -> &[String] {
        match category {
            UnitCategory::Infantry => &self.infantry,
            UnitCategory::Vehicle => &self.vehicle,
            UnitCategory::Aircraft => &self.aircraft,
            UnitCategory::Special => &self.special,
        }
    }

    fn push(&mut self, category: UnitCategory, name: String) {
        match category {
            UnitCategory::Infantry => self.infantry.push(name),
            UnitCategory::Vehicle => self.vehicle.push(name),
            UnitCategory::Aircraft => self.aircraft.push(name),
            UnitCategory::Special => self.special.push(name),
        }
    }

    pub fn len(&self) -> usize {
        self.infantry.len() + self.vehicle.len() + self.aircraft.len() + self.special.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Roster {
    house: House,
    ally: Option<House>,
    pools: UnitPools,
    roles: RoleTable,
    buildings: BTreeMap<BuildingRole, Vec<String>>,
    ally_buildings: Vec<String>,
    harvester: Option<String>,
}

impl Roster {
    pub fn build(
        house: House,
        ally: Option<House>,
        rules: &RulesCatalog,
        config: &RolesConfig,
    ) -> Self {
        let belongs = |name: &str, h: Option<House>| h.is_some() && House::from_type_name(name) == h;

        let mut pools = UnitPools::default();
        let mut pooled: Vec<&UnitDef> = Vec::new();
        let mut harvester = None;
        for unit in rules.units() {
            if !belongs(&unit.name, Some(house)) && !belongs(&unit.name, ally) {
                continue;
            }
            if unit.harvester {
                // The house's own harvester wins over an ally's.
                if harvester.is_none() || belongs(&unit.name, Some(house)) {
                    harvester = Some(unit.name.clone());
                }
                continue;
            }
            pools.push(unit.category, unit.name.clone());
            pooled.push(unit);
        }
        let roles = RoleTable::build(pooled, rules, config);

        let mut buildings: BTreeMap<BuildingRole, Vec<String>> = BTreeMap::new();
        let mut ally_buildings = Vec::new();
        for def in rules.buildings() {
            if belongs(&def.name, Some(house)) {
                buildings.entry(def.role).or_default().push(def.name.clone());
            } else if belongs(&def.name, ally) {
                ally_buildings.push(def.name.clone());
            }
        }

        tracing::debug!(
            "Roster for {} (ally {:?}): {} units, {} building types",
            house,
            ally,
            pools.len(),
            buildings.values().map(Vec::len).sum::<usize>()
        );

        Self {
            house,
            ally,
            pools,
            roles,
            buildings,
            ally_buildings,
            harvester,
        }
    }

    pub fn house(&self) -> House {
        self.house
    }

    pub fn ally(&self) -> Option<House> {
        self.ally
    }

    pub fn pools(&self) -> &UnitPools {
        &self.pools
    }

    pub fn roles(&self) -> &RoleTable {
        &self.roles
    }

    pub fn role_of(&self, unit: &str) -> Option<Role> {
        self.roles.role_of(unit)
    }

    /// Pooled units with `role`, in name order.
    pub fn units_with_role(&self, role: Role) -> impl Iterator<Item = &str> {
        self.roles.with_role(role)
    }

    /// The house's first building for `role`.
    pub fn building_for(&self, role: BuildingRole) -> Option<&str> {
        self.buildings
            .get(&role)
            .and_then(|names| names.first())
            .map(String::as_str)
    }

    pub fn buildings_for(&self, role: BuildingRole) -> &[String] {
        self.buildings.get(&role).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn ally_buildings(&self) -> &[String] {
        &self.ally_buildings
    }

    pub fn harvester(&self) -> Option<&str> {
        self.harvester.as_deref()
    }

    /// Whether a roster for this house/ally pair is still current.
    pub fn matches(&self, house: House, ally: Option<House>) -> bool {
        self.house == house && self.ally == ally
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rts_world::fixtures::sample_rules;

    #[test]
    fn test_great_house_roster() {
        let rules = sample_rules();
        let roster = Roster::build(House::Atreides, None, &rules, &RolesConfig::default());

        assert_eq!(roster.harvester(), Some("ATHarvester"));
        assert!(roster.pools().infantry.contains(&"ATSniper".to_string()));
        assert!(roster.pools().aircraft.contains(&"ATOrnithopter".to_string()));
        assert!(!roster.pools().vehicle.iter().any(|n| n.starts_with("HK")));
        assert_eq!(roster.building_for(BuildingRole::Refinery), Some("ATRefinery"));
        assert_eq!(roster.buildings_for(BuildingRole::Turret).len(), 2);
        assert!(roster.ally_buildings().is_empty());
        assert_eq!(roster.roles().len(), roster.pools().len());
    }

    #[test]
    fn test_ally_extends_pools_and_buildings() {
        let rules = sample_rules();
        let config = RolesConfig::default();
        let solo = Roster::build(House::Harkonnen, None, &rules, &config);
        let allied = Roster::build(House::Harkonnen, Some(House::Sardaukar), &rules, &config);

        assert!(allied.pools().len() > solo.pools().len());
        assert_eq!(allied.role_of("IMSardaukar"), Some(Role::AntiVehicle));
        assert_eq!(allied.ally_buildings(), &["IMBarracks".to_string()]);
        // Ally buildings are not part of the house's own role map.
        assert_eq!(allied.building_for(BuildingRole::Barracks), Some("HKBarracks"));
        assert!(allied.matches(House::Harkonnen, Some(House::Sardaukar)));
        assert!(!allied.matches(House::Harkonnen, None));
    }
}
