//! Combat role classification.
//!
//! A unit's role comes from its weapon chain (unit → turret → projectile →
//! warhead). The warhead's damage table is reduced to three buckets: soft
//! targets (None/Light), armor (Medium/Heavy) and structures
//! (Building/Concrete).

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use rts_world::{ArmorClass, RulesCatalog, UnitDef};

use crate::config::RolesConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    AntiInfantry,
    AntiVehicle,
    AntiBuilding,
    Scout,
}

impl Role {
    pub const ALL: [Role; 4] = [
        Role::AntiInfantry,
        Role::AntiVehicle,
        Role::AntiBuilding,
        Role::Scout,
    ];

    pub fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Role::AntiInfantry => "anti_infantry",
            Role::AntiVehicle => "anti_vehicle",
            Role::AntiBuilding => "anti_building",
            Role::Scout => "scout",
        };
        write!(f, "{}", name)
    }
}

/// Best damage percentage per target bucket.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DamageProfile {
    pub soft: f32,
    pub armored: f32,
    pub structure: f32,
}

impl DamageProfile {
    pub fn of_unit(unit: &UnitDef, rules: &RulesCatalog) -> Option<Self> {
        let warhead = rules.warhead_for_unit(unit)?;
        let best = |a: ArmorClass, b: ArmorClass| warhead.against(a).max(warhead.against(b));
        Some(Self {
            soft: best(ArmorClass::None, ArmorClass::Light),
            armored: best(ArmorClass::Medium, ArmorClass::Heavy),
            structure: best(ArmorClass::Building, ArmorClass::Concrete),
        })
    }

    pub fn role(&self, structure_threshold: f32) -> Role {
        if self.structure > structure_threshold
            && self.structure > self.soft
            && self.structure > self.armored
        {
            Role::AntiBuilding
        } else if self.soft > self.armored {
            Role::AntiInfantry
        } else {
            Role::AntiVehicle
        }
    }
}

pub fn classify(unit: &UnitDef, rules: &RulesCatalog, config: &RolesConfig) -> Role {
    if unit.turret.is_none() {
        let cheap_and_fast =
            unit.cost <= config.scout_max_cost && unit.speed >= config.scout_min_speed;
        return if cheap_and_fast || unit.non_combat {
            Role::Scout
        } else {
            Role::AntiVehicle
        };
    }
    DamageProfile::of_unit(unit, rules)
        .map(|profile| profile.role(config.structure_threshold))
        .unwrap_or(Role::AntiVehicle)
}

/// Role per unit type name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RoleTable {
    roles: BTreeMap<String, Role>,
}

impl RoleTable {
    pub fn build<'a>(
        units: impl IntoIterator<Item = &'a UnitDef>,
        rules: &RulesCatalog,
        config: &RolesConfig,
    ) -> Self {
        Self {
            roles: units
                .into_iter()
                .map(|u| (u.name.clone(), classify(u, rules, config)))
                .collect(),
        }
    }

    pub fn role_of(&self, type_name: &str) -> Option<Role> {
        self.roles.get(type_name).copied()
    }

    /// Unit names with `role`, in name order.
    pub fn with_role(&self, role: Role) -> impl Iterator<Item = &str> {
        self.roles
            .iter()
            .filter(move |(_, r)| **r == role)
            .map(|(name, _)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.roles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roles.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rts_world::fixtures::sample_rules;
    use rts_world::{UnitCategory, WarheadDef};

    fn role(name: &str) -> Role {
        let rules = sample_rules();
        classify(rules.unit(name).unwrap(), &rules, &RolesConfig::default())
    }

    #[test]
    fn test_sample_roster_roles() {
        assert_eq!(role("ATInfantry"), Role::AntiInfantry);
        assert_eq!(role("ATMongoose"), Role::AntiVehicle);
        assert_eq!(role("ATMinotaurus"), Role::AntiBuilding);
        assert_eq!(role("ATKindjal"), Role::AntiBuilding);
        assert_eq!(role("ATSonicTank"), Role::AntiInfantry);
        assert_eq!(role("ORLaserTank"), Role::AntiVehicle);
    }

    #[test]
    fn test_turretless_units() {
        assert_eq!(role("ATScout"), Role::Scout);
        assert_eq!(role("ORDustScout"), Role::Scout);
        // Expensive, but non-combat.
        assert_eq!(role("ATEngineer"), Role::Scout);
        // Slow and expensive with no weapon.
        assert_eq!(role("ATHarvester"), Role::AntiVehicle);
    }

    #[test]
    fn test_structure_bucket_needs_threshold() {
        let mut rules = sample_rules();
        let mut damage = BTreeMap::new();
        damage.insert(ArmorClass::Light, 30.0);
        damage.insert(ArmorClass::Medium, 40.0);
        damage.insert(ArmorClass::Building, 55.0);
        rules.insert_warhead(WarheadDef {
            name: "HighExplosive".to_string(),
            damage,
        });
        // Structure is the best bucket but below the threshold.
        assert_eq!(
            classify(rules.unit("ATMinotaurus").unwrap(), &rules, &RolesConfig::default()),
            Role::AntiVehicle
        );
    }

    #[test]
    fn test_broken_chain_defaults_to_anti_vehicle() {
        let rules = sample_rules();
        let unit = UnitDef {
            name: "ATPrototype".to_string(),
            cost: 100.0,
            speed: 20.0,
            armor: ArmorClass::Light,
            turret: Some("NoSuchTurret".to_string()),
            category: UnitCategory::Vehicle,
            max_health: 100.0,
            harvester: false,
            non_combat: false,
        };
        assert_eq!(classify(&unit, &rules, &RolesConfig::default()), Role::AntiVehicle);
    }

    #[test]
    fn test_role_table_lookup() {
        let rules = sample_rules();
        let table = RoleTable::build(rules.units(), &rules, &RolesConfig::default());
        assert_eq!(table.len(), rules.units().count());
        assert_eq!(table.role_of("HKLightInf"), Some(Role::AntiInfantry));
        assert!(table.with_role(Role::Scout).any(|n| n == "HKScout"));
        assert_eq!(table.role_of("Nothing"), None);
    }
}
