//! Sample data and scripted collaborators for testing.
//!
//! Enable the `test-fixtures` feature to access these helpers.
//!
//! # Example
//!
//! ```ignore
//! // In your Cargo.toml:
//! // [dev-dependencies]
//! // rts-world = { path = "../rts-world", features = ["test-fixtures"] }
//!
//! use rts_world::fixtures;
//!
//! let rules = fixtures::sample_rules();
//! let production = fixtures::ScriptedProduction::permissive();
//! ```

use std::collections::{BTreeMap, BTreeSet};

use crate::entity::PlayerSlot;
use crate::geometry::Vec2;
use crate::rules::RulesCatalog;
use crate::services::{MarketOffer, ProductionAuthority};

/// Raw JSON of the sample catalog.
pub fn sample_rules_json() -> &'static str {
    include_str!("../tests/fixtures/sample_rules.json")
}

/// Returns the sample rules catalog.
///
/// Contains:
/// - full rosters for Atreides, Harkonnen and Ordos (infantry, vehicles,
///   aircraft, scouts, engineers, harvesters)
/// - one or two units and a structure for each sub-house
/// - every building role, two turret types and walls per great house
/// - six warheads spanning anti-infantry, anti-vehicle and anti-structure profiles
pub fn sample_rules() -> RulesCatalog {
    RulesCatalog::from_json_str(sample_rules_json())
        .unwrap_or_else(|e| panic!("Failed to parse sample_rules.json: {}", e))
}

/// One accepted production request.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductionOrder {
    pub owner: PlayerSlot,
    pub type_name: String,
    pub is_building: bool,
    pub site: Option<Vec2>,
}

/// Production authority that accepts everything not explicitly refused and
/// records what it was asked to do. Nothing is ever actually produced.
#[derive(Debug, Clone)]
pub struct ScriptedProduction {
    pub orders: Vec<ProductionOrder>,
    pub upgrades: Vec<String>,
    pub purchases: Vec<String>,
    /// Types whose prerequisites are reported as missing.
    pub refused: BTreeSet<String>,
    /// Completed building counts by type, as reported by `owned_count`.
    pub owned: BTreeMap<String, usize>,
    pub upgradable: BTreeSet<String>,
    pub offers: Vec<MarketOffer>,
    pub power_ratio: f32,
    pub cost_multiplier: f32,
    /// Queue length reported for both queues.
    pub queued: usize,
}

impl ScriptedProduction {
    pub fn permissive() -> Self {
        Self {
            orders: Vec::new(),
            upgrades: Vec::new(),
            purchases: Vec::new(),
            refused: BTreeSet::new(),
            owned: BTreeMap::new(),
            upgradable: BTreeSet::new(),
            offers: Vec::new(),
            power_ratio: 1.0,
            cost_multiplier: 1.0,
            queued: 0,
        }
    }

    pub fn refuse(mut self, type_name: &str) -> Self {
        self.refused.insert(type_name.to_string());
        self
    }

    /// Names of every building order, in request order.
    pub fn building_orders(&self) -> Vec<&str> {
        self.orders
            .iter()
            .filter(|o| o.is_building)
            .map(|o| o.type_name.as_str())
            .collect()
    }

    /// Names of every unit order, in request order.
    pub fn unit_orders(&self) -> Vec<&str> {
        self.orders
            .iter()
            .filter(|o| !o.is_building)
            .map(|o| o.type_name.as_str())
            .collect()
    }
}

impl Default for ScriptedProduction {
    fn default() -> Self {
        Self::permissive()
    }
}

impl ProductionAuthority for ScriptedProduction {
    fn can_build(&self, _owner: PlayerSlot, type_name: &str, _is_building: bool) -> bool {
        !self.refused.contains(type_name)
    }

    fn start_production(
        &mut self,
        owner: PlayerSlot,
        type_name: &str,
        is_building: bool,
        site: Option<Vec2>,
    ) -> bool {
        if self.refused.contains(type_name) {
            return false;
        }
        self.orders.push(ProductionOrder {
            owner,
            type_name: type_name.to_string(),
            is_building,
            site,
        });
        true
    }

    fn queue_len(&self, _owner: PlayerSlot, _is_building: bool) -> usize {
        self.queued
    }

    fn owned_count(&self, _owner: PlayerSlot, type_name: &str) -> usize {
        self.owned.get(type_name).copied().unwrap_or(0)
    }

    fn can_upgrade(&self, _owner: PlayerSlot, building_type: &str) -> bool {
        self.upgradable.contains(building_type)
    }

    fn start_upgrade(&mut self, _owner: PlayerSlot, building_type: &str) -> bool {
        if self.upgradable.remove(building_type) {
            self.upgrades.push(building_type.to_string());
            true
        } else {
            false
        }
    }

    fn cost_multiplier(&self, _owner: PlayerSlot) -> f32 {
        self.cost_multiplier
    }

    fn power_ratio(&self, _owner: PlayerSlot) -> f32 {
        self.power_ratio
    }

    fn market_offers(&self, _owner: PlayerSlot) -> Vec<MarketOffer> {
        self.offers.clone()
    }

    fn purchase_offer(&mut self, _owner: PlayerSlot, type_name: &str) -> bool {
        match self.offers.iter().position(|o| o.type_name == type_name) {
            Some(i) => {
                self.offers.remove(i);
                self.purchases.push(type_name.to_string());
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::house::House;
    use crate::rules::BuildingRole;

    #[test]
    fn test_sample_rules_load() {
        let rules = sample_rules();
        assert!(rules.units().count() >= 30);
        for house in [House::Atreides, House::Harkonnen, House::Ordos] {
            let roles: BTreeSet<_> = rules
                .buildings()
                .filter(|b| House::from_type_name(&b.name) == Some(house))
                .map(|b| format!("{:?}", b.role))
                .collect();
            assert!(roles.len() >= 9, "{} is missing building roles", house);
        }
        let turret = rules.building("HKGunTurret").unwrap();
        assert_eq!(turret.role, BuildingRole::Turret);
    }

    #[test]
    fn test_every_turret_chain_resolves() {
        let rules = sample_rules();
        for unit in rules.units().filter(|u| u.turret.is_some()) {
            assert!(
                rules.warhead_for_unit(unit).is_some(),
                "{} has a broken weapon chain",
                unit.name
            );
        }
    }

    #[test]
    fn test_scripted_production_records_orders() {
        let mut production = ScriptedProduction::permissive().refuse("ATPalace");
        let p = PlayerSlot(1);
        assert!(production.start_production(p, "ATBarracks", true, Some(Vec2::ZERO)));
        assert!(!production.start_production(p, "ATPalace", true, None));
        assert!(production.start_production(p, "ATInfantry", false, None));
        assert_eq!(production.building_orders(), vec!["ATBarracks"]);
        assert_eq!(production.unit_orders(), vec!["ATInfantry"]);
    }
}
