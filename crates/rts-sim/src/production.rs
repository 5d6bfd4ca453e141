//! Production authority for the headless match: prerequisites, one building
//! queue and one unit queue per player, charging through the ledger, and a
//! power balance that slows construction.

use std::collections::{BTreeMap, VecDeque};
use std::rc::Rc;

use rts_world::{
    BuildingRole, PlayerSlot, ProductionAuthority, ResourceLedger, RulesCatalog, Shared,
    UnitCategory, Vec2,
};

/// Credits worth of work finished per tick at full power.
pub const BUILD_RATE: f32 = 10.0;
const POWER_PER_PLANT: f32 = 100.0;
const POWER_DRAIN: f32 = 20.0;
/// Production never stalls completely, however bad the power balance.
const MIN_SPEED: f32 = 0.25;

/// What has to be standing before something can be produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Prerequisite {
    Nothing,
    Building(BuildingRole),
    /// Not producible at all (construction yards, unknown names).
    Unbuildable,
}

/// Work in progress on a queue.
#[derive(Debug, Clone, PartialEq)]
pub struct Job {
    pub type_name: String,
    pub is_building: bool,
    pub site: Option<Vec2>,
    pub remaining: f32,
}

/// A finished job, ready to be placed in the world.
#[derive(Debug, Clone, PartialEq)]
pub struct Completed {
    pub owner: PlayerSlot,
    pub type_name: String,
    pub is_building: bool,
    pub site: Option<Vec2>,
}

#[derive(Debug, Clone, Default)]
struct PlayerQueues {
    buildings: VecDeque<Job>,
    units: VecDeque<Job>,
    owned: BTreeMap<String, usize>,
    spent: f64,
}

impl PlayerQueues {
    fn queue_mut(&mut self, is_building: bool) -> &mut VecDeque<Job> {
        if is_building {
            &mut self.buildings
        } else {
            &mut self.units
        }
    }
}

pub struct SkirmishProduction {
    rules: Rc<RulesCatalog>,
    ledger: Shared<dyn ResourceLedger>,
    players: BTreeMap<PlayerSlot, PlayerQueues>,
}

impl SkirmishProduction {
    pub fn new(rules: Rc<RulesCatalog>, ledger: Shared<dyn ResourceLedger>) -> Self {
        Self {
            rules,
            ledger,
            players: BTreeMap::new(),
        }
    }

    pub fn prerequisite(&self, type_name: &str, is_building: bool) -> Prerequisite {
        if is_building {
            let Some(def) = self.rules.building(type_name) else {
                return Prerequisite::Unbuildable;
            };
            return match def.role {
                BuildingRole::ConstructionYard => Prerequisite::Unbuildable,
                BuildingRole::Factory => Prerequisite::Building(BuildingRole::Refinery),
                BuildingRole::Tech | BuildingRole::Starport => {
                    Prerequisite::Building(BuildingRole::Factory)
                }
                BuildingRole::Turret => Prerequisite::Building(BuildingRole::Barracks),
                _ => Prerequisite::Nothing,
            };
        }
        let Some(def) = self.rules.unit(type_name) else {
            return Prerequisite::Unbuildable;
        };
        if def.harvester {
            return Prerequisite::Building(BuildingRole::Refinery);
        }
        Prerequisite::Building(match def.category {
            UnitCategory::Infantry => BuildingRole::Barracks,
            UnitCategory::Vehicle => BuildingRole::Factory,
            UnitCategory::Aircraft => BuildingRole::Starport,
            UnitCategory::Special => BuildingRole::Tech,
        })
    }

    /// Whether `owner` has a completed building with `role`.
    pub fn has_role(&self, owner: PlayerSlot, role: BuildingRole) -> bool {
        self.players.get(&owner).is_some_and(|p| {
            p.owned.iter().any(|(name, count)| {
                *count > 0 && self.rules.building(name).is_some_and(|b| b.role == role)
            })
        })
    }

    /// Counts a building as owned without going through a queue.
    pub fn grant(&mut self, owner: PlayerSlot, type_name: &str) {
        *self
            .players
            .entry(owner)
            .or_default()
            .owned
            .entry(type_name.to_string())
            .or_insert(0) += 1;
    }

    pub fn record_loss(&mut self, owner: PlayerSlot, type_name: &str) {
        if let Some(count) = self
            .players
            .get_mut(&owner)
            .and_then(|p| p.owned.get_mut(type_name))
        {
            *count = count.saturating_sub(1);
        }
    }

    /// Credits charged to `owner` so far.
    pub fn spent(&self, owner: PlayerSlot) -> f64 {
        self.players.get(&owner).map_or(0.0, |p| p.spent)
    }

    fn power_balance(&self, owner: PlayerSlot) -> (f32, f32) {
        let Some(player) = self.players.get(&owner) else {
            return (0.0, 0.0);
        };
        let mut generated = 0.0;
        let mut consumed = 0.0;
        for (name, count) in &player.owned {
            let Some(def) = self.rules.building(name) else {
                continue;
            };
            match def.role {
                BuildingRole::Power => generated += POWER_PER_PLANT * *count as f32,
                BuildingRole::ConstructionYard | BuildingRole::Wall => {}
                _ => consumed += POWER_DRAIN * *count as f32,
            }
        }
        (generated, consumed)
    }

    /// Advances every queue by one tick and returns what finished.
    pub fn advance(&mut self) -> Vec<Completed> {
        let speeds: BTreeMap<PlayerSlot, f32> = self
            .players
            .keys()
            .map(|p| (*p, self.power_ratio(*p).clamp(MIN_SPEED, 1.0)))
            .collect();

        let mut done = Vec::new();
        for (owner, player) in self.players.iter_mut() {
            let work = BUILD_RATE * speeds.get(owner).copied().unwrap_or(1.0);
            for is_building in [true, false] {
                let queue = player.queue_mut(is_building);
                let Some(job) = queue.front_mut() else {
                    continue;
                };
                job.remaining -= work;
                if job.remaining > 0.0 {
                    continue;
                }
                if let Some(job) = queue.pop_front() {
                    if is_building {
                        *player.owned.entry(job.type_name.clone()).or_insert(0) += 1;
                    }
                    done.push(Completed {
                        owner: *owner,
                        type_name: job.type_name,
                        is_building,
                        site: job.site,
                    });
                }
            }
        }
        done
    }
}

impl std::fmt::Debug for SkirmishProduction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SkirmishProduction")
            .field("players", &self.players.len())
            .finish()
    }
}

impl ProductionAuthority for SkirmishProduction {
    fn can_build(&self, owner: PlayerSlot, type_name: &str, is_building: bool) -> bool {
        if is_building && !self.has_role(owner, BuildingRole::ConstructionYard) {
            return false;
        }
        match self.prerequisite(type_name, is_building) {
            Prerequisite::Nothing => true,
            Prerequisite::Building(role) => self.has_role(owner, role),
            Prerequisite::Unbuildable => false,
        }
    }

    fn start_production(
        &mut self,
        owner: PlayerSlot,
        type_name: &str,
        is_building: bool,
        site: Option<Vec2>,
    ) -> bool {
        if !self.can_build(owner, type_name, is_building) {
            return false;
        }
        let Some(cost) = self.rules.cost_of(type_name) else {
            return false;
        };
        let price = f64::from(cost * self.cost_multiplier(owner));
        let charged = match self.ledger.try_borrow_mut() {
            Ok(mut ledger) => ledger.spend(owner, price),
            Err(_) => false,
        };
        if !charged {
            tracing::debug!("{}: cannot pay {:.0} for {}", owner, price, type_name);
            return false;
        }

        let player = self.players.entry(owner).or_default();
        player.spent += price;
        player.queue_mut(is_building).push_back(Job {
            type_name: type_name.to_string(),
            is_building,
            site,
            remaining: cost.max(BUILD_RATE),
        });
        true
    }

    fn queue_len(&self, owner: PlayerSlot, is_building: bool) -> usize {
        self.players.get(&owner).map_or(0, |p| {
            if is_building {
                p.buildings.len()
            } else {
                p.units.len()
            }
        })
    }

    fn owned_count(&self, owner: PlayerSlot, type_name: &str) -> usize {
        self.players
            .get(&owner)
            .and_then(|p| p.owned.get(type_name).copied())
            .unwrap_or(0)
    }

    fn power_ratio(&self, owner: PlayerSlot) -> f32 {
        let (generated, consumed) = self.power_balance(owner);
        if consumed <= 0.0 {
            1.0
        } else {
            generated / consumed
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rts_world::fixtures::sample_rules;
    use rts_world::{shared, Treasury};

    const P: PlayerSlot = PlayerSlot(1);

    fn production(credits: f64) -> (SkirmishProduction, Shared<Treasury>) {
        let treasury = shared(Treasury::with_starting_credits(&[P], credits));
        let production = SkirmishProduction::new(Rc::new(sample_rules()), treasury.clone());
        (production, treasury)
    }

    #[test]
    fn test_prerequisites() {
        let (mut production, _) = production(10_000.0);
        assert!(!production.can_build(P, "ATSmWindtrap", true));
        assert!(!production.can_build(P, "ATConYard", true));

        production.grant(P, "ATConYard");
        assert!(production.can_build(P, "ATSmWindtrap", true));
        assert!(!production.can_build(P, "ATFactory", true));
        assert!(!production.can_build(P, "ATInfantry", false));
        assert!(!production.can_build(P, "ATHarvester", false));

        production.grant(P, "ATBarracks");
        production.grant(P, "ATRefinery");
        assert!(production.can_build(P, "ATInfantry", false));
        assert!(production.can_build(P, "ATHarvester", false));
        assert!(production.can_build(P, "ATFactory", true));
        assert!(!production.can_build(P, "ATMinotaurus", false));

        production.record_loss(P, "ATBarracks");
        assert!(!production.can_build(P, "ATInfantry", false));
    }

    #[test]
    fn test_production_is_charged() {
        let (mut production, treasury) = production(300.0);
        production.grant(P, "ATConYard");

        assert!(production.start_production(P, "ATBarracks", true, Some(Vec2::ZERO)));
        assert_eq!(treasury.borrow().balance(P), 75.0);
        assert_eq!(production.spent(P), 225.0);
        // Not enough left for a second one.
        assert!(!production.start_production(P, "ATBarracks", true, None));
        assert_eq!(production.queue_len(P, true), 1);
    }

    #[test]
    fn test_jobs_complete_in_order() {
        let (mut production, _) = production(10_000.0);
        production.grant(P, "ATConYard");
        let site = Vec2::new(300.0, 300.0);
        assert!(production.start_production(P, "ATSmWindtrap", true, Some(site)));
        assert!(production.start_production(P, "ATBarracks", true, None));

        let ticks = (225.0 / BUILD_RATE).ceil() as usize;
        let mut finished = Vec::new();
        for _ in 0..ticks {
            finished.extend(production.advance());
        }
        assert_eq!(finished.len(), 1);
        assert_eq!(finished[0].type_name, "ATSmWindtrap");
        assert_eq!(finished[0].site, Some(site));
        assert_eq!(production.owned_count(P, "ATSmWindtrap"), 1);
        assert_eq!(production.queue_len(P, true), 1);
    }

    #[test]
    fn test_power_shortage_slows_work() {
        let (mut production, _) = production(10_000.0);
        production.grant(P, "ATConYard");
        assert_eq!(production.power_ratio(P), 1.0);

        for _ in 0..10 {
            production.grant(P, "ATBarracks");
        }
        assert_eq!(production.power_ratio(P), 0.0);
        assert!(production.start_production(P, "ATSmWindtrap", true, None));
        let ticks = (225.0 / BUILD_RATE).ceil() as usize;
        let finished: usize = (0..ticks).map(|_| production.advance().len()).sum();
        assert_eq!(finished, 0);

        production.grant(P, "ATSmWindtrap");
        production.grant(P, "ATSmWindtrap");
        assert_eq!(production.power_ratio(P), 1.0);
    }
}
