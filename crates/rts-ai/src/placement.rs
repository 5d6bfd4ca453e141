//! Building placement and the base anchor.
//!
//! Each building role has an ideal offset from the anchor, oriented by the
//! direction of the enemy. From that ideal point a ring search walks outward
//! until it finds a spot clear of every tracked building and inside the map.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::f32::consts::TAU;

use rts_world::{BuildingRole, Capabilities, EntitySnapshot, MapDimensions, Vec2};

use crate::config::PlacementConfig;

/// A building this controller placed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlacedBuilding {
    pub position: Vec2,
    pub type_name: String,
    pub role: BuildingRole,
}

/// Where a candidate site has to stay clear of.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Obstacle {
    pub position: Vec2,
    pub is_wall: bool,
}

#[derive(Debug, Clone, Default)]
pub struct PlacementPlanner {
    placed: Vec<PlacedBuilding>,
    anchor: Option<Vec2>,
}

impl PlacementPlanner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn anchor(&self) -> Option<Vec2> {
        self.anchor
    }

    pub fn set_anchor(&mut self, anchor: Vec2) {
        self.anchor = Some(anchor);
    }

    pub fn placed(&self) -> &[PlacedBuilding] {
        &self.placed
    }

    pub fn placed_with_role(&self, role: BuildingRole) -> usize {
        self.placed.iter().filter(|p| p.role == role).count()
    }

    /// Ideal site for a building of `role`. `ordinal` is how many of that
    /// role were placed before, so repeated walls and refineries spread out.
    pub fn ideal_site<R: Rng>(
        &self,
        role: BuildingRole,
        ordinal: usize,
        toward_enemy: Vec2,
        config: &PlacementConfig,
        rng: &mut R,
    ) -> Option<Vec2> {
        let anchor = self.anchor?;
        let forward = match toward_enemy.normalize() {
            v if v == Vec2::ZERO => Vec2::new(1.0, 0.0),
            v => v,
        };
        let side = forward.perp();
        let mut jitter = |amount: f32| {
            if amount > 0.0 {
                rng.gen_range(-amount..=amount)
            } else {
                0.0
            }
        };

        let site = match role {
            BuildingRole::Wall => {
                // Segments alternate left and right of the centerline, every
                // other one pushed forward half a spacing.
                let step = ((ordinal + 1) / 2) as f32;
                let sign = if ordinal % 2 == 0 { 1.0 } else { -1.0 };
                let stagger = if ordinal % 2 == 1 { config.wall_spacing * 0.5 } else { 0.0 };
                anchor
                    + forward * (config.wall_forward + stagger)
                    + side * (sign * step * config.wall_segment_spacing)
            }
            BuildingRole::Power | BuildingRole::Tech => {
                anchor - forward * config.power_behind + side * jitter(config.center_jitter * 0.5)
            }
            BuildingRole::Refinery => {
                let sign = if ordinal % 2 == 0 { 1.0 } else { -1.0 };
                anchor + side * (sign * config.refinery_flank) - forward * (config.power_behind * 0.25)
            }
            BuildingRole::Turret => {
                anchor + forward * config.turret_forward + side * jitter(config.center_jitter)
            }
            _ => {
                anchor
                    + Vec2::new(jitter(config.center_jitter), jitter(config.center_jitter))
            }
        };
        Some(site)
    }

    /// Nearest clear spot to `ideal`, searching rings of growing radius.
    pub fn find_site(
        ideal: Vec2,
        role: BuildingRole,
        obstacles: &[Obstacle],
        map: MapDimensions,
        config: &PlacementConfig,
    ) -> Option<Vec2> {
        let is_wall = role == BuildingRole::Wall;
        let clear = |p: Vec2| {
            map.contains_with_margin(p, config.edge_margin)
                && obstacles.iter().all(|o| {
                    let spacing = if is_wall && o.is_wall {
                        config.wall_spacing
                    } else {
                        config.min_spacing
                    };
                    o.position.distance_sq(&p) >= spacing * spacing
                })
        };

        if clear(ideal) {
            return Some(ideal);
        }
        for ring in 1..=config.max_rings {
            let radius = ring as f32 * config.ring_step;
            let samples = 8 * ring;
            for i in 0..samples {
                let angle = i as f32 / samples as f32 * TAU;
                let candidate = ideal + Vec2::from_angle(angle) * radius;
                if clear(candidate) {
                    return Some(candidate);
                }
            }
        }
        None
    }

    pub fn record(&mut self, position: Vec2, type_name: &str, role: BuildingRole) {
        self.placed.push(PlacedBuilding {
            position,
            type_name: type_name.to_string(),
            role,
        });
    }

    /// Drops ledger entries at a destroyed building's position.
    pub fn forget_at(&mut self, position: Vec2, tolerance: f32) -> usize {
        let before = self.placed.len();
        let tol_sq = tolerance * tolerance;
        self.placed.retain(|p| p.position.distance_sq(&position) > tol_sq);
        before - self.placed.len()
    }

    pub fn clear(&mut self) {
        self.placed.clear();
    }

    /// Snaps to the primary construction building if one is alive, otherwise
    /// the centroid of owned buildings, otherwise the centroid of everything
    /// this planner placed. Keeps the previous anchor if all three are empty.
    pub fn recompute_anchor(&mut self, own_buildings: &[EntitySnapshot]) -> Option<Vec2> {
        let primary = own_buildings
            .iter()
            .filter(|b| b.alive && b.has(Capabilities::CONSTRUCTION))
            .min_by_key(|b| b.id)
            .map(|b| b.position);
        let anchor = primary
            .or_else(|| Vec2::centroid(own_buildings.iter().filter(|b| b.alive).map(|b| b.position)))
            .or_else(|| Vec2::centroid(self.placed.iter().map(|p| p.position)))
            .or(self.anchor);
        self.anchor = anchor;
        anchor
    }

    /// Placed buildings not yet standing: no owned building within `tolerance`.
    pub fn pending_with_role(
        &self,
        role: BuildingRole,
        own_buildings: &[EntitySnapshot],
        tolerance: f32,
    ) -> usize {
        let tol_sq = tolerance * tolerance;
        self.placed
            .iter()
            .filter(|p| p.role == role)
            .filter(|p| {
                !own_buildings
                    .iter()
                    .any(|b| b.position.distance_sq(&p.position) <= tol_sq)
            })
            .count()
    }

    /// Obstacles from standing buildings plus everything placed.
    pub fn obstacles(&self, own_buildings: &[EntitySnapshot], wall_of: impl Fn(&EntitySnapshot) -> bool) -> Vec<Obstacle> {
        own_buildings
            .iter()
            .map(|b| Obstacle {
                position: b.position,
                is_wall: wall_of(b),
            })
            .chain(self.placed.iter().map(|p| Obstacle {
                position: p.position,
                is_wall: p.role == BuildingRole::Wall,
            }))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;
    use rts_world::{AttackIntent, EntityId, EntityKind, MoveIntent, PlayerSlot};

    fn building(id: u32, position: Vec2, caps: Capabilities) -> EntitySnapshot {
        EntitySnapshot {
            id: EntityId(id),
            kind: EntityKind::Building,
            owner: PlayerSlot(1),
            type_index: 0,
            position,
            health: 1000.0,
            max_health: 1000.0,
            move_intent: MoveIntent::default(),
            attack_intent: AttackIntent::default(),
            caps,
            alive: true,
        }
    }

    fn map() -> MapDimensions {
        MapDimensions::new(2000.0, 2000.0)
    }

    #[test]
    fn test_clear_ideal_is_used_as_is() {
        let config = PlacementConfig::default();
        let ideal = Vec2::new(500.0, 500.0);
        assert_eq!(
            PlacementPlanner::find_site(ideal, BuildingRole::Power, &[], map(), &config),
            Some(ideal)
        );
    }

    #[test]
    fn test_collision_resolves_on_later_ring() {
        let config = PlacementConfig::default();
        let ideal = Vec2::new(500.0, 500.0);
        let obstacles = [Obstacle {
            position: Vec2::new(510.0, 500.0),
            is_wall: false,
        }];
        let site =
            PlacementPlanner::find_site(ideal, BuildingRole::Factory, &obstacles, map(), &config)
                .unwrap();
        assert_ne!(site, ideal);
        assert!(site.distance(&obstacles[0].position) >= config.min_spacing);
        // Ring 1 (48 units out) can't clear a 96-unit spacing; ring 2 is the first option.
        assert!(site.distance(&ideal) > config.ring_step);
    }

    #[test]
    fn test_walls_pack_tighter() {
        let config = PlacementConfig::default();
        let ideal = Vec2::new(500.0, 500.0);
        let wall = [Obstacle {
            position: Vec2::new(550.0, 500.0),
            is_wall: true,
        }];
        assert_eq!(
            PlacementPlanner::find_site(ideal, BuildingRole::Wall, &wall, map(), &config),
            Some(ideal)
        );
        assert_ne!(
            PlacementPlanner::find_site(ideal, BuildingRole::Factory, &wall, map(), &config),
            Some(ideal)
        );
    }

    #[test]
    fn test_edge_margin_respected() {
        let config = PlacementConfig::default();
        let site = PlacementPlanner::find_site(
            Vec2::new(10.0, 10.0),
            BuildingRole::Power,
            &[],
            map(),
            &config,
        )
        .unwrap();
        assert!(map().contains_with_margin(site, config.edge_margin));
    }

    #[test]
    fn test_ideal_sites_face_the_enemy() {
        let config = PlacementConfig::default();
        let mut planner = PlacementPlanner::new();
        planner.set_anchor(Vec2::new(1000.0, 1000.0));
        let mut rng = SmallRng::seed_from_u64(1);
        let east = Vec2::new(1.0, 0.0);

        let turret = planner
            .ideal_site(BuildingRole::Turret, 0, east, &config, &mut rng)
            .unwrap();
        assert!(turret.x > 1000.0 + config.turret_forward * 0.9);

        let power = planner
            .ideal_site(BuildingRole::Power, 0, east, &config, &mut rng)
            .unwrap();
        assert!(power.x < 1000.0);

        let first = planner
            .ideal_site(BuildingRole::Refinery, 0, east, &config, &mut rng)
            .unwrap();
        let second = planner
            .ideal_site(BuildingRole::Refinery, 1, east, &config, &mut rng)
            .unwrap();
        assert!((first.z - 1000.0) * (second.z - 1000.0) < 0.0);

        let walls: Vec<Vec2> = (0..4)
            .map(|i| {
                planner
                    .ideal_site(BuildingRole::Wall, i, east, &config, &mut rng)
                    .unwrap()
            })
            .collect();
        assert!(walls.iter().all(|w| w.x >= 1000.0 + config.wall_forward));
        assert!(walls[1].x > walls[0].x);
    }

    #[test]
    fn test_anchor_prefers_construction_yard() {
        let mut planner = PlacementPlanner::new();
        let yard = building(3, Vec2::new(100.0, 100.0), Capabilities::CONSTRUCTION);
        let power = building(4, Vec2::new(300.0, 100.0), Capabilities::empty());

        assert_eq!(planner.recompute_anchor(&[power, yard]), Some(Vec2::new(100.0, 100.0)));
        assert_eq!(planner.recompute_anchor(&[power]), Some(Vec2::new(300.0, 100.0)));

        planner.record(Vec2::new(0.0, 0.0), "ATWall", BuildingRole::Wall);
        planner.record(Vec2::new(10.0, 0.0), "ATWall", BuildingRole::Wall);
        assert_eq!(planner.recompute_anchor(&[]), Some(Vec2::new(5.0, 0.0)));
    }

    #[test]
    fn test_forget_and_pending() {
        let mut planner = PlacementPlanner::new();
        planner.record(Vec2::new(100.0, 100.0), "ATSmWindtrap", BuildingRole::Power);
        planner.record(Vec2::new(400.0, 100.0), "ATSmWindtrap", BuildingRole::Power);

        let standing = [building(1, Vec2::new(100.0, 100.0), Capabilities::empty())];
        assert_eq!(planner.pending_with_role(BuildingRole::Power, &standing, 8.0), 1);

        assert_eq!(planner.forget_at(Vec2::new(101.0, 100.0), 8.0), 1);
        assert_eq!(planner.placed_with_role(BuildingRole::Power), 1);
    }
}
