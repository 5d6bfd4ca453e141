//! Sparse hash grid for radius queries.

use std::collections::HashMap;

use crate::entity::EntityId;
use crate::geometry::Vec2;

/// Accelerates "who is within r of p" queries. Optional: callers fall back
/// to scanning the registry when no index is available.
pub trait SpatialIndex {
    /// Entities whose last indexed position lies within `radius` of `center`.
    fn query_radius(&self, center: Vec2, radius: f32) -> Vec<EntityId>;
}

/// Uniform grid of buckets keyed by cell coordinate.
#[derive(Debug, Clone)]
pub struct GridIndex {
    cell_size: f32,
    cells: HashMap<(i32, i32), Vec<(EntityId, Vec2)>>,
}

impl GridIndex {
    pub fn new(cell_size: f32) -> Self {
        Self {
            cell_size: cell_size.max(1.0),
            cells: HashMap::new(),
        }
    }

    #[inline]
    fn cell_coord(&self, pos: Vec2) -> (i32, i32) {
        (
            (pos.x / self.cell_size).floor() as i32,
            (pos.z / self.cell_size).floor() as i32,
        )
    }

    pub fn clear(&mut self) {
        self.cells.clear();
    }

    pub fn insert(&mut self, entity: EntityId, pos: Vec2) {
        let coord = self.cell_coord(pos);
        self.cells.entry(coord).or_default().push((entity, pos));
    }

    pub fn len(&self) -> usize {
        self.cells.values().map(|c| c.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.values().all(|c| c.is_empty())
    }

    /// Rebuild grid from positions
    pub fn rebuild(&mut self, entities: impl Iterator<Item = (EntityId, Vec2)>) {
        self.clear();
        for (entity, pos) in entities {
            self.insert(entity, pos);
        }
    }
}

impl SpatialIndex for GridIndex {
    fn query_radius(&self, center: Vec2, radius: f32) -> Vec<EntityId> {
        let radius_sq = radius * radius;
        let (min_x, min_z) = self.cell_coord(Vec2::new(center.x - radius, center.z - radius));
        let (max_x, max_z) = self.cell_coord(Vec2::new(center.x + radius, center.z + radius));

        let mut found = Vec::new();
        for cx in min_x..=max_x {
            for cz in min_z..=max_z {
                if let Some(cell) = self.cells.get(&(cx, cz)) {
                    found.extend(
                        cell.iter()
                            .filter(|(_, pos)| pos.distance_sq(&center) <= radius_sq)
                            .map(|(id, _)| *id),
                    );
                }
            }
        }
        found.sort();
        found
    }
}
