//! Exploration coverage and the enemy sightings log.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};

use rts_world::{EntityId, EntityKind, MapDimensions, PlayerSlot, Vec2};

/// One flag per map tile.
#[derive(Debug, Clone, PartialEq)]
pub struct ExplorationGrid {
    tile_size: f32,
    cols: usize,
    rows: usize,
    explored: Vec<bool>,
}

impl ExplorationGrid {
    pub fn new(map: MapDimensions, tile_size: f32) -> Self {
        let tile_size = tile_size.max(1.0);
        let cols = ((map.width / tile_size).ceil() as usize).max(1);
        let rows = ((map.height / tile_size).ceil() as usize).max(1);
        Self {
            tile_size,
            cols,
            rows,
            explored: vec![false; cols * rows],
        }
    }

    /// Whether the grid's extent matches `map`.
    pub fn fits(&self, map: MapDimensions) -> bool {
        let other = Self::new(map, self.tile_size);
        other.cols == self.cols && other.rows == self.rows
    }

    pub fn dimensions(&self) -> (usize, usize) {
        (self.cols, self.rows)
    }

    pub fn tile_of(&self, p: Vec2) -> (usize, usize) {
        let col = (p.x / self.tile_size).floor().max(0.0) as usize;
        let row = (p.z / self.tile_size).floor().max(0.0) as usize;
        (col.min(self.cols - 1), row.min(self.rows - 1))
    }

    pub fn tile_center(&self, col: usize, row: usize) -> Vec2 {
        Vec2::new(
            (col as f32 + 0.5) * self.tile_size,
            (row as f32 + 0.5) * self.tile_size,
        )
    }

    pub fn is_explored(&self, p: Vec2) -> bool {
        let (col, row) = self.tile_of(p);
        self.explored[row * self.cols + col]
    }

    /// Marks every tile whose center lies within `radius` of `center`, plus
    /// the tile under `center`. Returns how many tiles were newly explored.
    pub fn mark_disk(&mut self, center: Vec2, radius: f32) -> usize {
        let mut newly = 0;
        let (c_col, c_row) = self.tile_of(center);
        let reach = (radius / self.tile_size).ceil() as isize + 1;
        let radius_sq = radius * radius;
        for dr in -reach..=reach {
            for dc in -reach..=reach {
                let col = c_col as isize + dc;
                let row = c_row as isize + dr;
                if col < 0 || row < 0 || col >= self.cols as isize || row >= self.rows as isize {
                    continue;
                }
                let (col, row) = (col as usize, row as usize);
                let inside = (col == c_col && row == c_row)
                    || self.tile_center(col, row).distance_sq(&center) <= radius_sq;
                let flag = &mut self.explored[row * self.cols + col];
                if inside && !*flag {
                    *flag = true;
                    newly += 1;
                }
            }
        }
        newly
    }

    pub fn explored_fraction(&self) -> f32 {
        let count = self.explored.iter().filter(|e| **e).count();
        count as f32 / self.explored.len() as f32
    }

    /// Center of a randomly sampled unexplored tile, if one turns up within
    /// `attempts` draws.
    pub fn random_unexplored<R: Rng>(&self, rng: &mut R, attempts: usize) -> Option<Vec2> {
        for _ in 0..attempts {
            let col = rng.gen_range(0..self.cols);
            let row = rng.gen_range(0..self.rows);
            if !self.explored[row * self.cols + col] {
                return Some(self.tile_center(col, row));
            }
        }
        None
    }
}

/// A strategic point worth visiting. Lower priority values are visited first.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Waypoint {
    pub position: Vec2,
    pub priority: u8,
}

/// Ordered scouting destinations.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WaypointQueue {
    entries: VecDeque<Waypoint>,
}

impl WaypointQueue {
    /// Map center, edge midpoints, corners and quadrant centers, inset by
    /// `margin`. Aggressive controllers visit whatever is closest to the
    /// enemy first; others go by priority, then distance from their base.
    pub fn strategic(
        map: MapDimensions,
        margin: f32,
        base: Vec2,
        enemy: Vec2,
        aggressive: bool,
    ) -> Self {
        let (w, h) = (map.width, map.height);
        let raw = [
            (Vec2::new(w * 0.5, h * 0.5), 0),
            (Vec2::new(w * 0.5, 0.0), 1),
            (Vec2::new(w * 0.5, h), 1),
            (Vec2::new(0.0, h * 0.5), 1),
            (Vec2::new(w, h * 0.5), 1),
            (Vec2::new(0.0, 0.0), 2),
            (Vec2::new(w, 0.0), 2),
            (Vec2::new(0.0, h), 2),
            (Vec2::new(w, h), 2),
            (Vec2::new(w * 0.25, h * 0.25), 3),
            (Vec2::new(w * 0.75, h * 0.25), 3),
            (Vec2::new(w * 0.25, h * 0.75), 3),
            (Vec2::new(w * 0.75, h * 0.75), 3),
        ];
        let mut entries: Vec<Waypoint> = raw
            .into_iter()
            .map(|(p, priority)| Waypoint {
                position: map.clamp(p, margin),
                priority,
            })
            .collect();
        if aggressive {
            entries.sort_by(|a, b| {
                a.position
                    .distance_sq(&enemy)
                    .total_cmp(&b.position.distance_sq(&enemy))
            });
        } else {
            entries.sort_by(|a, b| {
                a.priority.cmp(&b.priority).then(
                    a.position
                        .distance_sq(&base)
                        .total_cmp(&b.position.distance_sq(&base)),
                )
            });
        }
        Self {
            entries: entries.into(),
        }
    }

    /// Next waypoint over unexplored ground. Explored entries are dropped on
    /// the way; the returned entry goes to the back of the queue so it can be
    /// handed out again while it stays unexplored.
    pub fn next_unexplored(&mut self, grid: &ExplorationGrid) -> Option<Vec2> {
        while let Some(entry) = self.entries.pop_front() {
            if !grid.is_explored(entry.position) {
                self.entries.push_back(entry);
                return Some(entry.position);
            }
        }
        None
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Waypoint> {
        self.entries.iter()
    }
}

/// Coarse category of a sighting, used to adapt the unit mix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SightingCategory {
    Infantry,
    Vehicle,
    Structure,
}

/// Last known state of an observed enemy entity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sighting {
    pub owner: PlayerSlot,
    pub kind: EntityKind,
    pub type_index: u32,
    pub position: Vec2,
    pub category: SightingCategory,
    pub harvester: bool,
    pub tick: u64,
}

impl Sighting {
    pub fn age(&self, now: u64) -> u64 {
        now.saturating_sub(self.tick)
    }
}

/// Time-decayed log of enemy sightings, keyed by entity.
#[derive(Debug, Clone, Default)]
pub struct IntelLedger {
    horizon: u64,
    entries: BTreeMap<EntityId, Sighting>,
}

impl IntelLedger {
    pub fn new(horizon: u64) -> Self {
        Self {
            horizon,
            entries: BTreeMap::new(),
        }
    }

    pub fn horizon(&self) -> u64 {
        self.horizon
    }

    pub fn record(&mut self, id: EntityId, sighting: Sighting) {
        self.entries.insert(id, sighting);
    }

    pub fn forget(&mut self, id: EntityId) {
        self.entries.remove(&id);
    }

    pub fn get(&self, id: EntityId) -> Option<&Sighting> {
        self.entries.get(&id)
    }

    /// Sightings no older than the horizon, in id order. Stale entries that
    /// have not been evicted yet are skipped.
    pub fn recent(&self, now: u64) -> impl Iterator<Item = (EntityId, &Sighting)> {
        let horizon = self.horizon;
        self.entries
            .iter()
            .filter(move |(_, s)| s.age(now) <= horizon)
            .map(|(id, s)| (*id, s))
    }

    /// Evicts sightings past the horizon and returns how many were dropped.
    pub fn prune(&mut self, now: u64) -> usize {
        let before = self.entries.len();
        let horizon = self.horizon;
        self.entries.retain(|_, s| s.age(now) <= horizon);
        before - self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
