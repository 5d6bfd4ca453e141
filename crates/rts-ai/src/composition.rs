//! Unit-mix planning.
//!
//! The goal is a four-way ratio over [`Role`]s that always sums to 1. Training
//! fills whichever role lags the goal the most; the goal itself shifts to
//! counter whatever category dominates recent sightings.

use serde::{Deserialize, Serialize};

use crate::config::CompositionConfig;
use crate::intel::SightingCategory;
use crate::roles::Role;

/// Wire form of a goal: named weights, normalized on the way in.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GoalWeights {
    pub anti_infantry: f32,
    pub anti_vehicle: f32,
    pub anti_building: f32,
    pub scout: f32,
}

/// Normalized target ratio per role.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "GoalWeights", into = "GoalWeights")]
pub struct CompositionGoal {
    weights: [f32; 4],
}

impl CompositionGoal {
    /// Normalizes `weights` (indexed by [`Role::index`]). Negative or
    /// non-finite weights count as zero; an all-zero goal becomes balanced.
    pub fn new(weights: [f32; 4]) -> Self {
        let cleaned = weights.map(|w| if w.is_finite() && w > 0.0 { w } else { 0.0 });
        let sum: f32 = cleaned.iter().sum();
        if sum <= f32::EPSILON {
            return Self::balanced();
        }
        if (sum - 1.0).abs() < 1e-6 {
            return Self { weights: cleaned };
        }
        Self {
            weights: cleaned.map(|w| w / sum),
        }
    }

    pub fn balanced() -> Self {
        Self {
            weights: [0.3, 0.4, 0.2, 0.1],
        }
    }

    pub fn weight(&self, role: Role) -> f32 {
        self.weights[role.index()]
    }

    pub fn weights(&self) -> [f32; 4] {
        self.weights
    }

    pub fn sum(&self) -> f32 {
        self.weights.iter().sum()
    }
}

impl Default for CompositionGoal {
    fn default() -> Self {
        Self::balanced()
    }
}

impl From<GoalWeights> for CompositionGoal {
    fn from(w: GoalWeights) -> Self {
        Self::new([w.anti_infantry, w.anti_vehicle, w.anti_building, w.scout])
    }
}

impl From<CompositionGoal> for GoalWeights {
    fn from(goal: CompositionGoal) -> Self {
        let [anti_infantry, anti_vehicle, anti_building, scout] = goal.weights;
        Self {
            anti_infantry,
            anti_vehicle,
            anti_building,
            scout,
        }
    }
}

/// Living units per role.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RoleCounts([usize; 4]);

impl RoleCounts {
    pub fn add(&mut self, role: Role) {
        self.0[role.index()] += 1;
    }

    pub fn get(&self, role: Role) -> usize {
        self.0[role.index()]
    }

    pub fn total(&self) -> usize {
        self.0.iter().sum()
    }
}

impl FromIterator<Role> for RoleCounts {
    fn from_iter<I: IntoIterator<Item = Role>>(iter: I) -> Self {
        let mut counts = RoleCounts::default();
        iter.into_iter().for_each(|r| counts.add(r));
        counts
    }
}

/// The role whose share of the army trails its goal weight the most.
///
/// With no units at all this is the role with the largest weight. Returns
/// `None` when every role is at or above its target.
pub fn most_underrepresented(goal: &CompositionGoal, counts: &RoleCounts) -> Option<Role> {
    let total = counts.total();
    if total == 0 {
        return Role::ALL
            .into_iter()
            .max_by(|a, b| goal.weight(*a).total_cmp(&goal.weight(*b)).then(b.cmp(a)));
    }
    Role::ALL
        .into_iter()
        .map(|role| {
            let share = counts.get(role) as f32 / total as f32;
            (role, goal.weight(role) - share)
        })
        .filter(|(_, deficit)| *deficit > 0.0)
        .max_by(|(ra, a), (rb, b)| a.total_cmp(b).then(rb.cmp(ra)))
        .map(|(role, _)| role)
}

/// Goal countering the dominant category among recent sightings, or the
/// default goal when nothing dominates or there are too few samples.
pub fn adapt_goal(samples: &[SightingCategory], config: &CompositionConfig) -> CompositionGoal {
    if samples.len() < config.min_samples.max(1) {
        return config.default_goal;
    }
    let total = samples.len() as f32;
    let share = |category: SightingCategory| {
        samples.iter().filter(|s| **s == category).count() as f32 / total
    };
    let majority = config.majority_share;
    if share(SightingCategory::Infantry) > majority {
        config.vs_infantry
    } else if share(SightingCategory::Vehicle) > majority {
        config.vs_vehicles
    } else if share(SightingCategory::Structure) > majority {
        config.vs_structures
    } else {
        config.default_goal
    }
}
