//! Configuration loading for the AI controller.
//!
//! Every tuning value lives here, loaded from TOML. Per-difficulty values are
//! three-element tables indexed by [`Difficulty::tier`].

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::composition::CompositionGoal;
use crate::error::ConfigError;

/// Difficulty tier of a controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    Easy,
    #[default]
    Normal,
    Hard,
}

impl Difficulty {
    pub const ALL: [Difficulty; 3] = [Difficulty::Easy, Difficulty::Normal, Difficulty::Hard];

    pub fn tier(self) -> usize {
        match self {
            Difficulty::Easy => 0,
            Difficulty::Normal => 1,
            Difficulty::Hard => 2,
        }
    }

    /// Value for this tier from a per-difficulty table.
    pub fn pick<T: Copy>(self, table: &[T; 3]) -> T {
        table[self.tier()]
    }

    /// The highest tier scouts toward the enemy and harasses harvesters.
    pub fn is_highest(self) -> bool {
        self == Difficulty::Hard
    }
}

impl std::str::FromStr for Difficulty {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "easy" => Ok(Difficulty::Easy),
            "normal" => Ok(Difficulty::Normal),
            "hard" => Ok(Difficulty::Hard),
            other => Err(format!("unknown difficulty: '{}'", other)),
        }
    }
}

/// Multiplier bundle biasing a controller's priorities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Personality {
    pub name: String,
    /// Scales down the attack threshold.
    pub aggression: f32,
    /// Scales the defender quota.
    pub defense: f32,
    /// Scales refinery and harvester targets.
    pub economy: f32,
    /// Scales the health fraction at which attackers fall back.
    pub retreat: f32,
}

impl Personality {
    pub const PRESETS: [&'static str; 4] = ["balanced", "aggressive", "defensive", "economic"];

    pub fn balanced() -> Self {
        Self {
            name: "balanced".to_string(),
            aggression: 1.0,
            defense: 1.0,
            economy: 1.0,
            retreat: 1.0,
        }
    }

    pub fn aggressive() -> Self {
        Self {
            name: "aggressive".to_string(),
            aggression: 1.5,
            defense: 0.6,
            economy: 0.9,
            retreat: 0.5,
        }
    }

    pub fn defensive() -> Self {
        Self {
            name: "defensive".to_string(),
            aggression: 0.7,
            defense: 1.6,
            economy: 1.0,
            retreat: 1.4,
        }
    }

    pub fn economic() -> Self {
        Self {
            name: "economic".to_string(),
            aggression: 0.8,
            defense: 1.0,
            economy: 1.5,
            retreat: 1.2,
        }
    }

    /// Looks up a preset by name.
    pub fn preset(name: &str) -> Result<Self, ConfigError> {
        match name.to_lowercase().as_str() {
            "balanced" => Ok(Self::balanced()),
            "aggressive" => Ok(Self::aggressive()),
            "defensive" => Ok(Self::defensive()),
            "economic" => Ok(Self::economic()),
            _ => Err(ConfigError::UnknownPersonality(name.to_string())),
        }
    }
}

impl Default for Personality {
    fn default() -> Self {
        Self::balanced()
    }
}

/// Complete controller configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AiConfig {
    #[serde(default)]
    pub schedule: ScheduleConfig,
    #[serde(default)]
    pub roles: RolesConfig,
    #[serde(default)]
    pub economy: EconomyConfig,
    #[serde(default)]
    pub composition: CompositionConfig,
    #[serde(default)]
    pub scouting: ScoutingConfig,
    #[serde(default)]
    pub placement: PlacementConfig,
    #[serde(default)]
    pub army: ArmyConfig,
    #[serde(default)]
    pub defense: DefenseConfig,
}

impl AiConfig {
    /// Loads configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// Parses configuration from a TOML string.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Serializes the configuration as pretty TOML.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }
}

/// Intervals, in ticks, between runs of each scheduled behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    pub build: [u64; 3],
    pub train: [u64; 3],
    pub harvesters: u64,
    pub repair: u64,
    pub scout: u64,
    pub vision: u64,
    pub prune_intel: u64,
    pub adapt_composition: u64,
    pub army: [u64; 3],
    pub defense: u64,
    /// Per-slot stagger so controllers in one match don't all think on the same tick.
    pub instance_stride: u64,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            build: [90, 60, 40],
            train: [75, 50, 35],
            harvesters: 150,
            repair: 120,
            scout: 30,
            vision: 10,
            prune_intel: 120,
            adapt_composition: 300,
            army: [120, 90, 60],
            defense: 15,
            instance_stride: 7,
        }
    }
}

/// Unit role classification thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RolesConfig {
    /// Turretless units at or below this cost and at or above the scout speed are scouts.
    pub scout_max_cost: f32,
    pub scout_min_speed: f32,
    /// Structure damage percentage a warhead must exceed to count as anti-building.
    pub structure_threshold: f32,
}

impl Default for RolesConfig {
    fn default() -> Self {
        Self {
            scout_max_cost: 300.0,
            scout_min_speed: 12.0,
            structure_threshold: 60.0,
        }
    }
}

/// Build order, base growth, harvesters and repair.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EconomyConfig {
    /// Balance must cover this multiple of a phase's cost before it is attempted.
    pub phase_cost_factor: f32,
    /// One generator is wanted per this many buildings.
    pub buildings_per_generator: usize,
    pub refineries: [f32; 3],
    /// Lowest tier that builds a second factory.
    pub second_factory_tier: usize,
    /// Turret cap while the base is under attack.
    pub turrets_under_attack: [usize; 3],
    pub periodic_turret_chance: [f64; 3],
    pub max_turrets: [usize; 3],
    pub wall_min_turrets: usize,
    pub wall_segments: usize,
    /// Advanced buildings stop once the base holds this many buildings.
    pub building_ceiling: [usize; 3],
    /// Tick from which allied sub-house structures are built.
    pub subhouse_ramp: [u64; 3],
    pub harvesters_per_refinery: [f32; 3],
    /// Buildings at or below this health fraction are candidates for repair.
    pub repair_threshold: f32,
    /// Fraction of max health restored per repair.
    pub repair_fraction: f32,
    /// Repair price as a fraction of the building's cost, per unit of health fraction restored.
    pub repair_cost_factor: f32,
    /// Credits kept in reserve when paying for repairs.
    pub repair_reserve: f64,
}

impl Default for EconomyConfig {
    fn default() -> Self {
        Self {
            phase_cost_factor: 1.0,
            buildings_per_generator: 3,
            refineries: [1.0, 2.0, 3.0],
            second_factory_tier: 1,
            turrets_under_attack: [2, 3, 4],
            periodic_turret_chance: [0.1, 0.2, 0.3],
            max_turrets: [3, 5, 8],
            wall_min_turrets: 2,
            wall_segments: 5,
            building_ceiling: [10, 14, 18],
            subhouse_ramp: [9000, 6000, 3000],
            harvesters_per_refinery: [1.0, 1.5, 2.0],
            repair_threshold: 0.75,
            repair_fraction: 0.25,
            repair_cost_factor: 0.5,
            repair_reserve: 200.0,
        }
    }
}

/// Unit-mix targets and adaptation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CompositionConfig {
    pub default_goal: CompositionGoal,
    pub vs_infantry: CompositionGoal,
    pub vs_vehicles: CompositionGoal,
    pub vs_structures: CompositionGoal,
    /// Share a sighted category needs before the goal shifts to counter it.
    pub majority_share: f32,
    pub min_samples: usize,
    /// Below this balance the fallback trains infantry rather than vehicles.
    pub vehicle_min_balance: f64,
    pub use_market: bool,
}

impl Default for CompositionConfig {
    fn default() -> Self {
        Self {
            default_goal: CompositionGoal::balanced(),
            vs_infantry: CompositionGoal::new([0.5, 0.25, 0.15, 0.1]),
            vs_vehicles: CompositionGoal::new([0.2, 0.55, 0.15, 0.1]),
            vs_structures: CompositionGoal::new([0.2, 0.3, 0.4, 0.1]),
            majority_share: 0.5,
            min_samples: 10,
            vehicle_min_balance: 800.0,
            use_market: true,
        }
    }
}

/// Exploration and intelligence gathering.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoutingConfig {
    pub max_scouts: [usize; 3],
    pub tile_size: f32,
    /// Radius explored around a scout when it reaches its waypoint.
    pub reveal_radius: f32,
    pub arrival_distance: f32,
    pub view_range: f32,
    /// Sightings older than this are ignored and evicted.
    pub intel_horizon: u64,
    pub waypoint_margin: f32,
    pub random_tile_attempts: usize,
}

impl Default for ScoutingConfig {
    fn default() -> Self {
        Self {
            max_scouts: [1, 2, 3],
            tile_size: 128.0,
            reveal_radius: 320.0,
            arrival_distance: 64.0,
            view_range: 350.0,
            intel_horizon: 1800,
            waypoint_margin: 160.0,
            random_tile_attempts: 24,
        }
    }
}

/// Building placement around the base anchor.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlacementConfig {
    pub min_spacing: f32,
    pub wall_spacing: f32,
    pub edge_margin: f32,
    pub ring_step: f32,
    pub max_rings: usize,
    pub power_behind: f32,
    pub refinery_flank: f32,
    pub turret_forward: f32,
    pub wall_forward: f32,
    pub wall_segment_spacing: f32,
    pub center_jitter: f32,
}

impl Default for PlacementConfig {
    fn default() -> Self {
        Self {
            min_spacing: 96.0,
            wall_spacing: 40.0,
            edge_margin: 64.0,
            ring_step: 48.0,
            max_rings: 24,
            power_behind: 220.0,
            refinery_flank: 260.0,
            turret_forward: 300.0,
            wall_forward: 420.0,
            wall_segment_spacing: 48.0,
            center_jitter: 120.0,
        }
    }
}

/// Standing army, offensives, harassment and retreat.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ArmyConfig {
    pub near_base_radius: f32,
    pub defender_fraction: f32,
    pub defender_cap: [usize; 3],
    /// Idle units at base needed to launch an offensive, before aggression scaling.
    pub attack_threshold: [usize; 3],
    pub attack_cooldown: [u64; 3],
    pub cluster_radius: f32,
    pub max_fronts: [usize; 3],
    pub building_value: f32,
    pub harvester_value: f32,
    pub unit_value: f32,
    /// Maximum approach-angle jitter in radians.
    pub approach_jitter: f32,
    pub spread: f32,
    pub harass_size: usize,
    pub rally_distance: f32,
    /// Attackers below this health fraction (times the personality's retreat) fall back.
    pub retreat_health: f32,
}

impl Default for ArmyConfig {
    fn default() -> Self {
        Self {
            near_base_radius: 600.0,
            defender_fraction: 0.25,
            defender_cap: [4, 6, 8],
            attack_threshold: [10, 8, 6],
            attack_cooldown: [2400, 1800, 1200],
            cluster_radius: 500.0,
            max_fronts: [1, 2, 3],
            building_value: 3.0,
            harvester_value: 2.5,
            unit_value: 1.0,
            approach_jitter: 0.25,
            spread: 40.0,
            harass_size: 3,
            rally_distance: 250.0,
            retreat_health: 0.3,
        }
    }
}

/// Base defense thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DefenseConfig {
    /// Enemy units this close to the base anchor put it under attack.
    pub threat_radius: f32,
    /// Units further than this from the base are recalled on alarm.
    pub recall_radius: f32,
    pub engage_radius: f32,
    /// Ticks without damage before the alarm clears.
    pub calm_cooldown: u64,
    pub counterattack_min_units: usize,
    pub healthy_fraction: f32,
    /// Share of defenders kept home during a counterattack.
    pub holdback: f32,
}

impl Default for DefenseConfig {
    fn default() -> Self {
        Self {
            threat_radius: 700.0,
            recall_radius: 900.0,
            engage_radius: 600.0,
            calm_cooldown: 300,
            counterattack_min_units: 3,
            healthy_fraction: 0.5,
            holdback: 0.5,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_round_trips_through_toml() {
        let config = AiConfig::default();
        let text = config.to_toml().unwrap();
        let parsed = AiConfig::from_str(&text).unwrap();
        assert_eq!(parsed.army.attack_threshold, config.army.attack_threshold);
        assert_eq!(parsed.composition.default_goal, config.composition.default_goal);
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let config = AiConfig::from_str(
            r#"
            [army]
            attack_threshold = [3, 3, 3]

            [defense]
            calm_cooldown = 50
            "#,
        )
        .unwrap();
        assert_eq!(config.army.attack_threshold, [3, 3, 3]);
        assert_eq!(config.army.near_base_radius, 600.0);
        assert_eq!(config.defense.calm_cooldown, 50);
        assert_eq!(config.schedule.vision, 10);
    }

    #[test]
    fn test_difficulty_tables() {
        assert_eq!(Difficulty::Easy.pick(&[1, 2, 3]), 1);
        assert_eq!(Difficulty::Hard.pick(&[1, 2, 3]), 3);
        assert_eq!("HARD".parse::<Difficulty>(), Ok(Difficulty::Hard));
        assert!("brutal".parse::<Difficulty>().is_err());
    }

    #[test]
    fn test_personality_presets() {
        for name in Personality::PRESETS {
            assert_eq!(Personality::preset(name).unwrap().name, name);
        }
        assert!(matches!(
            Personality::preset("reckless"),
            Err(ConfigError::UnknownPersonality(_))
        ));
    }
}
