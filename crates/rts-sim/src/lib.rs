//! Headless skirmish harness.
//!
//! Runs two [`rts_ai::AiController`]s against each other on a small
//! simulation: a production authority with prerequisites and power, a
//! shared treasury fed by harvesters, straight-line movement and
//! continuous weapon fire. Used by the `rts-sim` binary and by the
//! determinism tests.

pub mod combat;
pub mod error;
pub mod production;
pub mod skirmish;
pub mod summary;

pub use combat::{Arsenal, Weapon};
pub use error::SimError;
pub use production::{Prerequisite, SkirmishProduction, BUILD_RATE};
pub use skirmish::{MatchConfig, Skirmish, TICKS_PER_SECOND};
pub use summary::{MatchSummary, PlayerStats, PlayerSummary};

use rts_world::RulesCatalog;

/// The catalog bundled with the workspace.
pub fn bundled_rules() -> Result<RulesCatalog, SimError> {
    Ok(RulesCatalog::from_json_str(
        rts_world::fixtures::sample_rules_json(),
    )?)
}

/// Plays one match to completion.
pub fn run_match(config: MatchConfig, rules: RulesCatalog) -> Result<MatchSummary, SimError> {
    let mut skirmish = Skirmish::new(config, rules)?;
    Ok(skirmish.run())
}
