//! JSON summary of a finished match.

use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use rts_ai::AiStatus;
use rts_world::{House, PlayerSlot};

use crate::error::SimError;

/// Running counters for one player.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlayerStats {
    pub units_built: u32,
    pub buildings_built: u32,
    pub units_lost: u32,
    pub buildings_lost: u32,
    pub kills: u32,
    pub harvested: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerSummary {
    pub slot: PlayerSlot,
    pub house: House,
    pub eliminated: bool,
    pub credits: f64,
    pub spent: f64,
    pub units: usize,
    pub buildings: usize,
    pub stats: PlayerStats,
    pub ai: AiStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchSummary {
    pub seed: u64,
    pub ticks: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub winner: Option<PlayerSlot>,
    pub players: Vec<PlayerSummary>,
}

impl MatchSummary {
    pub fn to_json(&self) -> Result<String, SimError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Writes the summary as pretty JSON.
    pub fn write_to(&self, path: &Path) -> Result<(), SimError> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, self)?;
        writer.flush()?;
        Ok(())
    }
}
