//! Error types for the headless harness.

use rts_ai::ConfigError;
use rts_world::{House, RulesError};

#[derive(Debug, thiserror::Error)]
pub enum SimError {
    #[error("rules error: {0}")]
    Rules(#[from] RulesError),
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("the rules catalog has no {1} for {0}")]
    MissingStart(House, &'static str),
}
