//! Error types for the AI controller.
//!
//! None of these are fatal: a scheduled behavior that fails is logged and
//! skipped, and the rest of the tick proceeds.

use rts_world::EntityId;

/// Errors that can occur while loading or saving configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
    #[error("unknown personality preset: '{0}'")]
    UnknownPersonality(String),
}

/// Failure inside a single scheduled behavior.
#[derive(Debug, thiserror::Error)]
pub enum AiError {
    #[error("no definition for '{0}' in the rules catalog")]
    MissingDefinition(String),
    #[error("entity {0} is dead or no longer owned")]
    StaleEntity(EntityId),
    #[error("no {0} collaborator is configured")]
    MissingCollaborator(&'static str),
    #[error("collaborator {0} is already in use")]
    Busy(&'static str),
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}
