use std::io;
use thiserror::Error;

/// Errors that can occur while persisting or loading an export manifest
#[derive(Error, Debug)]
pub enum ManifestError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to parse manifest JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to parse manifest TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize manifest TOML: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Invalid record: {0}")]
    InvalidRecord(String),
}
