//! Error types for the model crate

use std::path::PathBuf;
use thiserror::Error;

/// Result type for model operations
pub type Result<T> = std::result::Result<T, ModelError>;

/// Errors from interaction ingestion, training, and artifact handling
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid interaction: {0}")]
    InvalidInteraction(String),

    #[error("Interaction file not found: {0}")]
    DataFileMissing(PathBuf),

    #[error("Model artifact missing: {0}")]
    ArtifactsMissing(PathBuf),

    #[error("Model artifacts corrupt: {0}")]
    Corrupt(String),

    #[error("Cannot train model: {0}")]
    InsufficientData(String),
}
