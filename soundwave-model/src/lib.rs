//! # Soundwave Model Library
//!
//! Collaborative-filtering recommendation model for Soundwave:
//! - Interaction ingestion and training sample generation
//! - Matrix-factorization scorer trained on implicit feedback
//! - Artifact persistence shared by the trainer CLI and the API service

pub mod artifacts;
pub mod error;
pub mod model;
pub mod pipeline;

pub use artifacts::{ModelArtifacts, ModelMetadata};
pub use error::{ModelError, Result};
pub use model::{train_from_interactions, MfModel, TrainConfig};
pub use pipeline::Interaction;
