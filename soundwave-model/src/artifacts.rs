//! Model artifact persistence
//!
//! A model directory holds two files: `model.json` (factor matrices and
//! biases) and `metadata.json` (id mappings, user histories, popularity
//! ranking, and a training summary). The trainer writes both; the API
//! service loads both to serve recommendations.

use crate::error::{ModelError, Result};
use crate::model::MfModel;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

pub const MODEL_FILE_NAME: &str = "model.json";
pub const METADATA_FILE_NAME: &str = "metadata.json";

/// One entry of the popularity ranking
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PopularityEntry {
    pub item_id: String,
    pub score: f64,
}

/// Hyperparameters and counts recorded at training time
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingSummary {
    pub embedding_dim: usize,
    pub epochs: usize,
    pub learning_rate: f32,
    pub num_negatives: usize,
    pub seed: u64,
    pub num_samples: usize,
}

/// Serving-side metadata written next to the model weights
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelMetadata {
    pub generated_at: String,
    pub user_mapping: BTreeMap<String, usize>,
    pub item_mapping: BTreeMap<String, usize>,
    pub user_interactions: BTreeMap<String, Vec<String>>,
    pub item_popularity: Vec<PopularityEntry>,
    pub event_weights: HashMap<String, f64>,
    pub training: TrainingSummary,
}

/// Model weights plus metadata, as stored in a model directory
#[derive(Debug, Clone)]
pub struct ModelArtifacts {
    pub model: MfModel,
    pub metadata: ModelMetadata,
}

impl ModelArtifacts {
    /// Write both artifact files, creating the directory if needed
    pub fn save(&self, model_dir: &Path) -> Result<()> {
        std::fs::create_dir_all(model_dir)?;

        let model_json = serde_json::to_string(&self.model)?;
        std::fs::write(model_dir.join(MODEL_FILE_NAME), model_json)?;

        let metadata_json = serde_json::to_string_pretty(&self.metadata)?;
        std::fs::write(model_dir.join(METADATA_FILE_NAME), metadata_json)?;

        Ok(())
    }

    /// Load and validate artifacts from a model directory
    ///
    /// Missing files report which artifact is absent; weight matrices that
    /// disagree with the id mappings are rejected as corrupt.
    pub fn load(model_dir: &Path) -> Result<Self> {
        let model_path = model_dir.join(MODEL_FILE_NAME);
        let metadata_path = model_dir.join(METADATA_FILE_NAME);

        if !model_path.exists() {
            return Err(ModelError::ArtifactsMissing(model_path));
        }
        if !metadata_path.exists() {
            return Err(ModelError::ArtifactsMissing(metadata_path));
        }

        let model: MfModel = serde_json::from_str(&std::fs::read_to_string(&model_path)?)?;
        let metadata: ModelMetadata =
            serde_json::from_str(&std::fs::read_to_string(&metadata_path)?)?;

        if model.user_factors.len() != metadata.user_mapping.len() {
            return Err(ModelError::Corrupt(format!(
                "user mapping has {} entries but model has {} user rows",
                metadata.user_mapping.len(),
                model.user_factors.len()
            )));
        }
        if model.item_factors.len() != metadata.item_mapping.len() {
            return Err(ModelError::Corrupt(format!(
                "item mapping has {} entries but model has {} item rows",
                metadata.item_mapping.len(),
                model.item_factors.len()
            )));
        }
        if model.user_bias.len() != model.user_factors.len()
            || model.item_bias.len() != model.item_factors.len()
        {
            return Err(ModelError::Corrupt("bias vectors disagree with factor matrices".to_string()));
        }

        Ok(Self { model, metadata })
    }
}
