//! soundwave-train - Recommendation model trainer
//!
//! Trains the collaborative-filtering model from an interaction event file
//! (JSON array or JSONL) and writes the artifacts the API service serves
//! recommendations from.

use anyhow::{Context, Result};
use clap::Parser;
use soundwave_model::{pipeline, train_from_interactions, ModelArtifacts, TrainConfig};
use std::path::PathBuf;
use tracing::info;

#[derive(Debug, Parser)]
#[command(
    name = "soundwave-train",
    about = "Train the recommendation model from interaction data"
)]
struct Args {
    /// Path to a JSON or JSONL interactions file
    #[arg(long)]
    data_path: PathBuf,

    /// Directory to store the trained model artifacts
    /// (defaults to <root folder>/models/latest)
    #[arg(long)]
    model_dir: Option<PathBuf>,

    /// Number of latent factors per user/item
    #[arg(long, default_value_t = 32)]
    embedding_dim: usize,

    /// Training epochs
    #[arg(long, default_value_t = 10)]
    epochs: usize,

    /// SGD learning rate
    #[arg(long, default_value_t = 0.001)]
    learning_rate: f32,

    /// Negative samples per positive interaction
    #[arg(long, default_value_t = 4)]
    num_negatives: usize,

    /// Random seed for reproducibility
    #[arg(long, default_value_t = 42)]
    seed: u64,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let args = Args::parse();

    let model_dir = args.model_dir.unwrap_or_else(|| {
        soundwave_common::config::resolve_root_folder(None)
            .join(soundwave_common::config::DEFAULT_MODEL_SUBDIR)
    });

    info!("Loading interactions from {}", args.data_path.display());
    let interactions = pipeline::load_interactions(&args.data_path, None).with_context(|| {
        format!("failed to load interactions from {}", args.data_path.display())
    })?;
    info!("Loaded {} interactions", interactions.len());

    let config = TrainConfig {
        embedding_dim: args.embedding_dim,
        epochs: args.epochs,
        learning_rate: args.learning_rate,
        num_negatives: args.num_negatives,
        seed: args.seed,
    };
    let (model, metadata) = train_from_interactions(&interactions, &config)?;

    let artifacts = ModelArtifacts { model, metadata };
    artifacts
        .save(&model_dir)
        .with_context(|| format!("failed to write artifacts to {}", model_dir.display()))?;

    info!("Model artifacts written to {}", model_dir.display());
    info!(
        "Users: {}, items: {}, samples: {}",
        artifacts.metadata.user_mapping.len(),
        artifacts.metadata.item_mapping.len(),
        artifacts.metadata.training.num_samples
    );

    Ok(())
}
