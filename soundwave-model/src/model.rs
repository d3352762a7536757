//! Matrix-factorization scorer and trainer
//!
//! Implicit-feedback collaborative filtering: every user and item carries a
//! latent factor vector and a bias. The score for a (user, item) pair is
//! the sigmoid of the factor dot product plus biases. Training runs
//! stochastic gradient descent on binary cross-entropy over positive
//! interactions and sampled negatives.

use crate::artifacts::{ModelMetadata, PopularityEntry, TrainingSummary};
use crate::error::{ModelError, Result};
use crate::pipeline::{
    self, build_id_mappings, build_user_history, compute_item_popularity,
    generate_training_samples, Interaction, TrainingSamples,
};
use chrono::{SecondsFormat, Utc};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Training hyperparameters
#[derive(Debug, Clone)]
pub struct TrainConfig {
    /// Number of latent factors per user/item
    pub embedding_dim: usize,
    /// Full passes over the training samples
    pub epochs: usize,
    /// SGD step size
    pub learning_rate: f32,
    /// Negative samples per positive interaction
    pub num_negatives: usize,
    /// Seed for initialization, shuffling, and negative sampling
    pub seed: u64,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            embedding_dim: 32,
            epochs: 10,
            learning_rate: 0.001,
            num_negatives: 4,
            seed: 42,
        }
    }
}

/// Matrix-factorization model weights
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MfModel {
    pub embedding_dim: usize,
    pub user_factors: Vec<Vec<f32>>,
    pub item_factors: Vec<Vec<f32>>,
    pub user_bias: Vec<f32>,
    pub item_bias: Vec<f32>,
    pub global_bias: f32,
}

impl MfModel {
    /// Initialize with seeded uniform weights scaled by 1/sqrt(dim)
    pub fn new(num_users: usize, num_items: usize, embedding_dim: usize, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let scale = 1.0 / (embedding_dim as f32).sqrt();

        let mut init_factors = |count: usize| -> Vec<Vec<f32>> {
            (0..count)
                .map(|_| (0..embedding_dim).map(|_| rng.gen_range(-scale..scale)).collect())
                .collect()
        };

        let user_factors = init_factors(num_users);
        let item_factors = init_factors(num_items);

        Self {
            embedding_dim,
            user_factors,
            item_factors,
            user_bias: vec![0.0; num_users],
            item_bias: vec![0.0; num_items],
            global_bias: 0.0,
        }
    }

    pub fn num_users(&self) -> usize {
        self.user_factors.len()
    }

    pub fn num_items(&self) -> usize {
        self.item_factors.len()
    }

    /// Raw affinity before the sigmoid
    fn logit(&self, user_idx: usize, item_idx: usize) -> f32 {
        let dot: f32 = self.user_factors[user_idx]
            .iter()
            .zip(&self.item_factors[item_idx])
            .map(|(u, i)| u * i)
            .sum();
        dot + self.user_bias[user_idx] + self.item_bias[item_idx] + self.global_bias
    }

    /// Predicted interaction probability for a (user, item) pair
    pub fn score(&self, user_idx: usize, item_idx: usize) -> f32 {
        sigmoid(self.logit(user_idx, item_idx))
    }

    /// Scores for every item for one user, in item index order
    pub fn score_all_items(&self, user_idx: usize) -> Vec<f32> {
        (0..self.num_items()).map(|item_idx| self.score(user_idx, item_idx)).collect()
    }

    /// Run SGD over the samples, returning the final epoch's mean loss
    pub fn train(
        &mut self,
        samples: &TrainingSamples,
        epochs: usize,
        learning_rate: f32,
        seed: u64,
    ) -> Result<f64> {
        if samples.is_empty() {
            return Err(ModelError::InsufficientData(
                "no training samples generated".to_string(),
            ));
        }

        // Separate stream from the init RNG so reruns stay reproducible
        let mut rng = StdRng::seed_from_u64(seed.wrapping_add(1));
        let mut order: Vec<usize> = (0..samples.len()).collect();
        let mut mean_loss = 0.0;

        for epoch in 0..epochs {
            order.shuffle(&mut rng);
            let mut loss_sum = 0.0f64;

            for &i in &order {
                let user_idx = samples.user_indices[i];
                let item_idx = samples.item_indices[i];
                let label = samples.labels[i];

                let predicted = sigmoid(self.logit(user_idx, item_idx));
                loss_sum += binary_cross_entropy(predicted, label);

                // dBCE/dlogit for a sigmoid output
                let err = (predicted - label) * learning_rate;

                for d in 0..self.embedding_dim {
                    let user_factor = self.user_factors[user_idx][d];
                    let item_factor = self.item_factors[item_idx][d];
                    self.user_factors[user_idx][d] -= err * item_factor;
                    self.item_factors[item_idx][d] -= err * user_factor;
                }
                self.user_bias[user_idx] -= err;
                self.item_bias[item_idx] -= err;
                self.global_bias -= err;
            }

            mean_loss = loss_sum / samples.len() as f64;
            debug!(epoch, mean_loss, "training epoch complete");
        }

        Ok(mean_loss)
    }
}

fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

fn binary_cross_entropy(predicted: f32, label: f32) -> f64 {
    let p = f64::from(predicted).clamp(1e-7, 1.0 - 1e-7);
    let y = f64::from(label);
    -(y * p.ln() + (1.0 - y) * (1.0 - p).ln())
}

/// Train a model from normalized interactions and assemble its metadata
pub fn train_from_interactions(
    interactions: &[Interaction],
    config: &TrainConfig,
) -> Result<(MfModel, ModelMetadata)> {
    if interactions.is_empty() {
        return Err(ModelError::InsufficientData(
            "cannot train model without interactions".to_string(),
        ));
    }

    let (user_mapping, item_mapping) = build_id_mappings(interactions);
    if user_mapping.is_empty() || item_mapping.is_empty() {
        return Err(ModelError::InsufficientData(
            "insufficient unique users or items for training".to_string(),
        ));
    }

    let samples = generate_training_samples(
        interactions,
        &user_mapping,
        &item_mapping,
        config.num_negatives,
        config.seed,
    );
    if samples.is_empty() {
        return Err(ModelError::InsufficientData(
            "failed to generate training samples".to_string(),
        ));
    }

    info!(
        users = user_mapping.len(),
        items = item_mapping.len(),
        samples = samples.len(),
        "training matrix-factorization model"
    );

    let mut model = MfModel::new(
        user_mapping.len(),
        item_mapping.len(),
        config.embedding_dim,
        config.seed,
    );
    let final_loss = model.train(&samples, config.epochs, config.learning_rate, config.seed)?;
    info!(final_loss, "training complete");

    let metadata = ModelMetadata {
        generated_at: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
        user_mapping,
        item_mapping,
        user_interactions: build_user_history(interactions),
        item_popularity: compute_item_popularity(interactions)
            .into_iter()
            .map(|(item_id, score)| PopularityEntry { item_id, score })
            .collect(),
        event_weights: pipeline::default_event_weights(),
        training: TrainingSummary {
            embedding_dim: config.embedding_dim,
            epochs: config.epochs,
            learning_rate: config.learning_rate,
            num_negatives: config.num_negatives,
            seed: config.seed,
            num_samples: samples.len(),
        },
    };

    Ok((model, metadata))
}
