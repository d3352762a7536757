//! Recommendation serving
//!
//! Loads trained model artifacts and serves per-user item rankings. Users
//! absent from the training set fall back to the popularity ranking; known
//! users whose personalized ranking comes up short are topped up from it.

use soundwave_model::{MfModel, ModelArtifacts, Result as ModelResult};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;
use tracing::info;

/// Serves user-level recommendations from trained artifacts
pub struct RecommendationService {
    model: MfModel,
    user_mapping: BTreeMap<String, usize>,
    reverse_item_mapping: Vec<String>,
    user_interactions: HashMap<String, HashSet<String>>,
    popular_items: Vec<(String, f64)>,
}

impl RecommendationService {
    /// Load artifacts from a model directory
    pub fn load(model_dir: &Path) -> ModelResult<Self> {
        let ModelArtifacts { model, metadata } = ModelArtifacts::load(model_dir)?;

        let mut reverse_item_mapping = vec![String::new(); metadata.item_mapping.len()];
        for (item_id, index) in &metadata.item_mapping {
            reverse_item_mapping[*index] = item_id.clone();
        }

        let user_interactions = metadata
            .user_interactions
            .into_iter()
            .map(|(user, items)| (user, items.into_iter().collect()))
            .collect();

        // Defensive re-sort; artifacts are written ranked already
        let mut popular_items: Vec<(String, f64)> = metadata
            .item_popularity
            .into_iter()
            .map(|entry| (entry.item_id, entry.score))
            .collect();
        popular_items.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.0.cmp(&b.0))
        });

        info!(
            users = metadata.user_mapping.len(),
            items = reverse_item_mapping.len(),
            "loaded recommendation model from {}",
            model_dir.display()
        );

        Ok(Self {
            model,
            user_mapping: metadata.user_mapping,
            reverse_item_mapping,
            user_interactions,
            popular_items,
        })
    }

    /// Recommend up to `limit` item ids for a user
    ///
    /// The returned flag reports whether the popularity fallback was used
    /// (unknown user, or too few personalized items remained).
    pub fn recommend_for_user(&self, user_id: &str, limit: usize) -> (Vec<String>, bool) {
        if limit == 0 {
            return (Vec::new(), true);
        }

        let Some(&user_idx) = self.user_mapping.get(user_id) else {
            return (self.fallback_recommendations(limit, &HashSet::new()), true);
        };

        let exclude: HashSet<String> = self
            .user_interactions
            .get(user_id)
            .cloned()
            .unwrap_or_default();

        let scores = self.model.score_all_items(user_idx);
        let mut ranked: Vec<usize> = (0..scores.len()).collect();
        ranked.sort_by(|&a, &b| {
            scores[b]
                .partial_cmp(&scores[a])
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let mut recommendations = Vec::new();
        for item_idx in ranked {
            let item_id = &self.reverse_item_mapping[item_idx];
            if exclude.contains(item_id) {
                continue;
            }
            recommendations.push(item_id.clone());
            if recommendations.len() == limit {
                break;
            }
        }

        let fallback_used = recommendations.len() < limit;
        if fallback_used {
            let mut already_suggested = exclude;
            already_suggested.extend(recommendations.iter().cloned());
            let fill = self.fallback_recommendations(limit - recommendations.len(), &already_suggested);
            recommendations.extend(fill);
        }

        (recommendations, fallback_used)
    }

    fn fallback_recommendations(&self, limit: usize, exclude: &HashSet<String>) -> Vec<String> {
        if limit == 0 {
            return Vec::new();
        }
        self.popular_items
            .iter()
            .filter(|(item_id, _)| !exclude.contains(item_id))
            .take(limit)
            .map(|(item_id, _)| item_id.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use soundwave_model::{train_from_interactions, Interaction, TrainConfig};

    fn like(user: &str, item: &str) -> Interaction {
        Interaction {
            user_id: user.to_string(),
            item_id: item.to_string(),
            event_type: "like".to_string(),
            weight: 1.0,
        }
    }

    /// u1 likes a-items; u2 likes b-items; "hit" is the most popular item
    fn service() -> RecommendationService {
        let interactions = vec![
            like("u1", "a1"),
            like("u1", "a2"),
            like("u2", "b1"),
            like("u2", "b2"),
            like("u1", "hit"),
            like("u2", "hit"),
        ];
        let config = TrainConfig {
            embedding_dim: 8,
            epochs: 100,
            learning_rate: 0.2,
            num_negatives: 3,
            seed: 42,
        };
        let (model, metadata) = train_from_interactions(&interactions, &config).unwrap();

        let mut reverse_item_mapping = vec![String::new(); metadata.item_mapping.len()];
        for (item_id, index) in &metadata.item_mapping {
            reverse_item_mapping[*index] = item_id.clone();
        }

        RecommendationService {
            model,
            user_mapping: metadata.user_mapping,
            reverse_item_mapping,
            user_interactions: metadata
                .user_interactions
                .into_iter()
                .map(|(user, items)| (user, items.into_iter().collect()))
                .collect(),
            popular_items: metadata
                .item_popularity
                .into_iter()
                .map(|entry| (entry.item_id, entry.score))
                .collect(),
        }
    }

    #[test]
    fn test_unknown_user_gets_popularity_fallback() {
        let service = service();
        let (recommendations, fallback_used) = service.recommend_for_user("stranger", 3);

        assert!(fallback_used);
        assert_eq!(recommendations.len(), 3);
        // Most popular item (two interactions) ranks first
        assert_eq!(recommendations[0], "hit");
    }

    #[test]
    fn test_known_user_skips_interacted_items() {
        let service = service();
        let (recommendations, _) = service.recommend_for_user("u1", 2);

        assert!(!recommendations.contains(&"a1".to_string()));
        assert!(!recommendations.contains(&"a2".to_string()));
        assert!(!recommendations.contains(&"hit".to_string()));
    }

    #[test]
    fn test_short_catalogue_sets_fallback_flag() {
        let service = service();
        // u1 interacted with 3 of 5 items; only 2 personalized candidates exist
        let (recommendations, fallback_used) = service.recommend_for_user("u1", 4);

        assert!(fallback_used);
        // Nothing left to fill from: every other item was already interacted with
        assert_eq!(recommendations.len(), 2);
    }

    #[test]
    fn test_zero_limit_returns_empty_with_fallback_flag() {
        let service = service();
        let (recommendations, fallback_used) = service.recommend_for_user("u1", 0);

        assert!(recommendations.is_empty());
        assert!(fallback_used);
    }

    #[test]
    fn test_no_duplicates_in_recommendations() {
        let service = service();
        let (recommendations, _) = service.recommend_for_user("u2", 5);

        let unique: HashSet<&String> = recommendations.iter().collect();
        assert_eq!(unique.len(), recommendations.len());
    }
}
