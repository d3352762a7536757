//! Interaction ingestion and training sample preparation
//!
//! Normalizes raw interaction events into weighted implicit-feedback
//! records, then derives the dense index mappings, negative samples,
//! popularity ranking, and per-user histories the trainer consumes.

use crate::error::{ModelError, Result};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::path::Path;

/// Default weight per interaction event type
pub fn default_event_weights() -> HashMap<String, f64> {
    HashMap::from([
        ("like".to_string(), 1.0),
        ("playlist_add".to_string(), 1.5),
    ])
}

/// Merge caller overrides over the default event weights
pub fn resolve_event_weights(overrides: Option<&HashMap<String, f64>>) -> HashMap<String, f64> {
    let mut weights = default_event_weights();
    if let Some(extra) = overrides {
        for (event, weight) in extra {
            weights.insert(event.clone(), *weight);
        }
    }
    weights
}

/// Raw interaction record as it appears in ingest files
#[derive(Debug, Clone, Deserialize)]
pub struct RawInteraction {
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub item_id: Option<String>,
    #[serde(default)]
    pub event_type: Option<String>,
}

/// Normalized representation of a user's interaction with an item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Interaction {
    pub user_id: String,
    pub item_id: String,
    pub event_type: String,
    pub weight: f64,
}

impl Interaction {
    /// Normalize a raw record, assigning the weight for its event type
    pub fn from_raw(raw: &RawInteraction, weights: &HashMap<String, f64>) -> Result<Self> {
        let (user_id, item_id, event_type) = match (
            raw.user_id.clone(),
            raw.item_id.clone(),
            raw.event_type.clone(),
        ) {
            (Some(user_id), Some(item_id), Some(event_type)) => (user_id, item_id, event_type),
            (user_id, item_id, event_type) => {
                let mut missing = Vec::new();
                if user_id.is_none() {
                    missing.push("user_id");
                }
                if item_id.is_none() {
                    missing.push("item_id");
                }
                if event_type.is_none() {
                    missing.push("event_type");
                }
                return Err(ModelError::InvalidInteraction(format!(
                    "missing fields: {}",
                    missing.join(", ")
                )));
            }
        };

        let weight = weights.get(&event_type).copied().ok_or_else(|| {
            ModelError::InvalidInteraction(format!("unsupported event type '{}'", event_type))
        })?;

        Ok(Self {
            user_id,
            item_id,
            event_type,
            weight,
        })
    }
}

/// Load interactions from a JSON array or JSON Lines file
pub fn load_interactions(
    path: &Path,
    weight_overrides: Option<&HashMap<String, f64>>,
) -> Result<Vec<Interaction>> {
    if !path.exists() {
        return Err(ModelError::DataFileMissing(path.to_path_buf()));
    }

    let content = std::fs::read_to_string(path)?;
    let trimmed = content.trim();
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }

    let raw: Vec<RawInteraction> = if trimmed.starts_with('[') {
        serde_json::from_str(trimmed)?
    } else {
        trimmed
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(serde_json::from_str)
            .collect::<std::result::Result<_, _>>()?
    };

    let weights = resolve_event_weights(weight_overrides);
    raw.iter().map(|r| Interaction::from_raw(r, &weights)).collect()
}

/// Create stable dense index mappings for users and items
///
/// Ids are sorted lexicographically so the same interaction set always
/// produces the same mapping.
pub fn build_id_mappings(
    interactions: &[Interaction],
) -> (BTreeMap<String, usize>, BTreeMap<String, usize>) {
    let user_ids: BTreeSet<&str> = interactions.iter().map(|i| i.user_id.as_str()).collect();
    let item_ids: BTreeSet<&str> = interactions.iter().map(|i| i.item_id.as_str()).collect();

    let user_mapping = user_ids
        .into_iter()
        .enumerate()
        .map(|(idx, id)| (id.to_string(), idx))
        .collect();
    let item_mapping = item_ids
        .into_iter()
        .enumerate()
        .map(|(idx, id)| (id.to_string(), idx))
        .collect();

    (user_mapping, item_mapping)
}

/// Index-aligned training triples (user index, item index, label)
#[derive(Debug, Clone, Default)]
pub struct TrainingSamples {
    pub user_indices: Vec<usize>,
    pub item_indices: Vec<usize>,
    pub labels: Vec<f32>,
}

impl TrainingSamples {
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

/// Produce positive and negative samples for implicit feedback training
///
/// Each interaction contributes one positive (label 1.0) plus up to
/// `num_negatives` negatives (label 0.0) sampled without replacement from
/// items the user never interacted with. Users who touched the whole
/// catalogue contribute positives only.
pub fn generate_training_samples(
    interactions: &[Interaction],
    user_mapping: &BTreeMap<String, usize>,
    item_mapping: &BTreeMap<String, usize>,
    num_negatives: usize,
    seed: u64,
) -> TrainingSamples {
    if interactions.is_empty() {
        return TrainingSamples::default();
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let all_items: Vec<&str> = item_mapping.keys().map(|s| s.as_str()).collect();

    let mut history: HashMap<&str, HashSet<&str>> = HashMap::new();
    for interaction in interactions {
        history
            .entry(interaction.user_id.as_str())
            .or_default()
            .insert(interaction.item_id.as_str());
    }

    let mut samples = TrainingSamples::default();
    for interaction in interactions {
        let user_idx = user_mapping[&interaction.user_id];
        let item_idx = item_mapping[&interaction.item_id];
        samples.user_indices.push(user_idx);
        samples.item_indices.push(item_idx);
        samples.labels.push(1.0);

        let seen = &history[interaction.user_id.as_str()];
        let candidates: Vec<&str> = all_items
            .iter()
            .copied()
            .filter(|item| !seen.contains(item))
            .collect();
        if candidates.is_empty() {
            continue;
        }

        let count = num_negatives.min(candidates.len());
        for negative in candidates.choose_multiple(&mut rng, count) {
            samples.user_indices.push(user_idx);
            samples.item_indices.push(item_mapping[*negative]);
            samples.labels.push(0.0);
        }
    }

    samples
}

/// Aggregate interaction weights into a popularity ranking
///
/// Sorted by score descending; ties break on item id for determinism.
pub fn compute_item_popularity(interactions: &[Interaction]) -> Vec<(String, f64)> {
    let mut scores: HashMap<&str, f64> = HashMap::new();
    for interaction in interactions {
        *scores.entry(interaction.item_id.as_str()).or_insert(0.0) += interaction.weight;
    }

    let mut ranked: Vec<(String, f64)> = scores
        .into_iter()
        .map(|(item, score)| (item.to_string(), score))
        .collect();
    ranked.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.0.cmp(&b.0))
    });
    ranked
}

/// Map each user to the sorted unique item ids they interacted with
pub fn build_user_history(interactions: &[Interaction]) -> BTreeMap<String, Vec<String>> {
    let mut history: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
    for interaction in interactions {
        history
            .entry(interaction.user_id.clone())
            .or_default()
            .insert(interaction.item_id.clone());
    }
    history
        .into_iter()
        .map(|(user, items)| (user, items.into_iter().collect()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn raw(user: &str, item: &str, event: &str) -> RawInteraction {
        RawInteraction {
            user_id: Some(user.to_string()),
            item_id: Some(item.to_string()),
            event_type: Some(event.to_string()),
        }
    }

    fn like(user: &str, item: &str) -> Interaction {
        Interaction {
            user_id: user.to_string(),
            item_id: item.to_string(),
            event_type: "like".to_string(),
            weight: 1.0,
        }
    }

    #[test]
    fn test_from_raw_assigns_event_weight() {
        let weights = default_event_weights();

        let liked = Interaction::from_raw(&raw("u1", "i1", "like"), &weights).unwrap();
        assert_eq!(liked.weight, 1.0);

        let added = Interaction::from_raw(&raw("u1", "i1", "playlist_add"), &weights).unwrap();
        assert_eq!(added.weight, 1.5);
    }

    #[test]
    fn test_from_raw_reports_missing_fields() {
        let weights = default_event_weights();
        let incomplete = RawInteraction {
            user_id: Some("u1".to_string()),
            item_id: None,
            event_type: None,
        };

        let err = Interaction::from_raw(&incomplete, &weights).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("item_id"));
        assert!(message.contains("event_type"));
    }

    #[test]
    fn test_from_raw_rejects_unknown_event() {
        let weights = default_event_weights();
        let err = Interaction::from_raw(&raw("u1", "i1", "skipped"), &weights).unwrap_err();
        assert!(err.to_string().contains("skipped"));
    }

    #[test]
    fn test_weight_overrides_extend_defaults() {
        let overrides = HashMap::from([("skip".to_string(), -0.5), ("like".to_string(), 2.0)]);
        let weights = resolve_event_weights(Some(&overrides));

        assert_eq!(weights["like"], 2.0);
        assert_eq!(weights["playlist_add"], 1.5);
        assert_eq!(weights["skip"], -0.5);
    }

    #[test]
    fn test_load_interactions_json_array() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[{{"user_id": "u1", "item_id": "i1", "event_type": "like"}},
                {{"user_id": "u2", "item_id": "i2", "event_type": "playlist_add"}}]"#
        )
        .unwrap();

        let interactions = load_interactions(file.path(), None).unwrap();
        assert_eq!(interactions.len(), 2);
        assert_eq!(interactions[1].weight, 1.5);
    }

    #[test]
    fn test_load_interactions_jsonl() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, r#"{{"user_id": "u1", "item_id": "i1", "event_type": "like"}}"#).unwrap();
        writeln!(file).unwrap();
        writeln!(file, r#"{{"user_id": "u1", "item_id": "i2", "event_type": "like"}}"#).unwrap();

        let interactions = load_interactions(file.path(), None).unwrap();
        assert_eq!(interactions.len(), 2);
    }

    #[test]
    fn test_load_interactions_empty_file() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let interactions = load_interactions(file.path(), None).unwrap();
        assert!(interactions.is_empty());
    }

    #[test]
    fn test_load_interactions_missing_file() {
        let err = load_interactions(Path::new("/nonexistent/interactions.jsonl"), None).unwrap_err();
        assert!(matches!(err, ModelError::DataFileMissing(_)));
    }

    #[test]
    fn test_id_mappings_are_sorted_and_dense() {
        let interactions = vec![like("zoe", "i9"), like("amy", "i1"), like("mia", "i5")];
        let (users, items) = build_id_mappings(&interactions);

        assert_eq!(users["amy"], 0);
        assert_eq!(users["mia"], 1);
        assert_eq!(users["zoe"], 2);
        assert_eq!(items.len(), 3);
        assert_eq!(items["i1"], 0);
    }

    #[test]
    fn test_training_samples_counts_and_labels() {
        // Two users, four items; each interaction gets 2 negatives
        let interactions = vec![like("u1", "i1"), like("u1", "i2"), like("u2", "i3")];
        let (users, items) = build_id_mappings(&interactions);

        let samples = generate_training_samples(&interactions, &users, &items, 2, 42);

        // u1 has 2 unseen items, u2 has 3 (capped at 2 negatives each)
        assert_eq!(samples.len(), 3 + 2 + 2 + 2);
        let positives = samples.labels.iter().filter(|&&l| l == 1.0).count();
        assert_eq!(positives, 3);
    }

    #[test]
    fn test_negatives_exclude_user_history() {
        let interactions = vec![like("u1", "i1"), like("u1", "i2"), like("u2", "i3")];
        let (users, items) = build_id_mappings(&interactions);
        let samples = generate_training_samples(&interactions, &users, &items, 4, 7);

        let u1 = users["u1"];
        let seen: Vec<usize> = vec![items["i1"], items["i2"]];
        for i in 0..samples.len() {
            if samples.user_indices[i] == u1 && samples.labels[i] == 0.0 {
                assert!(!seen.contains(&samples.item_indices[i]));
            }
        }
    }

    #[test]
    fn test_training_samples_deterministic_per_seed() {
        let interactions = vec![
            like("u1", "i1"),
            like("u2", "i2"),
            like("u3", "i3"),
            like("u1", "i4"),
        ];
        let (users, items) = build_id_mappings(&interactions);

        let first = generate_training_samples(&interactions, &users, &items, 2, 42);
        let second = generate_training_samples(&interactions, &users, &items, 2, 42);

        assert_eq!(first.item_indices, second.item_indices);
        assert_eq!(first.user_indices, second.user_indices);
    }

    #[test]
    fn test_empty_interactions_produce_empty_samples() {
        let samples = generate_training_samples(&[], &BTreeMap::new(), &BTreeMap::new(), 4, 42);
        assert!(samples.is_empty());
    }

    #[test]
    fn test_popularity_ranking() {
        let interactions = vec![
            like("u1", "quiet"),
            Interaction {
                user_id: "u1".to_string(),
                item_id: "hit".to_string(),
                event_type: "playlist_add".to_string(),
                weight: 1.5,
            },
            like("u2", "hit"),
        ];

        let ranking = compute_item_popularity(&interactions);
        assert_eq!(ranking[0], ("hit".to_string(), 2.5));
        assert_eq!(ranking[1], ("quiet".to_string(), 1.0));
    }

    #[test]
    fn test_user_history_sorted_unique() {
        let interactions = vec![like("u1", "b"), like("u1", "a"), like("u1", "b")];
        let history = build_user_history(&interactions);

        assert_eq!(history["u1"], vec!["a".to_string(), "b".to_string()]);
    }
}
