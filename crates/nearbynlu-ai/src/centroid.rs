//! Centroid-based intent classification.
//!
//! Holds one unit-norm centroid per vocabulary label, in vocabulary order.
//! An embedding is scored by cosine similarity against every centroid and
//! the scores are turned into a distribution with a temperature-scaled
//! softmax. Centroids are the normalized mean of each label's training
//! embeddings.

use std::path::Path;

use nearbynlu_core::{NluError, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::backend::{IntentClassifier, cosine_sim, normalize, softmax};

/// Softmax temperature applied to cosine similarities.
pub const DEFAULT_TEMPERATURE: f32 = 0.1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CentroidClassifier {
    dim: usize,
    temperature: f32,
    centroids: Vec<Vec<f32>>,
}

impl CentroidClassifier {
    /// Build centroids from `(label_index, embedding)` examples.
    ///
    /// Every label in `0..num_labels` needs at least one example.
    pub fn build<'a>(
        examples: impl IntoIterator<Item = (usize, &'a [f32])>,
        num_labels: usize,
        dim: usize,
    ) -> Result<Self> {
        let mut accum: Vec<(Vec<f32>, usize)> = vec![(vec![0.0f32; dim], 0); num_labels];

        for (label, emb) in examples {
            if emb.len() != dim {
                return Err(NluError::DimensionMismatch {
                    encoder: emb.len(),
                    classifier: dim,
                });
            }
            let entry = accum.get_mut(label).ok_or_else(|| {
                NluError::model_load(
                    "centroid classifier",
                    format!("label index {label} outside vocabulary of {num_labels}"),
                )
            })?;
            for (acc, &val) in entry.0.iter_mut().zip(emb) {
                *acc += val;
            }
            entry.1 += 1;
        }

        let mut centroids = Vec::with_capacity(num_labels);
        for (label, (mut sum, count)) in accum.into_iter().enumerate() {
            if count == 0 {
                return Err(NluError::model_load(
                    "centroid classifier",
                    format!("label index {label} has no examples"),
                ));
            }
            for v in &mut sum {
                *v /= count as f32;
            }
            normalize(&mut sum);
            centroids.push(sum);
        }

        Ok(Self {
            dim,
            temperature: DEFAULT_TEMPERATURE,
            centroids,
        })
    }

    /// Set the softmax temperature; it must be finite and positive.
    pub fn with_temperature(mut self, temperature: f32) -> Result<Self> {
        if !valid_temperature(temperature) {
            return Err(NluError::model_load(
                "centroid classifier",
                format!("temperature must be finite and positive, got {temperature}"),
            ));
        }
        self.temperature = temperature;
        Ok(self)
    }

    /// Load a classifier persisted with [`save`](Self::save).
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| NluError::model_load(path.display(), e))?;
        let clf: Self =
            serde_json::from_str(&raw).map_err(|e| NluError::model_load(path.display(), e))?;

        if clf.centroids.is_empty() {
            return Err(NluError::model_load(path.display(), "no centroids"));
        }
        if let Some(bad) = clf.centroids.iter().position(|c| c.len() != clf.dim) {
            return Err(NluError::model_load(
                path.display(),
                format!("centroid {bad} is not {}-dimensional", clf.dim),
            ));
        }
        if !valid_temperature(clf.temperature) {
            return Err(NluError::model_load(
                path.display(),
                "temperature must be finite and positive",
            ));
        }

        info!(
            labels = clf.centroids.len(),
            dim = clf.dim,
            path = %path.display(),
            "loaded centroid classifier"
        );
        Ok(clf)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string(self).map_err(|e| NluError::model_load(path.display(), e))?;
        std::fs::write(path, json).map_err(|e| NluError::model_load(path.display(), e))
    }
}

fn valid_temperature(t: f32) -> bool {
    t.is_finite() && t > 0.0
}

impl IntentClassifier for CentroidClassifier {
    fn input_dim(&self) -> usize {
        self.dim
    }

    fn num_labels(&self) -> Option<usize> {
        Some(self.centroids.len())
    }

    fn classify(&self, embedding: &[f32]) -> Result<Vec<f32>> {
        if embedding.len() != self.dim {
            return Err(NluError::DimensionMismatch {
                encoder: embedding.len(),
                classifier: self.dim,
            });
        }
        let scaled: Vec<f32> = self
            .centroids
            .iter()
            .map(|c| cosine_sim(embedding, c) / self.temperature)
            .collect();
        Ok(softmax(&scaled))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DIM: usize = 4; // Small dim for tests.

    fn two_label_classifier() -> CentroidClassifier {
        // Label 0 points +x, label 1 points +y.
        let a = [1.0, 0.0, 0.0, 0.0];
        let b = [0.9, 0.1, 0.0, 0.0];
        let c = [0.0, 1.0, 0.0, 0.0];
        CentroidClassifier::build([(0, &a[..]), (0, &b[..]), (1, &c[..])], 2, DIM).unwrap()
    }

    #[test]
    fn build_centroids_mean_pooled() {
        let clf = two_label_classifier();
        assert_eq!(clf.num_labels(), Some(2));
        assert!(clf.centroids[0][0] > 0.9, "label 0 centroid should point +x");
        assert!(clf.centroids[1][1] > 0.9, "label 1 centroid should point +y");

        let norm: f32 = clf.centroids[0].iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5, "should be unit norm");
    }

    #[test]
    fn classify_picks_nearest_centroid() {
        let clf = two_label_classifier();
        let dist = clf.classify(&[0.95, 0.05, 0.0, 0.0]).unwrap();
        assert_eq!(dist.len(), 2);
        assert!(dist[0] > 0.9, "got {dist:?}");
        assert!((dist.iter().sum::<f32>() - 1.0).abs() < 1e-5);
    }

    #[test]
    fn zero_embedding_gives_uniform_distribution() {
        let clf = two_label_classifier();
        let dist = clf.classify(&[0.0; DIM]).unwrap();
        assert!((dist[0] - 0.5).abs() < 1e-6);
        assert!((dist[1] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn higher_temperature_flattens() {
        let sharp = two_label_classifier();
        let flat = two_label_classifier().with_temperature(10.0).unwrap();
        let x = [0.95, 0.05, 0.0, 0.0];
        assert!(flat.classify(&x).unwrap()[0] < sharp.classify(&x).unwrap()[0]);
    }

    #[test]
    fn classify_rejects_wrong_dim() {
        let clf = two_label_classifier();
        assert!(matches!(
            clf.classify(&[1.0, 0.0]),
            Err(NluError::DimensionMismatch { encoder: 2, classifier: 4 })
        ));
    }

    #[test]
    fn build_requires_every_label() {
        let a = [1.0, 0.0, 0.0, 0.0];
        let err = CentroidClassifier::build([(0, &a[..])], 2, DIM).unwrap_err();
        assert!(err.to_string().contains("no examples"), "{err}");
    }

    #[test]
    fn build_rejects_out_of_range_label() {
        let a = [1.0, 0.0, 0.0, 0.0];
        assert!(CentroidClassifier::build([(3, &a[..])], 2, DIM).is_err());
    }

    #[test]
    fn build_rejects_wrong_dim_example() {
        let a = [1.0, 0.0];
        assert!(matches!(
            CentroidClassifier::build([(0, &a[..])], 1, DIM),
            Err(NluError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("centroids.json");
        let clf = two_label_classifier().with_temperature(0.2).unwrap();
        clf.save(&path).unwrap();

        let loaded = CentroidClassifier::load(&path).unwrap();
        assert_eq!(loaded, clf);
        assert_eq!(loaded.temperature, 0.2);
    }

    #[test]
    fn load_rejects_ragged_centroids() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("centroids.json");
        std::fs::write(
            &path,
            r#"{"dim": 2, "temperature": 0.1, "centroids": [[1.0, 0.0], [1.0]]}"#,
        )
        .unwrap();
        assert!(matches!(
            CentroidClassifier::load(&path),
            Err(NluError::ModelLoad { .. })
        ));
    }

    #[test]
    fn load_rejects_non_positive_temperature() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("centroids.json");
        for temperature in ["0.0", "-1.0", "null"] {
            std::fs::write(
                &path,
                format!(r#"{{"dim": 1, "temperature": {temperature}, "centroids": [[1.0]]}}"#),
            )
            .unwrap();
            assert!(CentroidClassifier::load(&path).is_err(), "{temperature}");
        }
    }

    #[test]
    fn with_temperature_rejects_unusable_values() {
        for t in [0.0, -0.5, f32::INFINITY, f32::NEG_INFINITY, f32::NAN] {
            assert!(
                matches!(
                    two_label_classifier().with_temperature(t),
                    Err(NluError::ModelLoad { .. })
                ),
                "{t}"
            );
        }
        assert!(two_label_classifier().with_temperature(1e-3).is_ok());
    }
}
