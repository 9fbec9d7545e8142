//! Label vocabulary and distribution decoding.
//!
//! The vocabulary is the ordered list of intent labels persisted beside a
//! trained classifier: index `i` of every prediction distribution refers to
//! entry `i`. It is loaded once and never mutated.

use std::collections::HashSet;
use std::path::Path;

use tracing::info;

use crate::error::{NluError, Result};

/// Ordered intent labels, indexed `0..len()`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelVocabulary {
    labels: Vec<String>,
}

/// Top entry of a decoded distribution.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Decoded<'a> {
    pub label: &'a str,
    pub confidence: f32,
    pub index: usize,
}

impl LabelVocabulary {
    /// Build a vocabulary, rejecting empty lists and duplicate labels.
    pub fn new(labels: Vec<String>) -> Result<Self> {
        if labels.is_empty() {
            return Err(NluError::model_load("label vocabulary", "vocabulary is empty"));
        }
        let mut seen = HashSet::with_capacity(labels.len());
        for label in &labels {
            if !seen.insert(label.as_str()) {
                return Err(NluError::model_load(
                    "label vocabulary",
                    format!("duplicate label {label:?}"),
                ));
            }
        }
        Ok(Self { labels })
    }

    /// Load a vocabulary persisted as a JSON array of strings.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| NluError::model_load(path.display(), e))?;
        let labels: Vec<String> =
            serde_json::from_str(&raw).map_err(|e| NluError::model_load(path.display(), e))?;
        let vocabulary = Self::new(labels).map_err(|e| match e {
            NluError::ModelLoad { reason, .. } => NluError::model_load(path.display(), reason),
            other => other,
        })?;
        info!(labels = vocabulary.len(), path = %path.display(), "loaded label vocabulary");
        Ok(vocabulary)
    }

    /// Persist as a JSON array of strings.
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(&self.labels)
            .map_err(|e| NluError::model_load(path.display(), e))?;
        std::fs::write(path, json).map_err(|e| NluError::model_load(path.display(), e))
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.labels.get(index).map(String::as_str)
    }

    pub fn index_of(&self, label: &str) -> Option<usize> {
        self.labels.iter().position(|l| l == label)
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Decode a prediction distribution into its top label.
    ///
    /// Ties go to the lowest index. NaN components never win; a distribution
    /// that is all NaN decodes to index 0.
    pub fn decode(&self, distribution: &[f32]) -> Result<Decoded<'_>> {
        if distribution.len() != self.labels.len() {
            return Err(NluError::VocabularyMismatch {
                distribution: distribution.len(),
                vocabulary: self.labels.len(),
            });
        }

        let index = argmax(distribution);
        Ok(Decoded {
            label: &self.labels[index],
            confidence: distribution[index],
            index,
        })
    }
}

/// Index of the largest value, first occurrence on ties.
fn argmax(values: &[f32]) -> usize {
    let mut best_i = 0usize;
    let mut best_v = f32::NEG_INFINITY;
    for (i, &v) in values.iter().enumerate() {
        if v > best_v {
            best_v = v;
            best_i = i;
        }
    }
    best_i
}
