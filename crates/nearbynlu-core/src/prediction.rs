//! Per-query prediction output shared between the pipeline and its callers.

use serde::{Deserialize, Serialize};

use crate::entities::EntityMap;

/// Intent, entity hints and confidence for one query.
///
/// `confidence` is the classifier's probability for its top label, taken
/// before fallback: when `intent` was coarsened to a broad category the
/// number still refers to the original fine-grained label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    pub intent: String,
    pub entities: EntityMap,
    pub confidence: f32,
}
