//! Core types and rule-based logic for NearbyNLU: entity hints, label
//! decoding, confidence fallback and the query-response contract.

pub mod dataset;
pub mod entities;
pub mod error;
pub mod evaluation;
pub mod fallback;
pub mod prediction;
pub mod response;
pub mod schema;
pub mod vocabulary;

pub use dataset::{LabelledQueries, LabelledQuery};
pub use entities::{EntityMap, LocationHint, TimeHint, extract_entities};
pub use error::{NluError, Result};
pub use evaluation::{ClassificationStatus, Evaluation};
pub use fallback::{FallbackPolicy, INTENT_CONFIDENCE_THRESHOLD, apply_fallback};
pub use prediction::PredictionResult;
pub use response::{ApiCall, PlacesError, PlacesSearch, QueryResponse, build_api_call, compose_query};
pub use vocabulary::{Decoded, LabelVocabulary};

/// Fixed-length sentence embedding.
pub type Embedding = Vec<f32>;
