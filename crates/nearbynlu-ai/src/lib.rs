//! Intent inference: text encoders, intent classifiers and the pipeline that
//! ties them to a label vocabulary.
//!
//! The feature-hashing encoder and centroid classifier are always available.
//! ONNX Runtime backends need the `onnx` feature.

pub mod backend;
pub mod centroid;
#[cfg(feature = "onnx")]
mod embedder;
pub mod hashing;
pub mod manifest;
#[cfg(feature = "onnx")]
mod onnx_classifier;
pub mod pipeline;

pub use backend::{IntentClassifier, TextEncoder};
pub use centroid::CentroidClassifier;
#[cfg(feature = "onnx")]
pub use embedder::OnnxEncoder;
pub use hashing::HashingEncoder;
pub use manifest::{ArtifactManifest, ClassifierSpec, EncoderSpec, MANIFEST_FILE, OutputKind};
#[cfg(feature = "onnx")]
pub use onnx_classifier::OnnxClassifier;
pub use pipeline::{NluEngine, Pipeline};
