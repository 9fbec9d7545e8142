//! Prediction pipeline: encode, classify, decode, fall back, extract hints.
//!
//! A [`Pipeline`] is built once at startup from its artifacts and is
//! read-only afterwards, so a single instance serves any number of
//! concurrent callers. [`NluEngine`] is the cloneable handle a hosting
//! layer keeps; it may be unloaded, in which case every prediction fails
//! with [`NluError::ModelNotLoaded`].

use std::path::Path;
use std::sync::Arc;

use nearbynlu_core::{
    FallbackPolicy, LabelVocabulary, NluError, PredictionResult, Result, extract_entities,
};
use tracing::{debug, info};

use crate::backend::{IntentClassifier, TextEncoder};
use crate::centroid::CentroidClassifier;
use crate::hashing::HashingEncoder;
use crate::manifest::{ArtifactManifest, ClassifierSpec, EncoderSpec};

pub struct Pipeline {
    encoder: Box<dyn TextEncoder>,
    classifier: Box<dyn IntentClassifier>,
    vocabulary: LabelVocabulary,
    policy: FallbackPolicy,
    version: Option<String>,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("dim", &self.encoder.dim())
            .field("labels", &self.vocabulary.len())
            .field("policy", &self.policy)
            .field("version", &self.version)
            .finish()
    }
}

impl Pipeline {
    /// Assemble a pipeline, checking that the artifacts fit together.
    ///
    /// Fails with [`NluError::DimensionMismatch`] if the encoder's output
    /// width differs from the classifier's input width, and with
    /// [`NluError::VocabularyMismatch`] if the classifier declares a label
    /// count different from the vocabulary's.
    pub fn new(
        encoder: Box<dyn TextEncoder>,
        classifier: Box<dyn IntentClassifier>,
        vocabulary: LabelVocabulary,
    ) -> Result<Self> {
        if encoder.dim() != classifier.input_dim() {
            return Err(NluError::DimensionMismatch {
                encoder: encoder.dim(),
                classifier: classifier.input_dim(),
            });
        }
        match classifier.num_labels() {
            Some(n) if n != vocabulary.len() => {
                return Err(NluError::VocabularyMismatch {
                    distribution: n,
                    vocabulary: vocabulary.len(),
                });
            }
            _ => {}
        }

        Ok(Self {
            encoder,
            classifier,
            vocabulary,
            policy: FallbackPolicy::default(),
            version: None,
        })
    }

    pub fn with_policy(mut self, policy: FallbackPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    /// Load every artifact named by the bundle's `manifest.json`.
    pub fn load(dir: &Path) -> Result<Self> {
        let manifest = ArtifactManifest::load(dir)?;

        let vocabulary = LabelVocabulary::load(&dir.join(&manifest.vocabulary))?;
        let encoder = load_encoder(dir, &manifest.encoder)?;
        let classifier = load_classifier(dir, &manifest.classifier)?;

        let pipeline = Self::new(encoder, classifier, vocabulary)?.with_version(&manifest.version);
        info!(
            version = %manifest.version,
            dim = pipeline.encoder.dim(),
            labels = pipeline.vocabulary.len(),
            "prediction pipeline ready"
        );
        Ok(pipeline)
    }

    /// Predict the intent and entity hints of one query.
    ///
    /// Any text is accepted, including the empty string. The returned
    /// confidence is the classifier's, before fallback.
    pub fn predict(&self, text: &str) -> Result<PredictionResult> {
        let embedding = self.encoder.encode(text)?;
        let distribution = self.classifier.classify(&embedding)?;
        let decoded = self.vocabulary.decode(&distribution)?;
        let intent = self.policy.apply(decoded.label, decoded.confidence);

        debug!(
            label = decoded.label,
            confidence = decoded.confidence,
            intent,
            "classified query"
        );

        Ok(PredictionResult {
            intent: intent.to_string(),
            entities: extract_entities(text),
            confidence: decoded.confidence,
        })
    }

    pub fn encoder(&self) -> &dyn TextEncoder {
        self.encoder.as_ref()
    }

    pub fn vocabulary(&self) -> &LabelVocabulary {
        &self.vocabulary
    }

    pub fn policy(&self) -> &FallbackPolicy {
        &self.policy
    }

    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }
}

fn load_encoder(dir: &Path, spec: &EncoderSpec) -> Result<Box<dyn TextEncoder>> {
    match spec {
        EncoderSpec::Hashing { dim } => Ok(Box::new(HashingEncoder::new(*dim)?)),
        EncoderSpec::Onnx { path, dim } => load_onnx_encoder(&dir.join(path), *dim),
    }
}

fn load_classifier(dir: &Path, spec: &ClassifierSpec) -> Result<Box<dyn IntentClassifier>> {
    match spec {
        ClassifierSpec::Centroid { path } => {
            Ok(Box::new(CentroidClassifier::load(&dir.join(path))?))
        }
        ClassifierSpec::Onnx {
            path,
            input_dim,
            output,
        } => load_onnx_classifier(&dir.join(path), *input_dim, *output),
    }
}

#[cfg(feature = "onnx")]
fn load_onnx_encoder(path: &Path, dim: Option<usize>) -> Result<Box<dyn TextEncoder>> {
    Ok(Box::new(crate::embedder::OnnxEncoder::load(path, dim)?))
}

#[cfg(not(feature = "onnx"))]
fn load_onnx_encoder(path: &Path, _dim: Option<usize>) -> Result<Box<dyn TextEncoder>> {
    Err(NluError::model_load(
        path.display(),
        "ONNX encoder requires the `onnx` feature",
    ))
}

#[cfg(feature = "onnx")]
fn load_onnx_classifier(
    path: &Path,
    input_dim: Option<usize>,
    output: crate::manifest::OutputKind,
) -> Result<Box<dyn IntentClassifier>> {
    Ok(Box::new(crate::onnx_classifier::OnnxClassifier::load(
        path, input_dim, output,
    )?))
}

#[cfg(not(feature = "onnx"))]
fn load_onnx_classifier(
    path: &Path,
    _input_dim: Option<usize>,
    _output: crate::manifest::OutputKind,
) -> Result<Box<dyn IntentClassifier>> {
    Err(NluError::model_load(
        path.display(),
        "ONNX classifier requires the `onnx` feature",
    ))
}

/// Shared handle to a loaded pipeline, or to nothing.
#[derive(Debug, Clone, Default)]
pub struct NluEngine {
    pipeline: Option<Arc<Pipeline>>,
}

impl NluEngine {
    pub fn new(pipeline: Pipeline) -> Self {
        Self {
            pipeline: Some(Arc::new(pipeline)),
        }
    }

    /// A handle with no model; every prediction fails.
    pub fn unloaded() -> Self {
        Self::default()
    }

    /// Load a bundle directory. Failure here is fatal to startup.
    pub fn load(dir: &Path) -> Result<Self> {
        Ok(Self::new(Pipeline::load(dir)?))
    }

    pub fn pipeline(&self) -> Result<&Pipeline> {
        self.pipeline.as_deref().ok_or(NluError::ModelNotLoaded)
    }

    pub fn predict(&self, text: &str) -> Result<PredictionResult> {
        self.pipeline()?.predict(text)
    }
}
