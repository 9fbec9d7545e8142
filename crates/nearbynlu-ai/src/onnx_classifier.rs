//! ONNX Runtime intent classifier over sentence embeddings.
//!
//! Expects a model with one float input of shape `[batch, dim]` and one float
//! output of shape `[batch, num_labels]`, e.g. a dense head exported from the
//! training notebook.

use std::path::Path;
use std::sync::Mutex;

use nearbynlu_core::{NluError, Result};
use ort::session::Session;
use ort::value::Tensor;
use tracing::info;

use crate::backend::{IntentClassifier, softmax};
use crate::embedder::{infer_dim, infer_err};
use crate::manifest::OutputKind;

pub struct OnnxClassifier {
    session: Mutex<Session>,
    input_dim: usize,
    num_labels: Option<usize>,
    output: OutputKind,
}

impl OnnxClassifier {
    /// Load a classifier graph.
    ///
    /// `declared_input_dim` is used when the graph's input width is dynamic.
    pub fn load(
        model_path: &Path,
        declared_input_dim: Option<usize>,
        output: OutputKind,
    ) -> Result<Self> {
        let load_err = |e: &dyn std::fmt::Display| NluError::model_load(model_path.display(), e);

        if !model_path.exists() {
            return Err(load_err(&"classifier model not found"));
        }

        let session = Session::builder()
            .map_err(|e| load_err(&e))?
            .commit_from_file(model_path)
            .map_err(|e| load_err(&e))?;

        let input = session
            .inputs()
            .first()
            .ok_or_else(|| load_err(&"classifier has no inputs"))?;
        let output = session
            .outputs()
            .first()
            .ok_or_else(|| load_err(&"classifier has no outputs"))?;

        let input_dim = match (infer_dim(input.dtype()), declared_input_dim) {
            (Some(inferred), Some(declared)) if inferred != declared => {
                return Err(NluError::DimensionMismatch {
                    encoder: declared,
                    classifier: inferred,
                });
            }
            (Some(d), _) | (None, Some(d)) => d,
            (None, None) => return Err(load_err(&"cannot infer classifier input dimension")),
        };
        let num_labels = infer_dim(output.dtype());

        info!(
            input_dim,
            num_labels = ?num_labels,
            model = %model_path.display(),
            "loaded intent classifier"
        );
        Ok(Self {
            session: Mutex::new(session),
            input_dim,
            num_labels,
            output,
        })
    }
}

impl IntentClassifier for OnnxClassifier {
    fn input_dim(&self) -> usize {
        self.input_dim
    }

    fn num_labels(&self) -> Option<usize> {
        self.num_labels
    }

    fn classify(&self, embedding: &[f32]) -> Result<Vec<f32>> {
        if embedding.len() != self.input_dim {
            return Err(NluError::DimensionMismatch {
                encoder: embedding.len(),
                classifier: self.input_dim,
            });
        }

        let shape = [1i64, self.input_dim as i64];
        let input = Tensor::from_array((shape, embedding.to_vec().into_boxed_slice()))
            .map_err(infer_err)?;

        let mut session = self
            .session
            .lock()
            .map_err(|_| NluError::Inference("classifier session lock poisoned".into()))?;
        let outputs = session.run(ort::inputs![input]).map_err(infer_err)?;

        let (_, scores) = outputs[0].try_extract_tensor::<f32>().map_err(infer_err)?;
        Ok(match self.output {
            OutputKind::Probabilities => scores.to_vec(),
            OutputKind::Logits => softmax(scores),
        })
    }
}
