//! Versioned artifact bundle description.
//!
//! A model directory carries a `manifest.json` naming the encoder, the
//! classifier and the label vocabulary that were trained together. Paths
//! are relative to the bundle directory. Because the classifier and its
//! vocabulary are only ever loaded through one manifest, they change
//! together or not at all.

use std::path::{Path, PathBuf};

use nearbynlu_core::{NluError, Result};
use serde::{Deserialize, Serialize};

pub const MANIFEST_FILE: &str = "manifest.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactManifest {
    pub version: String,
    pub encoder: EncoderSpec,
    pub classifier: ClassifierSpec,
    pub vocabulary: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EncoderSpec {
    /// Sentence-transformers export: a directory with `model.onnx` and
    /// `tokenizer.json`.
    Onnx {
        path: PathBuf,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        dim: Option<usize>,
    },
    Hashing { dim: usize },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ClassifierSpec {
    Onnx {
        path: PathBuf,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        input_dim: Option<usize>,
        #[serde(default)]
        output: OutputKind,
    },
    Centroid { path: PathBuf },
}

/// What an ONNX classifier's output tensor holds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputKind {
    /// Already a probability distribution (softmax in the graph).
    #[default]
    Probabilities,
    /// Raw scores; softmax is applied after inference.
    Logits,
}

impl ArtifactManifest {
    /// Read `manifest.json` from a bundle directory.
    pub fn load(dir: &Path) -> Result<Self> {
        let path = dir.join(MANIFEST_FILE);
        let raw = std::fs::read_to_string(&path)
            .map_err(|e| NluError::model_load(path.display(), e))?;
        serde_json::from_str(&raw).map_err(|e| NluError::model_load(path.display(), e))
    }

    /// Write `manifest.json` into a bundle directory.
    pub fn save(&self, dir: &Path) -> Result<()> {
        let path = dir.join(MANIFEST_FILE);
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| NluError::model_load(path.display(), e))?;
        std::fs::write(&path, json).map_err(|e| NluError::model_load(path.display(), e))
    }
}
