//! ONNX Runtime embedding pipeline for sentence-transformers models.
//!
//! Implements mean-pooled embeddings using all-MiniLM-L6-v2 (384 dimensions).
//! The model directory must contain `model.onnx` and `tokenizer.json`.

use std::path::Path;
use std::sync::Mutex;

use nearbynlu_core::{Embedding, NluError, Result};
use ort::session::Session;
use ort::value::Tensor;
use tokenizers::Tokenizer;
use tracing::info;

use crate::backend::{TextEncoder, normalize};

/// Maximum tokens per input (MiniLM's position limit).
const MAX_TOKENS: usize = 256;

/// Sentence embedding generator using ONNX Runtime.
///
/// The session is locked per call, so one encoder can be shared between
/// threads; concurrent calls run one at a time.
pub struct OnnxEncoder {
    session: Mutex<Session>,
    tokenizer: Tokenizer,
    dim: usize,
}

impl OnnxEncoder {
    /// Load an embedding model from a directory containing `model.onnx` and `tokenizer.json`.
    ///
    /// `declared_dim` is used when the model does not state its output size.
    pub fn load(model_dir: &Path, declared_dim: Option<usize>) -> Result<Self> {
        let model_path = model_dir.join("model.onnx");
        let tokenizer_path = model_dir.join("tokenizer.json");
        let load_err = |e: &dyn std::fmt::Display| NluError::model_load(model_path.display(), e);

        if !model_path.exists() {
            return Err(load_err(&"model.onnx not found"));
        }
        if !tokenizer_path.exists() {
            return Err(NluError::model_load(tokenizer_path.display(), "tokenizer.json not found"));
        }

        let session = Session::builder()
            .map_err(|e| load_err(&e))?
            .commit_from_file(&model_path)
            .map_err(|e| load_err(&e))?;

        // Infer embedding dimension from model output shape.
        let output = session
            .outputs()
            .first()
            .ok_or_else(|| load_err(&"model has no outputs"))?;
        let dim = match (infer_dim(output.dtype()), declared_dim) {
            (Some(inferred), Some(declared)) if inferred != declared => {
                return Err(load_err(&format!(
                    "model outputs {inferred}-dim embeddings, manifest declares {declared}"
                )));
            }
            (Some(d), _) | (None, Some(d)) => d,
            (None, None) => return Err(load_err(&"cannot infer embedding dimension")),
        };

        let mut tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| NluError::model_load(tokenizer_path.display(), e))?;

        tokenizer
            .with_truncation(Some(tokenizers::TruncationParams {
                max_length: MAX_TOKENS,
                ..Default::default()
            }))
            .map_err(|e| NluError::model_load(tokenizer_path.display(), e))?;

        // Pad all inputs in a batch to the same length.
        tokenizer.with_padding(Some(tokenizers::PaddingParams {
            ..Default::default()
        }));

        info!(dim, model = %model_path.display(), "loaded embedding model");
        Ok(Self {
            session: Mutex::new(session),
            tokenizer,
            dim,
        })
    }

    /// Embed a batch of texts in one session run, one normalized vector per input.
    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Embedding>> {
        if texts.is_empty() {
            return Ok(vec![]);
        }

        let batch_size = texts.len();

        let encodings = self
            .tokenizer
            .encode_batch(texts.to_vec(), true)
            .map_err(|e| NluError::Inference(format!("tokenize: {e}")))?;

        let seq_len = encodings
            .iter()
            .map(|e| e.get_ids().len())
            .max()
            .unwrap_or(0);

        // Build flat input tensors: [batch_size, seq_len].
        let mut input_ids = vec![0i64; batch_size * seq_len];
        let mut attention_mask = vec![0i64; batch_size * seq_len];
        let mut token_type_ids = vec![0i64; batch_size * seq_len];

        for (i, encoding) in encodings.iter().enumerate() {
            let offset = i * seq_len;
            for (j, &id) in encoding.get_ids().iter().enumerate() {
                input_ids[offset + j] = id as i64;
            }
            for (j, &mask) in encoding.get_attention_mask().iter().enumerate() {
                attention_mask[offset + j] = mask as i64;
            }
            for (j, &tid) in encoding.get_type_ids().iter().enumerate() {
                token_type_ids[offset + j] = tid as i64;
            }
        }

        let shape = [batch_size as i64, seq_len as i64];
        let ids_tensor = Tensor::from_array((shape, input_ids.into_boxed_slice())).map_err(infer_err)?;
        let mask_tensor = Tensor::from_array((shape, attention_mask.clone().into_boxed_slice()))
            .map_err(infer_err)?;
        let type_tensor =
            Tensor::from_array((shape, token_type_ids.into_boxed_slice())).map_err(infer_err)?;

        let mut session = self
            .session
            .lock()
            .map_err(|_| NluError::Inference("encoder session lock poisoned".into()))?;

        let outputs = session
            .run(ort::inputs![
                "input_ids" => ids_tensor,
                "attention_mask" => mask_tensor,
                "token_type_ids" => type_tensor,
            ])
            .map_err(infer_err)?;

        // Token embeddings: [batch_size, seq_len, dim].
        let (output_shape, output_data) = outputs[0].try_extract_tensor::<f32>().map_err(infer_err)?;
        let dims: &[i64] = output_shape;
        if dims.len() != 3 || dims[0] as usize != batch_size || dims[2] as usize != self.dim {
            return Err(NluError::Inference(format!(
                "unexpected output shape: {dims:?}, expected [{batch_size}, {seq_len}, {}]",
                self.dim
            )));
        }

        let actual_seq_len = dims[1] as usize;

        // Mean pooling with attention mask.
        let mut embeddings = Vec::with_capacity(batch_size);
        for i in 0..batch_size {
            let mut pooled = vec![0.0f32; self.dim];
            let mut token_count = 0.0f32;

            for j in 0..actual_seq_len {
                let mask_val = attention_mask[i * seq_len + j] as f32;
                if mask_val > 0.0 {
                    let offset = (i * actual_seq_len + j) * self.dim;
                    for (d, p) in pooled.iter_mut().enumerate() {
                        *p += output_data[offset + d] * mask_val;
                    }
                    token_count += mask_val;
                }
            }

            if token_count > 0.0 {
                for p in &mut pooled {
                    *p /= token_count;
                }
            }
            normalize(&mut pooled);
            embeddings.push(pooled);
        }

        Ok(embeddings)
    }
}

impl TextEncoder for OnnxEncoder {
    fn dim(&self) -> usize {
        self.dim
    }

    fn encode(&self, text: &str) -> Result<Embedding> {
        self.embed_batch(&[text])?
            .pop()
            .ok_or_else(|| NluError::Inference("encoder returned no embedding".into()))
    }

    fn encode_batch(&self, texts: &[&str]) -> Result<Vec<Embedding>> {
        self.embed_batch(texts)
    }
}

pub(crate) fn infer_err(e: impl std::fmt::Display) -> NluError {
    NluError::Inference(e.to_string())
}

/// Try to infer the trailing dimension from an ONNX value type.
pub(crate) fn infer_dim(value_type: &ort::value::ValueType) -> Option<usize> {
    match value_type {
        ort::value::ValueType::Tensor { shape, .. } => shape
            .last()
            .and_then(|&d| if d > 0 { Some(d as usize) } else { None }),
        _ => None,
    }
}
