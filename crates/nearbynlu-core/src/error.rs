use thiserror::Error;

#[derive(Debug, Error)]
pub enum NluError {
    /// An encoder, classifier or vocabulary artifact could not be loaded.
    #[error("failed to load {artifact}: {reason}")]
    ModelLoad { artifact: String, reason: String },

    #[error("no model loaded")]
    ModelNotLoaded,

    #[error("distribution has {distribution} components but vocabulary has {vocabulary} labels")]
    VocabularyMismatch {
        distribution: usize,
        vocabulary: usize,
    },

    #[error("encoder produces {encoder}-dim embeddings but classifier expects {classifier}")]
    DimensionMismatch { encoder: usize, classifier: usize },

    #[error("inference failed: {0}")]
    Inference(String),

    #[error("dataset error: {0}")]
    Dataset(String),

    #[error("arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),
}

impl NluError {
    pub fn model_load(artifact: impl std::fmt::Display, reason: impl std::fmt::Display) -> Self {
        Self::ModelLoad {
            artifact: artifact.to_string(),
            reason: reason.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, NluError>;
