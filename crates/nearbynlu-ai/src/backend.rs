//! Encoder and classifier capabilities behind which numeric backends plug in.

use nearbynlu_core::{Embedding, Result};

/// Turns raw text into a fixed-length embedding.
///
/// Implementations must accept any text, including the empty string, and be
/// safe to call from several threads at once.
pub trait TextEncoder: Send + Sync {
    /// Length of every embedding this encoder produces.
    fn dim(&self) -> usize;

    fn encode(&self, text: &str) -> Result<Embedding>;

    /// Encode several texts, one embedding per input in input order.
    fn encode_batch(&self, texts: &[&str]) -> Result<Vec<Embedding>> {
        texts.iter().map(|text| self.encode(text)).collect()
    }
}

/// Maps an embedding to a distribution over the label vocabulary.
pub trait IntentClassifier: Send + Sync {
    /// Embedding length the classifier accepts.
    fn input_dim(&self) -> usize;

    /// Number of distribution components, when the artifact declares it.
    fn num_labels(&self) -> Option<usize>;

    fn classify(&self, embedding: &[f32]) -> Result<Vec<f32>>;
}

/// L2-normalize a vector in place.
pub(crate) fn normalize(v: &mut [f32]) {
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in v.iter_mut() {
            *x /= norm;
        }
    }
}

/// Cosine similarity; zero when either side is the zero vector.
pub(crate) fn cosine_sim(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let na: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let nb: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if na == 0.0 || nb == 0.0 {
        return 0.0;
    }
    dot / (na * nb)
}

/// Numerically stable softmax.
pub(crate) fn softmax(logits: &[f32]) -> Vec<f32> {
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = logits.iter().map(|&x| (x - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    exps.into_iter().map(|e| e / sum).collect()
}
