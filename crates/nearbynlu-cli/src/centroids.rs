//! Centroid bundle pipeline: reads a labelled CSV, encodes every labelled
//! query with the hashing encoder, writes a loadable model bundle.

use std::path::Path;
use std::time::Instant;

use anyhow::Context;
use nearbynlu_ai::{
    ArtifactManifest, CentroidClassifier, ClassifierSpec, EncoderSpec, HashingEncoder, TextEncoder,
};
use nearbynlu_core::{Embedding, LabelledQueries};

const ENCODE_BATCH_SIZE: usize = 256;
const VOCABULARY_FILE: &str = "labels.json";
const CENTROIDS_FILE: &str = "centroids.json";

pub struct CentroidOptions<'a> {
    pub dim: usize,
    pub temperature: f32,
    pub version: &'a str,
}

pub struct CentroidStats {
    pub examples: usize,
    pub labels: usize,
    pub elapsed_secs: f64,
}

/// Build a hashing + centroid bundle in `out_dir` from a labelled dataset.
///
/// Unlabelled rows are skipped. Every intent in the dataset becomes one
/// vocabulary label, in sorted order.
pub fn run_centroid_pipeline(
    dataset: &LabelledQueries,
    out_dir: &Path,
    options: &CentroidOptions<'_>,
) -> anyhow::Result<CentroidStats> {
    let start = Instant::now();

    // 1. Vocabulary from the distinct ground-truth intents.
    let vocabulary = dataset.vocabulary().context("building label vocabulary")?;
    let encoder = HashingEncoder::new(options.dim)?;

    let labelled: Vec<(&str, &str)> = dataset.labelled().collect();
    let total = labelled.len();
    eprintln!(
        "  Read {total} labelled queries across {} intents",
        vocabulary.len()
    );

    // 2. Encode in sub-batches, keeping each example's label index.
    let mut examples: Vec<(usize, Embedding)> = Vec::with_capacity(total);
    for chunk in labelled.chunks(ENCODE_BATCH_SIZE) {
        let texts: Vec<&str> = chunk.iter().map(|&(query, _)| query).collect();
        let embeddings = encoder.encode_batch(&texts).context("encoding queries")?;
        for (&(_, intent), embedding) in chunk.iter().zip(embeddings) {
            let label = vocabulary
                .index_of(intent)
                .with_context(|| format!("intent {intent:?} missing from vocabulary"))?;
            examples.push((label, embedding));
        }
        eprint!(
            "\r  Encoded {}/{total} ({:.1}%)",
            examples.len(),
            examples.len() as f64 / total as f64 * 100.0
        );
    }
    eprintln!();

    // 3. One centroid per label. Nothing is written until this succeeds.
    let classifier = CentroidClassifier::build(
        examples.iter().map(|(l, e)| (*l, e.as_slice())),
        vocabulary.len(),
        encoder.dim(),
    )
    .context("building centroids")?
    .with_temperature(options.temperature)
    .context("setting centroid temperature")?;

    // 4. Write the bundle; the manifest goes last so a partial write never loads.
    std::fs::create_dir_all(out_dir)
        .with_context(|| format!("creating {}", out_dir.display()))?;
    vocabulary.save(&out_dir.join(VOCABULARY_FILE))?;
    classifier.save(&out_dir.join(CENTROIDS_FILE))?;
    ArtifactManifest {
        version: options.version.to_string(),
        encoder: EncoderSpec::Hashing { dim: options.dim },
        classifier: ClassifierSpec::Centroid {
            path: CENTROIDS_FILE.into(),
        },
        vocabulary: VOCABULARY_FILE.into(),
    }
    .save(out_dir)?;

    Ok(CentroidStats {
        examples: total,
        labels: vocabulary.len(),
        elapsed_secs: start.elapsed().as_secs_f64(),
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use nearbynlu_ai::NluEngine;
    use nearbynlu_core::LabelledQuery;

    pub(crate) fn training_set() -> LabelledQueries {
        let rows = [
            ("dog park with off leash area", Some("dog_park")),
            ("park where my dog can run", Some("dog_park")),
            ("grocery store selling fresh vegetables", Some("grocery_store")),
            ("store to buy groceries", Some("grocery_store")),
            ("thai restaurant with pad thai", Some("thai_restaurant")),
            ("restaurant serving thai curry", Some("thai_restaurant")),
            ("something to do tonight", None),
        ];
        LabelledQueries::from_rows(
            rows.iter()
                .map(|(q, i)| LabelledQuery {
                    query: q.to_string(),
                    intent: i.map(str::to_string),
                })
                .collect(),
        )
    }

    pub(crate) fn options() -> CentroidOptions<'static> {
        CentroidOptions {
            dim: 128,
            temperature: 0.1,
            version: "test",
        }
    }

    #[test]
    fn writes_loadable_bundle() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("bundle");
        let stats = run_centroid_pipeline(&training_set(), &out, &options()).unwrap();
        assert_eq!(stats.examples, 6);
        assert_eq!(stats.labels, 3);

        let engine = NluEngine::load(&out).unwrap();
        let pipeline = engine.pipeline().unwrap();
        assert_eq!(pipeline.version(), Some("test"));
        assert_eq!(
            pipeline.vocabulary().labels(),
            ["dog_park", "grocery_store", "thai_restaurant"]
        );
        assert_eq!(
            engine.predict("thai restaurant with pad thai").unwrap().intent,
            "thai_restaurant"
        );
    }

    #[test]
    fn unusable_temperature_writes_nothing() {
        for temperature in [0.0, -1.0, f32::INFINITY, f32::NAN] {
            let dir = tempfile::tempdir().unwrap();
            let out = dir.path().join("bundle");
            let opts = CentroidOptions {
                temperature,
                ..options()
            };
            assert!(
                run_centroid_pipeline(&training_set(), &out, &opts).is_err(),
                "{temperature}"
            );
            assert!(!out.exists(), "{temperature}");
        }
    }

    #[test]
    fn empty_dataset_fails() {
        let dir = tempfile::tempdir().unwrap();
        let empty = LabelledQueries::from_rows(vec![]);
        assert!(run_centroid_pipeline(&empty, dir.path(), &options()).is_err());
        assert!(!dir.path().join("manifest.json").exists());
    }
}
