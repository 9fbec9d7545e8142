mod batch;
mod centroids;
mod display;

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use nearbynlu_ai::{NluEngine, Pipeline};
use nearbynlu_core::{
    FallbackPolicy, INTENT_CONFIDENCE_THRESHOLD, LabelledQueries, QueryResponse, compose_query,
};
use tracing_subscriber::EnvFilter;

use crate::centroids::CentroidOptions;

#[derive(Parser)]
#[command(name = "nearbynlu", version, about = "Intent classification for nearby-places queries")]
struct Cli {
    /// Model bundle directory (contains manifest.json).
    #[arg(long, global = true, env = "NEARBYNLU_MODEL_DIR", default_value = "models/current")]
    model_dir: PathBuf,

    /// Confidence below which fine labels fall back to a broad category.
    #[arg(
        long,
        global = true,
        env = "NEARBYNLU_CONFIDENCE_THRESHOLD",
        default_value_t = INTENT_CONFIDENCE_THRESHOLD
    )]
    threshold: f32,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Classify one query.
    Predict {
        query: String,
        /// Caller-supplied location, appended as "near <LOCATION>".
        #[arg(long)]
        location: Option<String>,
        /// Human-readable card instead of JSON.
        #[arg(long)]
        card: bool,
    },
    /// Classify one query per line, printing JSON lines in input order.
    Batch { file: PathBuf },
    /// Score a labelled `query,intent` CSV.
    Eval {
        csv: PathBuf,
        /// Also print each row's status (confirmed, coarsened, conflict, predicted).
        #[arg(long)]
        rows: bool,
    },
    /// Build a hashing + centroid bundle from a labelled `query,intent` CSV.
    Centroids {
        csv: PathBuf,
        #[arg(long)]
        out: PathBuf,
        #[arg(long, default_value_t = 512)]
        dim: usize,
        #[arg(long, default_value_t = nearbynlu_ai::centroid::DEFAULT_TEMPERATURE)]
        temperature: f32,
        #[arg(long, default_value = "centroid-v1")]
        version: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    tracing::debug!("nearbynlu v{}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Command::Predict {
            query,
            location,
            card,
        } => {
            let engine = load_engine(&cli.model_dir, cli.threshold)?;
            let text = compose_query(&query, location.as_deref());
            let prediction = engine.predict(&text)?;
            let response = QueryResponse::assemble(prediction, None);
            if card {
                display::print_response_card(&text, &response);
            } else {
                println!("{}", serde_json::to_string_pretty(&response)?);
            }
        }
        Command::Batch { file } => {
            let engine = load_engine(&cli.model_dir, cli.threshold)?;
            let raw = tokio::fs::read_to_string(&file)
                .await
                .with_context(|| format!("reading {}", file.display()))?;
            let queries: Vec<String> = raw.lines().map(str::to_string).collect();

            let (predictions, stats) = batch::predict_all(&engine, queries).await?;
            for prediction in predictions {
                let response = QueryResponse::assemble(prediction, None);
                println!("{}", serde_json::to_string(&response)?);
            }
            eprintln!(
                "  Classified {} queries in {:.2}s",
                stats.total, stats.elapsed_secs
            );
        }
        Command::Eval { csv, rows } => {
            let engine = load_engine(&cli.model_dir, cli.threshold)?;
            let dataset = LabelledQueries::from_csv(&csv)
                .with_context(|| format!("reading {}", csv.display()))?;

            let run = batch::evaluate(&engine, &dataset).await?;
            if rows {
                display::print_eval_rows(&dataset, &run.rows);
                println!();
            }
            display::print_evaluation(&run.evaluation)?;
            eprintln!(
                "  Evaluated {} queries in {:.2}s",
                run.stats.total, run.stats.elapsed_secs
            );
        }
        Command::Centroids {
            csv,
            out,
            dim,
            temperature,
            version,
        } => {
            let dataset = LabelledQueries::from_csv(&csv)
                .with_context(|| format!("reading {}", csv.display()))?;
            let options = CentroidOptions {
                dim,
                temperature,
                version: &version,
            };
            let stats = centroids::run_centroid_pipeline(&dataset, &out, &options)?;
            eprintln!(
                "  Wrote {} centroids from {} examples to {} in {:.2}s",
                stats.labels,
                stats.examples,
                out.display(),
                stats.elapsed_secs
            );
        }
    }

    Ok(())
}

/// Load the bundle once; any artifact problem stops the process here.
fn load_engine(model_dir: &Path, threshold: f32) -> anyhow::Result<NluEngine> {
    anyhow::ensure!(
        (0.0..=1.0).contains(&threshold),
        "confidence threshold must be within [0, 1], got {threshold}"
    );
    let pipeline = Pipeline::load(model_dir)
        .with_context(|| format!("loading model bundle from {}", model_dir.display()))?
        .with_policy(FallbackPolicy::with_threshold(threshold));
    Ok(NluEngine::new(pipeline))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_parses_predict() {
        let cli = Cli::try_parse_from([
            "nearbynlu",
            "--model-dir",
            "bundle",
            "predict",
            "thai food",
            "--location",
            "Brooklyn",
            "--card",
        ])
        .unwrap();
        assert_eq!(cli.model_dir, PathBuf::from("bundle"));
        assert_eq!(cli.threshold, INTENT_CONFIDENCE_THRESHOLD);
        match cli.command {
            Command::Predict {
                query,
                location,
                card,
            } => {
                assert_eq!(query, "thai food");
                assert_eq!(location.as_deref(), Some("Brooklyn"));
                assert!(card);
            }
            _ => panic!("expected predict"),
        }
    }

    #[test]
    fn cli_parses_eval_rows_flag() {
        let cli = Cli::try_parse_from(["nearbynlu", "eval", "held_out.csv", "--rows"]).unwrap();
        assert!(matches!(cli.command, Command::Eval { rows: true, .. }));
    }

    #[test]
    fn cli_requires_centroid_output() {
        assert!(Cli::try_parse_from(["nearbynlu", "centroids", "train.csv"]).is_err());
    }

    #[test]
    fn threshold_out_of_range() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_engine(dir.path(), 1.5).err().unwrap();
        assert!(err.to_string().contains("threshold"), "{err}");
    }

    #[test]
    fn missing_bundle_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_engine(dir.path(), 0.7).err().unwrap();
        assert!(format!("{err:#}").contains("manifest.json"), "{err:#}");
    }

    #[test]
    fn threshold_applies_to_loaded_pipeline() {
        let dir = tempfile::tempdir().unwrap();
        centroids::run_centroid_pipeline(
            &centroids::tests::training_set(),
            dir.path(),
            &centroids::tests::options(),
        )
        .unwrap();

        let engine = load_engine(dir.path(), 0.999).unwrap();
        assert_eq!(engine.pipeline().unwrap().policy().threshold(), 0.999);
        // Confident on its own training text, but not above 0.999.
        assert_eq!(
            engine.predict("thai restaurant with pad thai").unwrap().intent,
            "restaurant"
        );
    }
}
