//! Concurrent prediction over many queries.
//!
//! Each query runs on tokio's blocking pool against one shared pipeline.
//! Results come back in input order.

use std::time::Instant;

use anyhow::Context;
use nearbynlu_ai::NluEngine;
use nearbynlu_core::{ClassificationStatus, Evaluation, LabelledQueries, PredictionResult};

pub struct BatchStats {
    pub total: usize,
    pub elapsed_secs: f64,
}

/// Predict every query concurrently, preserving input order.
pub async fn predict_all(
    engine: &NluEngine,
    queries: Vec<String>,
) -> anyhow::Result<(Vec<PredictionResult>, BatchStats)> {
    let start = Instant::now();
    let total = queries.len();

    let handles: Vec<_> = queries
        .into_iter()
        .map(|query| {
            let engine = engine.clone();
            tokio::task::spawn_blocking(move || engine.predict(&query))
        })
        .collect();

    let mut predictions = Vec::with_capacity(total);
    for (i, joined) in futures::future::join_all(handles)
        .await
        .into_iter()
        .enumerate()
    {
        let prediction = joined
            .context("prediction task panicked")?
            .with_context(|| format!("predicting query {}", i + 1))?;
        predictions.push(prediction);
    }

    Ok((
        predictions,
        BatchStats {
            total,
            elapsed_secs: start.elapsed().as_secs_f64(),
        },
    ))
}

/// Outcome of scoring a labelled dataset.
pub struct EvalRun {
    pub evaluation: Evaluation,
    /// One entry per dataset row, in dataset order.
    pub rows: Vec<(PredictionResult, ClassificationStatus)>,
    pub stats: BatchStats,
}

/// Predict every dataset row and tally the outcome against its label.
pub async fn evaluate(engine: &NluEngine, dataset: &LabelledQueries) -> anyhow::Result<EvalRun> {
    let policy = engine.pipeline()?.policy().clone();
    let queries = dataset.iter().map(|row| row.query.clone()).collect();
    let (predictions, stats) = predict_all(engine, queries).await?;

    let mut evaluation = Evaluation::new(policy);
    let rows = dataset
        .iter()
        .zip(predictions)
        .map(|(row, prediction)| {
            let status = evaluation.record(&prediction.intent, row.intent.as_deref());
            (prediction, status)
        })
        .collect();

    Ok(EvalRun {
        evaluation,
        rows,
        stats,
    })
}
