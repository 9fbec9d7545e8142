//! Vertical card display for query responses, and the evaluation table.

use std::fmt::Write;

use arrow::util::pretty::pretty_format_batches;
use nearbynlu_core::{
    ClassificationStatus, Evaluation, LabelledQueries, PredictionResult, QueryResponse,
};
use serde_json::Value;

const MAX_LIST_ITEMS: usize = 10;

// ── Public API ──

/// Print one query response as a card grouped by section.
pub fn print_response_card(query: &str, response: &QueryResponse) {
    print!("{}", render_response_card(query, response));
}

/// Print the per-intent table followed by the overall accuracy.
pub fn print_evaluation(evaluation: &Evaluation) -> anyhow::Result<()> {
    let report = evaluation.report()?;
    if report.num_rows() > 0 {
        println!("{}", pretty_format_batches(&[report])?);
    }
    println!("{}", render_summary(evaluation));
    Ok(())
}

/// Print one line per dataset row: status, predicted intent, label, query.
pub fn print_eval_rows(
    dataset: &LabelledQueries,
    rows: &[(PredictionResult, ClassificationStatus)],
) {
    for (row, (prediction, status)) in dataset.iter().zip(rows) {
        println!(
            "{}",
            render_eval_row(&row.query, row.intent.as_deref(), prediction, *status)
        );
    }
}

// ── Rendering ──

fn render_response_card(query: &str, response: &QueryResponse) -> String {
    let prediction = &response.prediction;
    let mut out = String::new();

    let _ = writeln!(out, "=== {query} ===");
    let _ = writeln!(out);

    let _ = writeln!(out, "Intent");
    field(&mut out, "intent", &prediction.intent);
    field(&mut out, "confidence", &format!("{:.3}", prediction.confidence));
    let _ = writeln!(out);

    if !prediction.entities.is_empty() {
        let _ = writeln!(out, "Entities");
        for (key, value) in prediction.entities.iter() {
            field(&mut out, key, value);
        }
        let _ = writeln!(out);
    }

    if let Some(call) = &response.api_call {
        let _ = writeln!(out, "Places Request");
        field(&mut out, "location", &call.location);
        field(&mut out, "radius", &format!("{} m", call.radius));
        field(&mut out, "type", &call.place_type);
        let _ = writeln!(out);
    }

    if let Some(results) = &response.results {
        let _ = writeln!(out, "Results ({})", results.len());
        for place in results.iter().take(MAX_LIST_ITEMS) {
            let _ = writeln!(out, "    {}", place_label(place));
        }
        if results.len() > MAX_LIST_ITEMS {
            let _ = writeln!(out, "    ... and {} more", results.len() - MAX_LIST_ITEMS);
        }
        let _ = writeln!(out);
    }

    out
}

fn render_summary(evaluation: &Evaluation) -> String {
    let mut out = format!("labelled: {}", evaluation.labelled());
    if evaluation.unlabelled() > 0 {
        let _ = write!(out, "  unlabelled: {}", evaluation.unlabelled());
    }
    match evaluation.accuracy() {
        Some(acc) => {
            let _ = write!(out, "  accuracy: {:.1}%", acc * 100.0);
        }
        None => out.push_str("  accuracy: n/a"),
    }
    out
}

fn render_eval_row(
    query: &str,
    expected: Option<&str>,
    prediction: &PredictionResult,
    status: ClassificationStatus,
) -> String {
    format!(
        "{:<10} {:<24} {:<24} {}",
        status.as_str(),
        prediction.intent,
        expected.unwrap_or("-"),
        query
    )
}

// ── Helpers ──

fn field(out: &mut String, name: &str, value: &str) {
    let _ = writeln!(out, "  {:<26} {}", name, value);
}

/// Short label for a place result: its `name`, else the raw JSON.
fn place_label(place: &Value) -> String {
    match place.get("name").and_then(Value::as_str) {
        Some(name) => match place.get("vicinity").and_then(Value::as_str) {
            Some(vicinity) => format!("{name}  ({vicinity})"),
            None => name.to_string(),
        },
        None => place.to_string(),
    }
}
