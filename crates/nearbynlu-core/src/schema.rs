//! Arrow schemas for labelled query datasets and evaluation reports.

use arrow::datatypes::{DataType, Field, Schema};

/// Labelled dataset exchanged with the training tooling: `query,intent`.
///
/// Both columns are nullable: the CSV reader turns an empty cell into null,
/// and an empty query is still a query.
pub fn labelled_queries_schema() -> Schema {
    Schema::new(vec![
        Field::new("query", DataType::Utf8, true),
        Field::new("intent", DataType::Utf8, true),
    ])
}

/// Per-intent evaluation summary.
pub fn evaluation_report_schema() -> Schema {
    Schema::new(vec![
        Field::new("intent", DataType::Utf8, false),
        Field::new("total", DataType::UInt64, false),
        Field::new("confirmed", DataType::UInt64, false),
        Field::new("coarsened", DataType::UInt64, false),
        Field::new("conflict", DataType::UInt64, false),
        Field::new("accuracy", DataType::Float64, false),
    ])
}
