//! Labelled query datasets (`query,intent` CSV).
//!
//! This is the format the training and augmentation tooling reads and
//! writes. Rows are read through Arrow's CSV reader; an empty or missing
//! `intent` cell marks an unlabelled query.

use std::collections::BTreeSet;
use std::fs::File;
use std::path::Path;
use std::sync::Arc;

use arrow::array::{Array, LargeStringArray, StringArray};
use arrow::csv::ReaderBuilder;
use arrow::record_batch::RecordBatch;
use tracing::info;

use crate::error::{NluError, Result};
use crate::schema::labelled_queries_schema;
use crate::vocabulary::LabelVocabulary;

/// One dataset row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelledQuery {
    pub query: String,
    pub intent: Option<String>,
}

/// Ordered rows of a labelled dataset.
#[derive(Debug, Clone, Default)]
pub struct LabelledQueries {
    rows: Vec<LabelledQuery>,
}

impl LabelledQueries {
    /// Read a CSV file with a `query,intent` header.
    pub fn from_csv(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .map_err(|e| NluError::Dataset(format!("open {}: {e}", path.display())))?;
        let reader = ReaderBuilder::new(Arc::new(labelled_queries_schema()))
            .with_header(true)
            .build(file)?;

        let batches = reader.collect::<std::result::Result<Vec<_>, _>>()?;
        let dataset = Self::from_batches(&batches)?;
        info!(rows = dataset.len(), path = %path.display(), "loaded labelled queries");
        Ok(dataset)
    }

    /// Build from Arrow batches with `query` and optional `intent` columns.
    pub fn from_batches(batches: &[RecordBatch]) -> Result<Self> {
        let mut rows = Vec::new();

        for batch in batches {
            let query_col = batch
                .column_by_name("query")
                .ok_or_else(|| NluError::Dataset("missing 'query' column".into()))?;
            let intent_col = batch.column_by_name("intent");

            for row in 0..batch.num_rows() {
                // Null query cells come from empty CSV fields.
                let query = get_string(query_col.as_ref(), row).unwrap_or_default();
                let intent = intent_col
                    .and_then(|col| get_string(col.as_ref(), row))
                    .filter(|s| !s.is_empty());
                rows.push(LabelledQuery { query, intent });
            }
        }

        Ok(Self { rows })
    }

    pub fn from_rows(rows: Vec<LabelledQuery>) -> Self {
        Self { rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &LabelledQuery> {
        self.rows.iter()
    }

    /// Rows that carry an intent, as `(query, intent)` pairs.
    pub fn labelled(&self) -> impl Iterator<Item = (&str, &str)> {
        self.rows
            .iter()
            .filter_map(|r| r.intent.as_deref().map(|i| (r.query.as_str(), i)))
    }

    /// Vocabulary of the distinct intents, sorted.
    pub fn vocabulary(&self) -> Result<LabelVocabulary> {
        let distinct: BTreeSet<&str> = self.labelled().map(|(_, intent)| intent).collect();
        LabelVocabulary::new(distinct.into_iter().map(str::to_string).collect())
    }
}

/// Extract a string value from an Arrow array (handles Utf8 and LargeUtf8).
fn get_string(col: &dyn Array, row: usize) -> Option<String> {
    if col.is_null(row) {
        return None;
    }
    col.as_any()
        .downcast_ref::<StringArray>()
        .map(|arr| arr.value(row).to_string())
        .or_else(|| {
            col.as_any()
                .downcast_ref::<LargeStringArray>()
                .map(|arr| arr.value(row).to_string())
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::datatypes::{DataType, Field, Schema};
    use std::io::Write;

    fn write_csv(contents: &str) -> tempfile::NamedTempFile {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(contents.as_bytes()).unwrap();
        f
    }

    #[test]
    fn reads_csv_rows_in_order() {
        let f = write_csv(
            "query,intent\n\
             Find me a thai place,thai_restaurant\n\
             dog friendly park,dog_park\n\
             \"pizza, open late\",pizza_restaurant\n",
        );
        let ds = LabelledQueries::from_csv(f.path()).unwrap();
        assert_eq!(ds.len(), 3);
        let rows: Vec<_> = ds.labelled().collect();
        assert_eq!(rows[0], ("Find me a thai place", "thai_restaurant"));
        assert_eq!(rows[2], ("pizza, open late", "pizza_restaurant"));
    }

    #[test]
    fn empty_intent_is_unlabelled() {
        let f = write_csv("query,intent\nsomewhere to sit,\nhotel near me,hotel\n");
        let ds = LabelledQueries::from_csv(f.path()).unwrap();
        assert_eq!(ds.len(), 2);
        assert_eq!(ds.labelled().count(), 1);
        assert_eq!(ds.iter().next().unwrap().intent, None);
    }

    #[test]
    fn empty_query_cell_reads_as_empty_text() {
        let f = write_csv("query,intent\nthai food,thai_restaurant\n,hotel\n");
        let ds = LabelledQueries::from_csv(f.path()).unwrap();
        assert_eq!(ds.len(), 2);
        let rows: Vec<_> = ds.labelled().collect();
        assert_eq!(rows[1], ("", "hotel"));
    }

    #[test]
    fn vocabulary_is_sorted_and_distinct() {
        let f = write_csv(
            "query,intent\na,thai_restaurant\nb,dog_park\nc,thai_restaurant\nd,\n",
        );
        let ds = LabelledQueries::from_csv(f.path()).unwrap();
        let vocab = ds.vocabulary().unwrap();
        assert_eq!(vocab.labels(), ["dog_park", "thai_restaurant"]);
    }

    #[test]
    fn vocabulary_of_unlabelled_dataset_is_error() {
        let ds = LabelledQueries::from_rows(vec![LabelledQuery {
            query: "x".into(),
            intent: None,
        }]);
        assert!(ds.vocabulary().is_err());
    }

    #[test]
    fn missing_file() {
        let err = LabelledQueries::from_csv(Path::new("/nonexistent/queries.csv")).unwrap_err();
        assert!(matches!(err, NluError::Dataset(_)));
    }

    #[test]
    fn batches_without_query_column() {
        let schema = Schema::new(vec![Field::new("text", DataType::Utf8, false)]);
        let batch = RecordBatch::try_new(
            Arc::new(schema),
            vec![Arc::new(StringArray::from(vec!["hello"]))],
        )
        .unwrap();
        assert!(LabelledQueries::from_batches(&[batch]).is_err());
    }

    #[test]
    fn batches_without_intent_column_are_unlabelled() {
        let schema = Schema::new(vec![Field::new("query", DataType::LargeUtf8, false)]);
        let batch = RecordBatch::try_new(
            Arc::new(schema),
            vec![Arc::new(LargeStringArray::from(vec!["a", "b"]))],
        )
        .unwrap();
        let ds = LabelledQueries::from_batches(&[batch]).unwrap();
        assert_eq!(ds.len(), 2);
        assert_eq!(ds.labelled().count(), 0);
    }

    #[test]
    fn empty_batches() {
        assert!(LabelledQueries::from_batches(&[]).unwrap().is_empty());
    }
}
