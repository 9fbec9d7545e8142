//! Compare predictions against ground-truth intents.

use std::collections::BTreeMap;
use std::sync::Arc;

use arrow::array::{Float64Array, StringArray, UInt64Array};
use arrow::record_batch::RecordBatch;

use crate::error::Result;
use crate::fallback::FallbackPolicy;
use crate::schema::evaluation_report_schema;

/// Agreement between a predicted intent and the ground-truth label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassificationStatus {
    /// No ground truth, the prediction is the only classification.
    Predicted,
    /// Prediction equals the ground-truth label.
    Confirmed,
    /// Prediction is the broad fallback category of the ground-truth label.
    Coarsened,
    /// Prediction disagrees with the ground truth.
    Conflict,
}

impl ClassificationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Predicted => "predicted",
            Self::Confirmed => "confirmed",
            Self::Coarsened => "coarsened",
            Self::Conflict => "conflict",
        }
    }

    /// Classify `intent` against an optional ground-truth label.
    pub fn of(intent: &str, expected: Option<&str>, policy: &FallbackPolicy) -> Self {
        match expected {
            None => Self::Predicted,
            Some(gt) if gt == intent => Self::Confirmed,
            Some(gt) if policy.apply(gt, f32::NEG_INFINITY) == intent => Self::Coarsened,
            Some(_) => Self::Conflict,
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct Tally {
    total: u64,
    confirmed: u64,
    coarsened: u64,
    conflict: u64,
}

/// Running per-intent tallies, keyed by ground-truth intent.
#[derive(Debug)]
pub struct Evaluation {
    policy: FallbackPolicy,
    per_intent: BTreeMap<String, Tally>,
    unlabelled: u64,
}

impl Evaluation {
    pub fn new(policy: FallbackPolicy) -> Self {
        Self {
            policy,
            per_intent: BTreeMap::new(),
            unlabelled: 0,
        }
    }

    /// Record one prediction and return its status.
    pub fn record(&mut self, intent: &str, expected: Option<&str>) -> ClassificationStatus {
        let status = ClassificationStatus::of(intent, expected, &self.policy);
        let Some(gt) = expected else {
            self.unlabelled += 1;
            return status;
        };

        let tally = self.per_intent.entry(gt.to_string()).or_default();
        tally.total += 1;
        match status {
            ClassificationStatus::Confirmed => tally.confirmed += 1,
            ClassificationStatus::Coarsened => tally.coarsened += 1,
            ClassificationStatus::Conflict => tally.conflict += 1,
            ClassificationStatus::Predicted => {}
        }
        status
    }

    pub fn labelled(&self) -> u64 {
        self.per_intent.values().map(|t| t.total).sum()
    }

    pub fn unlabelled(&self) -> u64 {
        self.unlabelled
    }

    /// Exact-match accuracy over labelled rows, or `None` if there were none.
    pub fn accuracy(&self) -> Option<f64> {
        let total = self.labelled();
        if total == 0 {
            return None;
        }
        let confirmed: u64 = self.per_intent.values().map(|t| t.confirmed).sum();
        Some(confirmed as f64 / total as f64)
    }

    /// One row per ground-truth intent, sorted by intent.
    pub fn report(&self) -> Result<RecordBatch> {
        let intents: Vec<&str> = self.per_intent.keys().map(String::as_str).collect();
        let tallies: Vec<&Tally> = self.per_intent.values().collect();

        let column = |f: fn(&Tally) -> u64| -> UInt64Array {
            tallies.iter().map(|t| f(t)).collect::<Vec<_>>().into()
        };
        let accuracy: Float64Array = tallies
            .iter()
            .map(|t| t.confirmed as f64 / t.total as f64)
            .collect::<Vec<_>>()
            .into();

        Ok(RecordBatch::try_new(
            Arc::new(evaluation_report_schema()),
            vec![
                Arc::new(StringArray::from(intents)),
                Arc::new(column(|t| t.total)),
                Arc::new(column(|t| t.confirmed)),
                Arc::new(column(|t| t.coarsened)),
                Arc::new(column(|t| t.conflict)),
                Arc::new(accuracy),
            ],
        )?)
    }
}
