//! Confidence fallback: coarsen uncertain fine-grained intents.
//!
//! When the classifier's top confidence is below the threshold, a label such
//! as `thai_restaurant` collapses to its broad parent `restaurant`. Category
//! checks are literal, case-sensitive substring matches on the label, tried
//! in order; the first match wins. A label with no broader category passes
//! through unchanged.

/// Confidences strictly below this value trigger fallback.
pub const INTENT_CONFIDENCE_THRESHOLD: f32 = 0.70;

/// Broad categories, in match order.
pub const FALLBACK_CATEGORIES: &[&str] = &["restaurant", "park", "store"];

/// Threshold plus ordered broad categories.
#[derive(Debug, Clone, PartialEq)]
pub struct FallbackPolicy {
    threshold: f32,
    categories: Vec<String>,
}

impl Default for FallbackPolicy {
    fn default() -> Self {
        Self {
            threshold: INTENT_CONFIDENCE_THRESHOLD,
            categories: FALLBACK_CATEGORIES.iter().map(|c| c.to_string()).collect(),
        }
    }
}

impl FallbackPolicy {
    pub fn new(threshold: f32, categories: Vec<String>) -> Self {
        Self {
            threshold,
            categories,
        }
    }

    /// Default categories with a different threshold.
    pub fn with_threshold(threshold: f32) -> Self {
        Self {
            threshold,
            ..Self::default()
        }
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    /// Whether `confidence` counts as low. Equal-to-threshold is not low;
    /// NaN is.
    pub fn is_low(&self, confidence: f32) -> bool {
        confidence < self.threshold || confidence.is_nan()
    }

    /// Return the intent to report for `label` predicted at `confidence`.
    pub fn apply<'a>(&'a self, label: &'a str, confidence: f32) -> &'a str {
        if !self.is_low(confidence) {
            return label;
        }
        self.categories
            .iter()
            .find(|category| label.contains(category.as_str()))
            .map(String::as_str)
            .unwrap_or(label)
    }
}

/// [`FallbackPolicy::apply`] with the default threshold and categories.
pub fn apply_fallback(label: &str, confidence: f32) -> &str {
    if confidence >= INTENT_CONFIDENCE_THRESHOLD {
        return label;
    }
    FALLBACK_CATEGORIES
        .iter()
        .copied()
        .find(|category| label.contains(category))
        .unwrap_or(label)
}
