//! Query-response contract consumed by the hosting layer.
//!
//! A prediction becomes a places-search request only for the `restaurant`
//! intent with a location hint present. The search itself is performed by
//! an external [`PlacesSearch`] collaborator.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{info, warn};

use crate::prediction::PredictionResult;

/// Search radius in metres for generated places requests.
pub const DEFAULT_RADIUS_M: u32 = 5000;

/// Intent that triggers a places request.
pub const RESTAURANT_INTENT: &str = "restaurant";

#[derive(Error, Debug)]
#[error("places search failed: {0}")]
pub struct PlacesError(pub String);

/// External nearby-places lookup (geocode plus nearby search).
pub trait PlacesSearch: Send + Sync {
    fn search_nearby(
        &self,
        location: &str,
        radius: u32,
        place_type: &str,
    ) -> Result<Vec<Value>, PlacesError>;
}

/// Parameters of a places request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiCall {
    pub location: String,
    pub radius: u32,
    #[serde(rename = "type")]
    pub place_type: String,
}

/// Prediction plus the optional places request and its results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResponse {
    #[serde(flatten)]
    pub prediction: PredictionResult,
    pub api_call: Option<ApiCall>,
    pub results: Option<Vec<Value>>,
}

/// Append the caller-supplied location to the query text.
pub fn compose_query(query: &str, location: Option<&str>) -> String {
    match location {
        Some(loc) if !loc.is_empty() => format!("{query} near {loc}"),
        _ => query.to_string(),
    }
}

/// Places request for a prediction, if its intent and entities call for one.
pub fn build_api_call(prediction: &PredictionResult) -> Option<ApiCall> {
    if prediction.intent != RESTAURANT_INTENT {
        return None;
    }
    let location = prediction.entities.location_hint?;
    Some(ApiCall {
        location: location.as_str().to_string(),
        radius: DEFAULT_RADIUS_M,
        place_type: RESTAURANT_INTENT.to_string(),
    })
}

impl QueryResponse {
    /// Wrap a prediction, running the places search when one applies.
    ///
    /// Without a collaborator the request is still reported and `results`
    /// stays empty. A failed search is logged and yields no places.
    pub fn assemble(prediction: PredictionResult, places: Option<&dyn PlacesSearch>) -> Self {
        let api_call = build_api_call(&prediction);
        let results = match (&api_call, places) {
            (Some(call), Some(places)) => {
                match places.search_nearby(&call.location, call.radius, &call.place_type) {
                    Ok(found) => {
                        info!(count = found.len(), location = %call.location, "places search");
                        Some(found)
                    }
                    Err(e) => {
                        warn!(error = %e, location = %call.location, "places search failed");
                        Some(Vec::new())
                    }
                }
            }
            _ => None,
        };

        Self {
            prediction,
            api_call,
            results,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::extract_entities;
    use std::sync::Mutex;

    fn prediction(intent: &str, text: &str) -> PredictionResult {
        PredictionResult {
            intent: intent.into(),
            entities: extract_entities(text),
            confidence: 0.9,
        }
    }

    struct RecordingPlaces {
        calls: Mutex<Vec<(String, u32, String)>>,
        fail: bool,
    }

    impl RecordingPlaces {
        fn new(fail: bool) -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                fail,
            }
        }
    }

    impl PlacesSearch for RecordingPlaces {
        fn search_nearby(
            &self,
            location: &str,
            radius: u32,
            place_type: &str,
        ) -> Result<Vec<Value>, PlacesError> {
            self.calls
                .lock()
                .unwrap()
                .push((location.into(), radius, place_type.into()));
            if self.fail {
                return Err(PlacesError("quota exceeded".into()));
            }
            Ok(vec![serde_json::json!({"name": "Green Leaf", "place_id": "abc"})])
        }
    }

    #[test]
    fn compose_query_appends_location() {
        assert_eq!(
            compose_query("Find me a good restaurant", Some("San Francisco")),
            "Find me a good restaurant near San Francisco"
        );
        assert_eq!(compose_query("Find me a good restaurant", None), "Find me a good restaurant");
        assert_eq!(compose_query("pizza", Some("")), "pizza");
    }

    #[test]
    fn api_call_for_restaurant_with_location() {
        let call = build_api_call(&prediction("restaurant", "restaurants near me")).unwrap();
        assert_eq!(
            call,
            ApiCall {
                location: "nearby".into(),
                radius: 5000,
                place_type: "restaurant".into(),
            }
        );
    }

    #[test]
    fn no_api_call_without_location_or_other_intent() {
        assert_eq!(build_api_call(&prediction("restaurant", "a good restaurant")), None);
        assert_eq!(build_api_call(&prediction("park", "parks near me")), None);
        assert_eq!(build_api_call(&prediction("thai_restaurant", "near me")), None);
    }

    #[test]
    fn assemble_calls_places() {
        let places = RecordingPlaces::new(false);
        let resp = QueryResponse::assemble(
            prediction("restaurant", "vegan restaurant near me"),
            Some(&places),
        );
        assert!(resp.api_call.is_some());
        assert_eq!(resp.results.as_ref().map(Vec::len), Some(1));
        assert_eq!(
            places.calls.lock().unwrap().as_slice(),
            [("nearby".to_string(), 5000, "restaurant".to_string())]
        );
    }

    #[test]
    fn assemble_swallows_places_failure() {
        let places = RecordingPlaces::new(true);
        let resp =
            QueryResponse::assemble(prediction("restaurant", "food near me"), Some(&places));
        assert!(resp.api_call.is_some());
        assert_eq!(resp.results, Some(vec![]));
    }

    #[test]
    fn assemble_skips_places_when_not_applicable() {
        let places = RecordingPlaces::new(false);
        let resp = QueryResponse::assemble(prediction("hotel", "hotel near me"), Some(&places));
        assert_eq!(resp.api_call, None);
        assert_eq!(resp.results, None);
        assert!(places.calls.lock().unwrap().is_empty());
    }

    #[test]
    fn response_json_is_flat() {
        let resp = QueryResponse::assemble(prediction("restaurant", "near"), None);
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["intent"], "restaurant");
        assert_eq!(json["entities"]["location_hint"], "nearby");
        assert_eq!(json["api_call"]["type"], "restaurant");
        assert_eq!(json["api_call"]["radius"], 5000);
        assert!(json["results"].is_null());
    }
}
