//! Payloads exchanged with the external insight service.
//!
//! The request carries a bounded sample of normalized rows, the filter that
//! produced them, and the KPI set. Responses are passed through untouched.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

use crate::{filter::{FilterState, FilteredView}, kpi::KpiSet};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsightRequest {
    pub filter: FilterState,
    pub kpis: KpiSet,
    pub row_count: usize,
    pub sample: Vec<Map<String, JsonValue>>,
}

impl InsightRequest {
    /// Builds a request from the first `cap` rows of the view, in row order.
    pub fn build(view: &FilteredView<'_>, filter: &FilterState, kpis: KpiSet, cap: usize) -> Self {
        let dataset = view.dataset();
        let sample = view
            .rows()
            .take(cap)
            .map(|row| dataset.row_json(row))
            .collect();
        Self {
            filter: filter.clone(),
            kpis,
            row_count: view.len(),
            sample,
        }
    }
}

/// Observations returned by the service. Each entry is opaque.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InsightResponse {
    pub insights: Vec<JsonValue>,
    pub recommendations: Vec<JsonValue>,
    pub predictions: Vec<JsonValue>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        data::RawValue,
        geography::ProfileRegistry,
        kpi::{KpiOptions, compute_kpis},
        normalize::{RawTable, load_dataset},
    };

    #[test]
    fn request_sample_is_capped_and_typed() {
        let rows = (0..80)
            .map(|i| {
                vec![
                    Some(RawValue::text(if i % 2 == 0 { "CA" } else { "NY" })),
                    Some(RawValue::text(i.to_string())),
                ]
            })
            .collect();
        let table = RawTable::new(vec!["State".into(), "Stylists".into()], rows).unwrap();
        let dataset = load_dataset(&table, &ProfileRegistry::builtin().unwrap()).unwrap();
        let view = FilteredView::all(&dataset);
        let kpis = compute_kpis(&view, &KpiOptions::default()).unwrap();
        let filter = FilterState::default();

        let request = InsightRequest::build(&view, &filter, kpis, 50);
        assert_eq!(request.row_count, 80);
        assert_eq!(request.sample.len(), 50);
        let first = &request.sample[0];
        assert_eq!(first["State"], JsonValue::from("CA"));
        assert_eq!(first["Stylists"], JsonValue::from(0.0));
        assert_eq!(first["state_code"], JsonValue::from("CA"));

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["kpis"]["total_rows"], JsonValue::from(80));
        let parsed: InsightRequest = serde_json::from_value(json).unwrap();
        assert_eq!(parsed.sample.len(), 50);
    }

    #[test]
    fn response_passes_observations_through() {
        let raw = r#"{"insights": [{"label": "Growth", "detail": {"x": 1}}], "predictions": ["up"]}"#;
        let response: InsightResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(response.insights[0]["detail"]["x"], JsonValue::from(1));
        assert!(response.recommendations.is_empty());
        assert_eq!(response.predictions, vec![JsonValue::from("up")]);
    }
}
