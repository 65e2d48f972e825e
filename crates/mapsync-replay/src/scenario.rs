//! Replay scenario files.

use std::path::Path;

use mapsync_core::{MapCenter, Record, Result, ViewContext};
use mapsync_host::{HttpRecordSource, RecordSource};
use parking_lot::Mutex;
use serde::Deserialize;

/// A scripted sequence of host events.
///
/// ```json
/// {
///   "records": [{"id": "a", "lat": 52.5, "lon": 13.4}],
///   "steps": [
///     {"step": "ready"},
///     {"step": "toggle", "layer": "My Feature Layer", "checked": true},
///     {"step": "move", "zoom": 16, "lat": 52.5, "lon": 13.4, "records": []}
///   ]
/// }
/// ```
///
/// Without top-level `records` the configured HTTP endpoint is queried.
#[derive(Debug, Deserialize)]
pub struct Scenario {
    #[serde(default)]
    pub records: Option<Vec<Record>>,
    pub steps: Vec<Step>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "step", rename_all = "lowercase")]
pub enum Step {
    Ready,
    Toggle {
        layer: String,
        checked: bool,
    },
    /// Move the viewport, optionally replacing the scripted records first.
    Move {
        zoom: u8,
        lat: f64,
        lon: f64,
        #[serde(default)]
        records: Option<Vec<Record>>,
    },
    Click {
        layer: String,
        feature_id: String,
    },
}

impl Scenario {
    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&data)?)
    }
}

impl Step {
    /// Viewport for a move step.
    pub fn view(&self) -> Option<ViewContext> {
        match self {
            Step::Move { zoom, lat, lon, .. } => Some(ViewContext {
                center: MapCenter {
                    lat: *lat,
                    lon: *lon,
                },
                zoom: *zoom,
            }),
            _ => None,
        }
    }
}

/// Records from the scenario file, or from the live endpoint.
pub enum ReplaySource {
    Scripted(Mutex<Vec<Record>>),
    Http(HttpRecordSource),
}

impl ReplaySource {
    pub fn for_scenario(scenario: &Scenario, data_url: &str) -> Self {
        match &scenario.records {
            Some(records) => ReplaySource::Scripted(Mutex::new(records.clone())),
            None => ReplaySource::Http(HttpRecordSource::new(data_url)),
        }
    }

    /// Replace scripted records. Returns false for the HTTP source.
    pub fn replace(&self, records: Vec<Record>) -> bool {
        match self {
            ReplaySource::Scripted(current) => {
                *current.lock() = records;
                true
            }
            ReplaySource::Http(_) => false,
        }
    }
}

impl RecordSource for ReplaySource {
    async fn fetch_records(&self, hint: &ViewContext) -> Result<Vec<Record>> {
        match self {
            ReplaySource::Scripted(records) => Ok(records.lock().clone()),
            ReplaySource::Http(source) => source.fetch_records(hint).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_all_steps() {
        let json = r#"{
            "records": [{"id": "a", "lat": 1.0, "lon": 2.0}],
            "steps": [
                {"step": "ready"},
                {"step": "toggle", "layer": "L", "checked": true},
                {"step": "move", "zoom": 16, "lat": 1.0, "lon": 2.0},
                {"step": "click", "layer": "L", "feature_id": "a"}
            ]
        }"#;
        let scenario: Scenario = serde_json::from_str(json).unwrap();
        assert_eq!(scenario.records.as_ref().map(Vec::len), Some(1));
        assert_eq!(scenario.steps.len(), 4);
        assert_eq!(scenario.steps[0], Step::Ready);
        assert_eq!(
            scenario.steps[2].view(),
            Some(ViewContext {
                center: MapCenter { lat: 1.0, lon: 2.0 },
                zoom: 16
            })
        );
        assert_eq!(scenario.steps[3].view(), None);
    }

    #[test]
    fn test_unknown_step_is_rejected() {
        let json = r#"{"steps": [{"step": "teleport"}]}"#;
        assert!(serde_json::from_str::<Scenario>(json).is_err());
    }

    #[test]
    fn test_source_selection() {
        let scripted: Scenario =
            serde_json::from_str(r#"{"records": [], "steps": []}"#).unwrap();
        let source = ReplaySource::for_scenario(&scripted, "http://localhost/data");
        assert!(matches!(source, ReplaySource::Scripted(_)));
        assert!(source.replace(vec![Record::new("x", 0.0, 0.0)]));

        let live: Scenario = serde_json::from_str(r#"{"steps": []}"#).unwrap();
        let source = ReplaySource::for_scenario(&live, "http://localhost/data");
        assert!(!source.replace(Vec::new()));
    }

    #[tokio::test]
    async fn test_scripted_source_returns_current_records() {
        let scenario: Scenario = serde_json::from_str(
            r#"{"records": [{"id": "a", "lat": 1.0, "lon": 2.0}], "steps": []}"#,
        )
        .unwrap();
        let source = ReplaySource::for_scenario(&scenario, "unused");
        let hint = ViewContext {
            center: MapCenter::default(),
            zoom: 16,
        };
        assert_eq!(source.fetch_records(&hint).await.unwrap()[0].id, "a");

        source.replace(vec![Record::new("b", 0.0, 0.0)]);
        assert_eq!(source.fetch_records(&hint).await.unwrap()[0].id, "b");
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scenario.json");
        std::fs::write(&path, r#"{"steps": [{"step": "ready"}]}"#).unwrap();
        assert_eq!(Scenario::load(&path).unwrap().steps, vec![Step::Ready]);
        assert!(Scenario::load(&dir.path().join("missing.json")).is_err());
    }
}
