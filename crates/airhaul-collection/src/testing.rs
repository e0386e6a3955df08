//! Test doubles for discovery collaborators

use airhaul_core::{ChartMetadata, LoadedChart, Values};
use airhaul_engine::ChartRenderer;
use airhaul_repo::ChartSource;
use async_trait::async_trait;
use serde_json::{Value as JsonValue, json};
use std::collections::BTreeMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Renders one Pod listing the merged `images` value; counts calls
#[derive(Default)]
pub struct RecordingRenderer {
    calls: AtomicUsize,
    overlays: Mutex<Vec<Values>>,
}

impl RecordingRenderer {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn overlays(&self) -> Vec<Values> {
        self.overlays.lock().unwrap().clone()
    }
}

impl ChartRenderer for RecordingRenderer {
    fn render(&self, chart: &LoadedChart, values: &Values) -> airhaul_engine::Result<Vec<JsonValue>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.overlays.lock().unwrap().push(values.clone());

        let mut merged = chart.values.clone();
        merged.merge(values);

        let containers: Vec<JsonValue> = merged
            .get("images")
            .and_then(JsonValue::as_array)
            .map(|images| images.iter().map(|i| json!({"name": "c", "image": i})).collect())
            .unwrap_or_default();

        Ok(vec![
            json!({"kind": "Pod", "metadata": {"name": chart.name()}, "spec": {"containers": containers}}),
            json!({"kind": "ConfigMap", "metadata": {"name": "cfg"}, "data": {"a": "b"}}),
        ])
    }
}

/// Returns the same in-memory chart for every request; counts loads
pub struct StaticChartSource {
    chart: LoadedChart,
    loads: AtomicUsize,
}

impl StaticChartSource {
    pub fn new(default_values: &str) -> Self {
        Self {
            chart: LoadedChart {
                metadata: ChartMetadata {
                    api_version: Some("v2".to_string()),
                    name: "web".to_string(),
                    version: "1.0.0".to_string(),
                    app_version: None,
                    description: None,
                },
                values: Values::from_yaml(default_values).unwrap(),
                templates: BTreeMap::new(),
                crds: BTreeMap::new(),
            },
            loads: AtomicUsize::new(0),
        }
    }

    pub fn loads(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChartSource for StaticChartSource {
    async fn load(&self, _name: &str, _repo_url: &str, _version: &str) -> airhaul_repo::Result<LoadedChart> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        Ok(self.chart.clone())
    }
}
