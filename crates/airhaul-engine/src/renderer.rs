//! Rendering seam used by image discovery

use airhaul_core::{LoadedChart, Values};
use serde_json::Value as JsonValue;

use crate::engine::{Engine, ReleaseInfo};
use crate::error::Result;

/// Renders a chart into the manifest objects a dry-run install would create
pub trait ChartRenderer: Send + Sync {
    fn render(&self, chart: &LoadedChart, values: &Values) -> Result<Vec<JsonValue>>;
}

impl ChartRenderer for Engine {
    fn render(&self, chart: &LoadedChart, values: &Values) -> Result<Vec<JsonValue>> {
        self.render_chart(chart, values, &ReleaseInfo::for_chart(chart))?
            .objects()
    }
}
