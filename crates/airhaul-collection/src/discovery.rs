//! Image discovery in rendered charts
//!
//! A chart is rendered once per values pass. Every rendered object is
//! scanned with the default image queries plus any extra queries, and the
//! image strings found are deduplicated in first-seen order across passes.
//!
//! Failing queries never abort discovery; they are kept as diagnostics.

use airhaul_core::{LoadedChart, Values};
use airhaul_engine::ChartRenderer;
use serde_json::Value as JsonValue;
use std::collections::HashSet;

use crate::error::Result;
use crate::jsonpath::JsonPath;

/// Queries covering the image fields of workload manifests
pub const DEFAULT_IMAGE_PATHS: [&str; 4] = [
    "{.spec.template.spec.initContainers[*].image}",
    "{.spec.template.spec.containers[*].image}",
    "{.spec.initContainers[*].image}",
    "{.spec.containers[*].image}",
];

/// A swallowed query failure
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryDiagnostic {
    pub query: String,
    /// `Kind/name` of the object the query ran against, when known
    pub object: Option<String>,
    pub message: String,
}

/// Images found across all passes
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiscoveredImages {
    /// Distinct image strings in first-seen order
    pub images: Vec<String>,
    pub diagnostics: Vec<QueryDiagnostic>,
    /// Number of render passes performed
    pub passes: usize,
}

/// Incremental, deduplicating image scanner
#[derive(Debug)]
pub struct ImageDiscovery {
    queries: Vec<JsonPath>,
    seen: HashSet<String>,
    found: DiscoveredImages,
}

impl ImageDiscovery {
    /// Scanner with the default queries followed by `extra_paths`
    ///
    /// Extra queries that do not parse are logged, recorded as diagnostics
    /// and skipped.
    pub fn new<S: AsRef<str>>(extra_paths: &[S]) -> Self {
        let mut found = DiscoveredImages::default();
        let mut queries = Vec::new();

        let all = DEFAULT_IMAGE_PATHS
            .iter()
            .copied()
            .chain(extra_paths.iter().map(AsRef::as_ref));

        for source in all {
            match JsonPath::parse(source) {
                Ok(query) => queries.push(query),
                Err(e) => {
                    tracing::warn!(query = source, "ignoring path query: {}", e);
                    found.diagnostics.push(QueryDiagnostic {
                        query: source.to_string(),
                        object: None,
                        message: e.to_string(),
                    });
                }
            }
        }

        Self {
            queries,
            seen: HashSet::new(),
            found,
        }
    }

    /// Scan one pass worth of rendered objects
    pub fn scan(&mut self, objects: &[JsonValue]) {
        self.found.passes += 1;

        for object in objects {
            for query in &self.queries {
                match query.strings(object) {
                    Ok(images) => {
                        for image in images {
                            if self.seen.insert(image.clone()) {
                                self.found.images.push(image);
                            }
                        }
                    }
                    Err(e) => self.found.diagnostics.push(QueryDiagnostic {
                        query: query.source().to_string(),
                        object: describe(object),
                        message: e.to_string(),
                    }),
                }
            }
        }
    }

    pub fn finish(self) -> DiscoveredImages {
        self.found
    }
}

/// Render `chart` once per values pass and collect the images it deploys
///
/// Render failures are propagated.
pub fn images_in_chart<S: AsRef<str>>(
    renderer: &dyn ChartRenderer,
    chart: &LoadedChart,
    passes: &[Values],
    extra_paths: &[S],
) -> Result<DiscoveredImages> {
    let mut discovery = ImageDiscovery::new(extra_paths);

    for values in passes {
        let objects = renderer.render(chart, values)?;
        discovery.scan(&objects);
    }

    let found = discovery.finish();
    for diagnostic in &found.diagnostics {
        let Some(object) = &diagnostic.object else {
            continue;
        };
        tracing::debug!(
            chart = chart.name(),
            query = %diagnostic.query,
            object = %object,
            "path query found nothing: {}",
            diagnostic.message
        );
    }

    Ok(found)
}

fn describe(object: &JsonValue) -> Option<String> {
    let kind = object.get("kind")?.as_str()?;
    let name = object
        .pointer("/metadata/name")
        .and_then(JsonValue::as_str)
        .unwrap_or("<unnamed>");
    Some(format!("{}/{}", kind, name))
}
