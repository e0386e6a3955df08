//! Thick charts: a chart together with every image it deploys

use airhaul_core::apis::v1alpha1;
use airhaul_core::{Artifact, ArtifactRef, ChartArtifact, Values};
use airhaul_engine::ChartRenderer;
use airhaul_repo::{ChartSource, HttpClient};
use serde_json::Value as JsonValue;
use std::sync::Arc;

use crate::collection::Contents;
use crate::discovery;
use crate::error::{CollectionError, Result};

/// One values overlay applied to a render pass
#[derive(Debug, Clone, PartialEq)]
pub enum ValuesOverride {
    Inline(Values),
    /// Local path, or a URL when it starts with `http`
    File(String),
}

/// Which values passes to render
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValuesConfig {
    /// Skip the pass with the chart's own defaults (default: false)
    pub disable_default: bool,
    /// Overlays, each rendered as its own pass (default: none)
    pub overrides: Vec<ValuesOverride>,
}

/// Thick chart settings
#[derive(Debug, Clone, PartialEq)]
pub struct ThickChartConfig {
    pub name: String,
    pub repo_url: String,
    /// Chart version; empty picks the latest and tags the package `latest`
    pub version: String,
    pub values: ValuesConfig,
    /// Path queries run in addition to the default image queries
    pub extra_json_paths: Vec<String>,
}

impl ThickChartConfig {
    pub fn new(
        name: impl Into<String>,
        repo_url: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            repo_url: repo_url.into(),
            version: version.into(),
            values: ValuesConfig::default(),
            extra_json_paths: Vec::new(),
        }
    }

    /// Settings for the `index`th entry of a `ThickCharts` document
    ///
    /// Inline values win over a values file on the same override.
    pub fn from_spec(index: usize, spec: &v1alpha1::ThickChart) -> Self {
        let mut overrides = Vec::new();

        for (slot, entry) in spec.values_config.overrides.iter().enumerate() {
            let file = entry.values_file.as_deref().filter(|f| !f.is_empty());

            match (&entry.values, file) {
                (Some(values), file) => {
                    if file.is_some() {
                        tracing::warn!("found values and values file in override; ignoring values file");
                    }
                    overrides.push(ValuesOverride::Inline(Values(JsonValue::Object(values.clone()))));
                }
                (None, Some(file)) => overrides.push(ValuesOverride::File(file.to_string())),
                (None, None) => tracing::warn!(
                    "found no values or values file in chart {} (repo {:?} name {:?}) override {}",
                    index,
                    spec.repo_url,
                    spec.name,
                    slot
                ),
            }
        }

        Self {
            name: spec.name.clone(),
            repo_url: spec.repo_url.clone(),
            version: spec.version.clone(),
            values: ValuesConfig {
                disable_default: spec.values_config.disable_default,
                overrides,
            },
            extra_json_paths: spec.extra_json_paths.clone(),
        }
    }
}

/// Chart package plus its dependent images
pub struct ThickChart {
    config: ThickChartConfig,
    http: HttpClient,
    renderer: Arc<dyn ChartRenderer>,
    charts: Arc<dyn ChartSource>,
}

impl ThickChart {
    pub fn new(
        config: ThickChartConfig,
        http: HttpClient,
        renderer: Arc<dyn ChartRenderer>,
        charts: Arc<dyn ChartSource>,
    ) -> Self {
        Self {
            config,
            http,
            renderer,
            charts,
        }
    }

    pub fn config(&self) -> &ThickChartConfig {
        &self.config
    }

    /// Values for every render pass: defaults, inline overlays, then files
    async fn passes(&self) -> Result<Vec<Values>> {
        let mut passes = Vec::new();

        if !self.config.values.disable_default {
            passes.push(Values::new());
        }

        for entry in &self.config.values.overrides {
            if let ValuesOverride::Inline(values) = entry {
                passes.push(values.clone());
            }
        }

        for entry in &self.config.values.overrides {
            if let ValuesOverride::File(path) = entry {
                passes.push(self.values_file(path).await?);
            }
        }

        Ok(passes)
    }

    async fn values_file(&self, path: &str) -> Result<Values> {
        let data = self
            .http
            .open(path)
            .await
            .map_err(|e| CollectionError::ValuesFile {
                path: path.to_string(),
                message: e.to_string(),
            })?;

        let unparseable = |message: String| CollectionError::ValuesParse {
            path: path.to_string(),
            message,
        };
        let values = Values::from_slice(&data).map_err(|e| unparseable(e.to_string()))?;
        if values.is_empty() {
            return Err(unparseable("no values in file".to_string()));
        }
        Ok(values)
    }

    pub(crate) async fn compute(&self) -> Result<Contents> {
        let config = &self.config;

        let chart = self
            .charts
            .load(&config.name, &config.repo_url, &config.version)
            .await?;
        let passes = self.passes().await?;

        let found = discovery::images_in_chart(
            self.renderer.as_ref(),
            &chart,
            &passes,
            &config.extra_json_paths,
        )?;

        let mut contents = Contents::new();
        for image in &found.images {
            let reference = ArtifactRef::parse(image)?;
            contents.insert(reference.clone(), Artifact::image(reference));
        }

        let package = ChartArtifact {
            name: config.name.clone(),
            repo_url: config.repo_url.clone(),
            version: config.version.clone(),
        };
        contents.insert(package.reference()?, Artifact::Chart(package));

        tracing::info!(
            chart = %config.name,
            passes = found.passes,
            images = found.images.len(),
            skipped_queries = found.diagnostics.len(),
            "discovered chart images"
        );

        Ok(contents)
    }
}
