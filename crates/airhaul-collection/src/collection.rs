//! Collections and their memoized contents

use airhaul_core::{Artifact, ArtifactRef};
use airhaul_engine::{ChartRenderer, Engine};
use airhaul_repo::{ChartSource, HttpClient, RepositoryChartSource};
use indexmap::IndexMap;
use std::sync::Arc;

use crate::error::Result;
use crate::imagetxt::{ImageTxt, SourceFilter};
use crate::k3s::{K3s, ReleaseEndpoints};
use crate::thick_chart::{ThickChart, ThickChartConfig};

/// Artifacts of a collection, keyed by reference, in discovery order
pub type Contents = IndexMap<ArtifactRef, Artifact>;

/// Collaborators shared by every collection of a sync
#[derive(Clone)]
pub struct CollectionContext {
    pub http: HttpClient,
    pub renderer: Arc<dyn ChartRenderer>,
    pub charts: Arc<dyn ChartSource>,
    pub endpoints: ReleaseEndpoints,
}

impl CollectionContext {
    /// MiniJinja rendering, repository chart sources and the public k3s endpoints
    pub fn new(http: HttpClient) -> Self {
        Self {
            renderer: Arc::new(Engine),
            charts: Arc::new(RepositoryChartSource::new(http.clone())),
            endpoints: ReleaseEndpoints::default(),
            http,
        }
    }

    pub fn with_renderer(mut self, renderer: Arc<dyn ChartRenderer>) -> Self {
        self.renderer = renderer;
        self
    }

    pub fn with_charts(mut self, charts: Arc<dyn ChartSource>) -> Self {
        self.charts = charts;
        self
    }

    pub fn with_endpoints(mut self, endpoints: ReleaseEndpoints) -> Self {
        self.endpoints = endpoints;
        self
    }
}

/// The kinds of collection
pub enum CollectionKind {
    ThickChart(ThickChart),
    K3s(K3s),
    ImageTxt(ImageTxt),
}

impl CollectionKind {
    async fn compute(&self) -> Result<Contents> {
        match self {
            CollectionKind::ThickChart(chart) => chart.compute().await,
            CollectionKind::K3s(k3s) => k3s.compute().await,
            CollectionKind::ImageTxt(list) => list.compute().await,
        }
    }
}

/// A declared group of artifacts, expanded on first access
///
/// Starts uncomputed. The first successful [`Collection::contents`] call
/// runs discovery and keeps the result; later calls return it without any
/// I/O. A failed discovery leaves the collection uncomputed with nothing
/// kept, so the next call starts over.
pub struct Collection {
    name: String,
    kind: CollectionKind,
    computed: Option<Contents>,
}

impl Collection {
    pub fn new(name: impl Into<String>, kind: CollectionKind) -> Self {
        Self {
            name: name.into(),
            kind,
            computed: None,
        }
    }

    pub fn thick_chart(config: ThickChartConfig, ctx: &CollectionContext) -> Self {
        let name = config.name.clone();
        Self::new(
            name,
            CollectionKind::ThickChart(ThickChart::new(
                config,
                ctx.http.clone(),
                ctx.renderer.clone(),
                ctx.charts.clone(),
            )),
        )
    }

    pub fn k3s(version: &str, arch: Option<String>, ctx: &CollectionContext) -> Self {
        Self::new(
            format!("k3s@{}", version),
            CollectionKind::K3s(
                K3s::new(version, ctx.http.clone(), ctx.endpoints.clone()).with_arch(arch),
            ),
        )
    }

    pub fn image_txt(location: &str, filter: SourceFilter, ctx: &CollectionContext) -> Self {
        Self::new(
            location,
            CollectionKind::ImageTxt(ImageTxt::new(location, filter, ctx.http.clone())),
        )
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &CollectionKind {
        &self.kind
    }

    pub fn is_computed(&self) -> bool {
        self.computed.is_some()
    }

    /// The collection's artifacts, computing them on first use
    pub async fn contents(&mut self) -> Result<&Contents> {
        match self.computed {
            Some(ref contents) => Ok(contents),
            None => {
                tracing::debug!(collection = %self.name, "computing collection contents");
                let contents = self.kind.compute().await?;
                Ok(self.computed.insert(contents))
            }
        }
    }
}

impl std::fmt::Debug for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match self.kind {
            CollectionKind::ThickChart(_) => "ThickChart",
            CollectionKind::K3s(_) => "K3s",
            CollectionKind::ImageTxt(_) => "ImageTxt",
        };
        f.debug_struct("Collection")
            .field("name", &self.name)
            .field("kind", &kind)
            .field("computed", &self.is_computed())
            .finish()
    }
}
