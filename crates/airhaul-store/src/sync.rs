//! Syncing declared content into a store
//!
//! A sync replaces the store's content: the store is flushed, then every
//! document is dispatched in order on its group, version and kind. The
//! first failing document aborts the sync; anything added before it stays.

use airhaul_collection::{Collection, CollectionContext, SourceFilter, ThickChartConfig};
use airhaul_core::apis::v1alpha1::{self, Charts, Files, ImageTxts, Images, K3s, ThickCharts};
use airhaul_core::apis::{GroupVersion, GroupVersionKind, V1ALPHA1, V1ALPHA2};
use airhaul_core::{Artifact, ArtifactRef, ChartArtifact, FileArtifact};
use std::path::PathBuf;

use crate::document::{RawDocument, read_documents};
use crate::error::{Result, StoreError};
use crate::shutdown::Shutdown;
use crate::store::Store;

/// Outcome of a successful sync
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Documents processed
    pub documents: usize,
    /// References added, duplicates included
    pub artifacts: usize,
    /// Non-fatal warnings, such as deprecated API versions
    pub warnings: Vec<String>,
}

/// Dispatches documents into a store
pub struct Syncer<'a, S: Store + ?Sized> {
    store: &'a mut S,
    ctx: CollectionContext,
    shutdown: Shutdown,
    report: SyncReport,
}

impl<'a, S: Store + ?Sized> Syncer<'a, S> {
    pub fn new(store: &'a mut S, ctx: CollectionContext) -> Self {
        Self {
            store,
            ctx,
            shutdown: Shutdown::never(),
            report: SyncReport::default(),
        }
    }

    /// Abort between documents, and any in-flight fetch, once `shutdown` fires
    pub fn with_shutdown(mut self, shutdown: Shutdown) -> Self {
        self.shutdown = shutdown;
        self
    }

    /// Sync every document of every file, in order
    ///
    /// All files are read and split before the store is touched.
    pub async fn sync_files(self, files: &[PathBuf]) -> Result<SyncReport> {
        let mut documents = Vec::new();
        for file in files {
            tracing::debug!(file = %file.display(), "processing content file");
            documents.extend(read_documents(file)?);
        }
        self.sync(documents).await
    }

    /// Flush the store, then dispatch `documents` in order
    ///
    /// The store is closed again whether or not dispatch succeeds.
    pub async fn sync(mut self, documents: Vec<RawDocument>) -> Result<SyncReport> {
        tracing::debug!("flushing any existing content in store");
        self.store.flush().await?;
        self.store.open().await?;

        let dispatched = self.dispatch_all(&documents).await;
        let closed = self.store.close().await;

        dispatched?;
        closed?;
        Ok(self.report)
    }

    async fn dispatch_all(&mut self, documents: &[RawDocument]) -> Result<()> {
        for document in documents {
            if self.shutdown.is_cancelled() {
                return Err(StoreError::Cancelled);
            }

            let shutdown = self.shutdown.clone();
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => return Err(StoreError::Cancelled),
                result = self.dispatch(document) => result?,
            }
            self.report.documents += 1;
        }
        Ok(())
    }

    async fn dispatch(&mut self, document: &RawDocument) -> Result<()> {
        let gvk = document.gvk();
        let gv = &gvk.group_version;
        tracing::info!("syncing [{}] from {}", gvk, document.file);

        if *gv == GroupVersion::content(V1ALPHA1) {
            self.deprecated(gv, &GroupVersion::content(V1ALPHA2));
            match gvk.kind.as_str() {
                v1alpha1::FILES_KIND => self.files(document.decode()?).await,
                v1alpha1::IMAGES_KIND => self.images(document.decode()?).await,
                v1alpha1::CHARTS_KIND => self.charts(document.decode()?).await,
                _ => Err(unsupported_kind(&gvk)),
            }
        } else if *gv == GroupVersion::collection(V1ALPHA1) {
            self.deprecated(gv, &GroupVersion::collection(V1ALPHA2));
            match gvk.kind.as_str() {
                v1alpha1::K3S_KIND => self.k3s(document.decode()?).await,
                v1alpha1::THICK_CHARTS_KIND => self.thick_charts(document.decode()?).await,
                v1alpha1::IMAGE_TXTS_KIND => self.image_txts(document.decode()?).await,
                _ => Err(unsupported_kind(&gvk)),
            }
        } else if *gv == GroupVersion::content(V1ALPHA2) || *gv == GroupVersion::collection(V1ALPHA2) {
            Err(StoreError::NotYetSupported {
                group_version: gv.to_string(),
            })
        } else {
            Err(StoreError::UnrecognizedType {
                gvk: gvk.to_string(),
            })
        }
    }

    fn deprecated(&mut self, gv: &GroupVersion, replacement: &GroupVersion) {
        let warning = format!(
            "API version {} is deprecated; use {} instead",
            gv, replacement
        );
        tracing::warn!("{}", warning);
        self.report.warnings.push(warning);
    }

    async fn add(&mut self, reference: ArtifactRef, artifact: Artifact) -> Result<()> {
        tracing::info!(kind = %artifact.kind(), "adding [{}]", reference);
        self.store.add_artifact(reference, artifact).await?;
        self.report.artifacts += 1;
        Ok(())
    }

    async fn add_collection(&mut self, collection: &mut Collection) -> Result<()> {
        let added = self.store.add_collection(collection).await?;
        self.report.artifacts += added.len();
        Ok(())
    }

    async fn files(&mut self, doc: Files) -> Result<()> {
        for file in doc.spec.files {
            let artifact = FileArtifact {
                url: file.reference,
                name_override: file.name,
            };
            self.add(artifact.default_reference()?, Artifact::File(artifact))
                .await?;
        }
        Ok(())
    }

    async fn images(&mut self, doc: Images) -> Result<()> {
        for image in doc.spec.images {
            let reference = ArtifactRef::parse(&image.reference)?;
            self.add(reference.clone(), Artifact::image(reference)).await?;
        }
        Ok(())
    }

    async fn charts(&mut self, doc: Charts) -> Result<()> {
        for chart in doc.spec.charts {
            let package = ChartArtifact {
                name: chart.name,
                repo_url: chart.repo_url,
                version: chart.version,
            };
            self.add(package.reference()?, Artifact::Chart(package)).await?;
        }
        Ok(())
    }

    async fn k3s(&mut self, doc: K3s) -> Result<()> {
        let mut collection = Collection::k3s(&doc.spec.version, doc.spec.arch.clone(), &self.ctx);
        self.add_collection(&mut collection).await
    }

    async fn thick_charts(&mut self, doc: ThickCharts) -> Result<()> {
        for (index, chart) in doc.spec.charts.iter().enumerate() {
            let config = ThickChartConfig::from_spec(index, chart);
            let mut collection = Collection::thick_chart(config, &self.ctx);
            self.add_collection(&mut collection).await?;
        }
        Ok(())
    }

    async fn image_txts(&mut self, doc: ImageTxts) -> Result<()> {
        let name = doc.name().to_string();
        for entry in doc.spec.image_txts {
            let filter = SourceFilter::new(entry.sources.include, entry.sources.exclude);
            let mut collection = Collection::image_txt(&entry.reference, filter, &self.ctx);
            self.add_collection(&mut collection)
                .await
                .map_err(|e| match e {
                    StoreError::Collection(source) => StoreError::AddImageTxt {
                        name: name.clone(),
                        source,
                    },
                    other => other,
                })?;
        }
        Ok(())
    }
}

fn unsupported_kind(gvk: &GroupVersionKind) -> StoreError {
    StoreError::UnsupportedKind {
        kind: gvk.kind.clone(),
        group_version: gvk.group_version.to_string(),
    }
}
