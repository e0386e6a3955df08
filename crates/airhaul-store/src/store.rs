//! The content store seam

use airhaul_collection::Collection;
use airhaul_core::{Artifact, ArtifactRef};
use async_trait::async_trait;

use crate::error::Result;

/// Address stores serve their content on unless configured otherwise
pub const DEFAULT_REGISTRY: &str = "localhost:5000";

/// Persistent mapping of references to artifacts
///
/// Content is only readable or writable between [`Store::open`] and
/// [`Store::close`]. Adding a reference that is already stored replaces it.
#[async_trait]
pub trait Store: Send + Sync {
    async fn open(&mut self) -> Result<()>;

    async fn close(&mut self) -> Result<()>;

    /// Remove all stored content
    async fn flush(&mut self) -> Result<()>;

    /// Every stored reference, in insertion order
    async fn list(&self) -> Result<Vec<ArtifactRef>>;

    async fn get(&self, reference: &ArtifactRef) -> Result<Option<Artifact>>;

    /// Registry address the stored content is served on
    fn registry(&self) -> &str;

    async fn add_artifact(&mut self, reference: ArtifactRef, artifact: Artifact) -> Result<()>;

    /// Add every artifact of a collection, computing it if needed
    async fn add_collection(&mut self, collection: &mut Collection) -> Result<Vec<ArtifactRef>> {
        let contents = collection.contents().await?;

        let mut added = Vec::with_capacity(contents.len());
        for (reference, artifact) in contents {
            self.add_artifact(reference.clone(), artifact.clone()).await?;
            added.push(reference.clone());
        }

        tracing::debug!(collection = collection.name(), artifacts = added.len(), "added collection");
        Ok(added)
    }
}
