//! Copying stored content to a remote registry

use airhaul_core::ArtifactRef;
use airhaul_repo::{OciRegistry, RegistryClient, RegistryOptions, ResolvedCredentials};

use crate::error::{Result, StoreError};
use crate::shutdown::Shutdown;
use crate::store::Store;

/// Destination registry settings
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CopyOptions {
    pub username: Option<String>,
    pub password: Option<String>,
    /// Skip TLS certificate verification
    pub insecure: bool,
    /// Talk plain HTTP to the destination
    pub plain_http: bool,
}

impl CopyOptions {
    /// Basic auth when either half is given; otherwise the Docker config applies
    pub fn credentials(&self) -> Option<ResolvedCredentials> {
        let username = self.username.as_deref().unwrap_or_default();
        let password = self.password.as_deref().unwrap_or_default();
        if username.is_empty() && password.is_empty() {
            return None;
        }
        Some(ResolvedCredentials::basic(username, password))
    }

    pub fn registry_options(&self) -> RegistryOptions {
        RegistryOptions {
            insecure: self.insecure,
            plain_http: self.plain_http,
        }
    }
}

/// A reference as copied
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopiedArtifact {
    pub source: ArtifactRef,
    pub destination: ArtifactRef,
}

/// Copy every stored reference to `registry` over OCI
pub async fn copy_to_registry<S: Store + ?Sized>(
    store: &mut S,
    registry: &str,
    options: &CopyOptions,
    shutdown: &Shutdown,
) -> Result<Vec<CopiedArtifact>> {
    let source = OciRegistry::for_registry(
        store.registry(),
        &RegistryOptions::for_registry(store.registry()),
        None,
    );
    let credentials = options.credentials();
    let destination =
        OciRegistry::for_registry(registry, &options.registry_options(), credentials.as_ref());

    copy(store, &source, &destination, registry, shutdown).await
}

/// Copy every stored reference from `source` into `destination`
///
/// References are read from the store's registry and written under
/// `registry` with the same repository and tag. The first failure aborts
/// the copy; earlier writes stay in place.
pub async fn copy<S: Store + ?Sized>(
    store: &mut S,
    source: &dyn RegistryClient,
    destination: &dyn RegistryClient,
    registry: &str,
    shutdown: &Shutdown,
) -> Result<Vec<CopiedArtifact>> {
    store.open().await?;
    let copied = copy_all(&*store, source, destination, registry, shutdown).await;
    let closed = store.close().await;

    let copied = copied?;
    closed?;
    Ok(copied)
}

async fn copy_all<S: Store + ?Sized>(
    store: &S,
    source: &dyn RegistryClient,
    destination: &dyn RegistryClient,
    registry: &str,
    shutdown: &Shutdown,
) -> Result<Vec<CopiedArtifact>> {
    let references = store.list().await?;
    let mut copied = Vec::with_capacity(references.len());

    for reference in references {
        if shutdown.is_cancelled() {
            return Err(StoreError::Cancelled);
        }

        let from = reference.relocate(store.registry());
        let to = reference.relocate(registry);
        tracing::info!("copying [{}] -> [{}]", from, to);

        let failed = |e: airhaul_repo::RepoError| StoreError::CopyFailed {
            source_ref: from.to_string(),
            destination: to.to_string(),
            message: e.to_string(),
        };

        let transfer = async {
            let object = source.fetch(&from).await.map_err(failed)?;
            destination.write(&to, &object).await.map_err(failed)
        };

        let manifest = tokio::select! {
            biased;
            _ = shutdown.cancelled() => return Err(StoreError::Cancelled),
            result = transfer => result?,
        };
        tracing::debug!(manifest = %manifest, "copied [{}]", to);

        copied.push(CopiedArtifact {
            source: from,
            destination: to,
        });
    }

    Ok(copied)
}
