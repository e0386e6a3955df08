//! Extracting stored content to disk
//!
//! A reference is fetched from the registry the store is served on and each
//! of its layers is written as one file into the destination directory.

use airhaul_core::{Artifact, ArtifactRef};
use airhaul_repo::{Blob, OciObject, OciRegistry, RegistryClient, RegistryOptions};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

use crate::error::{Result, StoreError};
use crate::shutdown::Shutdown;
use crate::store::Store;

/// Layer annotation carrying the original file name
pub const TITLE_ANNOTATION: &str = "org.opencontainers.image.title";

/// What an extraction wrote
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedArtifact {
    /// Reference as fetched from the store's registry
    pub reference: ArtifactRef,
    pub files: Vec<PathBuf>,
}

/// Extract `reference` from the registry the store is served on
pub async fn extract_from_registry<S: Store + ?Sized>(
    store: &mut S,
    reference: &str,
    dir: &Path,
    shutdown: &Shutdown,
) -> Result<ExtractedArtifact> {
    let source = OciRegistry::for_registry(
        store.registry(),
        &RegistryOptions::for_registry(store.registry()),
        None,
    );
    extract(store, &source, reference, dir, shutdown).await
}

/// Fetch `reference` relocated to the store's registry and write its layers into `dir`
///
/// The stored artifact, when found, names the files: file artifacts keep
/// their file name and charts become `<name>-<version>.tgz`. Other layers
/// use their title annotation, falling back to their digest.
pub async fn extract<S: Store + ?Sized>(
    store: &mut S,
    source: &dyn RegistryClient,
    reference: &str,
    dir: &Path,
    shutdown: &Shutdown,
) -> Result<ExtractedArtifact> {
    store.open().await?;
    let extracted = extract_one(&*store, source, reference, dir, shutdown).await;
    let closed = store.close().await;

    let extracted = extracted?;
    closed?;
    Ok(extracted)
}

async fn extract_one<S: Store + ?Sized>(
    store: &S,
    source: &dyn RegistryClient,
    reference: &str,
    dir: &Path,
    shutdown: &Shutdown,
) -> Result<ExtractedArtifact> {
    let (stored, artifact) = lookup(store, reference).await?;
    let from = stored.relocate(store.registry());
    tracing::info!("extracting [{}] to {}", from, dir.display());

    let object = tokio::select! {
        biased;
        _ = shutdown.cancelled() => return Err(StoreError::Cancelled),
        result = source.fetch(&from) => result.map_err(|source| StoreError::ExtractFailed {
            reference: from.to_string(),
            source,
        })?,
    };

    tokio::fs::create_dir_all(dir).await.map_err(|source| StoreError::Io {
        path: dir.display().to_string(),
        source,
    })?;

    let mut files = Vec::with_capacity(object.layers.len());
    for (index, layer) in object.layers.iter().enumerate() {
        let path = dir.join(layer_file_name(artifact.as_ref(), &object, index, layer));
        tokio::fs::write(&path, &layer.data)
            .await
            .map_err(|source| StoreError::Io {
                path: path.display().to_string(),
                source,
            })?;
        tracing::debug!(bytes = layer.data.len(), "wrote {}", path.display());
        files.push(path);
    }

    Ok(ExtractedArtifact {
        reference: from,
        files,
    })
}

/// The stored reference `reference` names, with its artifact
///
/// References not in the store are still extracted, addressed as given.
async fn lookup<S: Store + ?Sized>(
    store: &S,
    reference: &str,
) -> Result<(ArtifactRef, Option<Artifact>)> {
    let local = ArtifactRef::parse_local(reference)?;
    for candidate in [local.clone(), ArtifactRef::parse(reference)?] {
        if let Some(artifact) = store.get(&candidate).await? {
            return Ok((candidate, Some(artifact)));
        }
    }
    tracing::warn!("[{}] is not in the store, extracting it anyway", local);
    Ok((local, None))
}

fn layer_file_name(artifact: Option<&Artifact>, object: &OciObject, index: usize, layer: &Blob) -> String {
    let named = match artifact {
        Some(Artifact::File(file)) if index == 0 => Some(file.file_name().to_string()),
        Some(Artifact::Chart(chart)) if index == 0 => Some(match chart.version.as_str() {
            "" => format!("{}.tgz", chart.name),
            version => format!("{}-{}.tgz", chart.name, version),
        }),
        _ => title(object, index),
    };

    named
        .as_deref()
        .and_then(|name| Path::new(name).file_name())
        .and_then(|name| name.to_str())
        .map(String::from)
        .unwrap_or_else(|| format!("sha256-{}", hex::encode(Sha256::digest(&layer.data))))
}

fn title(object: &OciObject, index: usize) -> Option<String> {
    object
        .manifest
        .as_ref()?
        .layers
        .get(index)?
        .annotations
        .as_ref()?
        .get(TITLE_ANNOTATION)
        .cloned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockStore, Operation};
    use crate::shutdown::shutdown_channel;
    use airhaul_core::{ChartArtifact, FileArtifact};
    use airhaul_repo::RepoError;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;

    /// Serves one fixed object for every reference not listed as missing
    struct FakeStoreRegistry {
        object: OciObject,
        missing: bool,
        fetched: Mutex<Vec<String>>,
    }

    impl FakeStoreRegistry {
        fn serving(layers: Vec<Blob>) -> Self {
            Self {
                object: OciObject {
                    manifest: None,
                    config: Blob::new("application/vnd.oci.image.config.v1+json", b"{}".to_vec()),
                    layers,
                },
                missing: false,
                fetched: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl RegistryClient for FakeStoreRegistry {
        async fn fetch(&self, reference: &ArtifactRef) -> airhaul_repo::Result<OciObject> {
            self.fetched.lock().unwrap().push(reference.to_string());
            if self.missing {
                return Err(RepoError::OciError {
                    message: format!("manifest unknown: {}", reference),
                });
            }
            Ok(self.object.clone())
        }

        async fn write(&self, _: &ArtifactRef, _: &OciObject) -> airhaul_repo::Result<String> {
            unreachable!("extract never writes")
        }
    }

    fn layer(data: &[u8]) -> Blob {
        Blob::new("application/octet-stream", data.to_vec())
    }

    fn file_store() -> MockStore {
        let file = FileArtifact {
            url: "https://get.example.io/install.sh?channel=stable".to_string(),
            name_override: None,
        };
        let reference = file.default_reference().unwrap();
        MockStore::with_artifacts([(reference, Artifact::File(file))])
    }

    #[tokio::test]
    async fn test_extract_file_uses_file_name() {
        let handle = file_store();
        let mut store = handle.clone();
        let registry = FakeStoreRegistry::serving(vec![layer(b"#!/bin/sh\n")]);
        let dir = tempfile::tempdir().unwrap();

        let extracted = extract(
            &mut store,
            &registry,
            "airhaul/install.sh:latest",
            dir.path(),
            &Shutdown::never(),
        )
        .await
        .unwrap();

        assert_eq!(
            *registry.fetched.lock().unwrap(),
            vec!["localhost:5000/airhaul/install.sh:latest"]
        );
        assert_eq!(extracted.files, vec![dir.path().join("install.sh")]);
        assert_eq!(std::fs::read(dir.path().join("install.sh")).unwrap(), b"#!/bin/sh\n");
        assert_eq!(handle.operations().last(), Some(&Operation::Close));
    }

    #[tokio::test]
    async fn test_extract_chart_archive_name() {
        let chart = ChartArtifact {
            name: "rancher".to_string(),
            repo_url: "https://releases.rancher.com/server-charts/stable".to_string(),
            version: "2.8.2".to_string(),
        };
        let reference = chart.reference().unwrap();
        let mut store = MockStore::with_artifacts([(reference, Artifact::Chart(chart))]);
        let registry = FakeStoreRegistry::serving(vec![layer(b"tgz")]);
        let dir = tempfile::tempdir().unwrap();

        let extracted = extract(&mut store, &registry, "rancher:2.8.2", dir.path(), &Shutdown::never())
            .await
            .unwrap();

        assert_eq!(extracted.files, vec![dir.path().join("rancher-2.8.2.tgz")]);
    }

    #[tokio::test]
    async fn test_extract_image_uses_titles_then_digests() {
        let reference = ArtifactRef::parse("nginx:1.25").unwrap();
        let mut store = MockStore::with_artifacts([(reference.clone(), Artifact::image(reference))]);

        let mut registry = FakeStoreRegistry::serving(vec![layer(b"one"), layer(b"two")]);
        registry.object.manifest = Some(
            serde_json::from_value(json!({
                "schemaVersion": 2,
                "config": {
                    "mediaType": "application/vnd.oci.image.config.v1+json",
                    "digest": "sha256:44136fa355b3678a1146ad16f7e8649e94fb4fc21fe77e8310c060f61caaff8a",
                    "size": 2
                },
                "layers": [
                    {
                        "mediaType": "application/octet-stream",
                        "digest": "sha256:7692c3ad3540bb803c020b3aee66cd8887123234ea0c6e7143c0add73ff431ed",
                        "size": 3,
                        "annotations": {"org.opencontainers.image.title": "../rootfs.tar"}
                    },
                    {
                        "mediaType": "application/octet-stream",
                        "digest": "sha256:3fc4ccfe745870e2c0d99f71f30ff0656c8dedd41cc1d7d3d376b0dbe685e2f3",
                        "size": 3
                    }
                ]
            }))
            .unwrap(),
        );
        let dir = tempfile::tempdir().unwrap();

        let extracted = extract(&mut store, &registry, "nginx:1.25", dir.path(), &Shutdown::never())
            .await
            .unwrap();

        assert_eq!(
            *registry.fetched.lock().unwrap(),
            vec!["localhost:5000/library/nginx:1.25"]
        );
        assert_eq!(extracted.files[0], dir.path().join("rootfs.tar"));
        let digest_name = format!("sha256-{}", hex::encode(Sha256::digest(b"two")));
        assert_eq!(extracted.files[1], dir.path().join(digest_name));
    }

    #[tokio::test]
    async fn test_extract_fetch_failure() {
        let handle = file_store();
        let mut store = handle.clone();
        let mut registry = FakeStoreRegistry::serving(Vec::new());
        registry.missing = true;
        let dir = tempfile::tempdir().unwrap();

        let err = extract(
            &mut store,
            &registry,
            "airhaul/install.sh:latest",
            dir.path(),
            &Shutdown::never(),
        )
        .await
        .unwrap_err();

        assert!(matches!(
            err,
            StoreError::ExtractFailed { ref reference, source: RepoError::OciError { .. } }
                if reference == "localhost:5000/airhaul/install.sh:latest"
        ));
        assert!(!handle.is_open());
    }

    #[tokio::test]
    async fn test_extract_cancelled() {
        let mut store = file_store();
        let registry = FakeStoreRegistry::serving(vec![layer(b"x")]);
        let dir = tempfile::tempdir().unwrap();
        let (trigger, shutdown) = shutdown_channel();
        trigger.cancel();

        let err = extract(&mut store, &registry, "airhaul/install.sh:latest", dir.path(), &shutdown)
            .await
            .unwrap_err();

        assert!(matches!(err, StoreError::Cancelled));
        assert!(registry.fetched.lock().unwrap().is_empty());
    }
}
