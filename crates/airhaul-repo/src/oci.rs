//! OCI registry client
//!
//! Fetches and writes whole OCI objects (manifest, config and layers) so
//! content can be replayed from one registry into another.

use airhaul_core::ArtifactRef;
use airhaul_core::artifact::media_types;
use async_trait::async_trait;
use oci_distribution::Reference;
use oci_distribution::client::{Client, ClientConfig, ClientProtocol, Config, ImageLayer};
use oci_distribution::manifest::OciImageManifest;
use oci_distribution::secrets::RegistryAuth;

use crate::config::RegistryOptions;
use crate::credentials::{ResolvedCredentials, registry_auth};
use crate::error::{RepoError, Result};

/// A blob with its media type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Blob {
    pub media_type: String,
    pub data: Vec<u8>,
}

impl Blob {
    pub fn new(media_type: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            media_type: media_type.into(),
            data,
        }
    }
}

/// Everything needed to recreate an artifact under another reference
#[derive(Debug, Clone)]
pub struct OciObject {
    /// Source manifest; when absent one is generated on write
    pub manifest: Option<OciImageManifest>,
    pub config: Blob,
    pub layers: Vec<Blob>,
}

impl OciObject {
    /// Total size of config and layers
    pub fn size(&self) -> usize {
        self.config.data.len() + self.layers.iter().map(|l| l.data.len()).sum::<usize>()
    }
}

/// Fetch and write OCI objects by reference
#[async_trait]
pub trait RegistryClient: Send + Sync {
    async fn fetch(&self, reference: &ArtifactRef) -> Result<OciObject>;

    /// Write an object, returning the manifest URL
    async fn write(&self, reference: &ArtifactRef, object: &OciObject) -> Result<String>;
}

/// OCI registry client
pub struct OciRegistry {
    client: Client,
    auth: RegistryAuth,
}

impl OciRegistry {
    pub fn new(options: &RegistryOptions, auth: RegistryAuth) -> Self {
        let config = ClientConfig {
            protocol: if options.plain_http {
                ClientProtocol::Http
            } else {
                ClientProtocol::Https
            },
            accept_invalid_certificates: options.insecure,
            ..Default::default()
        };

        Self {
            client: Client::new(config),
            auth,
        }
    }

    /// Client for one registry, authenticated with explicit credentials,
    /// the Docker config, or anonymously
    pub fn for_registry(
        registry: &str,
        options: &RegistryOptions,
        credentials: Option<&ResolvedCredentials>,
    ) -> Self {
        Self::new(options, registry_auth(registry, credentials))
    }

    /// Convert a reference; it must name a registry
    pub fn to_reference(reference: &ArtifactRef) -> Result<Reference> {
        if reference.registry().is_none() {
            return Err(RepoError::InvalidOciReference {
                reference: format!("{} (no registry)", reference),
            });
        }

        Reference::try_from(reference.to_string()).map_err(|e| RepoError::InvalidOciReference {
            reference: format!("{}: {}", reference, e),
        })
    }

    /// Parse an `oci://registry/repo:tag` chart location
    pub fn parse_reference(reference: &str) -> Result<Reference> {
        let clean = reference.trim_start_matches("oci://");

        Reference::try_from(clean).map_err(|e| RepoError::InvalidOciReference {
            reference: format!("{}: {}", reference, e),
        })
    }

    /// Pull a chart archive stored as an OCI artifact
    pub async fn pull_chart(&self, reference: &str) -> Result<Vec<u8>> {
        let reference = Self::parse_reference(reference)?;

        let image_data = self
            .client
            .pull(
                &reference,
                &self.auth,
                vec![media_types::HELM_CONTENT, media_types::HELM_PROVENANCE],
            )
            .await
            .map_err(|e| RepoError::OciError {
                message: format!("Failed to pull {}: {}", reference, e),
            })?;

        image_data
            .layers
            .into_iter()
            .find(|l| l.media_type == media_types::HELM_CONTENT)
            .map(|l| l.data)
            .ok_or_else(|| RepoError::OciError {
                message: format!("No chart content layer found in {}", reference),
            })
    }

    async fn pull_blob(&self, reference: &Reference, descriptor: &oci_distribution::manifest::OciDescriptor) -> Result<Blob> {
        let mut data: Vec<u8> = Vec::new();
        self.client
            .pull_blob(reference, descriptor, &mut data)
            .await
            .map_err(|e| RepoError::OciError {
                message: format!("Failed to pull blob {}: {}", descriptor.digest, e),
            })?;
        Ok(Blob::new(descriptor.media_type.clone(), data))
    }
}

#[async_trait]
impl RegistryClient for OciRegistry {
    async fn fetch(&self, reference: &ArtifactRef) -> Result<OciObject> {
        let oci_ref = Self::to_reference(reference)?;

        let (manifest, digest) = self
            .client
            .pull_image_manifest(&oci_ref, &self.auth)
            .await
            .map_err(|e| RepoError::OciError {
                message: format!("Failed to pull manifest for {}: {}", reference, e),
            })?;

        let config = self.pull_blob(&oci_ref, &manifest.config).await?;

        let mut layers = Vec::with_capacity(manifest.layers.len());
        for descriptor in &manifest.layers {
            layers.push(self.pull_blob(&oci_ref, descriptor).await?);
        }

        tracing::debug!(
            reference = %reference,
            digest = %digest,
            layers = layers.len(),
            "fetched object"
        );

        Ok(OciObject {
            manifest: Some(manifest),
            config,
            layers,
        })
    }

    async fn write(&self, reference: &ArtifactRef, object: &OciObject) -> Result<String> {
        let oci_ref = Self::to_reference(reference)?;

        let layers: Vec<ImageLayer> = object
            .layers
            .iter()
            .map(|l| ImageLayer::new(l.data.clone(), l.media_type.clone(), None))
            .collect();
        let config = Config::new(object.config.data.clone(), object.config.media_type.clone(), None);

        let response = self
            .client
            .push(&oci_ref, &layers, config, &self.auth, object.manifest.clone())
            .await
            .map_err(|e| RepoError::OciPushFailed {
                message: format!("{}: {}", reference, e),
            })?;

        Ok(response.manifest_url)
    }
}
