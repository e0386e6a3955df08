//! Artifacts - individually fetchable units of content
//!
//! An artifact only describes where its content lives. Building one never
//! touches the network; the store resolves the content when it persists it.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::reference::{ArtifactRef, DEFAULT_NAMESPACE, DEFAULT_TAG, ParseOptions};

/// Media types used when artifacts are written to a registry
pub mod media_types {
    /// OCI image manifest
    pub const OCI_MANIFEST: &str = "application/vnd.oci.image.manifest.v1+json";
    /// Docker v2 image manifest
    pub const DOCKER_MANIFEST: &str = "application/vnd.docker.distribution.manifest.v2+json";
    /// Generic file layer
    pub const FILE_LAYER: &str = "application/vnd.airhaul.file.layer.v1";
    /// Helm chart config
    pub const HELM_CONFIG: &str = "application/vnd.cncf.helm.config.v1+json";
    /// Helm chart content layer
    pub const HELM_CONTENT: &str = "application/vnd.cncf.helm.chart.content.v1.tar+gzip";
    /// Helm chart provenance layer
    pub const HELM_PROVENANCE: &str = "application/vnd.cncf.helm.chart.provenance.v1.prov";
}

/// Artifact variant names, mostly for display
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArtifactKind {
    Image,
    File,
    Chart,
}

impl std::fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ArtifactKind::Image => write!(f, "image"),
            ArtifactKind::File => write!(f, "file"),
            ArtifactKind::Chart => write!(f, "chart"),
        }
    }
}

/// A lazily resolvable unit of content
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Artifact {
    Image(ImageArtifact),
    File(FileArtifact),
    Chart(ChartArtifact),
}

/// Container image pulled from its source registry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageArtifact {
    pub reference: ArtifactRef,
}

/// Plain file fetched from a URL or local path
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileArtifact {
    pub url: String,
    /// Destination file name, when it differs from the URL's last segment
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name_override: Option<String>,
}

/// Chart package from a chart repository
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartArtifact {
    pub name: String,
    pub repo_url: String,
    #[serde(default)]
    pub version: String,
}

impl Artifact {
    pub fn image(reference: ArtifactRef) -> Self {
        Artifact::Image(ImageArtifact { reference })
    }

    pub fn file(url: impl Into<String>) -> Self {
        Artifact::File(FileArtifact {
            url: url.into(),
            name_override: None,
        })
    }

    pub fn renamed_file(url: impl Into<String>, name: impl Into<String>) -> Self {
        Artifact::File(FileArtifact {
            url: url.into(),
            name_override: Some(name.into()),
        })
    }

    pub fn chart(
        name: impl Into<String>,
        repo_url: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Artifact::Chart(ChartArtifact {
            name: name.into(),
            repo_url: repo_url.into(),
            version: version.into(),
        })
    }

    pub fn kind(&self) -> ArtifactKind {
        match self {
            Artifact::Image(_) => ArtifactKind::Image,
            Artifact::File(_) => ArtifactKind::File,
            Artifact::Chart(_) => ArtifactKind::Chart,
        }
    }

    /// Media type of the top-level object written for this artifact
    pub fn media_type(&self) -> &'static str {
        match self {
            Artifact::Image(_) => media_types::OCI_MANIFEST,
            Artifact::File(_) => media_types::FILE_LAYER,
            Artifact::Chart(_) => media_types::HELM_CONTENT,
        }
    }

    /// Human-readable origin of the content
    pub fn source(&self) -> String {
        match self {
            Artifact::Image(image) => image.reference.to_string(),
            Artifact::File(file) => file.url.clone(),
            Artifact::Chart(chart) => match chart.version.as_str() {
                "" => format!("{} ({})", chart.name, chart.repo_url),
                version => format!("{}@{} ({})", chart.name, version, chart.repo_url),
            },
        }
    }
}

impl FileArtifact {
    /// File name the content is stored under
    pub fn file_name(&self) -> &str {
        if let Some(name) = &self.name_override {
            return name;
        }
        let path = self
            .url
            .split(['?', '#'])
            .next()
            .unwrap_or(&self.url)
            .trim_end_matches('/');
        path.rsplit('/').next().unwrap_or(path)
    }

    /// Synthetic store reference: `airhaul/<file name>:latest`
    pub fn default_reference(&self) -> Result<ArtifactRef> {
        ArtifactRef::parse_local(&format!(
            "{}/{}:{}",
            DEFAULT_NAMESPACE,
            self.file_name().to_lowercase(),
            DEFAULT_TAG
        ))
    }
}

impl ChartArtifact {
    /// Store reference for the chart package, tagged with its version
    pub fn reference(&self) -> Result<ArtifactRef> {
        let tag = if self.version.is_empty() {
            DEFAULT_TAG.to_string()
        } else {
            crate::reference::tag_compliant(&self.version)
        };
        ArtifactRef::parse_with(&self.name, &ParseOptions::local().with_default_tag(tag))
    }
}
