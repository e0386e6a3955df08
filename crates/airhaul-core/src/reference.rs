//! Artifact references
//!
//! Parses references like `ghcr.io/org/app:v1.0`, `nginx` or
//! `airhaul/k3s:v1.29.0-k3s1` into normalized components. Two references that
//! normalize to the same components are the same artifact.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{CoreError, Result};

/// Namespace used for synthetic references (files, release bundles)
pub const DEFAULT_NAMESPACE: &str = "airhaul";

/// Tag applied when a reference carries neither tag nor digest
pub const DEFAULT_TAG: &str = "latest";

/// Registry assumed for image references without one
pub const DEFAULT_REGISTRY: &str = "docker.io";

const LEGACY_DOCKER_HUB: &str = "index.docker.io";
const MAX_TAG_LEN: usize = 128;

/// How to fill in what a reference string leaves out
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseOptions {
    /// Registry used when none is present (`None` keeps the reference relocatable)
    pub default_registry: Option<String>,
    /// Tag used when neither tag nor digest is present
    pub default_tag: String,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            default_registry: Some(DEFAULT_REGISTRY.to_string()),
            default_tag: DEFAULT_TAG.to_string(),
        }
    }
}

impl ParseOptions {
    /// Options for store-local references: no registry is filled in
    pub fn local() -> Self {
        Self {
            default_registry: None,
            default_tag: DEFAULT_TAG.to_string(),
        }
    }

    pub fn with_default_tag(mut self, tag: impl Into<String>) -> Self {
        self.default_tag = tag.into();
        self
    }
}

/// Normalized artifact reference
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ArtifactRef {
    registry: Option<String>,
    repository: String,
    tag: Option<String>,
    digest: Option<String>,
}

impl ArtifactRef {
    /// Parse an image reference, defaulting to Docker Hub and `latest`
    pub fn parse(reference: &str) -> Result<Self> {
        Self::parse_with(reference, &ParseOptions::default())
    }

    /// Parse a store-local reference (no default registry)
    pub fn parse_local(reference: &str) -> Result<Self> {
        Self::parse_with(reference, &ParseOptions::local())
    }

    /// Parse a reference with explicit defaults
    pub fn parse_with(reference: &str, options: &ParseOptions) -> Result<Self> {
        let invalid = |reason: &str| CoreError::InvalidReference {
            reference: reference.to_string(),
            reason: reason.to_string(),
        };

        let trimmed = reference.trim();
        if trimmed.is_empty() {
            return Err(invalid("empty reference"));
        }

        let (name_tag, digest) = match trimmed.split_once('@') {
            Some((name_tag, digest)) => {
                validate_digest(digest).map_err(|reason| invalid(&reason))?;
                (name_tag, Some(digest.to_string()))
            }
            None => (trimmed, None),
        };

        // A colon after the last slash separates the tag; earlier colons are ports
        let last_slash = name_tag.rfind('/').map(|i| i + 1).unwrap_or(0);
        let (name, tag) = match name_tag[last_slash..].rfind(':') {
            Some(pos) => {
                let split = last_slash + pos;
                (&name_tag[..split], Some(name_tag[split + 1..].to_string()))
            }
            None => (name_tag, None),
        };

        if let Some(tag) = &tag {
            validate_tag(tag).map_err(|reason| invalid(&reason))?;
        }

        let (registry, repository) = split_registry(name);
        let registry = registry
            .map(|r| {
                if r == LEGACY_DOCKER_HUB {
                    DEFAULT_REGISTRY.to_string()
                } else {
                    r.to_string()
                }
            })
            .or_else(|| options.default_registry.clone());

        let mut repository = repository.to_string();
        validate_repository(&repository).map_err(|reason| invalid(&reason))?;

        // Docker Hub official images live under library/
        if registry.as_deref() == Some(DEFAULT_REGISTRY) && !repository.contains('/') {
            repository = format!("library/{}", repository);
        }

        let tag = match (tag, &digest) {
            (None, None) => Some(options.default_tag.clone()),
            (tag, _) => tag,
        };

        Ok(Self {
            registry,
            repository,
            tag,
            digest,
        })
    }

    pub fn registry(&self) -> Option<&str> {
        self.registry.as_deref()
    }

    pub fn repository(&self) -> &str {
        &self.repository
    }

    pub fn tag(&self) -> Option<&str> {
        self.tag.as_deref()
    }

    pub fn digest(&self) -> Option<&str> {
        self.digest.as_deref()
    }

    /// Registry and repository without tag or digest
    pub fn name(&self) -> String {
        match &self.registry {
            Some(registry) => format!("{}/{}", registry, self.repository),
            None => self.repository.clone(),
        }
    }

    /// The same artifact addressed under another registry
    pub fn relocate(&self, registry: &str) -> Self {
        Self {
            registry: Some(registry.trim_end_matches('/').to_string()),
            ..self.clone()
        }
    }

    /// The same artifact without a registry component
    pub fn without_registry(&self) -> Self {
        Self {
            registry: None,
            ..self.clone()
        }
    }
}

impl fmt::Display for ArtifactRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())?;
        if let Some(tag) = &self.tag {
            write!(f, ":{}", tag)?;
        }
        if let Some(digest) = &self.digest {
            write!(f, "@{}", digest)?;
        }
        Ok(())
    }
}

impl FromStr for ArtifactRef {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for ArtifactRef {
    type Error = CoreError;

    fn try_from(s: String) -> Result<Self> {
        Self::parse_local(&s)
    }
}

impl From<ArtifactRef> for String {
    fn from(reference: ArtifactRef) -> Self {
        reference.to_string()
    }
}

/// Tag-safe form of a version string (`v1.2.3+k3s1` -> `v1.2.3-k3s1`)
pub fn tag_compliant(version: &str) -> String {
    version.replace('+', "-")
}

fn split_registry(name: &str) -> (Option<&str>, &str) {
    match name.split_once('/') {
        Some((first, rest))
            if first.contains('.') || first.contains(':') || first == "localhost" =>
        {
            (Some(first), rest)
        }
        _ => (None, name),
    }
}

fn validate_repository(repository: &str) -> std::result::Result<(), String> {
    if repository.is_empty() {
        return Err("empty repository".to_string());
    }
    for component in repository.split('/') {
        if component.is_empty() {
            return Err("empty path component".to_string());
        }
        let valid = component
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '.' | '_' | '-'));
        if !valid {
            return Err(format!("invalid path component '{}'", component));
        }
        if !component.starts_with(|c: char| c.is_ascii_alphanumeric()) {
            return Err(format!("path component '{}' must start with a letter or digit", component));
        }
    }
    Ok(())
}

fn validate_tag(tag: &str) -> std::result::Result<(), String> {
    if tag.is_empty() || tag.len() > MAX_TAG_LEN {
        return Err(format!("tag must be 1-{} characters", MAX_TAG_LEN));
    }
    if tag.starts_with(['.', '-']) {
        return Err(format!("tag '{}' must start with a word character", tag));
    }
    if let Some(c) = tag
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-')))
    {
        return Err(format!("invalid character '{}' in tag '{}'", c, tag));
    }
    Ok(())
}

fn validate_digest(digest: &str) -> std::result::Result<(), String> {
    let (algorithm, hex) = digest
        .split_once(':')
        .ok_or_else(|| format!("digest '{}' must be algorithm:hex", digest))?;
    if algorithm.is_empty() || hex.is_empty() || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(format!("malformed digest '{}'", digest));
    }
    Ok(())
}
