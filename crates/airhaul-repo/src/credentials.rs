//! Registry credential resolution
//!
//! Explicit basic auth always wins. Otherwise the Docker config
//! (`~/.docker/config.json`) is consulted by host, and failing that the
//! registry is accessed anonymously.

use base64::Engine as _;
use oci_distribution::secrets::RegistryAuth;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

use crate::error::{RepoError, Result};

/// Resolved credentials ready for use
#[derive(Clone, PartialEq, Eq)]
pub enum ResolvedCredentials {
    Basic { username: String, password: String },
}

impl std::fmt::Debug for ResolvedCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResolvedCredentials::Basic { username, .. } => f
                .debug_struct("Basic")
                .field("username", username)
                .field("password", &"***")
                .finish(),
        }
    }
}

impl ResolvedCredentials {
    pub fn basic(username: impl Into<String>, password: impl Into<String>) -> Self {
        ResolvedCredentials::Basic {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Registry authentication for the OCI client
    pub fn registry_auth(&self) -> RegistryAuth {
        match self {
            ResolvedCredentials::Basic { username, password } => {
                RegistryAuth::Basic(username.clone(), password.clone())
            }
        }
    }
}

/// Docker config.json format
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DockerConfig {
    #[serde(default)]
    pub auths: HashMap<String, DockerAuth>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DockerAuth {
    #[serde(default)]
    pub auth: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

impl DockerConfig {
    /// Load from the default location, or empty when absent
    pub fn load() -> Result<Self> {
        match dirs::home_dir() {
            Some(home) => Self::load_from(&home.join(".docker").join("config.json")),
            None => Ok(Self::default()),
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|source| RepoError::File {
            path: path.display().to_string(),
            source,
        })?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Credentials for a registry host (`ghcr.io`, `localhost:5000`)
    pub fn credentials_for(&self, registry: &str) -> Option<ResolvedCredentials> {
        let mut candidates = vec![
            registry.to_string(),
            format!("https://{}", registry),
            format!("http://{}", registry),
        ];
        if registry == airhaul_core::DEFAULT_REGISTRY {
            candidates.push("https://index.docker.io/v1/".to_string());
        }

        candidates
            .iter()
            .filter_map(|candidate| self.auths.get(candidate))
            .find_map(DockerAuth::resolve)
    }
}

impl DockerAuth {
    fn resolve(&self) -> Option<ResolvedCredentials> {
        if let (Some(username), Some(password)) = (&self.username, &self.password) {
            return Some(ResolvedCredentials::basic(username, password));
        }

        let decoded = base64::engine::general_purpose::STANDARD
            .decode(self.auth.as_ref()?)
            .ok()?;
        let decoded = String::from_utf8(decoded).ok()?;
        let (username, password) = decoded.split_once(':')?;
        Some(ResolvedCredentials::basic(username, password))
    }
}

/// Pick registry credentials: explicit, then Docker config, then anonymous
pub fn registry_auth(registry: &str, explicit: Option<&ResolvedCredentials>) -> RegistryAuth {
    if let Some(credentials) = explicit {
        return credentials.registry_auth();
    }

    match DockerConfig::load() {
        Ok(config) => config
            .credentials_for(registry)
            .map(|c| c.registry_auth())
            .unwrap_or(RegistryAuth::Anonymous),
        Err(e) => {
            tracing::debug!(error = %e, "ignoring unreadable docker config");
            RegistryAuth::Anonymous
        }
    }
}
