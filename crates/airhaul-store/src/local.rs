//! Directory-backed store
//!
//! The store keeps an `index.json` in its data directory recording every
//! reference with the artifact it resolves to. The index is loaded on open
//! and written back on close.

use airhaul_core::{Artifact, ArtifactRef};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Result, StoreError};
use crate::store::{DEFAULT_REGISTRY, Store};

const INDEX_FILE: &str = "index.json";
const INDEX_VERSION: u32 = 1;

/// Local store settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// Directory holding the store (default: `./store`)
    pub data_dir: PathBuf,
    /// Address the store's content is served on (default: `localhost:5000`)
    pub registry: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("store"),
            registry: DEFAULT_REGISTRY.to_string(),
        }
    }
}

impl StoreConfig {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            ..Self::default()
        }
    }

    pub fn with_registry(mut self, registry: impl Into<String>) -> Self {
        self.registry = registry.into();
        self
    }
}

/// One stored reference
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexEntry {
    pub reference: ArtifactRef,
    pub artifact: Artifact,
    pub added: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
struct IndexFile {
    version: u32,
    #[serde(default)]
    entries: Vec<IndexEntry>,
}

/// Store persisted in a local directory
#[derive(Debug)]
pub struct LocalStore {
    config: StoreConfig,
    entries: Option<IndexMap<ArtifactRef, IndexEntry>>,
}

impl LocalStore {
    pub fn new(config: StoreConfig) -> Self {
        Self {
            config,
            entries: None,
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.config.data_dir
    }

    pub fn is_open(&self) -> bool {
        self.entries.is_some()
    }

    fn index_path(&self) -> PathBuf {
        self.config.data_dir.join(INDEX_FILE)
    }

    fn entries(&self) -> Result<&IndexMap<ArtifactRef, IndexEntry>> {
        self.entries.as_ref().ok_or_else(|| self.not_open())
    }

    fn not_open(&self) -> StoreError {
        StoreError::NotOpen {
            location: self.config.data_dir.display().to_string(),
        }
    }

    fn read_index(&self) -> Result<IndexMap<ArtifactRef, IndexEntry>> {
        let path = self.index_path();
        if !path.exists() {
            return Ok(IndexMap::new());
        }

        let data = std::fs::read(&path).map_err(|source| io_error(&path, source))?;
        let index: IndexFile =
            serde_json::from_slice(&data).map_err(|e| StoreError::CorruptIndex {
                path: path.display().to_string(),
                message: e.to_string(),
            })?;

        if index.version != INDEX_VERSION {
            return Err(StoreError::CorruptIndex {
                path: path.display().to_string(),
                message: format!("unsupported index version {}", index.version),
            });
        }

        Ok(index
            .entries
            .into_iter()
            .map(|entry| (entry.reference.clone(), entry))
            .collect())
    }

    fn write_index(&self, entries: &IndexMap<ArtifactRef, IndexEntry>) -> Result<()> {
        let path = self.index_path();
        let index = IndexFile {
            version: INDEX_VERSION,
            entries: entries.values().cloned().collect(),
        };

        let json = serde_json::to_vec_pretty(&index).map_err(|e| StoreError::CorruptIndex {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;

        // Replace the index atomically
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, json).map_err(|source| io_error(&tmp, source))?;
        std::fs::rename(&tmp, &path).map_err(|source| io_error(&path, source))?;
        Ok(())
    }
}

fn io_error(path: &Path, source: std::io::Error) -> StoreError {
    StoreError::Io {
        path: path.display().to_string(),
        source,
    }
}

#[async_trait]
impl Store for LocalStore {
    async fn open(&mut self) -> Result<()> {
        if self.is_open() {
            return Ok(());
        }

        let dir = &self.config.data_dir;
        std::fs::create_dir_all(dir).map_err(|source| io_error(dir, source))?;

        let entries = self.read_index()?;
        tracing::debug!(store = %dir.display(), entries = entries.len(), "opened store");
        self.entries = Some(entries);
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        if let Some(entries) = self.entries.take() {
            self.write_index(&entries)?;
            tracing::debug!(store = %self.config.data_dir.display(), entries = entries.len(), "closed store");
        }
        Ok(())
    }

    async fn flush(&mut self) -> Result<()> {
        let path = self.index_path();
        if path.exists() {
            std::fs::remove_file(&path).map_err(|source| io_error(&path, source))?;
        }
        if let Some(entries) = self.entries.as_mut() {
            entries.clear();
        }
        tracing::debug!(store = %self.config.data_dir.display(), "flushed store");
        Ok(())
    }

    async fn list(&self) -> Result<Vec<ArtifactRef>> {
        Ok(self.entries()?.keys().cloned().collect())
    }

    async fn get(&self, reference: &ArtifactRef) -> Result<Option<Artifact>> {
        Ok(self.entries()?.get(reference).map(|e| e.artifact.clone()))
    }

    fn registry(&self) -> &str {
        &self.config.registry
    }

    async fn add_artifact(&mut self, reference: ArtifactRef, artifact: Artifact) -> Result<()> {
        let location = self.config.data_dir.display().to_string();
        let entries = self
            .entries
            .as_mut()
            .ok_or(StoreError::NotOpen { location })?;

        tracing::debug!(reference = %reference, kind = %artifact.kind(), "adding artifact");
        entries.insert(
            reference.clone(),
            IndexEntry {
                reference,
                artifact,
                added: Utc::now(),
            },
        );
        Ok(())
    }
}
