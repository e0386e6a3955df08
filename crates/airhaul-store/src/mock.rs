//! In-memory store for testing
//!
//! Clones share state, so a test can keep a handle while the store is
//! lent to a sync or copy.

use airhaul_core::{Artifact, ArtifactRef};
use async_trait::async_trait;
use indexmap::IndexMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::error::{Result, StoreError};
use crate::store::{DEFAULT_REGISTRY, Store};

/// A store call, as recorded by [`MockStore`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    Open,
    Close,
    Flush,
    List,
    Add(ArtifactRef),
}

/// Counts of operations performed for testing assertions
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct OperationCounts {
    pub opens: usize,
    pub closes: usize,
    pub flushes: usize,
    pub lists: usize,
    pub adds: usize,
}

#[derive(Debug, Default)]
struct State {
    open: bool,
    entries: IndexMap<ArtifactRef, Artifact>,
    operations: Vec<Operation>,
}

/// In-memory store
#[derive(Debug, Clone)]
pub struct MockStore {
    state: Arc<Mutex<State>>,
    registry: String,
}

impl MockStore {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(State::default())),
            registry: DEFAULT_REGISTRY.to_string(),
        }
    }

    /// Create with pre-populated artifacts
    pub fn with_artifacts(artifacts: impl IntoIterator<Item = (ArtifactRef, Artifact)>) -> Self {
        let store = Self::new();
        store.lock().entries.extend(artifacts);
        store
    }

    pub fn with_registry(mut self, registry: impl Into<String>) -> Self {
        self.registry = registry.into();
        self
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Every call made so far, in order
    pub fn operations(&self) -> Vec<Operation> {
        self.lock().operations.clone()
    }

    pub fn operation_counts(&self) -> OperationCounts {
        let state = self.lock();
        let mut counts = OperationCounts::default();
        for op in &state.operations {
            match op {
                Operation::Open => counts.opens += 1,
                Operation::Close => counts.closes += 1,
                Operation::Flush => counts.flushes += 1,
                Operation::List => counts.lists += 1,
                Operation::Add(_) => counts.adds += 1,
            }
        }
        counts
    }

    /// Stored references regardless of open state
    pub fn references(&self) -> Vec<ArtifactRef> {
        self.lock().entries.keys().cloned().collect()
    }

    pub fn is_open(&self) -> bool {
        self.lock().open
    }
}

impl Default for MockStore {
    fn default() -> Self {
        Self::new()
    }
}

fn not_open() -> StoreError {
    StoreError::NotOpen {
        location: "memory".to_string(),
    }
}

#[async_trait]
impl Store for MockStore {
    async fn open(&mut self) -> Result<()> {
        let mut state = self.lock();
        state.operations.push(Operation::Open);
        state.open = true;
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        let mut state = self.lock();
        state.operations.push(Operation::Close);
        state.open = false;
        Ok(())
    }

    async fn flush(&mut self) -> Result<()> {
        let mut state = self.lock();
        state.operations.push(Operation::Flush);
        state.entries.clear();
        Ok(())
    }

    async fn list(&self) -> Result<Vec<ArtifactRef>> {
        let mut state = self.lock();
        state.operations.push(Operation::List);
        if !state.open {
            return Err(not_open());
        }
        Ok(state.entries.keys().cloned().collect())
    }

    async fn get(&self, reference: &ArtifactRef) -> Result<Option<Artifact>> {
        let state = self.lock();
        if !state.open {
            return Err(not_open());
        }
        Ok(state.entries.get(reference).cloned())
    }

    fn registry(&self) -> &str {
        &self.registry
    }

    async fn add_artifact(&mut self, reference: ArtifactRef, artifact: Artifact) -> Result<()> {
        let mut state = self.lock();
        state.operations.push(Operation::Add(reference.clone()));
        if !state.open {
            return Err(not_open());
        }
        state.entries.insert(reference, artifact);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_clones_share_state() {
        let handle = MockStore::new();
        let mut store = handle.clone();

        store.open().await.unwrap();
        let reference = ArtifactRef::parse("nginx:1.25").unwrap();
        store
            .add_artifact(reference.clone(), Artifact::image(reference.clone()))
            .await
            .unwrap();
        store.close().await.unwrap();

        assert_eq!(handle.references(), vec![reference.clone()]);
        assert_eq!(
            handle.operations(),
            vec![Operation::Open, Operation::Add(reference), Operation::Close]
        );
        assert_eq!(handle.operation_counts().adds, 1);
    }

    #[tokio::test]
    async fn test_requires_open() {
        let mut store = MockStore::new();
        let reference = ArtifactRef::parse("nginx:1.25").unwrap();
        assert!(store.list().await.is_err());
        assert!(store
            .add_artifact(reference.clone(), Artifact::image(reference))
            .await
            .is_err());
    }
}
