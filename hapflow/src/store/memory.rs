//! In-memory checkpoint store.

use super::{ArtifactStore, Producer};
use crate::errors::Result;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

/// Tracks artifact existence in memory.
///
/// Each artifact records the generation at which it was last written, so
/// tests can tell a reused artifact from a rewritten one.
#[derive(Debug, Default, Clone)]
pub struct InMemoryArtifactStore {
    entries: Arc<Mutex<HashMap<String, u64>>>,
    writes: Arc<Mutex<Vec<String>>>,
    prepared: Arc<Mutex<bool>>,
}

impl InMemoryArtifactStore {
    /// Creates a new in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store where the given artifacts already exist.
    #[must_use]
    pub fn with_artifacts<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let store = Self::new();
        for name in names {
            store.seed(name);
        }
        store
    }

    /// Marks an artifact as existing without going through `write`.
    pub fn seed(&self, name: impl Into<String>) {
        self.entries.lock().insert(name.into(), 0);
    }

    /// Forgets an artifact.
    pub fn delete(&self, name: &str) -> bool {
        self.entries.lock().remove(name).is_some()
    }

    /// Returns the generation an artifact was last written at (0 if seeded).
    #[must_use]
    pub fn generation(&self, name: &str) -> Option<u64> {
        self.entries.lock().get(name).copied()
    }

    /// Returns all existing artifact names, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.entries.lock().keys().cloned().collect();
        names.sort();
        names
    }

    /// Returns successful writes in order.
    #[must_use]
    pub fn writes(&self) -> Vec<String> {
        self.writes.lock().clone()
    }
}

#[async_trait]
impl ArtifactStore for InMemoryArtifactStore {
    fn exists(&self, name: &str) -> bool {
        self.entries.lock().contains_key(name)
    }

    fn path(&self, name: &str) -> PathBuf {
        PathBuf::from("/memory").join(name)
    }

    async fn write(&self, name: &str, producer: Producer<'_>) -> Result<()> {
        producer.await?;

        let mut writes = self.writes.lock();
        writes.push(name.to_string());
        let generation = writes.len() as u64;
        self.entries.lock().insert(name.to_string(), generation);
        Ok(())
    }

    async fn prepare(&self) -> Result<bool> {
        let mut prepared = self.prepared.lock();
        let existed = *prepared;
        *prepared = true;
        Ok(existed)
    }

    async fn remove_all(&self, names: &[String]) -> Result<()> {
        let mut entries = self.entries.lock();
        for name in names {
            entries.remove(name);
        }
        Ok(())
    }
}
