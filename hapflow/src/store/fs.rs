//! Filesystem-backed checkpoint store rooted at the output directory.

use super::{ArtifactStore, Producer};
use crate::errors::{HapflowError, Result};
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Artifacts are files; relative names resolve under the root directory.
#[derive(Debug, Clone)]
pub struct FsArtifactStore {
    root: PathBuf,
}

impl FsArtifactStore {
    /// Creates a store rooted at `root`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Returns the root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[async_trait]
impl ArtifactStore for FsArtifactStore {
    fn exists(&self, name: &str) -> bool {
        self.path(name).exists()
    }

    fn path(&self, name: &str) -> PathBuf {
        // absolute names (caller inputs) are kept as-is by `join`
        self.root.join(name)
    }

    async fn write(&self, name: &str, producer: Producer<'_>) -> Result<()> {
        debug!(artifact = name, path = %self.path(name).display(), "Producing artifact");
        producer.await
    }

    async fn prepare(&self) -> Result<bool> {
        if self.root.is_dir() {
            warn!(
                "The path {} exists. Existing results may be reused.",
                self.root.display()
            );
            return Ok(true);
        }
        tokio::fs::create_dir_all(&self.root).await?;
        Ok(false)
    }

    async fn remove_all(&self, names: &[String]) -> Result<()> {
        let mut failures = Vec::new();

        for name in names {
            let path = self.path(name);
            match tokio::fs::remove_file(&path).await {
                Ok(()) => debug!(path = %path.display(), "Removed intermediate file"),
                Err(err) if err.kind() == ErrorKind::NotFound => {}
                Err(err) => failures.push((path, err.to_string())),
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(HapflowError::Cleanup { failures })
        }
    }
}
