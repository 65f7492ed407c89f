//! Checkpoint store: the artifact namespace the pipeline memoizes against.
//!
//! Existence of an artifact is the only completion signal. There is no
//! content hashing and no timestamp comparison, so a truncated file left by
//! a crashed tool is treated as complete on the next run, and a hand-placed
//! file skips the stage that would have produced it.
//!
//! Two processes driving the same store concurrently race on the existence
//! checks. Callers must not do that.

mod fs;
mod memory;

pub use fs::FsArtifactStore;
pub use memory::InMemoryArtifactStore;

use crate::errors::Result;
use async_trait::async_trait;
use futures::future::BoxFuture;
use std::path::PathBuf;

/// The side effect that materialises an artifact.
pub type Producer<'a> = BoxFuture<'a, Result<()>>;

/// Storage backend for pipeline artifacts.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Returns true if the named artifact exists.
    fn exists(&self, name: &str) -> bool;

    /// Resolves an artifact name to the path handed to external tools.
    fn path(&self, name: &str) -> PathBuf;

    /// Runs `producer` to create the named artifact.
    ///
    /// The artifact is only guaranteed to exist if the producer succeeded.
    async fn write(&self, name: &str, producer: Producer<'_>) -> Result<()>;

    /// Prepares the store for a run. Returns true if it already existed.
    async fn prepare(&self) -> Result<bool>;

    /// Deletes a batch of artifacts.
    ///
    /// Names that do not exist are ignored. Every name is attempted; any
    /// other failure is reported once the whole batch has been tried.
    async fn remove_all(&self, names: &[String]) -> Result<()>;
}
