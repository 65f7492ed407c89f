//! Removing intermediate artifacts after a successful run.

use crate::errors::Result;
use crate::store::ArtifactStore;
use tracing::info;

/// Deletes `names` from the store as one batch.
///
/// Absent names count as already deleted. Returns how many artifacts
/// existed before the batch ran.
pub async fn delete_intermediates(store: &dyn ArtifactStore, names: &[String]) -> Result<usize> {
    let present = names.iter().filter(|name| store.exists(name)).count();
    info!(present, listed = names.len(), "Deleting intermediate files");
    store.remove_all(names).await?;
    Ok(present)
}
