use std::path::{Path, PathBuf};

use tracing::info;

use crate::infra::import::snapshot::{load_snapshot, Snapshot};
use crate::platform::blocking::run_blocking;
use crate::usecase::services::request_slot::{RequestError, RequestSlot};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ImportError {
    #[error(transparent)]
    Request(#[from] RequestError),
    #[error("failed to load dataset: {0}")]
    Load(String),
}

/// Loads record snapshots from disk. A newer load supersedes one still in
/// flight.
pub struct ImportService {
    slot: RequestSlot,
}

impl ImportService {
    pub fn new() -> Self {
        Self {
            slot: RequestSlot::new("dataset-load"),
        }
    }

    pub async fn load(&self, path: &Path) -> Result<Snapshot, ImportError> {
        let owned: PathBuf = path.to_path_buf();
        let loaded = self
            .slot
            .run(run_blocking(move || load_snapshot(&owned)))
            .await?;

        let snapshot = loaded
            .and_then(|inner| inner)
            .map_err(|err| ImportError::Load(format!("{err:#}")))?;
        info!(
            path = %path.display(),
            records = snapshot.record_count(),
            "dataset loaded"
        );
        Ok(snapshot)
    }

    /// Drops any load still in flight.
    pub fn cancel(&self) {
        self.slot.cancel();
    }
}

impl Default for ImportService {
    fn default() -> Self {
        Self::new()
    }
}
