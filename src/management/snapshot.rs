use std::path::PathBuf;

use thiserror::Error;
use tracing::warn;

use crate::{
    config,
    state::{Feature, Snapshot},
};

#[derive(Debug, Error)]
pub enum StateError {
    #[error("state io error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("state encoding error: {0}")]
    SerdeError(#[from] serde_json::Error),
}

/// Persists the last published snapshot of every feature so a later run can
/// restore it before anything is fetched.
pub struct SnapshotStore {
    root: PathBuf,
}

impl Default for SnapshotStore {
    fn default() -> Self {
        Self::new(config::data_dir().join("state"))
    }
}

impl SnapshotStore {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub async fn persist(&self, snapshot: &Snapshot) -> Result<(), StateError> {
        async_fs::create_dir_all(&self.root).await?;
        let json = serde_json::to_string_pretty(snapshot)?;
        async_fs::write(self.path(snapshot.feature), json).await?;
        Ok(())
    }

    /// Returns `None` when nothing was stored for `feature` yet.
    pub async fn load(&self, feature: Feature) -> Result<Option<Snapshot>, StateError> {
        let path = self.path(feature);
        if !path.is_file() {
            return Ok(None);
        }

        let json = async_fs::read_to_string(path).await?;
        Ok(Some(serde_json::from_str(&json)?))
    }

    /// Loads every stored snapshot. Unreadable files are skipped with a
    /// warning.
    pub async fn load_all(&self) -> Vec<Snapshot> {
        let mut snapshots = Vec::new();
        for feature in Feature::ALL {
            match self.load(feature).await {
                Ok(Some(snapshot)) => snapshots.push(snapshot),
                Ok(None) => {}
                Err(e) => warn!(%feature, error = %e, "skipping unreadable snapshot"),
            }
        }
        snapshots
    }

    pub async fn clear(&self, feature: Feature) -> Result<(), StateError> {
        let path = self.path(feature);
        if path.is_file() {
            async_fs::remove_file(path).await?;
        }
        Ok(())
    }

    fn path(&self, feature: Feature) -> PathBuf {
        self.root.join(format!("{}.json", feature.name()))
    }
}
