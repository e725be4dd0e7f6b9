use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::filesystem::{self, FilesystemError, WriteOptions};
use crate::node::{observe_ids, Node, NodeStore};
use crate::project::{Project, Workspace};

/// Persisted form of a workspace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    /// Pack metadata.
    pub project: Project,
    /// The node store in array form.
    pub files: Vec<Node>,
    /// When the snapshot was taken.
    pub saved_at: DateTime<Utc>,
}

impl Snapshot {
    /// Copies the workspace into a snapshot stamped with the current time.
    pub fn capture(workspace: &Workspace) -> Self {
        Self {
            project: workspace.project.clone(),
            files: workspace.store.to_vec(),
            saved_at: Utc::now(),
        }
    }

    /// Rebuilds the workspace. Fresh ids issued afterwards will not collide
    /// with the loaded ones.
    pub fn into_workspace(self) -> Workspace {
        observe_ids(self.files.iter().map(|node| &node.id));
        Workspace {
            project: self.project,
            store: NodeStore::from_nodes(self.files),
        }
    }
}

/// Represents errors that can occur while loading or saving snapshots.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Reading or writing the snapshot file failed.
    #[error(transparent)]
    Filesystem(#[from] FilesystemError),
    /// The file is not a valid snapshot document.
    #[error("invalid snapshot: {0}")]
    Invalid(#[from] serde_json::Error),
}

/// Single-slot snapshot storage backed by a JSON file.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    path: PathBuf,
}

impl SnapshotStore {
    /// Creates a store backed by the file at `path`. Nothing is read yet.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the stored snapshot, or `Ok(None)` if nothing was saved yet.
    pub fn load(&self) -> Result<Option<Snapshot>, StorageError> {
        match filesystem::read_if_exists(&self.path)? {
            Some(content) => Ok(Some(serde_json::from_str(&content)?)),
            None => Ok(None),
        }
    }

    /// Writes the workspace, replacing any earlier snapshot.
    pub fn save(&self, workspace: &Workspace) -> Result<Snapshot, StorageError> {
        let snapshot = Snapshot::capture(workspace);
        let payload = serde_json::to_vec_pretty(&snapshot)?;
        filesystem::write_atomic(&self.path, &payload, WriteOptions::default())?;
        info!(path = %self.path.display(), nodes = snapshot.files.len(), "saved snapshot");
        Ok(snapshot)
    }

    /// Deletes the stored snapshot.
    pub fn clear(&self) -> Result<(), StorageError> {
        filesystem::remove_if_exists(&self.path)?;
        Ok(())
    }
}

/// Saves the workspace, logging instead of failing.
pub fn persist_best_effort(store: &SnapshotStore, workspace: &Workspace) {
    if let Err(err) = store.save(workspace) {
        warn!(path = %store.path().display(), error = %err, "failed to persist snapshot");
    }
}

/// Spawns the autosave task.
///
/// After each change the task waits until no further change has arrived for
/// `debounce`, then persists the latest workspace. Intermediate states are
/// never written. When every sender is gone the task saves any unsaved state
/// and exits.
pub fn spawn_autosave(
    store: SnapshotStore,
    mut changes: watch::Receiver<Workspace>,
    debounce: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while changes.changed().await.is_ok() {
            let mut open = true;
            loop {
                tokio::select! {
                    changed = changes.changed() => {
                        if changed.is_err() {
                            open = false;
                            break;
                        }
                    }
                    _ = tokio::time::sleep(debounce) => break,
                }
            }

            let workspace = changes.borrow_and_update().clone();
            let target = store.clone();
            let saved =
                tokio::task::spawn_blocking(move || persist_best_effort(&target, &workspace)).await;
            if let Err(err) = saved {
                warn!(error = %err, "autosave task panicked");
            }
            if !open {
                break;
            }
        }
        debug!("autosave stopped");
    })
}
