//! Workspace registry.
//!
//! The registry is the only shared mutable structure in the gateway. Each
//! entry is a creation slot: the first caller to ask for an unknown workspace
//! runs the factory inside the slot, and concurrent callers for the same id
//! wait on that slot instead of building a second backend.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

use syncpub_storage::WorkspaceId;
use tokio::sync::OnceCell;

use crate::codec;
use crate::factory::{Backend, StorageFactory};
use crate::policy::BackendKind;

type Slot = Arc<OnceCell<Arc<Backend>>>;

/// Error raised by the startup scan.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// The storage root could not be listed.
    #[error("cannot read storage directory {}: {source}", path.display())]
    ReadDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Process-lifetime table of workspace id -> backend.
#[derive(Debug)]
pub struct WorkspaceRegistry {
    factory: StorageFactory,
    slots: RwLock<HashMap<WorkspaceId, Slot>>,
}

impl WorkspaceRegistry {
    /// Create an empty registry that builds backends with `factory`.
    #[must_use]
    pub fn new(factory: StorageFactory) -> Self {
        Self {
            factory,
            slots: RwLock::new(HashMap::new()),
        }
    }

    /// Factory used for on-demand creation.
    #[must_use]
    pub fn factory(&self) -> &StorageFactory {
        &self.factory
    }

    /// Look up a workspace, optionally creating it.
    ///
    /// Returns `None` when the workspace is absent and `create_if_absent` is
    /// false, or when creation fails. Creation failures are logged but never
    /// propagated: callers cannot tell "never existed" from "failed to
    /// create".
    pub async fn obtain(&self, id: &WorkspaceId, create_if_absent: bool) -> Option<Arc<Backend>> {
        tracing::trace!(workspace = %id, create_if_absent, "Obtaining workspace");
        if let Some(backend) = self.get(id) {
            return Some(backend);
        }
        if !create_if_absent {
            return None;
        }

        let slot = self.slot(id);
        let created = slot
            .get_or_try_init(|| async {
                let backend = self.factory.create(id).await?;
                tracing::debug!(kind = ?backend.kind(), "Created workspace");
                tracing::trace!(workspace = %id, "Created workspace");
                Ok::<_, syncpub_storage::StorageError>(Arc::new(backend))
            })
            .await;

        match created {
            Ok(backend) => Some(Arc::clone(backend)),
            Err(err) => {
                tracing::debug!(kind = ?err.kind, "Workspace creation failed");
                tracing::trace!(workspace = %id, error = %err, "Workspace creation failed");
                self.discard_empty(id, &slot);
                None
            }
        }
    }

    /// Live backend for `id`, if any.
    #[must_use]
    pub fn get(&self, id: &WorkspaceId) -> Option<Arc<Backend>> {
        let slots = self.slots.read().unwrap_or_else(PoisonError::into_inner);
        slots.get(id).and_then(|slot| slot.get().cloned())
    }

    /// All live workspace ids in ascending lexical order.
    #[must_use]
    pub fn list(&self) -> Vec<WorkspaceId> {
        let slots = self.slots.read().unwrap_or_else(PoisonError::into_inner);
        let mut ids: Vec<WorkspaceId> = slots
            .iter()
            .filter(|(_, slot)| slot.initialized())
            .map(|(id, _)| id.clone())
            .collect();
        drop(slots);
        ids.sort();
        ids
    }

    /// Number of live workspaces.
    #[must_use]
    pub fn count(&self) -> usize {
        let slots = self.slots.read().unwrap_or_else(PoisonError::into_inner);
        slots.values().filter(|slot| slot.initialized()).count()
    }

    /// Drop a workspace from the registry.
    ///
    /// Persisted backing files are left in place, so a later scan or push can
    /// bring the workspace back. Removing an absent id is a no-op. Returns
    /// whether an entry was removed.
    pub fn remove(&self, id: &WorkspaceId) -> bool {
        let removed = self
            .slots
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(id)
            .is_some();
        tracing::trace!(workspace = %id, removed, "Removed workspace");
        removed
    }

    /// Populate the registry from backing files in the storage root.
    ///
    /// Runs once at startup, before serving. A file that fails to decode or
    /// open is logged and skipped. Does nothing in volatile mode. Returns the
    /// number of workspaces loaded.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::ReadDir`] if the storage root cannot be listed.
    pub async fn bootstrap_from_disk(&self) -> Result<usize, RegistryError> {
        if self.factory.kind() != BackendKind::Persistent {
            return Ok(0);
        }
        let root = self.factory.root();
        tracing::debug!("Loading existing workspace files");

        let mut loaded = 0;
        for filename in workspace_files(root)? {
            let id = match codec::decode(&filename) {
                Ok(id) => id,
                Err(err) => {
                    tracing::warn!(error = %err, "Skipping file with undecodable name");
                    tracing::trace!(file = %filename, "Skipped file");
                    continue;
                }
            };
            tracing::trace!(file = %filename, workspace = %id, "Loading workspace file");

            match self.factory.create(&id).await {
                Ok(backend) => {
                    self.install(id, backend);
                    loaded += 1;
                }
                Err(err) => {
                    tracing::warn!(kind = ?err.kind, "Skipping workspace file that failed to open");
                    tracing::trace!(file = %filename, error = %err, "Skipped file");
                }
            }
        }

        tracing::info!(count = loaded, "Loaded workspaces from disk");
        Ok(loaded)
    }

    /// Close every live backend.
    pub async fn close_all(&self) {
        let backends: Vec<Arc<Backend>> = {
            let slots = self.slots.read().unwrap_or_else(PoisonError::into_inner);
            slots.values().filter_map(|slot| slot.get().cloned()).collect()
        };
        for backend in backends {
            backend.close().await;
        }
    }

    /// Slot for `id`, inserting an empty one if absent.
    fn slot(&self, id: &WorkspaceId) -> Slot {
        let mut slots = self.slots.write().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(slots.entry(id.clone()).or_default())
    }

    /// Insert a ready backend unless the id is already live.
    fn install(&self, id: WorkspaceId, backend: Backend) {
        let mut slots = self.slots.write().unwrap_or_else(PoisonError::into_inner);
        let slot = slots.entry(id).or_default();
        if slot.set(Arc::new(backend)).is_err() {
            tracing::debug!("Workspace already loaded, keeping existing backend");
        }
    }

    /// Remove `slot` from the table if it is still the entry for `id` and
    /// never got initialised.
    fn discard_empty(&self, id: &WorkspaceId, slot: &Slot) {
        let mut slots = self.slots.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(current) = slots.get(id)
            && Arc::ptr_eq(current, slot)
            && !current.initialized()
        {
            slots.remove(id);
        }
    }
}

/// Backing-file names in `root`, sorted.
fn workspace_files(root: &Path) -> Result<Vec<String>, RegistryError> {
    let read_dir_error = |source| RegistryError::ReadDir {
        path: root.to_path_buf(),
        source,
    };
    let mut names = Vec::new();
    for entry in std::fs::read_dir(root).map_err(read_dir_error)? {
        let entry = entry.map_err(read_dir_error)?;
        if !entry.file_type().is_ok_and(|t| t.is_file()) {
            continue;
        }
        let Ok(name) = entry.file_name().into_string() else {
            continue;
        };
        if Path::new(&name)
            .extension()
            .is_some_and(|ext| ext == codec::FILE_EXTENSION)
        {
            names.push(name);
        }
    }
    names.sort();
    Ok(names)
}
