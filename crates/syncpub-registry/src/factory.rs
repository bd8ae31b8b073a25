//! Storage factory.
//!
//! [`StorageFactory::create`] is the only place that chooses between the
//! volatile and persistent engines; everything downstream sees a [`Backend`]
//! through the [`Storage`] trait.

use std::path::{Path, PathBuf};

use syncpub_storage::{
    Document, DocumentQuery, IngestOutcome, MemoryStorage, Storage, StorageError, WorkspaceId,
};
use syncpub_storage_sqlite::SqliteStorage;

use crate::codec;
use crate::policy::{BackendKind, Policy};

/// A live workspace backend.
#[derive(Debug)]
pub enum Backend {
    /// In-memory storage.
    Volatile(MemoryStorage),
    /// SQLite file storage.
    Persistent(SqliteStorage),
}

impl Backend {
    /// Which engine this backend uses.
    #[must_use]
    pub fn kind(&self) -> BackendKind {
        match self {
            Self::Volatile(_) => BackendKind::Volatile,
            Self::Persistent(_) => BackendKind::Persistent,
        }
    }

    /// Release resources held by the backend.
    pub async fn close(&self) {
        if let Self::Persistent(storage) = self {
            storage.close().await;
        }
    }
}

impl Storage for Backend {
    fn workspace(&self) -> &WorkspaceId {
        match self {
            Self::Volatile(s) => s.workspace(),
            Self::Persistent(s) => s.workspace(),
        }
    }

    async fn paths(&self) -> Result<Vec<String>, StorageError> {
        match self {
            Self::Volatile(s) => s.paths().await,
            Self::Persistent(s) => s.paths().await,
        }
    }

    async fn documents(&self, query: &DocumentQuery) -> Result<Vec<Document>, StorageError> {
        match self {
            Self::Volatile(s) => s.documents(query).await,
            Self::Persistent(s) => s.documents(query).await,
        }
    }

    async fn ingest(&self, doc: &Document) -> Result<IngestOutcome, StorageError> {
        match self {
            Self::Volatile(s) => s.ingest(doc).await,
            Self::Persistent(s) => s.ingest(doc).await,
        }
    }
}

/// Builds backends of one kind.
///
/// The factory never touches the registry and never creates directories:
/// in persistent mode the storage root must already exist.
#[derive(Clone, Debug)]
pub struct StorageFactory {
    kind: BackendKind,
    root: PathBuf,
}

impl StorageFactory {
    /// Create a factory for `kind`, storing files under `root`.
    #[must_use]
    pub fn new(kind: BackendKind, root: impl Into<PathBuf>) -> Self {
        Self {
            kind,
            root: root.into(),
        }
    }

    /// Create a factory from the process policy.
    #[must_use]
    pub fn from_policy(policy: &Policy) -> Self {
        Self::new(policy.backend, policy.storage_root.clone())
    }

    /// Engine used for new backends.
    #[must_use]
    pub fn kind(&self) -> BackendKind {
        self.kind
    }

    /// Storage root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Build a backend for `id`.
    ///
    /// Persistent backends open the codec-derived file under the root,
    /// creating it if missing.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the backing file cannot be opened or
    /// belongs to a different workspace.
    pub async fn create(&self, id: &WorkspaceId) -> Result<Backend, StorageError> {
        match self.kind {
            BackendKind::Volatile => Ok(Backend::Volatile(MemoryStorage::new(id.clone()))),
            BackendKind::Persistent => {
                let filename = codec::path_in(&self.root, id);
                let storage = SqliteStorage::open(id.clone(), filename).await?;
                Ok(Backend::Persistent(storage))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id() -> WorkspaceId {
        WorkspaceId::parse("+test.a").unwrap()
    }

    #[tokio::test]
    async fn test_volatile_create() {
        let factory = StorageFactory::new(BackendKind::Volatile, "/nonexistent");
        let backend = factory.create(&id()).await.unwrap();

        assert_eq!(backend.kind(), BackendKind::Volatile);
        assert_eq!(backend.workspace(), &id());
    }

    #[tokio::test]
    async fn test_persistent_create_writes_encoded_file() {
        let dir = tempfile::tempdir().unwrap();
        let factory = StorageFactory::new(BackendKind::Persistent, dir.path());
        let backend = factory.create(&id()).await.unwrap();

        assert_eq!(backend.kind(), BackendKind::Persistent);
        assert!(dir.path().join("test.a.sqlite").exists());
        backend.close().await;
    }

    #[tokio::test]
    async fn test_persistent_create_requires_root() {
        let dir = tempfile::tempdir().unwrap();
        let factory = StorageFactory::new(BackendKind::Persistent, dir.path().join("missing"));

        assert!(factory.create(&id()).await.is_err());
    }

    #[test]
    fn test_from_policy() {
        let policy = Policy {
            backend: BackendKind::Persistent,
            storage_root: PathBuf::from("/data"),
            ..Policy::default()
        };
        let factory = StorageFactory::from_policy(&policy);

        assert_eq!(factory.kind(), BackendKind::Persistent);
        assert_eq!(factory.root(), Path::new("/data"));
    }
}
