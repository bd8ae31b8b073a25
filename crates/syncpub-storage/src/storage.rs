//! Storage trait and error types.
//!
//! Provides the core [`Storage`] trait that every workspace backend
//! implements, along with [`StorageError`] for unified error handling across
//! backends and [`IngestOutcome`] for per-document write results.

use std::future::Future;
use std::path::PathBuf;

use crate::address::WorkspaceId;
use crate::document::{Document, DocumentQuery};
use crate::validate::ValidationError;

/// Result of offering one document to a backend.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum IngestOutcome {
    /// The document was stored and is now the current revision for its
    /// path and author.
    Accepted,
    /// The document was valid but did not advance state (duplicate, older
    /// than the stored revision, or already expired).
    Ignored,
    /// The document failed validation.
    Invalid(ValidationError),
}

impl IngestOutcome {
    /// Whether the backend state advanced.
    #[must_use]
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted)
    }
}

/// Semantic error categories.
#[derive(Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum StorageErrorKind {
    /// Backing store does not exist.
    NotFound,
    /// Permission denied.
    PermissionDenied,
    /// Backing store belongs to a different workspace.
    WorkspaceMismatch,
    /// Backing store content could not be decoded.
    Corrupt,
    /// Backend is temporarily unavailable.
    Unavailable,
    /// Other/unknown error category.
    Other,
}

/// Storage error with semantic kind and backend-specific source.
#[derive(Debug)]
pub struct StorageError {
    /// Semantic error category.
    pub kind: StorageErrorKind,
    /// Path context (if applicable).
    pub path: Option<PathBuf>,
    /// Backend identifier (e.g., "Memory", "Sqlite").
    pub backend: Option<&'static str>,
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl StorageError {
    /// Create a new storage error.
    #[must_use]
    pub fn new(kind: StorageErrorKind) -> Self {
        Self {
            kind,
            path: None,
            backend: None,
            source: None,
        }
    }

    /// Attach path context.
    #[must_use]
    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Attach backend identifier.
    #[must_use]
    pub fn with_backend(mut self, backend: &'static str) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Attach the underlying error source.
    #[must_use]
    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Downcast the source error to a concrete type.
    #[must_use]
    pub fn downcast_source<E: std::error::Error + 'static>(&self) -> Option<&E> {
        self.source.as_ref()?.downcast_ref()
    }
}

impl std::fmt::Display for StorageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Format: "[Backend] Kind: message (path: /foo/bar)"
        if let Some(backend) = self.backend {
            write!(f, "[{backend}] ")?;
        }

        let kind_str = match self.kind {
            StorageErrorKind::NotFound => "Not found",
            StorageErrorKind::PermissionDenied => "Permission denied",
            StorageErrorKind::WorkspaceMismatch => "Workspace mismatch",
            StorageErrorKind::Corrupt => "Corrupt",
            StorageErrorKind::Unavailable => "Unavailable",
            StorageErrorKind::Other => "Error",
        };

        write!(f, "{kind_str}")?;

        if let Some(source) = &self.source {
            write!(f, ": {source}")?;
        }

        if let Some(path) = &self.path {
            write!(f, " (path: {})", path.display())?;
        }

        Ok(())
    }
}

impl std::error::Error for StorageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|s| s.as_ref() as &(dyn std::error::Error + 'static))
    }
}

/// Append-only document container for exactly one workspace.
///
/// Implementations own the conflict rule: each [`ingest`](Storage::ingest)
/// call must be atomic with respect to it, so concurrent ingests to the same
/// workspace never lose a winning revision.
///
/// Volatile backends complete every call without suspending; persistent
/// backends suspend on I/O.
pub trait Storage: Send + Sync {
    /// The workspace this backend holds.
    fn workspace(&self) -> &WorkspaceId;

    /// Sorted, distinct paths that hold at least one live document.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the backend cannot be read.
    fn paths(&self) -> impl Future<Output = Result<Vec<String>, StorageError>> + Send;

    /// Documents matching `query`, sorted by path then newest first.
    ///
    /// Expired ephemeral documents are never returned.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the backend cannot be read.
    fn documents(
        &self,
        query: &DocumentQuery,
    ) -> impl Future<Output = Result<Vec<Document>, StorageError>> + Send;

    /// Offer one document.
    ///
    /// Validation failures and stale revisions are reported through
    /// [`IngestOutcome`], not as errors.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] only if the backend itself fails.
    fn ingest(
        &self,
        doc: &Document,
    ) -> impl Future<Output = Result<IngestOutcome, StorageError>> + Send;
}
