//! Volatile in-memory storage.
//!
//! Provides [`MemoryStorage`], which keeps every workspace document in a
//! process-local map and never suspends.

use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock};

use crate::address::WorkspaceId;
use crate::document::{Document, DocumentQuery, latest_per_path, now_micros, sort_newest_first};
use crate::storage::{IngestOutcome, Storage, StorageError};
use crate::validate::check_document;

/// Path -> author -> current revision by that author.
type DocMap = BTreeMap<String, BTreeMap<String, Document>>;

/// In-memory storage for one workspace.
///
/// Contents are lost when the process exits.
///
/// # Example
///
/// ```ignore
/// use syncpub_storage::{MemoryStorage, Storage, WorkspaceId};
///
/// let storage = MemoryStorage::new(WorkspaceId::parse("+test.a")?);
/// assert!(storage.paths().await?.is_empty());
/// ```
#[derive(Debug)]
pub struct MemoryStorage {
    workspace: WorkspaceId,
    docs: RwLock<DocMap>,
}

impl MemoryStorage {
    /// Create an empty storage for `workspace`.
    #[must_use]
    pub fn new(workspace: WorkspaceId) -> Self {
        Self {
            workspace,
            docs: RwLock::new(BTreeMap::new()),
        }
    }

    /// Number of stored revisions, including expired ones not yet dropped.
    #[must_use]
    pub fn len(&self) -> usize {
        let docs = self.docs.read().unwrap_or_else(PoisonError::into_inner);
        docs.values().map(BTreeMap::len).sum()
    }

    /// Whether no revisions are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn live_documents(&self, query: &DocumentQuery, now: i64) -> Vec<Document> {
        let docs = self.docs.read().unwrap_or_else(PoisonError::into_inner);
        let mut out: Vec<Document> = docs
            .values()
            .flat_map(BTreeMap::values)
            .filter(|doc| query.matches(doc) && !doc.is_expired(now))
            .cloned()
            .collect();
        drop(docs);
        sort_newest_first(&mut out);
        out
    }
}

impl Storage for MemoryStorage {
    fn workspace(&self) -> &WorkspaceId {
        &self.workspace
    }

    async fn paths(&self) -> Result<Vec<String>, StorageError> {
        let docs = self.live_documents(&DocumentQuery::history(), now_micros());
        let mut paths: Vec<String> = docs.into_iter().map(|doc| doc.path).collect();
        paths.dedup();
        Ok(paths)
    }

    async fn documents(&self, query: &DocumentQuery) -> Result<Vec<Document>, StorageError> {
        let docs = self.live_documents(query, now_micros());
        if query.include_history {
            Ok(docs)
        } else {
            Ok(latest_per_path(docs))
        }
    }

    async fn ingest(&self, doc: &Document) -> Result<IngestOutcome, StorageError> {
        let now = now_micros();
        if let Err(err) = check_document(doc, &self.workspace, now) {
            return Ok(IngestOutcome::Invalid(err));
        }
        if doc.is_expired(now) {
            return Ok(IngestOutcome::Ignored);
        }

        let mut docs = self.docs.write().unwrap_or_else(PoisonError::into_inner);
        let by_author = docs.entry(doc.path.clone()).or_default();
        if let Some(existing) = by_author.get(&doc.author)
            && !doc.supersedes(existing)
        {
            return Ok(IngestOutcome::Ignored);
        }
        by_author.insert(doc.author.clone(), doc.clone());
        Ok(IngestOutcome::Accepted)
    }
}
