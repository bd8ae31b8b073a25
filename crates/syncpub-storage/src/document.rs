//! Document model and conflict rule.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::address::WorkspaceId;

/// The only document format this engine accepts.
pub const DOCUMENT_FORMAT: &str = "es.4";

/// Current time in microseconds since the Unix epoch.
#[must_use]
pub fn now_micros() -> i64 {
    chrono::Utc::now().timestamp_micros()
}

/// One revision of one path, written by one author.
///
/// Serialized in camelCase, which is the shape peers exchange over the sync
/// API. `deleteAfter` is always present in the output (as `null` for
/// permanent documents) but may be omitted on input.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub format: String,
    pub workspace: String,
    pub path: String,
    pub content_hash: String,
    pub content: String,
    pub author: String,
    /// Microseconds since the Unix epoch.
    pub timestamp: i64,
    /// Expiry in microseconds for ephemeral documents.
    #[serde(default)]
    pub delete_after: Option<i64>,
    pub signature: String,
}

impl Document {
    /// Build a document with its content hash and digest signature filled in.
    ///
    /// The signature is a SHA-256 digest over the other fields. It satisfies
    /// the structural validator but is not a cryptographic author signature.
    #[must_use]
    pub fn compose(
        workspace: &WorkspaceId,
        author: &str,
        path: &str,
        content: &str,
        timestamp: i64,
    ) -> Self {
        let mut doc = Self {
            format: DOCUMENT_FORMAT.to_owned(),
            workspace: workspace.as_str().to_owned(),
            path: path.to_owned(),
            content_hash: content_hash(content),
            content: content.to_owned(),
            author: author.to_owned(),
            timestamp,
            delete_after: None,
            signature: String::new(),
        };
        doc.signature = doc.digest_signature();
        doc
    }

    /// Set an expiry and recompute the digest signature.
    #[must_use]
    pub fn with_delete_after(mut self, delete_after: i64) -> Self {
        self.delete_after = Some(delete_after);
        self.signature = self.digest_signature();
        self
    }

    fn digest_signature(&self) -> String {
        let mut hasher = Sha256::new();
        for field in [
            self.format.as_str(),
            self.workspace.as_str(),
            self.path.as_str(),
            self.content_hash.as_str(),
            self.author.as_str(),
        ] {
            hasher.update(field.as_bytes());
            hasher.update(b"\n");
        }
        hasher.update(self.timestamp.to_le_bytes());
        if let Some(delete_after) = self.delete_after {
            hasher.update(delete_after.to_le_bytes());
        }
        format!("b{}", hex::encode(hasher.finalize()))
    }

    /// Whether an ephemeral document has passed its `deleteAfter` time.
    #[must_use]
    pub fn is_expired(&self, now: i64) -> bool {
        self.delete_after.is_some_and(|t| t <= now)
    }

    /// Whether this revision wins over `other` for the same path and author.
    ///
    /// Newer timestamps win; equal timestamps fall back to the greater
    /// signature so every replica picks the same winner.
    #[must_use]
    pub fn supersedes(&self, other: &Document) -> bool {
        (self.timestamp, self.signature.as_str()) > (other.timestamp, other.signature.as_str())
    }

    /// Ordering key: path ascending, then newest first.
    fn history_cmp(&self, other: &Document) -> Ordering {
        self.path
            .cmp(&other.path)
            .then_with(|| other.timestamp.cmp(&self.timestamp))
            .then_with(|| other.signature.cmp(&self.signature))
    }
}

/// Lowercase hex SHA-256 of the document content.
#[must_use]
pub fn content_hash(content: &str) -> String {
    hex::encode(Sha256::digest(content.as_bytes()))
}

/// Sort documents by path, newest revision first within each path.
pub fn sort_newest_first(docs: &mut [Document]) {
    docs.sort_by(Document::history_cmp);
}

/// Filter for document listings.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DocumentQuery {
    /// Only return documents at this exact path.
    pub path: Option<String>,
    /// Return every author's revision instead of only the winner per path.
    pub include_history: bool,
}

impl DocumentQuery {
    /// Every revision at every path.
    #[must_use]
    pub fn history() -> Self {
        Self {
            path: None,
            include_history: true,
        }
    }

    /// Whether a document passes the path filter.
    #[must_use]
    pub fn matches(&self, doc: &Document) -> bool {
        self.path.as_deref().is_none_or(|p| p == doc.path)
    }
}

/// Keep only the winning revision per path.
///
/// Expects `docs` sorted with [`sort_newest_first`].
pub fn latest_per_path(docs: Vec<Document>) -> Vec<Document> {
    let mut out: Vec<Document> = Vec::new();
    for doc in docs {
        if out.last().is_none_or(|last| last.path != doc.path) {
            out.push(doc);
        }
    }
    out
}
