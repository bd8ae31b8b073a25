//! Structural document validation.
//!
//! Every backend runs [`check_document`] before applying its conflict rule.
//! Cryptographic signature verification is not performed here; only the shape
//! of the signature is checked.

use crate::address::{AddressError, WorkspaceId, check_author, check_path};
use crate::document::{DOCUMENT_FORMAT, Document, content_hash};

/// Timestamps below this are considered nonsense (roughly 1970-04-26 in microseconds).
pub const MIN_TIMESTAMP: i64 = 10_000_000_000_000;

/// How far into the future a timestamp may be, in microseconds (10 minutes).
pub const FUTURE_CUTOFF: i64 = 10 * 60 * 1_000_000;

/// Reason a document failed validation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("unsupported format {0:?}")]
    Format(String),
    #[error("document belongs to a different workspace")]
    WrongWorkspace,
    #[error(transparent)]
    Address(#[from] AddressError),
    #[error("content hash does not match content")]
    ContentHash,
    #[error("timestamp out of range")]
    Timestamp,
    #[error("ephemeral paths ('!') and deleteAfter must appear together")]
    Ephemeral,
    #[error("deleteAfter must be later than timestamp")]
    DeleteAfter,
    #[error("path is owned by another author")]
    NotOwner,
    #[error("malformed signature")]
    Signature,
}

/// Validate a document against the workspace it is being written to.
///
/// `now` is the current time in microseconds.
///
/// # Errors
///
/// Returns the first [`ValidationError`] encountered.
pub fn check_document(
    doc: &Document,
    workspace: &WorkspaceId,
    now: i64,
) -> Result<(), ValidationError> {
    if doc.format != DOCUMENT_FORMAT {
        return Err(ValidationError::Format(doc.format.clone()));
    }
    if doc.workspace != workspace.as_str() {
        return Err(ValidationError::WrongWorkspace);
    }
    check_author(&doc.author)?;
    check_path(&doc.path)?;

    if doc.timestamp < MIN_TIMESTAMP || doc.timestamp > now.saturating_add(FUTURE_CUTOFF) {
        return Err(ValidationError::Timestamp);
    }
    if doc.path.contains('!') != doc.delete_after.is_some() {
        return Err(ValidationError::Ephemeral);
    }
    if doc.delete_after.is_some_and(|t| t <= doc.timestamp) {
        return Err(ValidationError::DeleteAfter);
    }
    // Paths containing '~' may only be written by an author named in them.
    if doc.path.contains('~') && !doc.path.contains(&format!("~{}", doc.author)) {
        return Err(ValidationError::NotOwner);
    }
    if doc.content_hash != content_hash(&doc.content) {
        return Err(ValidationError::ContentHash);
    }
    check_signature(&doc.signature)
}

fn check_signature(signature: &str) -> Result<(), ValidationError> {
    let mut chars = signature.chars();
    let well_formed = chars.next() == Some('b')
        && signature.len() > 1
        && chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit());
    if well_formed {
        Ok(())
    } else {
        Err(ValidationError::Signature)
    }
}
