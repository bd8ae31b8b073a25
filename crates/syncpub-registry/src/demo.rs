//! The well-known demo workspace.
//!
//! A fresh gateway has nothing to sync. Seeding `+gardening.pals` with an
//! author profile and one wiki page gives new peers something to pull.

use std::sync::Arc;

use percent_encoding::{NON_ALPHANUMERIC, utf8_percent_encode};
use syncpub_storage::{Document, Storage, StorageError, WorkspaceId, now_micros};

use crate::factory::Backend;
use crate::registry::WorkspaceRegistry;

/// Id of the demo workspace.
pub const DEMO_WORKSPACE: &str = "+gardening.pals";

/// Author of the seeded documents.
pub const DEMO_AUTHOR: &str = "@bird.btr46n7ij6eq6hwnpvfcdakxqy3e6vz4e5vmw33ur7tjey5dkx6ea";

const DISPLAY_NAME: &str = "Bird, the example author";
const PAGE_TITLE: &str = "A page from the pub";
const PAGE_TEXT: &str = "This page was created on the pub as part of the example \
    +gardening.pals workspace, so there would be some pages to sync around.";

/// Parsed demo workspace id.
#[must_use]
pub fn demo_workspace() -> WorkspaceId {
    WorkspaceId::parse(DEMO_WORKSPACE).expect("demo workspace id is valid")
}

/// Path of the demo author's profile document.
#[must_use]
pub fn profile_path() -> String {
    format!("/about/~{DEMO_AUTHOR}/profile.json")
}

/// Path of the demo wiki page.
#[must_use]
pub fn wiki_path() -> String {
    format!(
        "/wiki/shared/{}.md",
        utf8_percent_encode(PAGE_TITLE, NON_ALPHANUMERIC)
    )
}

/// Write the demo documents into `storage`.
///
/// Documents are composed with the current time, so re-seeding replaces the
/// earlier revisions. Returns the number of documents accepted.
///
/// # Errors
///
/// Returns [`StorageError`] if the backend fails.
pub async fn seed_demo(storage: &impl Storage) -> Result<usize, StorageError> {
    let workspace = storage.workspace().clone();
    let now = now_micros();
    let profile = serde_json::json!({ "displayName": DISPLAY_NAME }).to_string();
    let docs = [
        Document::compose(&workspace, DEMO_AUTHOR, &profile_path(), &profile, now),
        Document::compose(&workspace, DEMO_AUTHOR, &wiki_path(), PAGE_TEXT, now),
    ];

    let mut accepted = 0;
    for doc in &docs {
        let outcome = storage.ingest(doc).await?;
        if outcome.is_accepted() {
            accepted += 1;
        } else {
            tracing::debug!(path = %doc.path, ?outcome, "Demo document not accepted");
        }
    }
    tracing::debug!(accepted, "Seeded demo workspace");
    Ok(accepted)
}

/// Obtain (creating if needed) and seed the demo workspace.
///
/// Returns `None` if the workspace could not be created or seeding failed.
pub async fn create_demo_workspace(registry: &WorkspaceRegistry) -> Option<Arc<Backend>> {
    let backend = registry.obtain(&demo_workspace(), true).await?;
    match seed_demo(backend.as_ref()).await {
        Ok(_) => Some(backend),
        Err(err) => {
            tracing::warn!(kind = ?err.kind, "Failed to seed demo workspace");
            None
        }
    }
}
