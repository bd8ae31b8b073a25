//! HTTP request handlers.

pub(crate) mod admin;
pub(crate) mod api;
pub(crate) mod pages;

use std::sync::Arc;

use syncpub_registry::Backend;
use syncpub_storage::WorkspaceId;

use crate::error::ServerError;
use crate::state::AppState;

/// Parse a workspace id from a path segment.
///
/// Ids that fail the address grammar are indistinguishable from unknown ones.
pub(crate) fn parse_workspace(raw: &str) -> Result<WorkspaceId, ServerError> {
    WorkspaceId::parse(raw).map_err(|err| {
        tracing::trace!(workspace = raw, error = %err, "Rejected workspace id");
        ServerError::NotFound
    })
}

/// Look up an existing workspace without creating it.
pub(crate) async fn existing(state: &AppState, raw: &str) -> Result<Arc<Backend>, ServerError> {
    let id = parse_workspace(raw)?;
    state
        .registry
        .obtain(&id, false)
        .await
        .ok_or(ServerError::NotFound)
}
