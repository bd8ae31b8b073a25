//! Administrative endpoints.
//!
//! Both answer `303 See Other` back to the index page so they can be driven
//! from plain HTML forms.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::response::Redirect;
use syncpub_registry::demo;
use syncpub_storage::WorkspaceId;

use crate::state::AppState;

/// Handle POST /api/{workspace}/delete.
///
/// Drops the registry entry only; backing files stay on disk.
pub(crate) async fn delete_workspace(
    State(state): State<Arc<AppState>>,
    Path(workspace): Path<String>,
) -> Redirect {
    if let Ok(id) = WorkspaceId::parse(&workspace) {
        state.registry.remove(&id);
    }
    Redirect::to("/")
}

/// Handle POST /demo-hack/create-demo-workspace.
pub(crate) async fn create_demo_workspace(State(state): State<Arc<AppState>>) -> Redirect {
    if demo::create_demo_workspace(&state.registry).await.is_none() {
        tracing::warn!("Demo workspace could not be created");
    }
    Redirect::to("/")
}
