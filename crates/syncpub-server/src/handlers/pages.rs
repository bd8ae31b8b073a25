//! HTML pages.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::response::Html;
use syncpub_storage::{DocumentQuery, Storage};

use crate::error::ServerError;
use crate::handlers::existing;
use crate::state::AppState;
use crate::views::{self, Listing};

/// Handle GET /.
pub(crate) async fn index(State(state): State<Arc<AppState>>) -> Html<String> {
    let listing = if state.policy.discoverable {
        Listing::Ids(state.registry.list())
    } else {
        Listing::Count(state.registry.count())
    };
    Html(views::index_page(&listing, &state.policy))
}

/// Handle GET /workspace/{workspace}.
pub(crate) async fn workspace(
    State(state): State<Arc<AppState>>,
    Path(workspace): Path<String>,
) -> Result<Html<String>, ServerError> {
    let storage = existing(&state, &workspace).await?;
    let docs = storage.documents(&DocumentQuery::default()).await?;
    Ok(Html(views::workspace_page(storage.workspace(), &docs)))
}
