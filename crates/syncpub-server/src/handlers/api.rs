//! Sync API.
//!
//! Reads never create workspaces. Pushes may create the workspace when the
//! policy allows it.

use std::sync::Arc;

use axum::Json;
use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use serde::{Deserialize, Serialize};
use syncpub_storage::{Document, DocumentQuery, Storage};

use crate::error::ServerError;
use crate::handlers::{existing, parse_workspace};
use crate::state::AppState;

/// Query parameters for GET /api/{workspace}/documents.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct DocumentsParams {
    /// Include superseded revisions (default `true`).
    history: Option<bool>,
    /// Only documents at this exact path.
    path: Option<String>,
}

/// Response for POST /api/{workspace}/documents.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub(crate) struct IngestResponse {
    pub(crate) num_ingested: usize,
    pub(crate) num_ignored: usize,
    pub(crate) num_total: usize,
}

/// Handle GET /api/{workspace}/paths.
pub(crate) async fn get_paths(
    State(state): State<Arc<AppState>>,
    Path(workspace): Path<String>,
) -> Result<Json<Vec<String>>, ServerError> {
    let storage = existing(&state, &workspace).await?;
    Ok(Json(storage.paths().await?))
}

/// Handle GET /api/{workspace}/documents.
pub(crate) async fn get_documents(
    State(state): State<Arc<AppState>>,
    Path(workspace): Path<String>,
    Query(params): Query<DocumentsParams>,
) -> Result<Json<Vec<Document>>, ServerError> {
    let storage = existing(&state, &workspace).await?;
    let query = DocumentQuery {
        path: params.path,
        include_history: params.history.unwrap_or(true),
    };
    Ok(Json(storage.documents(&query).await?))
}

/// Handle POST /api/{workspace}/documents.
///
/// Readonly pubs never reach this handler. The body must be a JSON array;
/// its `Content-Type` is not checked.
/// Elements are ingested one at a time in request order. Anything that does
/// not deserialize as a document, fails validation, or loses the conflict
/// rule counts as ignored.
pub(crate) async fn post_documents(
    State(state): State<Arc<AppState>>,
    Path(workspace): Path<String>,
    body: Bytes,
) -> Result<Json<IngestResponse>, ServerError> {
    let id = parse_workspace(&workspace)?;
    let candidates: Vec<serde_json::Value> = serde_json::from_slice(&body)
        .map_err(|e| ServerError::BadRequest(format!("expected a JSON array of documents: {e}")))?;

    let storage = state
        .registry
        .obtain(&id, state.policy.creates_on_push())
        .await
        .ok_or(ServerError::NotFound)?;

    let num_total = candidates.len();
    let mut num_ingested = 0;
    for candidate in candidates {
        let Ok(doc) = serde_json::from_value::<Document>(candidate) else {
            continue;
        };
        match storage.ingest(&doc).await {
            Ok(outcome) if outcome.is_accepted() => num_ingested += 1,
            Ok(outcome) => tracing::trace!(path = %doc.path, ?outcome, "Document not ingested"),
            Err(err) => tracing::warn!(kind = ?err.kind, "Storage failure during ingest"),
        }
    }

    tracing::debug!(num_ingested, num_total, "Ingest request complete");
    tracing::trace!(workspace = %id, num_ingested, num_total, "Ingest request complete");
    Ok(Json(IngestResponse {
        num_ingested,
        num_ignored: num_total - num_ingested,
        num_total,
    }))
}
