//! Push gate for readonly pubs.

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::error::ServerError;
use crate::state::AppState;

/// Refuse the request before its body is read when the pub is readonly.
///
/// Runs ahead of every extractor, so the answer is 403 whatever the
/// workspace id, body, or body size.
pub(crate) async fn reject_when_readonly(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    if state.policy.readonly {
        return ServerError::Forbidden.into_response();
    }
    next.run(request).await
}
