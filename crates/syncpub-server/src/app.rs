//! Router construction.
//!
//! Builds the axum router with all routes and middleware.

use std::sync::Arc;

use axum::Router;
use axum::extract::{DefaultBodyLimit, MatchedPath, Request};
use axum::middleware::from_fn_with_state;
use axum::routing::{get, post};
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::Span;

use crate::handlers;
use crate::middleware::{readonly, security};
use crate::state::AppState;

/// Legacy prefix still used by older peers.
const LEGACY_API_PREFIX: &str = "/earthstar-api/v1";

/// Span for one request.
///
/// Records the route template rather than the URI, so workspace ids stay out
/// of every log line emitted while the request is handled.
fn request_span(request: &Request) -> Span {
    let route = request
        .extensions()
        .get::<MatchedPath>()
        .map_or("unmatched", MatchedPath::as_str);
    tracing::debug_span!("request", method = %request.method(), route)
}

/// Create the application router.
pub(crate) fn create_router(state: Arc<AppState>, max_body_bytes: usize) -> Router {
    let readonly_gate = from_fn_with_state(Arc::clone(&state), readonly::reject_when_readonly);

    let api_routes = Router::new()
        .route("/{workspace}/paths", get(handlers::api::get_paths))
        .route("/{workspace}/documents", get(handlers::api::get_documents))
        .route(
            "/{workspace}/documents",
            post(handlers::api::post_documents).route_layer(readonly_gate),
        )
        .route("/{workspace}/delete", post(handlers::admin::delete_workspace));

    Router::new()
        .route("/", get(handlers::pages::index))
        .route("/workspace/{workspace}", get(handlers::pages::workspace))
        .route(
            "/demo-hack/create-demo-workspace",
            post(handlers::admin::create_demo_workspace),
        )
        .nest("/api", api_routes.clone())
        .nest(LEGACY_API_PREFIX, api_routes)
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http().make_span_with(request_span))
                .layer(CorsLayer::permissive())
                .layer(security::csp_layer())
                .layer(security::content_type_options_layer())
                .layer(security::frame_options_layer()),
        )
        .with_state(state)
}
