//! Error types for the HTTP server.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

/// Body sent for backend failures. Storage details stay in the logs.
const STORAGE_ERROR_BODY: &str = "Storage error";

/// Server error type.
///
/// Unknown, invalid, and uncreatable workspaces all surface as
/// [`ServerError::NotFound`] and carry no identifier.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Workspace absent and not creatable.
    #[error("Workspace not found")]
    NotFound,

    /// Write attempted on a readonly pub.
    #[error("This pub is readonly")]
    Forbidden,

    /// Request body could not be used.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Backend I/O failure during a request.
    #[error("Storage error: {0}")]
    Io(#[from] syncpub_storage::StorageError),
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            Self::NotFound => (StatusCode::NOT_FOUND, self.to_string()),
            Self::Forbidden => (StatusCode::FORBIDDEN, self.to_string()),
            Self::BadRequest(_) => (StatusCode::BAD_REQUEST, self.to_string()),
            Self::Io(err) => {
                tracing::error!(
                    kind = ?err.kind,
                    backend = err.backend.unwrap_or("unknown"),
                    "Storage failure while serving request"
                );
                tracing::trace!(error = %err, "Storage failure while serving request");
                (StatusCode::INTERNAL_SERVER_ERROR, STORAGE_ERROR_BODY.to_owned())
            }
        };

        (status, axum::Json(json!({"error": message}))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use axum::body::to_bytes;
    use pretty_assertions::assert_eq;
    use syncpub_storage::{StorageError, StorageErrorKind};

    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(ServerError::NotFound.into_response().status(), StatusCode::NOT_FOUND);
        assert_eq!(ServerError::Forbidden.into_response().status(), StatusCode::FORBIDDEN);
        assert_eq!(
            ServerError::BadRequest("x".to_owned()).into_response().status(),
            StatusCode::BAD_REQUEST
        );
        let io = StorageError::new(StorageErrorKind::Unavailable);
        assert_eq!(
            ServerError::Io(io).into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn test_storage_error_body_hides_backend_details() {
        let io = StorageError::new(StorageErrorKind::Unavailable)
            .with_backend("Sqlite")
            .with_path("/srv/pub/secret.ws.sqlite")
            .with_source(std::io::Error::other("pool closed"));

        let response = ServerError::Io(io).into_response();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let parsed: serde_json::Value = serde_json::from_slice(&body).unwrap();

        assert_eq!(parsed, json!({"error": "Storage error"}));
    }
}
