use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;
use tracing::error;

pub type ApiResult<T> = Result<T, ApiError>;

/// The full error taxonomy of the API surface. NotFound and Validation are
/// recoverable and produce user-facing responses; Internal is logged and
/// surfaced as an opaque 500.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("validation failed on {field}: {message}")]
    Validation {
        field: &'static str,
        message: &'static str,
    },

    /// Unauthenticated access to a protected route. Carries the original
    /// path so the login redirect can send the user back.
    #[error("authentication required")]
    Unauthorized { next: String },

    #[error("forbidden")]
    Forbidden,

    #[error("{0} already taken")]
    Conflict(&'static str),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::NotFound(resource) => (
                StatusCode::NOT_FOUND,
                Json(json!({ "error": "not_found", "resource": resource })),
            )
                .into_response(),
            ApiError::Validation { field, message } => (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(json!({ "error": "validation", "field": field, "message": message })),
            )
                .into_response(),
            ApiError::Unauthorized { next } => (
                StatusCode::FOUND,
                [(header::LOCATION, format!("/auth/login/?next={next}"))],
            )
                .into_response(),
            ApiError::Forbidden => StatusCode::FORBIDDEN.into_response(),
            ApiError::Conflict(resource) => (
                StatusCode::CONFLICT,
                Json(json!({ "error": "conflict", "resource": resource })),
            )
                .into_response(),
            ApiError::Internal(e) => {
                error!("internal error: {e:#}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": "internal" })),
                )
                    .into_response()
            }
        }
    }
}

/// Run blocking DB work off the async runtime, folding a join failure
/// into the internal-error branch.
pub(crate) async fn blocking<T, F>(f: F) -> ApiResult<T>
where
    F: FnOnce() -> ApiResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| ApiError::Internal(anyhow::anyhow!("blocking task join: {e}")))?
}
