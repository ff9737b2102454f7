use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use lineage_graph::ResolveError;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Resolution error: {0}")]
    Resolve(#[from] ResolveError),

    #[error("Traversal failed: {0}")]
    Traversal(String),

    #[error("Internal server error")]
    Internal,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(_) => {
                (StatusCode::BAD_REQUEST, self.to_string())
            }
            ApiError::Resolve(ResolveError::EmptyQuery) => {
                (StatusCode::BAD_REQUEST, self.to_string())
            }
            ApiError::Resolve(ResolveError::NotFound(_)) => {
                (StatusCode::NOT_FOUND, self.to_string())
            }
            ApiError::Resolve(ref e) => {
                tracing::error!("Knowledge graph error: {}", e);
                (StatusCode::BAD_GATEWAY, "Knowledge graph unavailable".to_string())
            }
            ApiError::Traversal(ref reason) => {
                tracing::warn!("Traversal failed: {}", reason);
                (StatusCode::BAD_GATEWAY, self.to_string())
            }
            ApiError::Internal => {
                tracing::error!("Internal error: {}", self);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            }
        };

        let body = Json(json!({
            "error": message
        }));

        (status, body).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
