use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use utoipa::ToSchema;

/// Standard error response body.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Human-readable error message
    pub error: String,
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Route not found: {0}")]
    RouteNotFound(String),

    #[error("External service error: {0}")]
    ExternalServiceError(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::RouteNotFound(status) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                format!("Route not found: {}", status),
            ),
            AppError::ExternalServiceError(msg) => (StatusCode::BAD_GATEWAY, msg.clone()),
            AppError::InternalError(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal error".to_string(),
                )
            }
        };

        (status, axum::Json(ErrorResponse { error: message })).into_response()
    }
}

/// Failure of a single call to one of the external lookup services.
#[derive(Debug, thiserror::Error)]
pub enum UpstreamError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP {0}")]
    Status(reqwest::StatusCode),

    #[error("service reported status {0}")]
    ApiStatus(String),

    #[error("unexpected payload: {0}")]
    Malformed(String),

    #[error("no results")]
    Empty,
}

impl From<crate::services::gpx::GpxError> for AppError {
    fn from(err: crate::services::gpx::GpxError) -> Self {
        AppError::InternalError(format!("GPX export error: {}", err))
    }
}

impl From<crate::services::table::TableError> for AppError {
    fn from(err: crate::services::table::TableError) -> Self {
        AppError::InternalError(format!("CSV export error: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_route_not_found_is_unprocessable() {
        let response = AppError::RouteNotFound("NOT_FOUND".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn test_external_error_is_bad_gateway() {
        let response =
            AppError::ExternalServiceError("directions timed out".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn test_bad_request_status() {
        let response = AppError::BadRequest("origin must not be empty".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
