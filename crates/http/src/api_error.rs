//! Typed API error for HTTP handlers.
//!
//! Converts domain errors into HTTP responses with a JSON body and status
//! code. Handlers return `Result<Json<T>, ApiError>`.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use leadflow_service::ServiceError;
use leadflow_storage::StorageError;

/// API error with HTTP status code and human-readable message.
///
/// Converts to JSON response: `{"error": "message"}`.
///
/// `Internal` logs the real error server-side and returns a static message
/// to the client.
#[derive(Debug)]
pub enum ApiError {
    /// 400 Bad Request: malformed body or missing identifying fields.
    BadRequest(String),
    /// 401 Unauthorized: webhook signature missing or wrong.
    Unauthorized(String),
    /// 404 Not Found.
    NotFound(String),
    /// 422 Unprocessable Entity: valid syntax but rejected by a constraint.
    UnprocessableEntity(String),
    /// 500 Internal Server Error. Details logged, not exposed.
    Internal(anyhow::Error),
    /// 502 Bad Gateway: the extraction service failed; the provider should redeliver.
    BadGateway(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            Self::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            Self::UnprocessableEntity(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg),
            Self::Internal(err) => {
                tracing::error!(error = ?err, "internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal server error".to_owned())
            },
            Self::BadGateway(msg) => (StatusCode::BAD_GATEWAY, msg),
        };
        let body = serde_json::json!({"error": message});
        (status, Json(body)).into_response()
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err)
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        Self::BadRequest(format!("invalid payload: {err}"))
    }
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Storage(ref e) if e.is_duplicate() => {
                Self::UnprocessableEntity(err.to_string())
            },
            ServiceError::Storage(StorageError::NotFound { entity, id }) => {
                Self::NotFound(format!("{entity} '{id}' not found"))
            },
            ServiceError::Validation(msg) => Self::BadRequest(msg),
            ServiceError::ExtractionFailed { ref conversation_id, ref source } => {
                tracing::warn!(
                    error = %source,
                    conversation_id = %conversation_id,
                    "Extraction failed, asking provider to redeliver"
                );
                Self::BadGateway("extraction failed".to_owned())
            },
            ServiceError::Storage(_) => Self::Internal(err.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use leadflow_llm::LlmError;

    use super::*;

    fn status(err: ApiError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn service_errors_map_to_statuses() {
        assert_eq!(status(ServiceError::Validation("x".to_owned()).into()), StatusCode::BAD_REQUEST);
        assert_eq!(
            status(
                ServiceError::ExtractionFailed {
                    conversation_id: "c".to_owned(),
                    source: LlmError::EmptyResponse,
                }
                .into()
            ),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            status(ServiceError::Storage(StorageError::Pool("gone".to_owned())).into()),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(status(ApiError::Unauthorized("bad".to_owned())), StatusCode::UNAUTHORIZED);
    }
}
