use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use flightdeck_core::CoreError;
use serde_json::json;

#[derive(Debug)]
pub enum AppError {
    AuthenticationError(String),
    NotFoundError(String),
    /// The catalog could not answer; carries the underlying cause.
    ServiceUnavailable(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            AppError::AuthenticationError(msg) => (StatusCode::UNAUTHORIZED, json!({ "error": msg })),
            AppError::NotFoundError(msg) => (StatusCode::NOT_FOUND, json!({ "error": msg })),
            AppError::ServiceUnavailable(cause) => {
                tracing::error!("Service unavailable: {}", cause);
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    json!({ "error": "Service unavailable", "detail": cause }),
                )
            }
        };

        (status, Json(body)).into_response()
    }
}

impl From<CoreError> for AppError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::NotFound(what) => AppError::NotFoundError(format!("{} not found", what)),
            CoreError::ServiceUnavailable(cause) => AppError::ServiceUnavailable(cause.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_core_errors_map_to_status() {
        let resp = AppError::from(CoreError::NotFound("Flight F1".to_string())).into_response();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let resp = AppError::from(CoreError::ServiceUnavailable("db down".into())).into_response();
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);

        let resp = AppError::AuthenticationError("no token".to_string()).into_response();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }
}
