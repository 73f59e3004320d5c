//! HTTP error handling and response mapping.
//!
//! Client errors echo their message. Server errors log the detail and return a
//! generic message so engine internals never reach the client.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use llmgate_engine::EngineError;
use serde_json::json;

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("model initialization failed: {0}")]
    ModelInit(String),

    #[error("generation failed: {0}")]
    Generation(String),

    #[error("server at capacity")]
    ServiceUnavailable,
}

impl From<EngineError> for ServerError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::Tokenization(msg) => ServerError::InvalidInput(msg),
            EngineError::ModelLoad(msg) => ServerError::ModelInit(msg),
            EngineError::Generation(msg) => ServerError::Generation(msg),
        }
    }
}

impl ServerError {
    pub fn status(&self) -> StatusCode {
        match self {
            ServerError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            ServerError::ModelInit(_) | ServerError::Generation(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            ServerError::ServiceUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();
        let (error_type, message) = match self {
            ServerError::InvalidInput(msg) => ("invalid_request_error", msg),
            ServerError::ModelInit(detail) => {
                tracing::error!(%detail, "model initialization failed");
                ("server_error", "model is not available".to_string())
            }
            ServerError::Generation(detail) => {
                tracing::error!(%detail, "generation failed");
                ("server_error", "generation failed".to_string())
            }
            ServerError::ServiceUnavailable => (
                "server_error",
                "Server at capacity, try again later".to_string(),
            ),
        };

        let body = Json(json!({
            "error": {
                "message": message,
                "type": error_type,
                "param": null,
                "code": null,
            }
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engine_errors_map_to_taxonomy() {
        assert!(matches!(
            ServerError::from(EngineError::Tokenization("empty".into())),
            ServerError::InvalidInput(_)
        ));
        assert!(matches!(
            ServerError::from(EngineError::ModelLoad("gone".into())),
            ServerError::ModelInit(_)
        ));
        assert!(matches!(
            ServerError::from(EngineError::Generation("oom".into())),
            ServerError::Generation(_)
        ));
    }

    #[test]
    fn statuses() {
        assert_eq!(ServerError::InvalidInput("x".into()).status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ServerError::ModelInit("x".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ServerError::Generation("x".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ServerError::ServiceUnavailable.status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }
}
