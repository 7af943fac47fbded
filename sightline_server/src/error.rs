use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use sightline_core::error as core_error;

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

#[derive(thiserror::Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    Core(#[from] sightline_core::Error),

    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            ApiError::Core(err) => match err {
                core_error::Error::InvalidInput(_) => StatusCode::BAD_REQUEST,
                core_error::Error::NotFound(_) => StatusCode::NOT_FOUND,
                core_error::Error::Backend { .. } | core_error::Error::BackendMessage(_) => {
                    StatusCode::BAD_GATEWAY
                }
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let code = self.status_code();
        if code == StatusCode::BAD_GATEWAY {
            // Source chains stay in the log; clients only see the context.
            tracing::error!(error = %self, "store failure surfaced to client");
        }
        let body = ErrorBody {
            error: self.to_string(),
        };
        (code, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_maps_to_404() {
        let err = ApiError::Core(sightline_core::Error::NotFound("metric x".to_string()));
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn invalid_input_maps_to_400() {
        let err = ApiError::InvalidInput("port must be positive".to_string());
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }
}
