use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use propertymap_core::FetchError;
use serde::Serialize;
use tracing::error;

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    pub message: String,
}

#[derive(thiserror::Error, Debug)]
pub enum ApiError {
    #[error("Failed to fetch properties")]
    Fetch(#[from] FetchError),

    #[error("Location not found")]
    LocationNotFound(String),

    #[error("Search failed")]
    Geocode(String),

    #[error("Invalid input")]
    InvalidInput(String),
}

impl ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            // Any failure to fetch is reported the same way
            ApiError::Fetch(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::LocationNotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Geocode(_) => StatusCode::BAD_GATEWAY,
            ApiError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        }
    }

    fn message(&self) -> String {
        match self {
            ApiError::Fetch(err) => err.to_string(),
            ApiError::LocationNotFound(query) => format!("No match for {:?}", query),
            ApiError::Geocode(msg) => msg.clone(),
            ApiError::InvalidInput(msg) => msg.clone(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let code = self.status_code();
        let body = ErrorBody {
            error: self.to_string(),
            message: self.message(),
        };
        if code.is_server_error() {
            error!(status = code.as_u16(), error = %body.message, "{}", body.error);
        }
        (code, Json(body)).into_response()
    }
}
