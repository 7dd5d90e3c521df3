//! Maps [`lws_core::Error`] and request-parsing failures onto the §6.2
//! response-code table.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use lws_core::Error;
use serde::Serialize;

#[derive(Debug)]
pub enum ApiError {
    Core(Error),
    BadRequest(&'static str),
}

impl From<Error> for ApiError {
    fn from(e: Error) -> Self {
        ApiError::Core(e)
    }
}

#[derive(Serialize)]
struct ErrorBody {
    status: &'static str,
    reason: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (code, reason) = match &self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.to_string()),
            ApiError::Core(Error::AccountNotFound) => (StatusCode::FORBIDDEN, "AccountNotFound".to_string()),
            ApiError::Core(Error::AccountExists) => (StatusCode::FORBIDDEN, "AccountExists".to_string()),
            ApiError::Core(Error::DuplicateRequest) => (StatusCode::FORBIDDEN, "DuplicateRequest".to_string()),
            ApiError::Core(Error::BadAddress) => (StatusCode::BAD_REQUEST, "bad address".to_string()),
            ApiError::Core(Error::BadViewKey) => (StatusCode::BAD_REQUEST, "bad view key".to_string()),
            ApiError::Core(Error::BadClientTx) => (StatusCode::BAD_REQUEST, "bad transaction".to_string()),
            ApiError::Core(Error::DaemonTimeout) => (StatusCode::SERVICE_UNAVAILABLE, "daemon timeout".to_string()),
            ApiError::Core(Error::CreateQueueMax) => {
                (StatusCode::SERVICE_UNAVAILABLE, "create request queue full".to_string())
            }
            ApiError::Core(Error::ExceededRestRequestLimit) => {
                (StatusCode::BAD_REQUEST, "request too large".to_string())
            }
            ApiError::Core(other) => (StatusCode::INTERNAL_SERVER_ERROR, other.to_string()),
        };
        (code, Json(ErrorBody { status: "error", reason })).into_response()
    }
}
