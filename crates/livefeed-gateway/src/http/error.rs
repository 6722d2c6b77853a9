use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use livefeed_core::LivefeedError;
use serde_json::json;

/// JSON error reply: `{ "ok": false, "error": { "code": "...", "message": "..." } }`
#[derive(Debug)]
pub struct ApiError(pub LivefeedError);

impl From<LivefeedError> for ApiError {
    fn from(err: LivefeedError) -> Self {
        Self(err)
    }
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self.0 {
            LivefeedError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            LivefeedError::Io(_) => StatusCode::BAD_REQUEST,
            LivefeedError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = json!({
            "ok": false,
            "error": { "code": self.0.code(), "message": self.0.to_string() },
        });
        (status, Json(body)).into_response()
    }
}
