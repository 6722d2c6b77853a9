//! Publish endpoint: POST /ingest
//!
//! Accepts one body per call and broadcasts it to every open `/events`
//! stream. Bodies are never rejected for their content:
//!
//! | Content-Type                         | Envelope                              |
//! |--------------------------------------|---------------------------------------|
//! | `application/x-www-form-urlencoded`  | object of the form fields, repeated keys as arrays |
//! | anything else (JSON, text, none)     | JSON if it parses, else `{"text": raw}` |
//!
//! Response: `{ "ok": true, "deliveredTo": 3 }`

use axum::{
    body::Bytes,
    extract::{FromRequest, Request, State},
    http::{header, HeaderMap, StatusCode},
    Form, Json,
};
use livefeed_core::LivefeedError;
use livefeed_protocol::Envelope;
use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::warn;

use super::error::ApiError;
use crate::app::AppState;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestResponse {
    pub ok: bool,
    /// Subscribers a write was attempted for, not confirmed deliveries.
    pub delivered_to: usize,
}

/// POST /ingest: normalize and broadcast.
pub async fn ingest_handler(
    State(state): State<Arc<AppState>>,
    InboundBody(envelope): InboundBody,
) -> Json<IngestResponse> {
    let delivered_to = state.hub.publish_envelope(envelope);
    Json(IngestResponse {
        ok: true,
        delivered_to,
    })
}

/// Publish body decoded by content type into an [`Envelope`].
///
/// The only rejection is a body over the configured size limit.
pub struct InboundBody(pub Envelope);

impl FromRequest<Arc<AppState>> for InboundBody {
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &Arc<AppState>) -> Result<Self, Self::Rejection> {
        let limit = state.config.gateway.body_limit_bytes;
        let declared = content_length(req.headers());

        if is_form(req.headers()) {
            return match Form::<Vec<(String, String)>>::from_request(req, state).await {
                Ok(Form(pairs)) => Ok(InboundBody(Envelope::normalize(Value::Object(
                    fold_form_fields(pairs),
                )))),
                Err(rejection) if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE => {
                    Err(too_large(declared, limit))
                }
                Err(rejection) => {
                    warn!(error = %rejection.body_text(), "unreadable form body, publishing empty text");
                    Ok(InboundBody(Envelope::normalize(Value::Null)))
                }
            };
        }

        let bytes = match Bytes::from_request(req, state).await {
            Ok(bytes) => bytes,
            Err(rejection) if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE => {
                return Err(too_large(declared, limit));
            }
            Err(rejection) => {
                return Err(ApiError(LivefeedError::Io(std::io::Error::other(
                    rejection.body_text(),
                ))));
            }
        };

        let raw = String::from_utf8_lossy(&bytes);
        Ok(InboundBody(Envelope::normalize_text(&raw)))
    }
}

/// Collect form pairs into an object. A key seen once maps to its string,
/// a repeated key to an array of every value in body order.
fn fold_form_fields(pairs: Vec<(String, String)>) -> Map<String, Value> {
    let mut fields = Map::new();
    for (key, value) in pairs {
        let value = Value::String(value);
        match fields.get_mut(&key) {
            Some(Value::Array(values)) => values.push(value),
            Some(existing) => {
                let first = existing.take();
                *existing = Value::Array(vec![first, value]);
            }
            None => {
                fields.insert(key, value);
            }
        }
    }
    fields
}

fn is_form(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .map(|mime| mime.trim().eq_ignore_ascii_case("application/x-www-form-urlencoded"))
        .unwrap_or(false)
}

fn content_length(headers: &HeaderMap) -> Option<usize> {
    headers
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse().ok())
}

fn too_large(declared: Option<usize>, max: usize) -> ApiError {
    // chunked bodies carry no length; report the limit they crossed
    let size = declared.unwrap_or(max + 1);
    warn!(size, max, "publish body rejected: too large");
    ApiError(LivefeedError::PayloadTooLarge { size, max })
}
