use axum::{
    body::Body,
    extract::State,
    http::header,
    response::IntoResponse,
};
use std::sync::Arc;

use crate::app::AppState;

/// GET /events: open a Server-Sent Events stream.
///
/// The response body is the hub subscription itself: it stays open until the
/// client goes away (axum drops the body, which disconnects the subscriber)
/// or the hub drops the subscriber.
pub async fn events_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let subscription = state.hub.subscribe();
    (
        [
            (header::CONTENT_TYPE, "text/event-stream"),
            (header::CACHE_CONTROL, "no-cache, no-transform"),
            (header::CONNECTION, "keep-alive"),
        ],
        Body::from_stream(subscription),
    )
}
