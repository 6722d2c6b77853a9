use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use livefeed_core::LivefeedConfig;
use livefeed_hub::BroadcastHub;
use std::sync::Arc;
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};

/// Shared state handed to every Axum handler as `Arc<AppState>`.
pub struct AppState {
    pub config: LivefeedConfig,
    /// Every open `/events` stream lives in here.
    pub hub: BroadcastHub,
}

impl AppState {
    pub fn new(config: LivefeedConfig, hub: BroadcastHub) -> Self {
        Self { config, hub }
    }
}

/// Assemble the full Axum router.
///
/// Compression skips `text/event-stream` responses, so the event stream is
/// never buffered by the gzip encoder.
pub fn build_router(state: Arc<AppState>) -> Router {
    let body_limit = state.config.gateway.body_limit_bytes;
    Router::new()
        .route("/events", get(crate::http::events::events_handler))
        .route("/ingest", post(crate::http::ingest::ingest_handler))
        .route("/health", get(crate::http::health::health_handler))
        .with_state(state)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::{to_bytes, Body},
        http::{header, Request, StatusCode},
    };
    use futures_util::StreamExt;
    use livefeed_core::HubConfig;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    fn router_with(config: LivefeedConfig) -> (Router, BroadcastHub) {
        let hub = BroadcastHub::new(config.hub.clone());
        let state = Arc::new(AppState::new(config, hub.clone()));
        (build_router(state), hub)
    }

    fn router() -> (Router, BroadcastHub) {
        router_with(LivefeedConfig::default())
    }

    async fn json_body(response: axum::response::Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    async fn health(router: &Router) -> Value {
        let response = router
            .clone()
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        json_body(response).await
    }

    async fn ingest(router: &Router, content_type: &str, body: &'static str) -> axum::response::Response {
        router
            .clone()
            .oneshot(
                Request::post("/ingest")
                    .header(header::CONTENT_TYPE, content_type)
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn health_reports_zero_clients() {
        let (router, _hub) = router();
        let body = health(&router).await;
        assert_eq!(body["ok"], true);
        assert_eq!(body["clients"], 0);
    }

    #[tokio::test]
    async fn ingest_reports_attempted_count() {
        let (router, hub) = router();
        let _a = hub.subscribe();
        let _b = hub.subscribe();

        let response = ingest(&router, "application/json", r#"{"text":"hello"}"#).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await, json!({"ok": true, "deliveredTo": 2}));
    }

    #[tokio::test]
    async fn ingest_plain_text_becomes_text_payload() {
        let (router, hub) = router();
        let mut sub = hub.subscribe();

        ingest(&router, "text/plain", "raw string").await;
        let frame = sub.try_recv().unwrap();
        assert_eq!(&frame[..], b"data: {\"text\":\"raw string\"}\n\n");
    }

    #[tokio::test]
    async fn ingest_malformed_json_is_not_rejected() {
        let (router, hub) = router();
        let mut sub = hub.subscribe();

        let response = ingest(&router, "application/json", "{oops").await;
        assert_eq!(response.status(), StatusCode::OK);
        let frame = sub.try_recv().unwrap();
        assert_eq!(&frame[..], b"data: {\"text\":\"{oops\"}\n\n");
    }

    #[tokio::test]
    async fn ingest_form_fields_become_object() {
        let (router, hub) = router();
        let mut sub = hub.subscribe();

        ingest(&router, "application/x-www-form-urlencoded", "text=hi+there&level=2").await;
        let frame = sub.try_recv().unwrap();
        let parsed = livefeed_protocol::Frame::parse(std::str::from_utf8(&frame).unwrap()).unwrap();
        let payload: Value = serde_json::from_str(&parsed.data).unwrap();
        assert_eq!(payload, json!({"text": "hi there", "level": "2"}));
    }

    #[tokio::test]
    async fn ingest_form_keeps_repeated_keys() {
        let (router, hub) = router();
        let mut sub = hub.subscribe();

        ingest(&router, "application/x-www-form-urlencoded", "a=1&a=2&b%5Bc%5D=3").await;
        let frame = sub.try_recv().unwrap();
        let parsed = livefeed_protocol::Frame::parse(std::str::from_utf8(&frame).unwrap()).unwrap();
        let payload: Value = serde_json::from_str(&parsed.data).unwrap();
        assert_eq!(payload, json!({"a": ["1", "2"], "b[c]": "3"}));
    }

    #[tokio::test]
    async fn events_after_shutdown_end_immediately() {
        let (router, hub) = router();
        hub.shutdown();

        let response = router
            .clone()
            .oneshot(Request::get("/events").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert!(body.is_empty());
        assert_eq!(health(&router).await["clients"], 0);
    }

    #[tokio::test]
    async fn oversized_body_is_413() {
        let mut config = LivefeedConfig::default();
        config.gateway.body_limit_bytes = 8;
        let (router, hub) = router_with(config);
        let _sub = hub.subscribe();

        let response = ingest(&router, "application/json", r#"{"text":"far too long"}"#).await;
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
        let body = json_body(response).await;
        assert_eq!(body["ok"], false);
        assert_eq!(body["error"]["code"], "PAYLOAD_TOO_LARGE");
    }

    #[tokio::test]
    async fn events_stream_end_to_end() {
        let mut config = LivefeedConfig::default();
        config.hub = HubConfig {
            heartbeat_interval_ms: 60_000,
            ..HubConfig::default()
        };
        let (router, _hub) = router_with(config);

        let response = router
            .clone()
            .oneshot(Request::get("/events").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "text/event-stream"
        );
        assert_eq!(health(&router).await["clients"], 1);

        let published = ingest(&router, "application/json", r#"{"text":"hello"}"#).await;
        assert_eq!(json_body(published).await["deliveredTo"], 1);

        let mut stream = response.into_body().into_data_stream();
        let chunk = stream.next().await.unwrap().unwrap();
        assert_eq!(&chunk[..], b"data: {\"text\":\"hello\"}\n\n");

        // client goes away
        drop(stream);
        assert_eq!(health(&router).await["clients"], 0);
    }
}
