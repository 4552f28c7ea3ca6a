//! In-process scenario tests for qlab-daemon HTTP endpoints.
//!
//! These tests spin up the Axum router **without** binding a TCP socket.
//! Each test calls `routes::build_router` and drives it via
//! `tower::ServiceExt::oneshot`. Stream pacing runs on a paused tokio clock.

use std::{sync::Arc, time::Duration};

use axum::http::{header, Request, StatusCode};
use http_body_util::BodyExt;
use qlab_daemon::{
    routes,
    state::{self, StreamSettings},
};
use tower::ServiceExt; // oneshot

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Build a fresh in-process router backed by a default AppState.
fn make_router() -> axum::Router {
    routes::build_router(Arc::new(state::AppState::new()))
}

fn make_router_with(ticks: u32, interval: Duration) -> axum::Router {
    let settings = StreamSettings::new(ticks, interval).expect("valid settings");
    routes::build_router(Arc::new(state::AppState::with_stream(settings)))
}

fn get(uri: &str) -> Request<axum::body::Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(axum::body::Body::empty())
        .unwrap()
}

/// Drive the router with a single request and return (status, body_bytes).
async fn call(router: axum::Router, req: Request<axum::body::Body>) -> (StatusCode, bytes::Bytes) {
    let resp = router.oneshot(req).await.expect("oneshot failed");
    let status = resp.status();
    let body = resp
        .into_body()
        .collect()
        .await
        .expect("body collect failed")
        .to_bytes();
    (status, body)
}

fn expected_counting_body(ticks: u32) -> String {
    (0..ticks).map(|i| format!("data: {i}\n\n")).collect()
}

// ---------------------------------------------------------------------------
// GET /health
// ---------------------------------------------------------------------------

#[tokio::test]
async fn health_returns_200_ok_true() {
    let (status, body) = call(make_router(), get("/health")).await;
    assert_eq!(status, StatusCode::OK);

    let json: serde_json::Value = serde_json::from_slice(&body).expect("body is not valid JSON");
    assert_eq!(json["ok"], true);
    assert_eq!(json["service"], "qlab-daemon");
    assert!(json["version"].is_string());
}

// ---------------------------------------------------------------------------
// GET /stream
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn stream_default_emits_ten_counting_chunks_then_closes() {
    let (status, body) = call(make_router(), get("/stream")).await;
    assert_eq!(status, StatusCode::OK);

    let text = String::from_utf8(body.to_vec()).expect("utf8 body");
    assert_eq!(text, expected_counting_body(10));
    assert!(text.starts_with("data: 0\n\n"));
    assert!(text.ends_with("data: 9\n\n"));
}

#[tokio::test(start_paused = true)]
async fn stream_media_type_is_event_stream() {
    let resp = make_router_with(1, Duration::from_millis(10))
        .oneshot(get("/stream"))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let ct = resp
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    assert!(ct.starts_with("text/event-stream"), "got content-type {ct:?}");
    assert_eq!(
        resp.headers()
            .get(header::CACHE_CONTROL)
            .and_then(|v| v.to_str().ok()),
        Some("no-cache")
    );
}

#[tokio::test(start_paused = true)]
async fn stream_chunks_are_paced_one_interval_apart() {
    let resp = make_router().oneshot(get("/stream")).await.unwrap();
    let start = tokio::time::Instant::now();
    let mut body = resp.into_body();

    let mut seen = Vec::new();
    while let Some(frame) = body.frame().await {
        let frame = frame.expect("frame error");
        let Ok(data) = frame.into_data() else {
            continue;
        };
        seen.push((start.elapsed(), String::from_utf8(data.to_vec()).unwrap()));
    }

    assert_eq!(seen.len(), 10, "exactly ten chunks");
    for (i, (at, chunk)) in seen.iter().enumerate() {
        assert_eq!(chunk, &format!("data: {i}\n\n"));

        let due = Duration::from_secs(i as u64);
        assert!(
            *at >= due && *at < due + Duration::from_millis(100),
            "chunk {i} arrived at {at:?}, expected ~{due:?}"
        );
    }

    // Closes right after the last chunk: no trailing pause.
    assert!(start.elapsed() < Duration::from_secs(9) + Duration::from_millis(100));
}

#[tokio::test(start_paused = true)]
async fn stream_honours_configured_tick_count() {
    let (status, body) = call(make_router_with(3, Duration::from_millis(50)), get("/stream")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, expected_counting_body(3).as_bytes());
}

#[tokio::test(start_paused = true)]
async fn stream_with_zero_ticks_is_empty() {
    let (status, body) = call(make_router_with(0, Duration::from_secs(1)), get("/stream")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.is_empty());
}

#[tokio::test(start_paused = true)]
async fn concurrent_streams_count_independently() {
    let st = Arc::new(state::AppState::new());
    let a = call(routes::build_router(Arc::clone(&st)), get("/stream"));
    let b = call(routes::build_router(Arc::clone(&st)), get("/stream"));

    let ((sa, ba), (sb, bb)) = tokio::join!(a, b);
    assert_eq!(sa, StatusCode::OK);
    assert_eq!(sb, StatusCode::OK);
    assert_eq!(ba, expected_counting_body(10).as_bytes());
    assert_eq!(bb, expected_counting_body(10).as_bytes());
}

#[tokio::test(start_paused = true)]
async fn counting_events_yields_ticks_items() {
    use futures_util::StreamExt;

    let settings = StreamSettings::new(4, Duration::from_millis(200)).unwrap();
    let n = routes::counting_events(settings).count().await;
    assert_eq!(n, 4);
}

// ---------------------------------------------------------------------------
// Unknown routes / methods
// ---------------------------------------------------------------------------

#[tokio::test]
async fn unknown_route_is_404() {
    let (status, _) = call(make_router(), get("/v1/stream")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn post_to_stream_is_405() {
    let req = Request::builder()
        .method("POST")
        .uri("/stream")
        .body(axum::body::Body::empty())
        .unwrap();
    let (status, _) = call(make_router(), req).await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
}
