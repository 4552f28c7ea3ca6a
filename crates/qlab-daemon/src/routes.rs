//! Axum router and HTTP handlers for qlab-daemon.
//!
//! `build_router` is the single entry point; `main.rs` calls it and attaches
//! middleware layers. Scenario tests in `tests/` drive the bare router.

use std::{convert::Infallible, sync::Arc};

use axum::{
    extract::State,
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{
        sse::{Event, Sse},
        IntoResponse, Response,
    },
    routing::get,
    Json, Router,
};
use futures_util::{stream, Stream, StreamExt};
use tokio::time::MissedTickBehavior;
use tokio_stream::wrappers::IntervalStream;
use tracing::{debug, info};
use uuid::Uuid;

use crate::{
    api_types::HealthResponse,
    state::{AppState, StreamSettings},
};

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

/// Build the application router wired to the given shared state.
///
/// Middleware layers (CORS, tracing) are **not** applied here; `main.rs`
/// attaches them after this call so tests can use the bare router.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/stream", get(stream))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// GET /health
// ---------------------------------------------------------------------------

pub(crate) async fn health(State(st): State<Arc<AppState>>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            ok: true,
            service: st.build.service.to_string(),
            version: st.build.version.to_string(),
        }),
    )
}

// ---------------------------------------------------------------------------
// GET /stream  (SSE)
// ---------------------------------------------------------------------------

/// Counting SSE stream: `data: {i}\n\n` for `i` in `0..ticks`, one chunk per
/// interval, then the response ends.
///
/// No keep-alive: the body holds exactly the counting chunks. Client
/// disconnect drops the stream.
pub(crate) async fn stream(State(st): State<Arc<AppState>>) -> Response {
    let settings = st.stream;
    let stream_id = Uuid::new_v4();
    info!(
        %stream_id,
        ticks = settings.ticks(),
        interval_ms = settings.interval().as_millis() as u64,
        "stream/open"
    );

    let last = settings.ticks() as usize;
    let events = counting_events(settings)
        .enumerate()
        .map(move |(n, ev)| {
            if n + 1 == last {
                debug!(%stream_id, "stream/complete");
            }
            ev
        });

    let mut headers = HeaderMap::new();
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));

    (headers, Sse::new(events)).into_response()
}

/// The counting event stream on its own, without HTTP.
///
/// The first event is ready immediately; each later one waits a full
/// interval. The stream ends as soon as the last event is yielded.
pub fn counting_events(settings: StreamSettings) -> impl Stream<Item = Result<Event, Infallible>> {
    let mut ticker = tokio::time::interval(settings.interval());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    // Counter first: zip ends on the counter's `None` without awaiting another tick.
    stream::iter(0..settings.ticks())
        .zip(IntervalStream::new(ticker))
        .map(|(i, _)| Ok(Event::default().data(i.to_string())))
}
