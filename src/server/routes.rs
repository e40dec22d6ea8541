//! HTTP routes of the content server.
//!
//! | Route | Purpose |
//! |---|---|
//! | `GET /` | player page |
//! | `GET /content.swf` | currently loaded file |
//! | `GET /events` | bridge messages as server-sent events |
//! | `GET /health` | status JSON |
//! | anything else | embedded asset or 404 |

use std::convert::Infallible;
use std::path::PathBuf;

use axum::{
    body::Body,
    extract::State,
    http::{header, StatusCode},
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    routing::get,
    Json, Router,
};
use futures::stream::{self, Stream};
use serde::Serialize;
use tokio::sync::{broadcast, watch};
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info, warn};

use super::static_files::{serve_file, serve_static, INDEX};
use crate::bridge::{BridgeMessage, EventBridge};

pub const SWF_MIME: &str = "application/x-shockwave-flash";

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct ServerState {
    pub bridge: EventBridge,
    pub content: watch::Receiver<Option<PathBuf>>,
    /// Cancelled on server stop; ends open event streams.
    pub shutdown: CancellationToken,
}

pub fn create_router(state: ServerState) -> Router {
    Router::new()
        .route("/", get(|| async { serve_file(INDEX) }))
        .route("/content.swf", get(serve_content))
        .route("/events", get(stream_events))
        .route("/health", get(health))
        .fallback(serve_static)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn serve_content(State(state): State<ServerState>) -> Response {
    let Some(path) = state.content.borrow().clone() else {
        debug!("Content requested but nothing is loaded");
        return (StatusCode::NOT_FOUND, "No content loaded").into_response();
    };

    match tokio::fs::read(&path).await {
        Ok(bytes) => {
            info!("Serving {} ({} bytes)", path.display(), bytes.len());
            Response::builder()
                .status(StatusCode::OK)
                .header(header::CONTENT_TYPE, SWF_MIME)
                .header(header::CACHE_CONTROL, "no-store")
                .body(Body::from(bytes))
                .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
        }
        Err(e) => {
            warn!("Loaded content {} is unreadable: {}", path.display(), e);
            (StatusCode::NOT_FOUND, "Content not found").into_response()
        }
    }
}

async fn stream_events(
    State(state): State<ServerState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    info!(
        "Player page attached to event stream ({} already attached)",
        state.bridge.page_count()
    );
    let receiver = state.bridge.subscribe();
    Sse::new(bridge_events(receiver, state.shutdown)).keep_alive(KeepAlive::default())
}

/// Turns a bridge subscription into SSE events until the server stops.
fn bridge_events(
    receiver: broadcast::Receiver<BridgeMessage>,
    shutdown: CancellationToken,
) -> impl Stream<Item = Result<Event, Infallible>> {
    stream::unfold(
        (receiver, shutdown),
        |(mut receiver, shutdown)| async move {
            loop {
                // Queued messages drain before the stream honours shutdown
                let message = tokio::select! {
                    biased;
                    message = receiver.recv() => message,
                    _ = shutdown.cancelled() => return None,
                };

                match message {
                    Ok(message) => match message.to_json() {
                        Ok(json) => {
                            return Some((Ok(Event::default().data(json)), (receiver, shutdown)))
                        }
                        Err(e) => error!("Failed to encode bridge message: {}", e),
                    },
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!("Player page lagging, dropped {} bridge messages", skipped);
                    }
                    Err(broadcast::error::RecvError::Closed) => return None,
                }
            }
        },
    )
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    loaded: bool,
    file: Option<String>,
    pages: usize,
}

async fn health(State(state): State<ServerState>) -> Json<HealthResponse> {
    let file = state
        .content
        .borrow()
        .as_ref()
        .and_then(|path| path.file_name())
        .map(|name| name.to_string_lossy().into_owned());

    Json(HealthResponse {
        status: "ok",
        loaded: file.is_some(),
        file,
        pages: state.bridge.page_count(),
    })
}
