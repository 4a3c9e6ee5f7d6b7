//! Request instrumentation: counters, timings and one log line per request.

use crate::sensors::ReadingSource;
use crate::web::stats::ServerStats;
use crate::web::AppState;
use axum::{
    body::Body,
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};

const SIZEOF_KILOBYTE: u64 = 1 << 10;
const SIZEOF_MEGABYTE: u64 = 1 << 20;
const SIZEOF_GIGABYTE: u64 = 1 << 30;

/// Format a byte count for the request log, e.g. `500B` or `2.00kB`.
pub fn format_content_length(content_length: u64) -> String {
    let length = content_length as f64;
    if content_length >= SIZEOF_GIGABYTE {
        format!("{:.2}gB", length / SIZEOF_GIGABYTE as f64)
    } else if content_length >= SIZEOF_MEGABYTE {
        format!("{:.2}mB", length / SIZEOF_MEGABYTE as f64)
    } else if content_length >= SIZEOF_KILOBYTE {
        format!("{:.2}kB", length / SIZEOF_KILOBYTE as f64)
    } else {
        format!("{}B", content_length)
    }
}

/// A response together with the status and body size that were written.
pub struct RecordedResponse {
    pub status: StatusCode,
    pub content_length: u64,
    response: Response,
}

impl RecordedResponse {
    /// Buffer the body of `response` so its size can be reported.
    pub async fn capture(response: Response) -> Self {
        let (parts, body) = response.into_parts();
        match axum::body::to_bytes(body, usize::MAX).await {
            Ok(bytes) => Self {
                status: parts.status,
                content_length: bytes.len() as u64,
                response: Response::from_parts(parts, Body::from(bytes)),
            },
            Err(e) => {
                error!("Failed to buffer response body: {}", e);
                Self {
                    status: StatusCode::INTERNAL_SERVER_ERROR,
                    content_length: 0,
                    response: StatusCode::INTERNAL_SERVER_ERROR.into_response(),
                }
            }
        }
    }
}

impl IntoResponse for RecordedResponse {
    fn into_response(self) -> Response {
        self.response
    }
}

/// Records the outcome of one request. If dropped before [`finish`] is
/// called, the client went away mid-request and it counts as canceled.
///
/// [`finish`]: RequestGuard::finish
struct RequestGuard {
    stats: Arc<ServerStats>,
    path: String,
    started: Instant,
    finished: bool,
}

impl RequestGuard {
    fn new(stats: Arc<ServerStats>, path: String) -> Self {
        stats.record_request();
        Self {
            stats,
            path,
            started: Instant::now(),
            finished: false,
        }
    }

    fn finish(mut self, status: StatusCode, content_length: u64) {
        self.finished = true;
        if status != StatusCode::OK {
            self.stats.record_error();
        }
        let elapsed = self.started.elapsed();
        self.stats.record_elapsed(elapsed);
        info!(
            "{} {} {} {:?}",
            self.path,
            status.as_u16(),
            format_content_length(content_length),
            elapsed
        );
    }
}

impl Drop for RequestGuard {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        self.stats.record_canceled();
        let elapsed = self.started.elapsed();
        self.stats.record_elapsed(elapsed);
        warn!("{} canceled {:?}", self.path, elapsed);
    }
}

/// Middleware wrapping every route with request accounting.
pub async fn track_requests<S: ReadingSource>(
    State(state): State<AppState<S>>,
    request: Request,
    next: Next,
) -> Response {
    let guard = RequestGuard::new(Arc::clone(&state.stats), request.uri().path().to_string());

    let response = match state.request_timeout {
        Some(limit) => match tokio::time::timeout(limit, next.run(request)).await {
            Ok(response) => response,
            Err(_) => {
                state.stats.record_deadline_exceeded();
                (StatusCode::GATEWAY_TIMEOUT, "request deadline exceeded\n").into_response()
            }
        },
        None => next.run(request).await,
    };

    let recorded = RecordedResponse::capture(response).await;
    guard.finish(recorded.status, recorded.content_length);
    recorded.into_response()
}
