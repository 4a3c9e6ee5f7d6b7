//! HTTP handlers for the exporter routes.

use crate::exposition::{render_directory, render_prometheus};
use crate::sensors::ReadingSource;
use crate::web::AppState;
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
};

const TEXT_PLAIN: &str = "text/plain; charset=utf-8";
const APPLICATION_JSON: &str = "application/json; charset=utf-8";

/// Scrape every sensor and answer in the Prometheus text format.
///
/// Any sensor failure fails the whole scrape with a 500.
pub async fn get_sensor_data<S: ReadingSource>(State(state): State<AppState<S>>) -> Response {
    match state.aggregator.aggregate().await {
        Ok(batch) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, TEXT_PLAIN)],
            render_prometheus(&batch),
        )
            .into_response(),
        Err(failure) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            [(header::CONTENT_TYPE, TEXT_PLAIN)],
            format!("error fetching data; {}\n", failure),
        )
            .into_response(),
    }
}

/// List the configured sensors as a JSON object of name to address.
pub async fn get_sensors<S: ReadingSource>(State(state): State<AppState<S>>) -> Response {
    let mut body = render_directory(state.aggregator.table()).to_string();
    body.push('\n');
    (StatusCode::OK, [(header::CONTENT_TYPE, APPLICATION_JSON)], body).into_response()
}

/// Process-wide request statistics.
pub async fn get_debug_vars<S: ReadingSource>(State(state): State<AppState<S>>) -> Response {
    Json(state.stats.snapshot()).into_response()
}
