//! Web application router and middleware setup.

use crate::sensors::ReadingSource;
use crate::web::{handlers, instrument, AppState};
use axum::{middleware, routing::get, Router};
use tower_http::trace::TraceLayer;

/// Create the axum application with all routes and the request instrumentation.
pub fn create_app<S: ReadingSource>(state: AppState<S>, enable_trace: bool) -> Router {
    let app = Router::new()
        .route("/", get(handlers::get_sensor_data::<S>))
        .route("/prometheus", get(handlers::get_sensor_data::<S>))
        .route("/sensors", get(handlers::get_sensors::<S>))
        .route("/debug/vars", get(handlers::get_debug_vars::<S>))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            instrument::track_requests::<S>,
        ))
        .with_state(state);

    if enable_trace {
        app.layer(TraceLayer::new_for_http())
    } else {
        app
    }
}
