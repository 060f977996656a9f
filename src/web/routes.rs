use axum::{routing::get, Router};
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers;
use crate::state::AppState;

/// Create the application router
///
/// A single route: `GET /` serves the MJPEG stream. No parameters, no
/// authentication.
pub fn create_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(handlers::mjpeg_stream))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
