//! HTTP request handlers

use axum::{
    body::Body,
    extract::State,
    http::{header, StatusCode},
    response::Response,
};
use bytes::Bytes;
use std::sync::Arc;

use crate::error::{AppError, Result};
use crate::state::AppState;
use crate::stream::{StreamSession, CONTENT_TYPE};

/// MJPEG stream endpoint
///
/// Acquires a capture source for this request and streams multipart JPEG
/// chunks until the source is exhausted or the client goes away. The
/// session is scoped to the request: dropping the response body cancels
/// the capture worker, which releases the device.
pub async fn mjpeg_stream(State(state): State<Arc<AppState>>) -> Result<Response> {
    let source = state.open_source();
    let cancel = state.session_token();
    let jpeg_quality = state.capture.jpeg_quality;

    let mut rx = StreamSession::open(source, jpeg_quality, cancel.clone());

    let body_stream = async_stream::stream! {
        // Cancels the session when the body is dropped; the capture worker
        // observes it before its next blocking read.
        let _guard = cancel.drop_guard();
        while let Some(chunk) = rx.recv().await {
            yield Ok::<Bytes, std::io::Error>(chunk);
        }
    };

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, CONTENT_TYPE)
        .header(header::CACHE_CONTROL, "no-cache, no-store, must-revalidate")
        .header(header::PRAGMA, "no-cache")
        .header(header::EXPIRES, "0")
        .header(header::CONNECTION, "keep-alive")
        .body(Body::from_stream(body_stream))
        .map_err(|e| AppError::Internal(format!("Failed to build stream response: {}", e)))
}
