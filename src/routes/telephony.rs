//! Telephony route configuration
//!
//! # Endpoints
//!
//! - `GET|POST /incoming-call` - Call-setup webhook, replies with TwiML
//! - `GET /media-stream` - WebSocket upgrade for the call's media stream

use axum::{Router, routing::get};
use tower_http::trace::TraceLayer;

use crate::handlers::{incoming_call, media_stream_handler};
use crate::state::AppState;
use std::sync::Arc;

/// Create the telephony router
pub fn create_telephony_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/incoming-call", get(incoming_call).post(incoming_call))
        .route("/media-stream", get(media_stream_handler))
        .layer(TraceLayer::new_for_http())
}
