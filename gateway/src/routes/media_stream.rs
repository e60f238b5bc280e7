//! Media stream WebSocket route configuration

use axum::{Router, routing::get};
use tower_http::trace::TraceLayer;

use crate::handlers::{media_stream_handler, media_stream_tenant_handler};
use crate::state::AppState;
use std::sync::Arc;

/// Create the media stream router
///
/// # Endpoints
///
/// `GET /media-stream` and `GET /media-stream/{tenant}` - WebSocket upgrade
/// for one call's telephony media stream.
///
/// # Protocol
///
/// The telephony provider sends JSON frames tagged by `event`:
/// `connected`, `start`, `media` (base64 u-law at 8 kHz), `mark` and `stop`.
///
/// The gateway answers with `media`, `mark` and `clear` frames for the same
/// `streamSid`.
///
/// # Example
///
/// ```json
/// {"event": "start", "streamSid": "MZ123", "start": {"callSid": "CA123"}}
/// {"event": "media", "streamSid": "MZ123", "media": {"track": "inbound", "payload": "/w=="}}
/// ```
pub fn create_media_stream_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/media-stream", get(media_stream_handler))
        .route("/media-stream/{tenant}", get(media_stream_tenant_handler))
        .layer(TraceLayer::new_for_http())
}
