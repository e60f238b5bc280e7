//! Router construction.

use axum::{Router, routing::get};
use std::sync::Arc;
use tower_http::set_header::SetResponseHeaderLayer;

use crate::handlers;
use crate::state::AppState;

pub mod media_stream;
pub mod voice;

/// Build the complete application: health, call setup and media stream routes
/// with security headers applied.
pub fn create_app(app_state: Arc<AppState>) -> Router {
    // Public health check route
    let public_routes = Router::new().route("/", get(handlers::api::health_check));

    let security_headers = tower::ServiceBuilder::new()
        .layer(SetResponseHeaderLayer::overriding(
            http::header::X_CONTENT_TYPE_OPTIONS,
            http::HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            http::header::X_FRAME_OPTIONS,
            http::HeaderValue::from_static("DENY"),
        ));

    public_routes
        .merge(voice::create_voice_router())
        .merge(media_stream::create_media_stream_router())
        .with_state(app_state)
        .layer(security_headers)
}
