use axum::{Router, routing::get};
use tower_http::trace::TraceLayer;

use crate::handlers::voice::{incoming_call, incoming_call_for_tenant};
use crate::state::AppState;
use std::sync::Arc;

/// Create the call setup router
///
/// # Endpoints
///
/// - `POST /incoming-call` - default tenant
/// - `POST /incoming-call/{tenant}` - named tenant, 404 when unknown
///
/// GET is accepted too for providers configured to fetch the markup.
pub fn create_voice_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/incoming-call", get(incoming_call).post(incoming_call))
        .route(
            "/incoming-call/{tenant}",
            get(incoming_call_for_tenant).post(incoming_call_for_tenant),
        )
        .layer(TraceLayer::new_for_http())
}
