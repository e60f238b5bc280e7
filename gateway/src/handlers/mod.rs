//! HTTP and WebSocket request handlers
//!
//! - `api` - Health check endpoint
//! - `voice` - Call setup webhook answered with stream markup
//! - `media_stream` - Per-call telephony media stream bridged to the AI session

pub mod api;
pub mod media_stream;
pub mod voice;

pub use media_stream::{media_stream_handler, media_stream_tenant_handler};
