//! Shared types for the realtime AI session.
//!
//! The connection client translates provider events into [`RealtimeEvent`] and
//! delivers them over a channel. The bridge never sees raw provider frames.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur during realtime operations.
#[derive(Debug, Error)]
pub enum RealtimeError {
    /// Connection to the provider failed
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Authentication failed
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// WebSocket error
    #[error("WebSocket error: {0}")]
    WebSocketError(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Not connected
    #[error("Not connected")]
    NotConnected,
}

/// Result type for realtime operations.
pub type RealtimeResult<T> = Result<T, RealtimeError>;

// =============================================================================
// Configuration Types
// =============================================================================

/// Connection settings for one realtime session.
///
/// Behavioural settings (prompt, voice, formats) are sent after the socket
/// opens as a `session.update`, so they are not part of this struct.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct RealtimeConfig {
    /// API key for authentication
    pub api_key: String,

    /// Websocket endpoint, without query string
    pub url: String,

    /// Model to use (e.g., "gpt-4o-realtime-preview")
    pub model: String,
}

impl fmt::Debug for RealtimeConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RealtimeConfig")
            .field("api_key", &"<redacted>")
            .field("url", &self.url)
            .field("model", &self.model)
            .finish()
    }
}

// =============================================================================
// Connection State
// =============================================================================

/// Connection state for realtime providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConnectionState {
    /// Not connected to the provider
    #[default]
    Disconnected,
    /// Currently connecting
    Connecting,
    /// Connected and ready
    Connected,
    /// Connection failed
    Failed,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionState::Disconnected => write!(f, "Disconnected"),
            ConnectionState::Connecting => write!(f, "Connecting"),
            ConnectionState::Connected => write!(f, "Connected"),
            ConnectionState::Failed => write!(f, "Failed"),
        }
    }
}

// =============================================================================
// Events
// =============================================================================

/// Events delivered by a realtime connection, in arrival order.
///
/// `Ready` is emitted once when the socket opens. `Closed` is always the last
/// event and is emitted exactly once, also when the handshake fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RealtimeEvent {
    /// Socket is open and accepts client events.
    Ready,
    SessionCreated {
        session_id: String,
    },
    SessionUpdated,
    /// The provider reported a protocol or processing error.
    Error {
        error_type: String,
        code: Option<String>,
        message: String,
    },
    /// Server VAD detected the caller speaking.
    SpeechStarted {
        item_id: Option<String>,
    },
    /// The caller finished a speech segment.
    InputCommitted {
        item_id: Option<String>,
    },
    ResponseCreated {
        response_id: Option<String>,
    },
    /// Text or transcript fragment of the current response.
    TextDelta {
        delta: String,
    },
    /// Base64 audio fragment in the session's output format.
    AudioDelta {
        item_id: Option<String>,
        audio: String,
    },
    AudioDone {
        item_id: Option<String>,
    },
    ResponseDone {
        response_id: Option<String>,
        status: Option<String>,
    },
    Closed {
        reason: Option<String>,
    },
}

impl RealtimeEvent {
    /// Short name for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            RealtimeEvent::Ready => "ready",
            RealtimeEvent::SessionCreated { .. } => "session_created",
            RealtimeEvent::SessionUpdated => "session_updated",
            RealtimeEvent::Error { .. } => "error",
            RealtimeEvent::SpeechStarted { .. } => "speech_started",
            RealtimeEvent::InputCommitted { .. } => "input_committed",
            RealtimeEvent::ResponseCreated { .. } => "response_created",
            RealtimeEvent::TextDelta { .. } => "text_delta",
            RealtimeEvent::AudioDelta { .. } => "audio_delta",
            RealtimeEvent::AudioDone { .. } => "audio_done",
            RealtimeEvent::ResponseDone { .. } => "response_done",
            RealtimeEvent::Closed { .. } => "closed",
        }
    }
}
