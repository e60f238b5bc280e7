//! OpenAI Realtime API WebSocket message types.
//!
//! Only the events the bridge sends or reacts to are modelled. Every other
//! server event deserializes to [`ServerEvent::Unknown`].
//!
//! Client events (sent to server):
//! - session.update
//! - input_audio_buffer.append
//! - response.create
//!
//! Server events (received from server):
//! - session.created, session.updated
//! - input_audio_buffer.speech_started, input_audio_buffer.speech_stopped
//! - input_audio_buffer.committed
//! - response.created, response.done
//! - response.text.delta, response.audio_transcript.delta
//! - response.audio.delta, response.audio.done
//! - error
//!
//! The `response.output_*` names used by newer API revisions are accepted as
//! aliases of the corresponding `response.*` events.

use serde::{Deserialize, Serialize};

use super::config::{Modality, OpenAIRealtimeAudioFormat, OpenAIRealtimeVoice};
use crate::core::realtime::base::RealtimeEvent;

// =============================================================================
// Session Configuration
// =============================================================================

/// Session configuration for OpenAI Realtime API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Response modalities (text, audio)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modalities: Option<Vec<Modality>>,

    /// System instructions for the assistant
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,

    /// Voice for audio output
    #[serde(skip_serializing_if = "Option::is_none")]
    pub voice: Option<OpenAIRealtimeVoice>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_audio_format: Option<OpenAIRealtimeAudioFormat>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_audio_format: Option<OpenAIRealtimeAudioFormat>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub turn_detection: Option<TurnDetection>,

    /// Temperature for response generation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

/// Turn detection configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum TurnDetection {
    /// Server-side VAD
    #[serde(rename = "server_vad")]
    ServerVad {
        /// Activation threshold
        #[serde(skip_serializing_if = "Option::is_none")]
        threshold: Option<f32>,
        /// Audio prefix padding in ms
        #[serde(skip_serializing_if = "Option::is_none")]
        prefix_padding_ms: Option<u32>,
        /// Silence duration to end a segment, in ms
        #[serde(skip_serializing_if = "Option::is_none")]
        silence_duration_ms: Option<u32>,
        /// Whether the server creates a response when a segment ends
        #[serde(skip_serializing_if = "Option::is_none")]
        create_response: Option<bool>,
        /// Whether caller speech interrupts an active response
        #[serde(skip_serializing_if = "Option::is_none")]
        interrupt_response: Option<bool>,
    },
}

impl TurnDetection {
    /// Server VAD that commits segments but leaves response creation to the client.
    pub fn server_vad_manual_response() -> Self {
        TurnDetection::ServerVad {
            threshold: None,
            prefix_padding_ms: None,
            silence_duration_ms: None,
            create_response: Some(false),
            interrupt_response: Some(false),
        }
    }
}

/// Per-response overrides for `response.create`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
}

// =============================================================================
// Client Events
// =============================================================================

/// Client events sent to the Realtime API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ClientEvent {
    /// Update session configuration
    #[serde(rename = "session.update")]
    SessionUpdate {
        /// Session configuration
        session: SessionConfig,
    },

    /// Append audio to input buffer
    #[serde(rename = "input_audio_buffer.append")]
    InputAudioBufferAppend {
        /// Base64-encoded audio data
        audio: String,
    },

    /// Create a response
    #[serde(rename = "response.create")]
    ResponseCreate {
        #[serde(skip_serializing_if = "Option::is_none")]
        response: Option<ResponseConfig>,
    },
}

impl ClientEvent {
    /// Append already base64-encoded audio.
    pub fn audio_append(audio_base64: impl Into<String>) -> Self {
        ClientEvent::InputAudioBufferAppend {
            audio: audio_base64.into(),
        }
    }

    /// Request a response, optionally with instructions for this response only.
    pub fn response_create(instructions: Option<String>) -> Self {
        ClientEvent::ResponseCreate {
            response: instructions.map(|instructions| ResponseConfig {
                instructions: Some(instructions),
            }),
        }
    }

    /// Event type name, for logging.
    pub fn event_type(&self) -> &'static str {
        match self {
            ClientEvent::SessionUpdate { .. } => "session.update",
            ClientEvent::InputAudioBufferAppend { .. } => "input_audio_buffer.append",
            ClientEvent::ResponseCreate { .. } => "response.create",
        }
    }
}

// =============================================================================
// Server Events
// =============================================================================

/// Server events received from the Realtime API.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type")]
pub enum ServerEvent {
    /// Error occurred
    #[serde(rename = "error")]
    Error {
        /// Error details
        error: ApiError,
    },

    /// Session created
    #[serde(rename = "session.created")]
    SessionCreated {
        #[serde(default)]
        session: Session,
    },

    /// Session updated
    #[serde(rename = "session.updated")]
    SessionUpdated {
        #[serde(default)]
        session: Session,
    },

    /// Speech started (VAD detected speech)
    #[serde(rename = "input_audio_buffer.speech_started")]
    SpeechStarted {
        #[serde(default)]
        audio_start_ms: u64,
        #[serde(default)]
        item_id: Option<String>,
    },

    /// Speech stopped (VAD detected silence)
    #[serde(rename = "input_audio_buffer.speech_stopped")]
    SpeechStopped {
        #[serde(default)]
        audio_end_ms: u64,
        #[serde(default)]
        item_id: Option<String>,
    },

    /// Audio buffer committed
    #[serde(rename = "input_audio_buffer.committed")]
    InputAudioBufferCommitted {
        #[serde(default)]
        previous_item_id: Option<String>,
        #[serde(default)]
        item_id: Option<String>,
    },

    /// Response created
    #[serde(rename = "response.created")]
    ResponseCreated {
        #[serde(default)]
        response: Response,
    },

    /// Response done
    #[serde(rename = "response.done")]
    ResponseDone {
        #[serde(default)]
        response: Response,
    },

    /// Text chunk
    #[serde(rename = "response.text.delta", alias = "response.output_text.delta")]
    TextDelta {
        #[serde(default)]
        item_id: Option<String>,
        delta: String,
    },

    /// Transcript chunk of spoken output
    #[serde(
        rename = "response.audio_transcript.delta",
        alias = "response.output_audio_transcript.delta"
    )]
    AudioTranscriptDelta {
        #[serde(default)]
        item_id: Option<String>,
        delta: String,
    },

    /// Audio data chunk
    #[serde(rename = "response.audio.delta", alias = "response.output_audio.delta")]
    AudioDelta {
        #[serde(default)]
        item_id: Option<String>,
        /// Base64-encoded audio
        delta: String,
    },

    /// Audio generation complete for one item
    #[serde(rename = "response.audio.done", alias = "response.output_audio.done")]
    AudioDone {
        #[serde(default)]
        item_id: Option<String>,
    },

    #[serde(other)]
    Unknown,
}

impl ServerEvent {
    /// Parse a text frame. Unparseable frames yield `None`.
    pub fn parse(text: &str) -> Option<Self> {
        serde_json::from_str(text).ok()
    }

    /// Map to the event the bridge consumes. Events the bridge ignores map to `None`.
    pub fn into_realtime_event(self) -> Option<RealtimeEvent> {
        match self {
            ServerEvent::Error { error } => Some(RealtimeEvent::Error {
                error_type: error.error_type,
                code: error.code,
                message: error.message,
            }),
            ServerEvent::SessionCreated { session } => Some(RealtimeEvent::SessionCreated {
                session_id: session.id,
            }),
            ServerEvent::SessionUpdated { .. } => Some(RealtimeEvent::SessionUpdated),
            ServerEvent::SpeechStarted { item_id, .. } => {
                Some(RealtimeEvent::SpeechStarted { item_id })
            }
            ServerEvent::InputAudioBufferCommitted { item_id, .. } => {
                Some(RealtimeEvent::InputCommitted { item_id })
            }
            ServerEvent::ResponseCreated { response } => Some(RealtimeEvent::ResponseCreated {
                response_id: response.id,
            }),
            ServerEvent::ResponseDone { response } => Some(RealtimeEvent::ResponseDone {
                response_id: response.id,
                status: response.status,
            }),
            ServerEvent::TextDelta { delta, .. }
            | ServerEvent::AudioTranscriptDelta { delta, .. } => {
                Some(RealtimeEvent::TextDelta { delta })
            }
            ServerEvent::AudioDelta { item_id, delta } => Some(RealtimeEvent::AudioDelta {
                item_id,
                audio: delta,
            }),
            ServerEvent::AudioDone { item_id } => Some(RealtimeEvent::AudioDone { item_id }),
            ServerEvent::SpeechStopped { .. } | ServerEvent::Unknown => None,
        }
    }
}

/// API error details.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ApiError {
    /// Error type
    #[serde(rename = "type", default)]
    pub error_type: String,
    /// Error code
    #[serde(default)]
    pub code: Option<String>,
    /// Error message
    #[serde(default)]
    pub message: String,
    /// Event ID that caused the error
    #[serde(default)]
    pub event_id: Option<String>,
}

/// Session information.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Session {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub model: Option<String>,
}

/// Response information.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Response {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}
