//! OpenAI Realtime API module.
//!
//! Bidirectional session with OpenAI's Realtime API: caller audio is appended
//! to the input buffer, server VAD commits speech segments, and responses
//! stream back as audio and text deltas.
//!
//! # Supported Voices
//!
//! alloy, ash, ballad, coral, echo, sage, shimmer, verse
//!
//! # Audio Format
//!
//! Input is always G.711 u-law at 8kHz, the format the telephony leg carries.
//! Output is either G.711 u-law or PCM 16-bit signed little-endian at 24kHz.

mod client;
mod config;
mod messages;

pub use client::{OpenAIRealtime, RealtimeHandle};
pub use config::{
    DEFAULT_REALTIME_MODEL, MAX_TEMPERATURE, MIN_TEMPERATURE, Modality,
    OPENAI_REALTIME_SAMPLE_RATE, OPENAI_REALTIME_URL, OpenAIRealtimeAudioFormat,
    OpenAIRealtimeVoice,
};
pub use messages::{
    ApiError, ClientEvent, Response, ResponseConfig, ServerEvent, Session, SessionConfig,
    TurnDetection,
};
