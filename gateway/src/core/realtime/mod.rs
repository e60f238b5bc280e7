//! Realtime conversational AI session.
//!
//! The bridge talks to the AI peer through a [`RealtimeHandle`] for outgoing
//! client events and a channel of [`RealtimeEvent`]s for everything coming
//! back. Only the OpenAI Realtime API is implemented.
//!
//! # Example
//!
//! ```rust,ignore
//! use callbridge_gateway::core::realtime::{OpenAIRealtime, RealtimeConfig};
//!
//! let (handle, mut events) = OpenAIRealtime::new(config)?.start();
//! handle.send(ClientEvent::response_create(None)).await?;
//! ```

mod base;
pub mod openai;

pub use base::{ConnectionState, RealtimeConfig, RealtimeError, RealtimeEvent, RealtimeResult};
pub use openai::{
    ClientEvent, Modality, OPENAI_REALTIME_SAMPLE_RATE, OPENAI_REALTIME_URL, OpenAIRealtime,
    OpenAIRealtimeAudioFormat, OpenAIRealtimeVoice, RealtimeHandle, SessionConfig, TurnDetection,
};
