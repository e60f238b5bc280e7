//! Telephony media-stream protocol.
//!
//! The telephony provider streams event-tagged JSON text frames over a
//! websocket: lifecycle events, base64 µ-law audio chunks and acknowledgements
//! of marks we send. The bridge answers with media, mark and clear frames
//! addressed by the stream id.

pub mod messages;

pub use messages::{
    MarkPayload, MediaFormat, MediaPayload, OutboundMedia, StartMetadata, StopMetadata,
    TelephonyEvent, TelephonyOutgoing,
};
