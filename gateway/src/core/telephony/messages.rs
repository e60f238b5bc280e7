//! Telephony media-stream frames.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Track name the provider uses for caller audio.
pub const INBOUND_TRACK: &str = "inbound";

// =============================================================================
// Incoming Frames (Telephony -> Bridge)
// =============================================================================

/// Inbound frame, tagged by `event`. Unknown tags parse as [`TelephonyEvent::Unknown`].
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "event", rename_all = "lowercase")]
pub enum TelephonyEvent {
    /// Socket-level hello, sent once before `start`.
    Connected {
        #[serde(default)]
        protocol: Option<String>,
        #[serde(default)]
        version: Option<String>,
    },

    /// Streaming began. Carries the stream id used to address outbound frames.
    Start {
        #[serde(rename = "streamSid", default)]
        stream_sid: Option<String>,
        #[serde(default)]
        start: StartMetadata,
    },

    /// One chunk of caller audio.
    Media {
        #[serde(rename = "streamSid", default)]
        stream_sid: Option<String>,
        media: MediaPayload,
    },

    /// A mark we sent has been played out.
    Mark {
        #[serde(rename = "streamSid", default)]
        stream_sid: Option<String>,
        mark: MarkPayload,
    },

    /// The stream ended.
    Stop {
        #[serde(rename = "streamSid", default)]
        stream_sid: Option<String>,
        #[serde(default)]
        stop: StopMetadata,
    },

    #[serde(other)]
    Unknown,
}

impl TelephonyEvent {
    /// Parse a text frame. Frames that are not valid JSON or lack required
    /// fields yield `None` and are dropped by the caller.
    pub fn parse(text: &str) -> Option<Self> {
        serde_json::from_str(text).ok()
    }

    /// Stream id of a `start` frame, preferring the top-level field.
    pub fn start_stream_sid(&self) -> Option<&str> {
        match self {
            TelephonyEvent::Start { stream_sid, start } => {
                stream_sid.as_deref().or(start.stream_sid.as_deref())
            }
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StartMetadata {
    pub stream_sid: Option<String>,
    pub account_sid: Option<String>,
    pub call_sid: Option<String>,
    pub tracks: Vec<String>,
    pub custom_parameters: HashMap<String, String>,
    pub media_format: Option<MediaFormat>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaFormat {
    pub encoding: String,
    pub sample_rate: u32,
    #[serde(default = "default_channels")]
    pub channels: u16,
}

fn default_channels() -> u16 {
    1
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MediaPayload {
    /// Base64 µ-law bytes.
    pub payload: String,
    #[serde(default)]
    pub track: Option<String>,
    #[serde(default)]
    pub chunk: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
}

impl MediaPayload {
    /// Frames without a track are caller audio.
    pub fn is_inbound(&self) -> bool {
        self.track.as_deref().is_none_or(|track| track == INBOUND_TRACK)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkPayload {
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StopMetadata {
    pub account_sid: Option<String>,
    pub call_sid: Option<String>,
}

// =============================================================================
// Outgoing Frames (Bridge -> Telephony)
// =============================================================================

/// Outbound frame, tagged by `event`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "lowercase")]
pub enum TelephonyOutgoing {
    /// Audio to play to the caller.
    Media {
        #[serde(rename = "streamSid")]
        stream_sid: String,
        media: OutboundMedia,
    },

    /// Ask the provider to acknowledge once playback reaches this point.
    Mark {
        #[serde(rename = "streamSid")]
        stream_sid: String,
        mark: MarkPayload,
    },

    /// Discard audio buffered for playback.
    Clear {
        #[serde(rename = "streamSid")]
        stream_sid: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutboundMedia {
    /// Base64 µ-law bytes.
    pub payload: String,
}

impl TelephonyOutgoing {
    pub fn media(stream_sid: impl Into<String>, payload: impl Into<String>) -> Self {
        TelephonyOutgoing::Media {
            stream_sid: stream_sid.into(),
            media: OutboundMedia {
                payload: payload.into(),
            },
        }
    }

    pub fn mark(stream_sid: impl Into<String>, name: impl Into<String>) -> Self {
        TelephonyOutgoing::Mark {
            stream_sid: stream_sid.into(),
            mark: MarkPayload { name: name.into() },
        }
    }

    pub fn clear(stream_sid: impl Into<String>) -> Self {
        TelephonyOutgoing::Clear {
            stream_sid: stream_sid.into(),
        }
    }

    /// Serialize to the JSON text sent on the socket.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_start_frame_deserialization() {
        let frame = json!({
            "event": "start",
            "sequenceNumber": "1",
            "streamSid": "MZ123",
            "start": {
                "accountSid": "AC1",
                "streamSid": "MZ123",
                "callSid": "CA456",
                "tracks": ["inbound"],
                "customParameters": {"tenant": "acme"},
                "mediaFormat": {"encoding": "audio/x-mulaw", "sampleRate": 8000, "channels": 1}
            }
        })
        .to_string();

        let event = TelephonyEvent::parse(&frame).unwrap();
        assert_eq!(event.start_stream_sid(), Some("MZ123"));
        match event {
            TelephonyEvent::Start { start, .. } => {
                assert_eq!(start.call_sid.as_deref(), Some("CA456"));
                assert_eq!(start.custom_parameters.get("tenant").unwrap(), "acme");
                let format = start.media_format.unwrap();
                assert_eq!(format.encoding, "audio/x-mulaw");
                assert_eq!(format.sample_rate, 8000);
            }
            other => panic!("expected start, got {other:?}"),
        }
    }

    #[test]
    fn test_start_stream_sid_falls_back_to_metadata() {
        let frame = r#"{"event":"start","start":{"streamSid":"MZ9"}}"#;
        let event = TelephonyEvent::parse(frame).unwrap();
        assert_eq!(event.start_stream_sid(), Some("MZ9"));
    }

    #[test]
    fn test_media_frame_deserialization() {
        let frame = r#"{"event":"media","sequenceNumber":"3","streamSid":"MZ123","media":{"track":"inbound","chunk":"1","timestamp":"5","payload":"//8="}}"#;
        match TelephonyEvent::parse(frame).unwrap() {
            TelephonyEvent::Media { media, .. } => {
                assert_eq!(media.payload, "//8=");
                assert!(media.is_inbound());
                assert_eq!(media.chunk.as_deref(), Some("1"));
            }
            other => panic!("expected media, got {other:?}"),
        }
    }

    #[test]
    fn test_outbound_track_is_not_inbound() {
        let media = MediaPayload {
            payload: String::new(),
            track: Some("outbound".to_string()),
            chunk: None,
            timestamp: None,
        };
        assert!(!media.is_inbound());
    }

    #[test]
    fn test_mark_and_stop_frames() {
        let mark = TelephonyEvent::parse(r#"{"event":"mark","streamSid":"MZ1","mark":{"name":"item_1"}}"#);
        assert!(matches!(mark, Some(TelephonyEvent::Mark { ref mark, .. }) if mark.name == "item_1"));

        let stop = TelephonyEvent::parse(r#"{"event":"stop","streamSid":"MZ1","stop":{"callSid":"CA1"}}"#);
        assert!(matches!(stop, Some(TelephonyEvent::Stop { .. })));

        let bare_stop = TelephonyEvent::parse(r#"{"event":"stop"}"#);
        assert!(matches!(bare_stop, Some(TelephonyEvent::Stop { .. })));
    }

    #[test]
    fn test_unknown_event_is_not_an_error() {
        let event = TelephonyEvent::parse(r#"{"event":"dtmf","dtmf":{"digit":"1"}}"#);
        assert_eq!(event, Some(TelephonyEvent::Unknown));
    }

    #[test]
    fn test_malformed_frames_are_rejected() {
        assert!(TelephonyEvent::parse("not json").is_none());
        assert!(TelephonyEvent::parse(r#"{"no_event":true}"#).is_none());
        assert!(TelephonyEvent::parse(r#"{"event":"media"}"#).is_none());
    }

    #[test]
    fn test_outgoing_serialization() {
        let media = serde_json::to_value(TelephonyOutgoing::media("MZ1", "AAA=")).unwrap();
        assert_eq!(
            media,
            json!({"event": "media", "streamSid": "MZ1", "media": {"payload": "AAA="}})
        );

        let mark = serde_json::to_value(TelephonyOutgoing::mark("MZ1", "item_7")).unwrap();
        assert_eq!(
            mark,
            json!({"event": "mark", "streamSid": "MZ1", "mark": {"name": "item_7"}})
        );

        let clear = TelephonyOutgoing::clear("MZ1").to_json().unwrap();
        assert_eq!(clear, r#"{"event":"clear","streamSid":"MZ1"}"#);
    }
}
