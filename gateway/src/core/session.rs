//! Per-call mutable state.
//!
//! A [`CallSession`] is owned by exactly one bridge controller and is only
//! touched from that controller's event path, so it carries no locks.

use crate::core::turns::{ResponseRequest, TurnCoordinator};

/// State for one accepted telephony connection.
#[derive(Debug, Default)]
pub struct CallSession {
    stream_sid: Option<String>,
    call_sid: Option<String>,
    turn_text: String,
    turns: TurnCoordinator,
    output_pcm: Vec<u8>,
}

impl CallSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stream identifier assigned by the telephony side. Absent until `start`.
    pub fn stream_sid(&self) -> Option<&str> {
        self.stream_sid.as_deref()
    }

    pub fn set_stream_sid(&mut self, stream_sid: impl Into<String>) {
        self.stream_sid = Some(stream_sid.into());
    }

    pub fn call_sid(&self) -> Option<&str> {
        self.call_sid.as_deref()
    }

    pub fn set_call_sid(&mut self, call_sid: Option<String>) {
        self.call_sid = call_sid;
    }

    /// True from response acknowledgement until its completion.
    pub fn ai_response_in_flight(&self) -> bool {
        self.turns.response_in_flight()
    }

    pub fn queued_instruction(&self) -> Option<&ResponseRequest> {
        self.turns.queued_instruction()
    }

    pub fn turns(&self) -> &TurnCoordinator {
        &self.turns
    }

    pub fn turns_mut(&mut self) -> &mut TurnCoordinator {
        &mut self.turns
    }

    pub fn turn_text(&self) -> &str {
        &self.turn_text
    }

    pub fn append_turn_text(&mut self, fragment: &str) {
        self.turn_text.push_str(fragment);
    }

    /// Take the accumulated text of the current turn, leaving the buffer empty.
    pub fn take_turn_text(&mut self) -> String {
        std::mem::take(&mut self.turn_text)
    }

    /// Append AI output PCM and take the longest prefix that is a whole
    /// number of `frame_bytes` frames. The remainder is carried into the next
    /// call so decimation stays continuous across deltas.
    pub fn take_output_frames(&mut self, pcm: &[u8], frame_bytes: usize) -> Vec<u8> {
        self.output_pcm.extend_from_slice(pcm);
        let frame_bytes = frame_bytes.max(1);
        let usable = self.output_pcm.len() - self.output_pcm.len() % frame_bytes;
        let rest = self.output_pcm.split_off(usable);
        std::mem::replace(&mut self.output_pcm, rest)
    }

    /// Bytes of AI output PCM waiting for a complete frame.
    pub fn carried_output_len(&self) -> usize {
        self.output_pcm.len()
    }

    /// Drop carried output PCM at a playback boundary.
    pub fn clear_output_carry(&mut self) {
        self.output_pcm.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_session_is_empty() {
        let session = CallSession::new();
        assert!(session.stream_sid().is_none());
        assert!(session.call_sid().is_none());
        assert!(!session.ai_response_in_flight());
        assert!(session.queued_instruction().is_none());
        assert_eq!(session.turn_text(), "");
    }

    #[test]
    fn test_turn_text_accumulates_and_clears() {
        let mut session = CallSession::new();
        session.append_turn_text("Hello ");
        session.append_turn_text("there");
        assert_eq!(session.turn_text(), "Hello there");

        assert_eq!(session.take_turn_text(), "Hello there");
        assert_eq!(session.turn_text(), "");
    }

    #[test]
    fn test_in_flight_follows_coordinator() {
        let mut session = CallSession::new();
        session.turns_mut().caller_segment_ended(None);
        assert!(!session.ai_response_in_flight());
        session.turns_mut().response_started();
        assert!(session.ai_response_in_flight());
    }

    #[test]
    fn test_stream_sid_set_once_known() {
        let mut session = CallSession::new();
        session.set_stream_sid("MZ123");
        session.set_call_sid(Some("CA456".to_string()));
        assert_eq!(session.stream_sid(), Some("MZ123"));
        assert_eq!(session.call_sid(), Some("CA456"));
    }

    #[test]
    fn test_output_frames_carry_partial_remainder() {
        let mut session = CallSession::new();

        // 7 bytes with 6-byte frames: one frame out, one byte carried
        assert_eq!(session.take_output_frames(&[1, 2, 3, 4, 5, 6, 7], 6), vec![1, 2, 3, 4, 5, 6]);
        assert_eq!(session.carried_output_len(), 1);

        assert_eq!(session.take_output_frames(&[8, 9, 10], 6), Vec::<u8>::new());
        assert_eq!(session.carried_output_len(), 4);

        assert_eq!(session.take_output_frames(&[11, 12, 13], 6), vec![7, 8, 9, 10, 11, 12]);
        assert_eq!(session.carried_output_len(), 1);

        session.clear_output_carry();
        assert_eq!(session.carried_output_len(), 0);
    }
}
