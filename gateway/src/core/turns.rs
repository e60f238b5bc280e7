//! Turn-taking between the caller and the realtime AI session.
//!
//! The AI peer rejects a `response.create` while another response is still
//! outstanding, so every request goes through [`TurnCoordinator`]. A caller
//! segment that ends while a response is outstanding is parked in a single
//! queue slot.
//!
//! # Queue policy
//!
//! The slot holds at most one request and the most recent one wins: a second
//! caller segment ending while busy overwrites the parked request. Greeting
//! requests are never queued; they are dropped unless the coordinator is idle.

use std::fmt;

use tracing::debug;

/// A pending `response.create` with optional per-response instructions.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ResponseRequest {
    pub instructions: Option<String>,
}

impl ResponseRequest {
    pub fn new(instructions: Option<String>) -> Self {
        Self { instructions }
    }
}

/// Turn state as seen from the bridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TurnState {
    /// No response outstanding.
    #[default]
    Idle,
    /// A response request was sent and not yet acknowledged.
    ResponseRequested,
    /// The AI acknowledged a response and is producing it.
    ResponseActive,
}

impl fmt::Display for TurnState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TurnState::Idle => write!(f, "idle"),
            TurnState::ResponseRequested => write!(f, "response_requested"),
            TurnState::ResponseActive => write!(f, "response_active"),
        }
    }
}

/// Gate for response requests. Returns the request to send, if any, from each transition.
#[derive(Debug, Default)]
pub struct TurnCoordinator {
    state: TurnState,
    queued: Option<ResponseRequest>,
}

impl TurnCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> TurnState {
        self.state
    }

    /// True while an acknowledged response is being produced.
    pub fn response_in_flight(&self) -> bool {
        self.state == TurnState::ResponseActive
    }

    /// True while any request is outstanding, acknowledged or not.
    pub fn is_busy(&self) -> bool {
        self.state != TurnState::Idle
    }

    pub fn queued_instruction(&self) -> Option<&ResponseRequest> {
        self.queued.as_ref()
    }

    /// The caller finished a speech segment (input buffer committed).
    pub fn caller_segment_ended(&mut self, instructions: Option<String>) -> Option<ResponseRequest> {
        let request = ResponseRequest::new(instructions);
        match self.state {
            TurnState::Idle => {
                self.state = TurnState::ResponseRequested;
                Some(request)
            }
            TurnState::ResponseRequested | TurnState::ResponseActive => {
                if self.queued.is_some() {
                    debug!(state = %self.state, "Replacing queued response request");
                } else {
                    debug!(state = %self.state, "Queueing response request until current turn completes");
                }
                self.queued = Some(request);
                None
            }
        }
    }

    /// Request the opening greeting. Dropped unless idle.
    pub fn request_greeting(&mut self, instructions: Option<String>) -> Option<ResponseRequest> {
        if self.state != TurnState::Idle {
            debug!(state = %self.state, "Skipping greeting, a response is already outstanding");
            return None;
        }
        self.state = TurnState::ResponseRequested;
        Some(ResponseRequest::new(instructions))
    }

    /// The AI acknowledged a response (`response.created`).
    ///
    /// A response the AI starts on its own is tracked the same way, so the
    /// gate stays closed until it completes.
    pub fn response_started(&mut self) {
        self.state = TurnState::ResponseActive;
    }

    /// The AI rejected our unacknowledged request with an `error` event.
    ///
    /// Only meaningful while `ResponseRequested`: the rejected request is no
    /// longer outstanding, so the queued request (if any) is issued in its
    /// place, otherwise the coordinator returns to idle. In any other state
    /// the error concerns something else and is ignored.
    pub fn request_failed(&mut self) -> Option<ResponseRequest> {
        if self.state != TurnState::ResponseRequested {
            return None;
        }
        match self.queued.take() {
            Some(next) => {
                debug!("Response request rejected, issuing queued request");
                Some(next)
            }
            None => {
                debug!("Response request rejected, returning to idle");
                self.state = TurnState::Idle;
                None
            }
        }
    }

    /// The AI completed a response (`response.done`).
    ///
    /// Returns the queued request when one is waiting; it is now outstanding.
    /// A completion that arrives while our own request is still unacknowledged
    /// belongs to some other response and is ignored.
    pub fn response_finished(&mut self) -> Option<ResponseRequest> {
        match self.state {
            TurnState::ResponseActive => match self.queued.take() {
                Some(next) => {
                    self.state = TurnState::ResponseRequested;
                    Some(next)
                }
                None => {
                    self.state = TurnState::Idle;
                    None
                }
            },
            TurnState::ResponseRequested | TurnState::Idle => {
                debug!(state = %self.state, "Ignoring completion without an active response");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_segment_end_when_idle_requests_immediately() {
        let mut turns = TurnCoordinator::new();
        let req = turns.caller_segment_ended(Some("continue".into()));
        assert_eq!(req, Some(ResponseRequest::new(Some("continue".into()))));
        assert_eq!(turns.state(), TurnState::ResponseRequested);
        assert!(!turns.response_in_flight());
    }

    #[test]
    fn test_ack_sets_in_flight() {
        let mut turns = TurnCoordinator::new();
        turns.caller_segment_ended(None);
        turns.response_started();
        assert!(turns.response_in_flight());
        assert_eq!(turns.state(), TurnState::ResponseActive);
    }

    #[test]
    fn test_completion_without_queue_returns_to_idle() {
        let mut turns = TurnCoordinator::new();
        turns.caller_segment_ended(None);
        turns.response_started();
        assert_eq!(turns.response_finished(), None);
        assert_eq!(turns.state(), TurnState::Idle);
        assert!(!turns.is_busy());
    }

    #[test]
    fn test_queued_request_overwrites_previous() {
        let mut turns = TurnCoordinator::new();
        turns.caller_segment_ended(Some("first".into()));
        turns.response_started();

        assert_eq!(turns.caller_segment_ended(Some("second".into())), None);
        assert_eq!(turns.caller_segment_ended(Some("third".into())), None);
        assert_eq!(
            turns.queued_instruction(),
            Some(&ResponseRequest::new(Some("third".into())))
        );

        let follow_up = turns.response_finished();
        assert_eq!(follow_up, Some(ResponseRequest::new(Some("third".into()))));
        assert_eq!(turns.state(), TurnState::ResponseRequested);
        assert!(turns.queued_instruction().is_none());

        turns.response_started();
        assert_eq!(turns.response_finished(), None);
        assert_eq!(turns.state(), TurnState::Idle);
    }

    #[test]
    fn test_segment_end_while_unacknowledged_is_queued() {
        let mut turns = TurnCoordinator::new();
        assert!(turns.caller_segment_ended(None).is_some());
        assert!(turns.caller_segment_ended(Some("later".into())).is_none());
        assert!(turns.queued_instruction().is_some());
    }

    #[test]
    fn test_greeting_only_when_idle() {
        let mut turns = TurnCoordinator::new();
        assert!(turns.request_greeting(Some("hello".into())).is_some());
        assert!(turns.request_greeting(Some("hello".into())).is_none());

        let mut busy = TurnCoordinator::new();
        busy.caller_segment_ended(None);
        busy.response_started();
        assert!(busy.request_greeting(None).is_none());
        assert!(busy.queued_instruction().is_none());
    }

    #[test]
    fn test_stray_completion_is_ignored() {
        let mut turns = TurnCoordinator::new();
        assert_eq!(turns.response_finished(), None);
        assert_eq!(turns.state(), TurnState::Idle);

        turns.caller_segment_ended(None);
        assert_eq!(turns.response_finished(), None);
        assert_eq!(turns.state(), TurnState::ResponseRequested);
    }

    #[test]
    fn test_rejected_request_returns_to_idle() {
        let mut turns = TurnCoordinator::new();
        assert!(turns.caller_segment_ended(None).is_some());

        assert_eq!(turns.request_failed(), None);
        assert_eq!(turns.state(), TurnState::Idle);

        assert_eq!(
            turns.caller_segment_ended(Some("again".into())),
            Some(ResponseRequest::new(Some("again".into())))
        );
        assert_eq!(turns.state(), TurnState::ResponseRequested);
    }

    #[test]
    fn test_rejected_request_issues_queued_one() {
        let mut turns = TurnCoordinator::new();
        turns.caller_segment_ended(Some("first".into()));
        turns.caller_segment_ended(Some("second".into()));

        assert_eq!(
            turns.request_failed(),
            Some(ResponseRequest::new(Some("second".into())))
        );
        assert_eq!(turns.state(), TurnState::ResponseRequested);
        assert!(turns.queued_instruction().is_none());
    }

    #[test]
    fn test_rejection_outside_requested_is_ignored() {
        let mut idle = TurnCoordinator::new();
        assert_eq!(idle.request_failed(), None);
        assert_eq!(idle.state(), TurnState::Idle);

        let mut active = TurnCoordinator::new();
        active.caller_segment_ended(None);
        active.response_started();
        active.caller_segment_ended(Some("queued".into()));
        assert_eq!(active.request_failed(), None);
        assert_eq!(active.state(), TurnState::ResponseActive);
        assert!(active.queued_instruction().is_some());
    }

    #[derive(Debug, Clone, Copy)]
    enum Step {
        SegmentEnd,
        AiAck,
        AiDone,
        AiReject,
    }

    /// Simulated AI peer counting requests it has received but not finished.
    #[derive(Default)]
    struct Peer {
        pending: usize,
        active: usize,
    }

    impl Peer {
        fn receive(&mut self, request: Option<ResponseRequest>) {
            if request.is_some() {
                self.pending += 1;
            }
        }

        fn outstanding(&self) -> usize {
            self.pending + self.active
        }
    }

    fn run(steps: &[Step]) {
        let mut turns = TurnCoordinator::new();
        let mut peer = Peer::default();

        for step in steps {
            match step {
                Step::SegmentEnd => peer.receive(turns.caller_segment_ended(None)),
                Step::AiAck => {
                    if peer.pending > 0 {
                        peer.pending -= 1;
                        peer.active += 1;
                        turns.response_started();
                    }
                }
                Step::AiDone => {
                    if peer.active > 0 {
                        peer.active -= 1;
                        peer.receive(turns.response_finished());
                    }
                }
                Step::AiReject => {
                    if peer.pending > 0 {
                        peer.pending -= 1;
                        peer.receive(turns.request_failed());
                    }
                }
            }
            assert!(
                peer.outstanding() <= 1,
                "more than one outstanding response after {steps:?}"
            );
        }
    }

    #[test]
    fn test_at_most_one_outstanding_for_all_interleavings() {
        const ALL: [Step; 4] = [
            Step::SegmentEnd,
            Step::AiAck,
            Step::AiDone,
            Step::AiReject,
        ];
        const LEN: u32 = 7;

        for mut code in 0..ALL.len().pow(LEN) {
            let mut steps = Vec::with_capacity(LEN as usize);
            for _ in 0..LEN {
                steps.push(ALL[code % ALL.len()]);
                code /= ALL.len();
            }
            run(&steps);
        }
    }
}
