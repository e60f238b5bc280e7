//! Bridge controller for one call.
//!
//! [`BridgeController`] is a synchronous state machine. The media-stream
//! handler feeds it [`BridgeInput`]s from the telephony socket, the realtime
//! connection and the greeting timer, and executes the [`BridgeAction`]s it
//! returns in order. Keeping I/O out of the controller means every ordering
//! and teardown rule can be tested without sockets.

use std::sync::Arc;
use std::time::Duration;

use base64::prelude::*;
use tracing::{debug, info, trace, warn};

use crate::config::TenantSettings;
use crate::core::booking::{BookingRecord, extract_booking};
use crate::core::codec::{
    TELEPHONY_SAMPLE_RATE, decimation_step, downsample_and_encode, generate_tone,
    pcm16le_to_samples,
};
use crate::core::realtime::openai::{ClientEvent, OpenAIRealtimeAudioFormat};
use crate::core::realtime::RealtimeEvent;
use crate::core::session::CallSession;
use crate::core::telephony::{TelephonyEvent, TelephonyOutgoing};
use crate::core::turns::{ResponseRequest, TurnState};

/// Settle time between AI readiness and the greeting request.
pub const DEFAULT_GREETING_DELAY: Duration = Duration::from_millis(300);

/// Connectivity tone played on stream start when enabled.
pub const SELF_CHECK_TONE_HZ: f64 = 440.0;
pub const SELF_CHECK_TONE_MS: u32 = 200;

/// Mark name used when the AI does not report an item id.
const DEFAULT_MARK_NAME: &str = "response_audio";

/// Everything that can happen to a call.
#[derive(Debug, Clone, PartialEq)]
pub enum BridgeInput {
    Telephony(TelephonyEvent),
    /// The telephony socket closed or errored.
    TelephonyClosed,
    Ai(RealtimeEvent),
    /// The greeting settle delay elapsed.
    GreetingDue,
}

/// Side effects requested by the controller, to be executed in order.
#[derive(Debug, Clone, PartialEq)]
pub enum BridgeAction {
    SendAi(ClientEvent),
    SendTelephony(TelephonyOutgoing),
    ScheduleGreeting(Duration),
    DeliverBooking(BookingRecord),
    CloseAi,
    CloseTelephony,
}

pub struct BridgeController {
    session: CallSession,
    settings: Arc<TenantSettings>,
    greeting_delay: Duration,
    telephony_open: bool,
    ai_open: bool,
    ai_ready: bool,
    greeting_scheduled: bool,
}

impl BridgeController {
    /// A controller for a freshly accepted call. Both sides start open: the AI
    /// connection is dialed at the same moment the telephony socket is accepted.
    pub fn new(settings: Arc<TenantSettings>, greeting_delay: Duration) -> Self {
        Self {
            session: CallSession::new(),
            settings,
            greeting_delay,
            telephony_open: true,
            ai_open: true,
            ai_ready: false,
            greeting_scheduled: false,
        }
    }

    pub fn session(&self) -> &CallSession {
        &self.session
    }

    pub fn settings(&self) -> &TenantSettings {
        &self.settings
    }

    pub fn telephony_open(&self) -> bool {
        self.telephony_open
    }

    pub fn ai_open(&self) -> bool {
        self.ai_open
    }

    pub fn ai_ready(&self) -> bool {
        self.ai_open && self.ai_ready
    }

    /// Both sides are closed; the call is over.
    pub fn is_finished(&self) -> bool {
        !self.telephony_open && !self.ai_open
    }

    pub fn handle(&mut self, input: BridgeInput) -> Vec<BridgeAction> {
        let mut actions = Vec::new();
        match input {
            BridgeInput::Telephony(event) => self.on_telephony(event, &mut actions),
            BridgeInput::TelephonyClosed => {
                if self.telephony_open {
                    info!("Telephony connection closed");
                    self.telephony_open = false;
                    self.teardown(&mut actions);
                }
            }
            BridgeInput::Ai(event) => self.on_ai(event, &mut actions),
            BridgeInput::GreetingDue => self.on_greeting_due(&mut actions),
        }
        actions
    }

    fn on_telephony(&mut self, event: TelephonyEvent, actions: &mut Vec<BridgeAction>) {
        if !self.telephony_open {
            return;
        }

        match event {
            TelephonyEvent::Connected { protocol, .. } => {
                debug!(protocol = ?protocol, "Telephony stream connected");
            }
            TelephonyEvent::Start { .. } => {
                let Some(stream_sid) = event.start_stream_sid().map(str::to_string) else {
                    warn!("Ignoring start event without a stream id");
                    return;
                };
                if let TelephonyEvent::Start { start, .. } = event {
                    self.session.set_call_sid(start.call_sid);
                }
                info!(
                    stream_sid = %stream_sid,
                    call_sid = ?self.session.call_sid(),
                    "Media stream started"
                );
                self.session.set_stream_sid(stream_sid.clone());

                if self.settings.self_check_tone {
                    let tone = generate_tone(SELF_CHECK_TONE_HZ, SELF_CHECK_TONE_MS);
                    actions.push(BridgeAction::SendTelephony(TelephonyOutgoing::media(
                        stream_sid,
                        BASE64_STANDARD.encode(tone),
                    )));
                }
            }
            TelephonyEvent::Media { media, .. } => {
                if !media.is_inbound() {
                    trace!(track = ?media.track, "Ignoring non-inbound media");
                    return;
                }
                if !self.ai_ready() {
                    trace!("Dropping caller audio, AI session not ready");
                    return;
                }
                actions.push(BridgeAction::SendAi(ClientEvent::audio_append(media.payload)));
            }
            TelephonyEvent::Mark { mark, .. } => {
                debug!(mark = %mark.name, "Playback mark reached");
            }
            TelephonyEvent::Stop { .. } => {
                info!(stream_sid = ?self.session.stream_sid(), "Media stream stopped");
                self.teardown(actions);
            }
            TelephonyEvent::Unknown => {}
        }
    }

    fn on_ai(&mut self, event: RealtimeEvent, actions: &mut Vec<BridgeAction>) {
        if !self.ai_open {
            return;
        }

        match event {
            RealtimeEvent::Ready => {
                info!("AI session ready");
                self.ai_ready = true;
                actions.push(BridgeAction::SendAi(ClientEvent::SessionUpdate {
                    session: self.settings.session_config(),
                }));
                if !self.greeting_scheduled {
                    self.greeting_scheduled = true;
                    actions.push(BridgeAction::ScheduleGreeting(self.greeting_delay));
                }
            }
            RealtimeEvent::SessionCreated { session_id } => {
                debug!(session_id = %session_id, "AI session created");
            }
            RealtimeEvent::SessionUpdated => debug!("AI session configured"),
            RealtimeEvent::Error {
                error_type,
                code,
                message,
            } => {
                warn!(
                    error_type = %error_type,
                    code = ?code,
                    message = %message,
                    "AI session reported an error"
                );
                // A rejected response.create never gets response.created
                if self.session.turns().state() == TurnState::ResponseRequested {
                    let next = self.session.turns_mut().request_failed();
                    push_request(next, actions);
                }
            }
            RealtimeEvent::SpeechStarted { .. } => {
                if !self.settings.barge_in {
                    return;
                }
                self.session.clear_output_carry();
                if let Some(stream_sid) = self.session.stream_sid() {
                    debug!("Caller started speaking, clearing playback");
                    actions.push(BridgeAction::SendTelephony(TelephonyOutgoing::clear(
                        stream_sid,
                    )));
                }
            }
            RealtimeEvent::InputCommitted { item_id } => {
                debug!(item_id = ?item_id, "Caller segment committed");
                let instructions = self.settings.turn_instructions.clone();
                let request = self.session.turns_mut().caller_segment_ended(instructions);
                push_request(request, actions);
            }
            RealtimeEvent::ResponseCreated { response_id } => {
                debug!(response_id = ?response_id, "AI response started");
                self.session.turns_mut().response_started();
            }
            RealtimeEvent::TextDelta { delta } => self.session.append_turn_text(&delta),
            RealtimeEvent::AudioDelta { audio, .. } => self.on_audio_delta(audio, actions),
            RealtimeEvent::AudioDone { item_id } => {
                self.session.clear_output_carry();
                if let Some(stream_sid) = self.session.stream_sid() {
                    let name = item_id.unwrap_or_else(|| DEFAULT_MARK_NAME.to_string());
                    actions.push(BridgeAction::SendTelephony(TelephonyOutgoing::mark(
                        stream_sid, name,
                    )));
                }
            }
            RealtimeEvent::ResponseDone {
                response_id,
                status,
            } => {
                debug!(response_id = ?response_id, status = ?status, "AI response done");
                if self.session.turns().response_in_flight() {
                    self.finish_turn(actions);
                }
                let next = self.session.turns_mut().response_finished();
                push_request(next, actions);
            }
            RealtimeEvent::Closed { reason } => {
                info!(reason = ?reason, "AI connection closed");
                self.ai_open = false;
                self.ai_ready = false;
                self.teardown(actions);
            }
        }
    }

    fn on_greeting_due(&mut self, actions: &mut Vec<BridgeAction>) {
        if !self.ai_ready() {
            return;
        }
        let instructions = self.settings.greeting_instructions.clone();
        match self.session.turns_mut().request_greeting(instructions) {
            Some(request) => {
                debug!("Requesting greeting");
                push_request(Some(request), actions);
            }
            None => debug!("Greeting skipped"),
        }
    }

    /// Route one AI audio delta to the caller, transcoding when needed.
    fn on_audio_delta(&mut self, audio: String, actions: &mut Vec<BridgeAction>) {
        let Some(stream_sid) = self.session.stream_sid().map(str::to_string) else {
            trace!("Dropping AI audio, stream id not known yet");
            return;
        };

        let payload = match self.settings.output_audio_format {
            OpenAIRealtimeAudioFormat::G711Ulaw => audio,
            OpenAIRealtimeAudioFormat::Pcm16 => {
                let pcm = match BASE64_STANDARD.decode(audio.as_bytes()) {
                    Ok(pcm) => pcm,
                    Err(e) => {
                        trace!(error = %e, "Dropping undecodable AI audio");
                        return;
                    }
                };
                let from_rate = self.settings.output_audio_format.sample_rate();
                let frame_bytes = 2 * decimation_step(from_rate, TELEPHONY_SAMPLE_RATE);
                let frames = self.session.take_output_frames(&pcm, frame_bytes);
                let samples = pcm16le_to_samples(&frames);
                let mulaw = downsample_and_encode(&samples, from_rate, TELEPHONY_SAMPLE_RATE);
                if mulaw.is_empty() {
                    return;
                }
                BASE64_STANDARD.encode(mulaw)
            }
        };

        actions.push(BridgeAction::SendTelephony(TelephonyOutgoing::media(
            stream_sid, payload,
        )));
    }

    /// Run booking extraction over the finished turn and clear its text.
    fn finish_turn(&mut self, actions: &mut Vec<BridgeAction>) {
        let text = self.session.take_turn_text();
        match extract_booking(&text) {
            Ok(Some(record)) => {
                info!(
                    name = %record.name,
                    start = %record.start,
                    emergency = record.emergency,
                    "Booking recognized"
                );
                actions.push(BridgeAction::DeliverBooking(record));
            }
            Ok(None) => {}
            Err(e) => warn!(error = %e, "Discarding malformed booking"),
        }
    }

    /// Close whichever side is still open. Each side is closed at most once.
    fn teardown(&mut self, actions: &mut Vec<BridgeAction>) {
        if self.ai_open {
            self.ai_open = false;
            self.ai_ready = false;
            actions.push(BridgeAction::CloseAi);
        }
        if self.telephony_open {
            self.telephony_open = false;
            actions.push(BridgeAction::CloseTelephony);
        }
    }
}

fn push_request(request: Option<ResponseRequest>, actions: &mut Vec<BridgeAction>) {
    if let Some(request) = request {
        actions.push(BridgeAction::SendAi(ClientEvent::response_create(
            request.instructions,
        )));
    }
}
