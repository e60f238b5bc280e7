//! Media stream WebSocket handler
//!
//! One call per connection. The telephony provider streams caller audio here
//! after the call setup webhook; the handler opens the AI realtime session,
//! feeds both peers' events into a [`BridgeController`] and carries out the
//! actions it returns.

use axum::{
    extract::{
        Path, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::time::{Duration, Instant};
use tracing::{Instrument, debug, error, info, info_span, trace, warn};
use uuid::Uuid;

use crate::config::TenantSettings;
use crate::core::booking::BookingRecord;
use crate::core::bridge::{BridgeAction, BridgeController, BridgeInput};
use crate::core::delivery::{BookingSink, DeliveryContext, dispatch_booking};
use crate::core::realtime::{OpenAIRealtime, RealtimeEvent, RealtimeHandle};
use crate::core::telephony::{TelephonyEvent, TelephonyOutgoing};
use crate::errors::{AppError, AppResult};
use crate::state::AppState;

/// Outbound telephony queue depth.
const CHANNEL_BUFFER_SIZE: usize = 1024;

/// Maximum WebSocket frame size (10 MB)
const MAX_WS_FRAME_SIZE: usize = 10 * 1024 * 1024;

/// Maximum WebSocket message size (10 MB)
const MAX_WS_MESSAGE_SIZE: usize = 10 * 1024 * 1024;

/// How long queued telephony frames may take to flush after the call ends.
const SENDER_DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

/// Items for the telephony sender task, in send order.
enum TelephonyRoute {
    Frame(String),
    Close,
}

/// `GET /media-stream` for the default tenant.
pub async fn media_stream_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> AppResult<Response> {
    upgrade(ws, state, None)
}

/// `GET /media-stream/{tenant}`.
pub async fn media_stream_tenant_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Path(tenant): Path<String>,
) -> AppResult<Response> {
    upgrade(ws, state, Some(tenant))
}

/// Resolve the tenant and AI client before accepting the upgrade, so a bad
/// tenant or missing credentials fail as plain HTTP errors.
fn upgrade(
    ws: WebSocketUpgrade,
    state: Arc<AppState>,
    tenant: Option<String>,
) -> AppResult<Response> {
    let settings = state
        .config
        .tenants
        .resolve(tenant.as_deref())
        .ok_or_else(|| AppError::UnknownTenant(tenant.unwrap_or_default()))?;
    let client = OpenAIRealtime::new(state.config.realtime_config()?)?;

    let call_id = Uuid::new_v4().to_string();
    let span = info_span!("call", call_id = %call_id, tenant = %settings.id);
    span.in_scope(|| info!("Media stream connection upgrade requested"));

    Ok(ws
        .max_frame_size(MAX_WS_FRAME_SIZE)
        .max_message_size(MAX_WS_MESSAGE_SIZE)
        .on_upgrade(move |socket| {
            handle_media_stream(socket, state, settings, client, call_id).instrument(span)
        }))
}

/// Run one call until both peers are closed.
async fn handle_media_stream(
    socket: WebSocket,
    state: Arc<AppState>,
    settings: Arc<TenantSettings>,
    client: OpenAIRealtime,
    call_id: String,
) {
    info!("Media stream connection established");

    let (mut sender, mut receiver) = socket.split();
    let (telephony_tx, mut telephony_rx) = mpsc::channel::<TelephonyRoute>(CHANNEL_BUFFER_SIZE);

    // Sender task for outgoing telephony frames
    let mut sender_task = tokio::spawn(
        async move {
            while let Some(route) = telephony_rx.recv().await {
                let (result, should_close) = match route {
                    TelephonyRoute::Frame(json) => {
                        (sender.send(Message::Text(json.into())).await, false)
                    }
                    TelephonyRoute::Close => {
                        debug!("Closing telephony WebSocket connection");
                        (sender.send(Message::Close(None)).await, true)
                    }
                };

                if let Err(e) = result {
                    debug!("Failed to send telephony frame: {}", e);
                    break;
                }
                if should_close {
                    break;
                }
            }
        }
        .in_current_span(),
    );

    let (ai, mut ai_events) = client.start();
    let call = CallContext {
        call_id,
        tenant: settings.id.clone(),
        booking_sink: state.booking_sink_for(&settings),
        telephony_tx,
        ai,
    };
    let mut controller = BridgeController::new(settings, state.config.greeting_delay());

    let greeting = tokio::time::sleep(Duration::ZERO);
    tokio::pin!(greeting);
    let mut greeting_armed = false;

    while !controller.is_finished() {
        let input = tokio::select! {
            msg = receiver.next(), if controller.telephony_open() => match msg {
                Some(Ok(Message::Text(text))) => match TelephonyEvent::parse(text.as_str()) {
                    Some(event) => BridgeInput::Telephony(event),
                    None => {
                        trace!("Discarding unparseable telephony frame");
                        continue;
                    }
                },
                Some(Ok(Message::Close(_))) | None => BridgeInput::TelephonyClosed,
                Some(Ok(_)) => continue,
                Some(Err(e)) => {
                    warn!("Telephony WebSocket error: {}", e);
                    BridgeInput::TelephonyClosed
                }
            },
            event = ai_events.recv(), if controller.ai_open() => match event {
                Some(event) => BridgeInput::Ai(event),
                None => BridgeInput::Ai(RealtimeEvent::Closed {
                    reason: Some("event channel closed".to_string()),
                }),
            },
            () = &mut greeting, if greeting_armed => {
                greeting_armed = false;
                BridgeInput::GreetingDue
            },
            else => break,
        };

        for action in controller.handle(input) {
            match action {
                BridgeAction::ScheduleGreeting(delay) => {
                    greeting.as_mut().reset(Instant::now() + delay);
                    greeting_armed = true;
                }
                BridgeAction::DeliverBooking(record) => {
                    let context = DeliveryContext {
                        call_id: call.call_id.clone(),
                        call_sid: controller.session().call_sid().map(str::to_string),
                        tenant: call.tenant.clone(),
                    };
                    call.deliver(record, context);
                }
                other => call.execute(other).await,
            }
        }
    }

    // Cleanup
    call.ai.close();
    drop(call);
    if tokio::time::timeout(SENDER_DRAIN_TIMEOUT, &mut sender_task)
        .await
        .is_err()
    {
        sender_task.abort();
    }

    info!("Media stream connection terminated");
}

/// Per-call I/O endpoints the controller's actions are carried out on.
struct CallContext {
    call_id: String,
    tenant: String,
    booking_sink: Option<Arc<dyn BookingSink>>,
    telephony_tx: mpsc::Sender<TelephonyRoute>,
    ai: RealtimeHandle,
}

impl CallContext {
    async fn execute(&self, action: BridgeAction) {
        match action {
            BridgeAction::SendAi(event) => {
                let kind = event.event_type();
                if let Err(e) = self.ai.send(event).await {
                    debug!(event = kind, "Dropping AI event: {}", e);
                }
            }
            BridgeAction::SendTelephony(frame) => self.send_telephony(&frame).await,
            BridgeAction::CloseAi => {
                debug!("Closing AI connection");
                self.ai.close();
            }
            BridgeAction::CloseTelephony => {
                let _ = self.telephony_tx.send(TelephonyRoute::Close).await;
            }
            BridgeAction::ScheduleGreeting(_) | BridgeAction::DeliverBooking(_) => {}
        }
    }

    async fn send_telephony(&self, frame: &TelephonyOutgoing) {
        match frame.to_json() {
            Ok(json) => {
                if self
                    .telephony_tx
                    .send(TelephonyRoute::Frame(json))
                    .await
                    .is_err()
                {
                    trace!("Telephony sender gone, dropping frame");
                }
            }
            Err(e) => error!("Failed to serialize telephony frame: {}", e),
        }
    }

    fn deliver(&self, record: BookingRecord, context: DeliveryContext) {
        match &self.booking_sink {
            Some(sink) => {
                dispatch_booking(sink.clone(), record, context);
            }
            None => warn!(
                name = %record.name,
                "Booking recognized but no booking webhook is configured"
            ),
        }
    }
}
