//! OpenAI Realtime API client implementation.
//!
//! # API Reference
//!
//! - Endpoint: `wss://api.openai.com/v1/realtime?model=<model>`
//! - Protocol: WebSocket with JSON events
//!
//! [`OpenAIRealtime::start`] spawns the connection task and returns a
//! [`RealtimeHandle`] for sending client events plus the receiving end of the
//! event channel. The task owns the socket; the handle only talks to it
//! through channels, so it can be cloned and dropped freely.
//!
//! # Example
//!
//! ```rust,ignore
//! use callbridge_gateway::core::realtime::{OpenAIRealtime, RealtimeConfig, RealtimeEvent};
//!
//! let realtime = OpenAIRealtime::new(RealtimeConfig {
//!     api_key: "sk-...".to_string(),
//!     url: OPENAI_REALTIME_URL.to_string(),
//!     model: "gpt-4o-realtime-preview".to_string(),
//! })?;
//! let (handle, mut events) = realtime.start();
//! while let Some(event) = events.recv().await {
//!     if let RealtimeEvent::Closed { .. } = event {
//!         break;
//!     }
//! }
//! ```

use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use http::HeaderValue;
use parking_lot::RwLock;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::handshake::client::Request;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};
use url::Url;

use super::messages::{ClientEvent, ServerEvent};
use crate::core::realtime::base::{
    ConnectionState, RealtimeConfig, RealtimeError, RealtimeEvent, RealtimeResult,
};

/// Channel capacity for outgoing client events.
const WS_CHANNEL_CAPACITY: usize = 256;

/// Channel capacity for events delivered to the bridge.
const EVENT_CHANNEL_CAPACITY: usize = 1024;

// =============================================================================
// OpenAI Realtime Client
// =============================================================================

/// Validated connection settings for one OpenAI Realtime session.
pub struct OpenAIRealtime {
    config: RealtimeConfig,
    url: Url,
}

impl OpenAIRealtime {
    /// Validate the configuration. No connection is made yet.
    pub fn new(config: RealtimeConfig) -> RealtimeResult<Self> {
        if config.api_key.trim().is_empty() {
            return Err(RealtimeError::AuthenticationFailed(
                "API key is required for OpenAI Realtime".to_string(),
            ));
        }

        let mut url = Url::parse(&config.url).map_err(|e| {
            RealtimeError::InvalidConfiguration(format!("Invalid realtime URL '{}': {e}", config.url))
        })?;
        if !matches!(url.scheme(), "ws" | "wss") {
            return Err(RealtimeError::InvalidConfiguration(format!(
                "Realtime URL must use ws or wss, got: {}",
                url.scheme()
            )));
        }
        if !config.model.is_empty() {
            url.query_pairs_mut().append_pair("model", &config.model);
        }

        Ok(Self { config, url })
    }

    /// Full websocket URL including the model query parameter.
    pub fn ws_url(&self) -> &str {
        self.url.as_str()
    }

    fn build_request(&self) -> RealtimeResult<Request> {
        let mut request = self
            .url
            .as_str()
            .into_client_request()
            .map_err(|e| RealtimeError::ConnectionFailed(e.to_string()))?;

        let bearer = HeaderValue::from_str(&format!("Bearer {}", self.config.api_key))
            .map_err(|e| RealtimeError::InvalidConfiguration(format!("Invalid API key: {e}")))?;
        let headers = request.headers_mut();
        headers.insert(http::header::AUTHORIZATION, bearer);
        headers.insert("OpenAI-Beta", HeaderValue::from_static("realtime=v1"));

        Ok(request)
    }

    /// Spawn the connection task.
    ///
    /// The returned receiver yields [`RealtimeEvent::Ready`] once connected and
    /// always ends with a single [`RealtimeEvent::Closed`].
    pub fn start(self) -> (RealtimeHandle, mpsc::Receiver<RealtimeEvent>) {
        let (tx, rx) = mpsc::channel::<ClientEvent>(WS_CHANNEL_CAPACITY);
        let (event_tx, event_rx) = mpsc::channel::<RealtimeEvent>(EVENT_CHANNEL_CAPACITY);
        let cancel = CancellationToken::new();
        let state = Arc::new(RwLock::new(ConnectionState::Connecting));

        let handle = RealtimeHandle {
            sender: tx,
            cancel: cancel.clone(),
            state: state.clone(),
        };

        let request = self.build_request();
        tokio::spawn(async move {
            let reason = match request {
                Ok(request) => run_connection(request, rx, &event_tx, cancel, &state).await,
                Err(e) => {
                    *state.write() = ConnectionState::Failed;
                    Some(e.to_string())
                }
            };
            let _ = event_tx.send(RealtimeEvent::Closed { reason }).await;
        });

        (handle, event_rx)
    }
}

/// Drive one socket until either side closes or the handle cancels.
///
/// Returns the close reason, if any.
async fn run_connection(
    request: Request,
    mut outgoing: mpsc::Receiver<ClientEvent>,
    events: &mpsc::Sender<RealtimeEvent>,
    cancel: CancellationToken,
    state: &RwLock<ConnectionState>,
) -> Option<String> {
    let connect = tokio_tungstenite::connect_async(request);
    let ws_stream = tokio::select! {
        _ = cancel.cancelled() => {
            *state.write() = ConnectionState::Disconnected;
            return Some("closed before connecting".to_string());
        }
        result = connect => match result {
            Ok((ws_stream, _response)) => ws_stream,
            Err(e) => {
                warn!(error = %e, "Failed to connect to OpenAI Realtime API");
                *state.write() = ConnectionState::Failed;
                return Some(RealtimeError::ConnectionFailed(e.to_string()).to_string());
            }
        },
    };

    *state.write() = ConnectionState::Connected;
    info!("Connected to OpenAI Realtime API");
    if events.send(RealtimeEvent::Ready).await.is_err() {
        *state.write() = ConnectionState::Disconnected;
        return None;
    }

    let (mut ws_sink, mut ws_stream) = ws_stream.split();

    let reason = loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                debug!("Closing OpenAI Realtime connection");
                let _ = ws_sink.send(Message::Close(None)).await;
                break None;
            }

            // Handle outgoing messages
            outgoing_event = outgoing.recv() => {
                let Some(event) = outgoing_event else {
                    let _ = ws_sink.send(Message::Close(None)).await;
                    break None;
                };

                let json = match serde_json::to_string(&event) {
                    Ok(json) => json,
                    Err(e) => {
                        warn!(
                            "{}",
                            RealtimeError::SerializationError(format!("{}: {e}", event.event_type()))
                        );
                        continue;
                    }
                };

                if let Err(e) = ws_sink.send(Message::Text(json.into())).await {
                    break Some(RealtimeError::WebSocketError(e.to_string()).to_string());
                }
            }

            // Handle incoming messages
            incoming = ws_stream.next() => {
                match incoming {
                    Some(Ok(Message::Text(text))) => match ServerEvent::parse(&text) {
                        Some(event) => {
                            let Some(event) = event.into_realtime_event() else {
                                continue;
                            };
                            if events.send(event).await.is_err() {
                                let _ = ws_sink.send(Message::Close(None)).await;
                                break None;
                            }
                        }
                        None => trace!(len = text.len(), "Discarding unparseable server event"),
                    },
                    Some(Ok(Message::Ping(data))) => {
                        if let Err(e) = ws_sink.send(Message::Pong(data)).await {
                            break Some(RealtimeError::WebSocketError(e.to_string()).to_string());
                        }
                    }
                    Some(Ok(Message::Close(frame))) => {
                        info!("OpenAI Realtime connection closed by server");
                        break frame
                            .map(|f| f.reason.as_str().to_string())
                            .filter(|reason| !reason.is_empty());
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        warn!(error = %e, "OpenAI Realtime websocket error");
                        break Some(RealtimeError::WebSocketError(e.to_string()).to_string());
                    }
                    None => break Some("stream ended".to_string()),
                }
            }
        }
    };

    *state.write() = ConnectionState::Disconnected;
    reason
}

// =============================================================================
// Handle
// =============================================================================

/// Cheap, cloneable handle to a running realtime connection.
#[derive(Clone)]
pub struct RealtimeHandle {
    sender: mpsc::Sender<ClientEvent>,
    cancel: CancellationToken,
    state: Arc<RwLock<ConnectionState>>,
}

impl RealtimeHandle {
    /// Queue a client event for the socket.
    pub async fn send(&self, event: ClientEvent) -> RealtimeResult<()> {
        if self.cancel.is_cancelled() {
            return Err(RealtimeError::NotConnected);
        }
        self.sender
            .send(event)
            .await
            .map_err(|_| RealtimeError::NotConnected)
    }

    /// Close the connection. Calling this more than once has no further effect.
    pub fn close(&self) {
        self.cancel.cancel();
    }

    pub fn is_closed(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn connection_state(&self) -> ConnectionState {
        *self.state.read()
    }

    pub fn is_ready(&self) -> bool {
        !self.is_closed() && self.connection_state() == ConnectionState::Connected
    }
}
