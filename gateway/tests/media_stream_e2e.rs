//! End-to-end media stream tests
//!
//! Run the gateway on a local port against a mock AI realtime peer and drive
//! calls from a telephony client over real WebSockets.

use std::net::SocketAddr;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, oneshot};
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, accept_async, connect_async};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use callbridge_gateway::config::{
    DEFAULT_GREETING_INSTRUCTIONS, ServerConfig, TenantDirectory, TenantSettings,
};
use callbridge_gateway::{routes, state::AppState};

const STEP_TIMEOUT: Duration = Duration::from_secs(5);

type TelephonySocket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Scripted stand-in for the AI realtime service.
struct MockAi {
    /// Client events the gateway sent, parsed.
    received: mpsc::UnboundedReceiver<Value>,
    /// Frames to push to the gateway. A close frame ends the connection.
    outgoing: mpsc::UnboundedSender<Message>,
    /// Fires when the gateway's connection ends.
    closed: oneshot::Receiver<()>,
}

impl MockAi {
    async fn start() -> (SocketAddr, Self) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let (received_tx, received) = mpsc::unbounded_channel();
        let (outgoing, mut outgoing_rx) = mpsc::unbounded_channel::<Message>();
        let (closed_tx, closed) = oneshot::channel();

        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let ws = accept_async(stream).await.unwrap();
            let (mut sink, mut stream) = ws.split();

            loop {
                tokio::select! {
                    msg = stream.next() => match msg {
                        Some(Ok(Message::Text(text))) => {
                            let value: Value = serde_json::from_str(text.as_str()).unwrap();
                            let _ = received_tx.send(value);
                        }
                        Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                        Some(Ok(_)) => {}
                    },
                    Some(frame) = outgoing_rx.recv() => {
                        let is_close = matches!(frame, Message::Close(_));
                        if sink.send(frame).await.is_err() || is_close {
                            break;
                        }
                    }
                }
            }
            let _ = closed_tx.send(());
        });

        (
            addr,
            Self {
                received,
                outgoing,
                closed,
            },
        )
    }

    async fn next_event(&mut self) -> Value {
        timeout(STEP_TIMEOUT, self.received.recv())
            .await
            .expect("timed out waiting for a client event")
            .expect("mock AI connection ended")
    }

    fn send(&self, event: Value) {
        self.outgoing
            .send(Message::Text(event.to_string().into()))
            .unwrap();
    }

    fn hang_up(&self) {
        self.outgoing.send(Message::Close(None)).unwrap();
    }
}

fn config(realtime_addr: SocketAddr, tenant: TenantSettings) -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        public_url: None,
        tls: None,
        openai_api_key: Some("sk-test".to_string()),
        realtime_url: format!("ws://{realtime_addr}/v1/realtime"),
        realtime_model: "gpt-4o-realtime-preview".to_string(),
        greeting_delay_ms: 100,
        booking_webhook_url: None,
        booking_webhook_timeout_seconds: 5,
        tenants: TenantDirectory::single(tenant),
    }
}

async fn start_gateway(config: ServerConfig) -> SocketAddr {
    let _ = rustls::crypto::ring::default_provider().install_default();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = routes::create_app(AppState::new(config));
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

async fn connect_telephony(gateway: SocketAddr, tenant: &str) -> TelephonySocket {
    let (socket, _) = connect_async(format!("ws://{gateway}/media-stream/{tenant}"))
        .await
        .unwrap();
    socket
}

async fn send_frame(socket: &mut TelephonySocket, frame: Value) {
    socket
        .send(Message::Text(frame.to_string().into()))
        .await
        .unwrap();
}

/// Next JSON frame from the gateway, skipping control frames.
async fn next_frame(socket: &mut TelephonySocket) -> Value {
    loop {
        let msg = timeout(STEP_TIMEOUT, socket.next())
            .await
            .expect("timed out waiting for a telephony frame")
            .expect("telephony socket ended")
            .unwrap();
        match msg {
            Message::Text(text) => return serde_json::from_str(text.as_str()).unwrap(),
            Message::Close(_) => panic!("telephony socket closed"),
            _ => continue,
        }
    }
}

/// Wait until the gateway closes the telephony socket.
async fn expect_telephony_closed(socket: &mut TelephonySocket) {
    timeout(STEP_TIMEOUT, async {
        while let Some(msg) = socket.next().await {
            match msg {
                Ok(Message::Close(_)) | Err(_) => return,
                Ok(_) => continue,
            }
        }
    })
    .await
    .expect("telephony socket was not closed");
}

fn start_frame() -> Value {
    json!({
        "event": "start",
        "streamSid": "MZ1",
        "start": {
            "streamSid": "MZ1",
            "callSid": "CA1",
            "tracks": ["inbound"],
            "mediaFormat": {"encoding": "audio/x-mulaw", "sampleRate": 8000, "channels": 1}
        }
    })
}

#[tokio::test]
async fn test_full_call_with_booking() {
    let webhook = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/bookings"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&webhook)
        .await;

    let (ai_addr, mut ai) = MockAi::start().await;
    let tenant = TenantSettings {
        id: "acme".to_string(),
        booking_webhook_url: Some(format!("{}/bookings", webhook.uri())),
        ..Default::default()
    };
    let gateway = start_gateway(config(ai_addr, tenant)).await;
    let mut telephony = connect_telephony(gateway, "acme").await;

    send_frame(
        &mut telephony,
        json!({"event": "connected", "protocol": "Call", "version": "1.0.0"}),
    )
    .await;
    send_frame(&mut telephony, start_frame()).await;

    // Session configuration comes first, with server-side responses disabled
    let update = ai.next_event().await;
    assert_eq!(update["type"], "session.update");
    assert_eq!(update["session"]["input_audio_format"], "g711_ulaw");
    assert_eq!(update["session"]["turn_detection"]["create_response"], false);

    // Greeting after the settle delay
    let greeting = ai.next_event().await;
    assert_eq!(greeting["type"], "response.create");
    assert_eq!(
        greeting["response"]["instructions"],
        DEFAULT_GREETING_INSTRUCTIONS
    );

    // Only the inbound track reaches the AI, payload untouched
    send_frame(
        &mut telephony,
        json!({"event": "media", "streamSid": "MZ1", "media": {"track": "outbound", "payload": "ZZZZ"}}),
    )
    .await;
    send_frame(
        &mut telephony,
        json!({"event": "media", "streamSid": "MZ1", "media": {"track": "inbound", "chunk": "1", "payload": "AAEC"}}),
    )
    .await;
    let append = ai.next_event().await;
    assert_eq!(append["type"], "input_audio_buffer.append");
    assert_eq!(append["audio"], "AAEC");

    // One response with audio, a transcript carrying a booking, and a caller
    // segment committed while it is still in flight
    ai.send(json!({"type": "response.created", "response": {"id": "resp_1"}}));
    ai.send(json!({"type": "response.audio.delta", "item_id": "item_1", "delta": "//8="}));
    ai.send(json!({"type": "response.audio_transcript.delta", "item_id": "item_1", "delta": "Booked. BOOKING: {\"name\":\"Jane\",\"phone\":\"555\","}));
    ai.send(json!({"type": "input_audio_buffer.committed", "item_id": "item_2"}));
    ai.send(json!({"type": "response.audio_transcript.delta", "item_id": "item_1", "delta": "\"address\":\"1 Main\",\"job\":\"leak\",\"start\":\"2025-03-01T09:00:00Z\",\"end\":\"2025-03-01T10:00:00Z\"}"}));
    ai.send(json!({"type": "response.audio.done", "item_id": "item_1"}));
    ai.send(json!({"type": "response.done", "response": {"id": "resp_1", "status": "completed"}}));

    let media = next_frame(&mut telephony).await;
    assert_eq!(
        media,
        json!({"event": "media", "streamSid": "MZ1", "media": {"payload": "//8="}})
    );
    let mark = next_frame(&mut telephony).await;
    assert_eq!(
        mark,
        json!({"event": "mark", "streamSid": "MZ1", "mark": {"name": "item_1"}})
    );

    // The queued caller turn is requested once the first response is done
    let follow_up = ai.next_event().await;
    assert_eq!(follow_up["type"], "response.create");
    assert!(
        timeout(Duration::from_millis(200), ai.received.recv())
            .await
            .is_err(),
        "only one response may be outstanding"
    );

    // The booking reaches the webhook with the call's identifiers
    let mut requests = Vec::new();
    for _ in 0..50 {
        requests = webhook.received_requests().await.unwrap();
        if !requests.is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    assert_eq!(requests.len(), 1);
    let body: Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(body["name"], "Jane");
    assert_eq!(body["start"], "2025-03-01T09:00:00Z");
    assert_eq!(body["emergency"], false);
    assert_eq!(requests[0].headers.get("x-tenant").unwrap(), "acme");
    assert_eq!(requests[0].headers.get("x-call-sid").unwrap(), "CA1");

    // Barge-in clears buffered playback
    ai.send(json!({"type": "input_audio_buffer.speech_started", "item_id": "item_3"}));
    let clear = next_frame(&mut telephony).await;
    assert_eq!(clear, json!({"event": "clear", "streamSid": "MZ1"}));

    // Stop tears down both sides
    send_frame(&mut telephony, json!({"event": "stop", "streamSid": "MZ1"})).await;
    timeout(STEP_TIMEOUT, ai.closed)
        .await
        .expect("AI connection was not closed")
        .unwrap();
    expect_telephony_closed(&mut telephony).await;
}

#[tokio::test]
async fn test_unparseable_frames_are_ignored() {
    let (ai_addr, mut ai) = MockAi::start().await;
    let gateway = start_gateway(config(ai_addr, TenantSettings::default())).await;
    let mut telephony = connect_telephony(gateway, "default").await;

    send_frame(&mut telephony, start_frame()).await;
    assert_eq!(ai.next_event().await["type"], "session.update");
    assert_eq!(ai.next_event().await["type"], "response.create");

    telephony
        .send(Message::Text("not json".into()))
        .await
        .unwrap();
    send_frame(&mut telephony, json!({"event": "dtmf", "dtmf": {"digit": "1"}})).await;
    send_frame(
        &mut telephony,
        json!({"event": "media", "streamSid": "MZ1", "media": {"payload": "AQID"}}),
    )
    .await;

    let append = ai.next_event().await;
    assert_eq!(append["type"], "input_audio_buffer.append");
    assert_eq!(append["audio"], "AQID");
}

#[tokio::test]
async fn test_telephony_hangup_closes_ai_session() {
    let (ai_addr, mut ai) = MockAi::start().await;
    let gateway = start_gateway(config(ai_addr, TenantSettings::default())).await;
    let mut telephony = connect_telephony(gateway, "default").await;

    send_frame(&mut telephony, start_frame()).await;
    assert_eq!(ai.next_event().await["type"], "session.update");

    telephony.close(None).await.unwrap();
    timeout(STEP_TIMEOUT, ai.closed)
        .await
        .expect("AI connection was not closed")
        .unwrap();
}

#[tokio::test]
async fn test_ai_close_hangs_up_telephony() {
    let (ai_addr, mut ai) = MockAi::start().await;
    let gateway = start_gateway(config(ai_addr, TenantSettings::default())).await;
    let mut telephony = connect_telephony(gateway, "default").await;

    send_frame(&mut telephony, start_frame()).await;
    assert_eq!(ai.next_event().await["type"], "session.update");

    ai.hang_up();
    expect_telephony_closed(&mut telephony).await;
}

/// The AI side is unreachable: the call is accepted and then hung up.
#[tokio::test]
async fn test_unreachable_ai_hangs_up_telephony() {
    let unused = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let ai_addr = unused.local_addr().unwrap();
    drop(unused);

    let gateway = start_gateway(config(ai_addr, TenantSettings::default())).await;
    let mut telephony = connect_telephony(gateway, "default").await;

    expect_telephony_closed(&mut telephony).await;
}

#[tokio::test]
async fn test_unknown_tenant_is_refused() {
    let (ai_addr, _ai) = MockAi::start().await;
    let tenant = TenantSettings {
        id: "acme".to_string(),
        ..Default::default()
    };
    let gateway = start_gateway(config(ai_addr, tenant)).await;

    let result = connect_async(format!("ws://{gateway}/media-stream/initech")).await;
    match result {
        Err(tokio_tungstenite::tungstenite::Error::Http(response)) => {
            assert_eq!(response.status(), 404);
        }
        Err(e) => panic!("expected an HTTP 404 rejection, got {e}"),
        Ok(_) => panic!("upgrade for an unknown tenant was accepted"),
    }
}
