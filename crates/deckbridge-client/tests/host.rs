//! End-to-end scenarios against an in-process fake host.

use deckbridge_client::{ActionHandler, ClientError, Commands, Connection, Router};
use deckbridge_core::{ConnectionState, EventKind, Manifest, RegistrationFrame};
use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{WebSocketStream, accept_async};

const WAIT: Duration = Duration::from_secs(5);

struct FakeHost {
    listener: TcpListener,
}

impl FakeHost {
    async fn bind() -> Self {
        Self {
            listener: TcpListener::bind("127.0.0.1:0").await.unwrap(),
        }
    }

    fn endpoint(&self) -> String {
        format!("ws://{}", self.listener.local_addr().unwrap())
    }

    fn connection(&self) -> Connection {
        Connection::with_endpoint(
            self.endpoint(),
            RegistrationFrame::new("registerPlugin", "abc123"),
        )
    }

    async fn accept(&self) -> HostSocket {
        let (stream, _) = tokio::time::timeout(WAIT, self.listener.accept())
            .await
            .unwrap()
            .unwrap();
        HostSocket {
            ws: accept_async(stream).await.unwrap(),
        }
    }
}

struct HostSocket {
    ws: WebSocketStream<TcpStream>,
}

impl HostSocket {
    async fn recv(&mut self) -> Value {
        loop {
            let msg = tokio::time::timeout(WAIT, self.ws.next())
                .await
                .unwrap()
                .unwrap()
                .unwrap();
            if let Message::Text(text) = msg {
                return serde_json::from_str(text.as_str()).unwrap();
            }
        }
    }

    async fn send(&mut self, frame: Value) {
        self.ws
            .send(Message::Text(frame.to_string().into()))
            .await
            .unwrap();
    }
}

#[tokio::test]
async fn connects_once_and_registers_first() {
    let host = FakeHost::bind().await;
    let connection = host.connection();

    connection.connect();
    connection.connect();
    let mut socket = host.accept().await;

    assert_eq!(
        socket.recv().await,
        json!({"event": "registerPlugin", "uuid": "abc123"})
    );
    assert!(
        tokio::time::timeout(Duration::from_millis(100), host.listener.accept())
            .await
            .is_err(),
        "second connect must not open another socket"
    );
}

#[tokio::test]
async fn sends_before_connect_follow_registration_in_order() {
    let host = FakeHost::bind().await;
    let connection = host.connection();
    let commands = Commands::new(connection.clone(), "abc123");

    let first = commands.show_ok("ctx");
    let second = commands.set_state("ctx", 1);
    assert_eq!(connection.state(), ConnectionState::Unconnected);

    connection.connect();
    let mut socket = host.accept().await;

    assert_eq!(socket.recv().await["event"], "registerPlugin");
    assert_eq!(socket.recv().await, json!({"event": "showOk", "context": "ctx"}));
    assert_eq!(
        socket.recv().await,
        json!({"event": "setState", "context": "ctx", "payload": {"state": 1}})
    );
    first.await.unwrap();
    second.await.unwrap();
}

#[tokio::test]
async fn payloadless_event_reaches_listener() {
    let host = FakeHost::bind().await;
    let connection = host.connection();
    let (tx, mut rx) = mpsc::unbounded_channel();
    connection.on(EventKind::SystemDidWakeUp, move |event| {
        let _ = tx.send(event.kind());
    });

    connection.connect();
    let mut socket = host.accept().await;
    socket.recv().await;
    socket.send(json!({"event": "systemDidWakeUp"})).await;

    let kind = tokio::time::timeout(WAIT, rx.recv()).await.unwrap().unwrap();
    assert_eq!(kind, EventKind::SystemDidWakeUp);
    assert_eq!(connection.state(), ConnectionState::Ready);
}

#[tokio::test]
async fn global_settings_round_trip() {
    let host = FakeHost::bind().await;
    let connection = host.connection();
    let commands = Commands::new(connection.clone(), "abc123");

    connection.connect();
    let mut socket = host.accept().await;
    socket.recv().await;

    let settings = commands.get_global_settings::<Value>();
    assert_eq!(
        socket.recv().await,
        json!({"event": "getGlobalSettings", "context": "abc123"})
    );
    socket
        .send(json!({
            "event": "didReceiveGlobalSettings",
            "payload": {"settings": {"name": "Elgato"}}
        }))
        .await;

    let settings = tokio::time::timeout(WAIT, settings).await.unwrap().unwrap();
    assert_eq!(settings, json!({"name": "Elgato"}));
    assert_eq!(commands.pending_requests(), 0);
}

#[tokio::test]
async fn routed_key_press_sets_title() {
    let host = FakeHost::bind().await;
    let connection = host.connection();
    let commands = Commands::new(connection.clone(), "abc123");
    let manifest: Manifest = r#"{"Actions":[{"UUID":"com.example.counter"}]}"#.parse().unwrap();
    let router = Router::new(commands, Arc::new(manifest));
    router.route(
        "com.example.counter",
        ActionHandler::new().on_key_down(|ev| {
            let _ = ev.action.set_title("pressed");
        }),
    );

    connection.connect();
    let mut socket = host.accept().await;
    socket.recv().await;
    socket
        .send(json!({
            "event": "keyDown",
            "action": "com.example.other",
            "context": "ignored",
            "device": "D1",
            "payload": {"settings": {}}
        }))
        .await;
    socket
        .send(json!({
            "event": "keyDown",
            "action": "com.example.counter",
            "context": "c1",
            "device": "D1",
            "payload": {"settings": {}}
        }))
        .await;

    assert_eq!(
        socket.recv().await,
        json!({"event": "setTitle", "context": "c1", "payload": {"title": "pressed"}})
    );
}

#[tokio::test]
async fn host_close_ends_the_connection() {
    let host = FakeHost::bind().await;
    let connection = host.connection();

    connection.connect();
    let mut socket = host.accept().await;
    socket.recv().await;
    socket.ws.close(None).await.unwrap();

    tokio::time::timeout(WAIT, connection.closed()).await.unwrap();
    assert_eq!(connection.state(), ConnectionState::Closed);

    let late = connection.send_event("showOk", serde_json::Map::new());
    assert!(matches!(late.await, Err(ClientError::Closed)));
}
