//! The host connection.
//!
//! One [`Connection`] per process. It owns the WebSocket, sends the
//! registration frame first thing after the socket opens, serializes every
//! outbound frame and decodes every inbound one before handing it to the
//! listener registry.
//!
//! Sends are queued, so anything sent before [`Connection::connect`] or
//! before the socket opens goes out right after the registration frame, in
//! call order.

use crate::deferred::{Completion, Resolver, deferred};
use crate::listeners::{ListenerId, Listeners};
use crate::ClientError;
use deckbridge_core::{
    ConnectionState, Envelope, EventKind, InboundEvent, OutboundMessage, RegistrationFrame,
    RegistrationParameters,
};
use futures_util::{SinkExt, StreamExt};
use serde_json::{Map, Value};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::{mpsc, watch};
use tokio_tungstenite::tungstenite::Message;

/// One queued outbound frame.
struct Outbound {
    text: String,
    ack: Resolver<()>,
}

type CloseHook = Box<dyn FnOnce() + Send>;

struct Inner {
    endpoint: String,
    registration: RegistrationFrame,
    listeners: Listeners,
    outbound_tx: mpsc::UnboundedSender<Outbound>,
    /// Taken by the transport task; `None` once `connect` has run.
    outbound_rx: Mutex<Option<mpsc::UnboundedReceiver<Outbound>>>,
    state: watch::Sender<ConnectionState>,
    /// Run once when the connection reaches Closed.
    close_hooks: Mutex<Vec<CloseHook>>,
}

/// Shared handle to the host connection. Clones are cheap and refer to the
/// same socket.
#[derive(Clone)]
pub struct Connection {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("endpoint", &self.inner.endpoint)
            .field("state", &self.state())
            .field("listeners", &self.inner.listeners)
            .finish()
    }
}

impl Connection {
    /// Prepare a connection from the launch parameters. Nothing is opened
    /// until [`connect`](Self::connect).
    pub fn new(params: &RegistrationParameters) -> Self {
        Self::with_endpoint(
            params.endpoint(),
            RegistrationFrame::new(&params.register_event, &params.plugin_uuid),
        )
    }

    pub fn with_endpoint(endpoint: impl Into<String>, registration: RegistrationFrame) -> Self {
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let (state, _) = watch::channel(ConnectionState::Unconnected);
        Self {
            inner: Arc::new(Inner {
                endpoint: endpoint.into(),
                registration,
                listeners: Listeners::default(),
                outbound_tx,
                outbound_rx: Mutex::new(Some(outbound_rx)),
                state,
                close_hooks: Mutex::new(Vec::new()),
            }),
        }
    }

    pub fn state(&self) -> ConnectionState {
        *self.inner.state.borrow()
    }

    /// Wait until the connection reaches [`ConnectionState::Closed`].
    pub async fn closed(&self) {
        let mut rx = self.inner.state.subscribe();
        // The sender lives as long as `self`, so this only ends on Closed.
        let _ = rx.wait_for(|s| *s == ConnectionState::Closed).await;
    }

    /// Open the transport and register. Calling it again is a no-op.
    ///
    /// Must run inside a tokio runtime. Failures are logged, and the
    /// connection moves to [`ConnectionState::Closed`].
    pub fn connect(&self) {
        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(runtime) => runtime,
            Err(e) => {
                tracing::error!("connect called outside a tokio runtime: {}", e);
                return;
            }
        };

        let Some(outbound) = self
            .inner
            .outbound_rx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        else {
            tracing::debug!("connect called more than once, ignoring");
            return;
        };

        self.inner.state.send_replace(ConnectionState::Connecting);
        runtime.spawn(run_transport(Arc::clone(&self.inner), outbound));
    }

    /// Serialize and queue a typed command. The completion settles once the
    /// transport has written the frame, not when the host has processed it.
    pub fn send(&self, message: &OutboundMessage) -> Completion<()> {
        match self.try_send(message) {
            Ok(done) => done,
            Err(e) => Completion::failed(e),
        }
    }

    /// Send `{ event, ...fields }` for events outside [`OutboundMessage`].
    pub fn send_event(&self, event: &str, fields: Map<String, Value>) -> Completion<()> {
        match serde_json::to_string(&Envelope::new(event, fields)) {
            Ok(text) => self.write(text).unwrap_or_else(Completion::failed),
            Err(e) => Completion::failed(e.into()),
        }
    }

    /// Like [`send`](Self::send), but reports a closed queue immediately.
    pub(crate) fn try_send(&self, message: &OutboundMessage) -> Result<Completion<()>, ClientError> {
        let text = serde_json::to_string(message)?;
        tracing::trace!(event = message.event_name(), "queueing");
        self.write(text)
    }

    fn write(&self, text: String) -> Result<Completion<()>, ClientError> {
        let (ack, done) = deferred();
        self.inner
            .outbound_tx
            .send(Outbound { text, ack })
            .map_err(|_| ClientError::Closed)?;
        Ok(done)
    }

    /// Subscribe to every future event of `kind`.
    pub fn on<F>(&self, kind: EventKind, listener: F) -> ListenerId
    where
        F: Fn(&InboundEvent) + Send + Sync + 'static,
    {
        self.inner.listeners.add(kind, Arc::new(listener), false)
    }

    /// Subscribe to the next event of `kind` only.
    pub fn once<F>(&self, kind: EventKind, listener: F) -> ListenerId
    where
        F: Fn(&InboundEvent) + Send + Sync + 'static,
    {
        self.inner.listeners.add(kind, Arc::new(listener), true)
    }

    pub fn remove_listener(&self, kind: EventKind, id: ListenerId) -> bool {
        self.inner.listeners.remove(kind, id)
    }

    /// Remove all listeners for `kind`, or all listeners when `None`.
    pub fn remove_all_listeners(&self, kind: Option<EventKind>) {
        self.inner.listeners.remove_all(kind);
    }

    pub fn listener_count(&self, kind: EventKind) -> usize {
        self.inner.listeners.count(kind)
    }

    /// Run `hook` once the connection is closed, or right away if it already
    /// is.
    pub(crate) fn on_close(&self, hook: impl FnOnce() + Send + 'static) {
        let mut hooks = self
            .inner
            .close_hooks
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if self.state() == ConnectionState::Closed {
            drop(hooks);
            hook();
        } else {
            hooks.push(Box::new(hook));
        }
    }

    /// Decode one raw inbound frame and dispatch it as if the transport had
    /// received it.
    #[cfg(test)]
    pub(crate) fn handle_text(&self, text: &str) {
        self.inner.handle_text(text);
    }
}

impl Inner {
    fn handle_text(&self, text: &str) {
        let value: Value = match serde_json::from_str(text) {
            Ok(value) => value,
            Err(e) => {
                tracing::error!("failed to parse inbound message: {}", e);
                return;
            }
        };

        let Some(name) = Envelope::event_of(&value) else {
            tracing::warn!("received message without an event: {}", text);
            return;
        };

        let kind: EventKind = match name.parse() {
            Ok(kind) => kind,
            Err(e) => {
                tracing::warn!("{}", e);
                return;
            }
        };

        let event: InboundEvent = match serde_json::from_value(value) {
            Ok(event) => event,
            Err(e) => {
                tracing::error!(event = %kind, "malformed message: {}", e);
                return;
            }
        };

        self.state.send_if_modified(|state| {
            if *state == ConnectionState::Connecting {
                *state = ConnectionState::Ready;
                true
            } else {
                false
            }
        });

        let delivered = self.listeners.notify(&event);
        tracing::trace!(event = %kind, delivered, "dispatched");
    }
}

async fn run_transport(inner: Arc<Inner>, mut outbound: mpsc::UnboundedReceiver<Outbound>) {
    let ws = match tokio_tungstenite::connect_async(inner.endpoint.as_str()).await {
        Ok((ws, _response)) => ws,
        Err(e) => {
            tracing::error!(endpoint = %inner.endpoint, "failed to open transport: {}", e);
            shut_down(&inner, outbound);
            return;
        }
    };
    let (mut sink, mut stream) = ws.split();

    let registration = match serde_json::to_string(&inner.registration) {
        Ok(text) => text,
        Err(e) => {
            tracing::error!("failed to encode registration frame: {}", e);
            shut_down(&inner, outbound);
            return;
        }
    };
    if let Err(e) = sink.send(Message::Text(registration.into())).await {
        tracing::error!("failed to send registration frame: {}", e);
        shut_down(&inner, outbound);
        return;
    }
    tracing::debug!(
        endpoint = %inner.endpoint,
        event = %inner.registration.event,
        "registration frame sent"
    );

    loop {
        tokio::select! {
            Some(out) = outbound.recv() => {
                match sink.send(Message::Text(out.text.into())).await {
                    Ok(()) => {
                        out.ack.resolve(());
                    }
                    Err(e) => {
                        tracing::error!("write failed: {}", e);
                        out.ack.reject(e.into());
                        break;
                    }
                }
            }

            msg = stream.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => inner.handle_text(text.as_str()),
                    Some(Ok(Message::Binary(_))) => {
                        tracing::warn!("ignoring binary frame");
                    }
                    Some(Ok(Message::Close(frame))) => {
                        tracing::debug!(?frame, "host closed the connection");
                        break;
                    }
                    // Ping/pong are answered by tungstenite.
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        tracing::error!("transport error: {}", e);
                        break;
                    }
                    None => break,
                }
            }
        }
    }

    shut_down(&inner, outbound);
}

/// Move to Closed, fail whatever is still queued, then run the close hooks.
fn shut_down(inner: &Inner, mut outbound: mpsc::UnboundedReceiver<Outbound>) {
    inner.state.send_replace(ConnectionState::Closed);
    outbound.close();
    while let Ok(out) = outbound.try_recv() {
        out.ack.reject(ClientError::Closed);
    }

    // State is Closed before the hooks are taken, so late registrations run
    // in `on_close` instead.
    let hooks = std::mem::take(
        &mut *inner
            .close_hooks
            .lock()
            .unwrap_or_else(PoisonError::into_inner),
    );
    for hook in hooks {
        hook();
    }
    tracing::debug!("connection closed");
}
