//! Request/response correlation.
//!
//! The host answers "get" commands with an ordinary event (`getSettings` is
//! answered by `didReceiveSettings`, and so on) that carries no request id.
//! The correlator keeps a table of outstanding requests, each naming the reply
//! kind it waits for and, for instance-scoped requests, the context the reply
//! must carry. A reply settles every outstanding request it matches and
//! leaves the rest pending.
//!
//! Requests have no timeout: a request the host never answers stays pending
//! until the connection closes, which rejects it with [`ClientError::Closed`].
//!
//! [`ClientError::Closed`]: crate::ClientError::Closed

use crate::deferred::{Completion, Resolver, deferred};
use crate::{ClientError, Connection};
use deckbridge_core::{EventKind, InboundEvent, OutboundMessage};
use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, Mutex, PoisonError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct RequestId(u64);

struct PendingRequest {
    reply: EventKind,
    /// Context the reply must carry; `None` accepts any reply of the kind.
    context: Option<String>,
    resolver: Resolver<InboundEvent>,
}

#[derive(Default)]
struct PendingTable {
    next_id: u64,
    requests: BTreeMap<RequestId, PendingRequest>,
    /// Reply kinds that already have a connection listener.
    watching: HashSet<EventKind>,
}

impl PendingTable {
    fn settle(table: &Mutex<PendingTable>, event: &InboundEvent) {
        let matched: Vec<PendingRequest> = {
            let mut table = table.lock().unwrap_or_else(PoisonError::into_inner);
            let ids: Vec<RequestId> = table
                .requests
                .iter()
                .filter(|(_, r)| r.matches(event))
                .map(|(id, _)| *id)
                .collect();
            ids.iter()
                .filter_map(|id| table.requests.remove(id))
                .collect()
        };

        for request in matched {
            request.resolver.resolve(event.clone());
        }
    }

    fn reject_all(table: &Mutex<PendingTable>) {
        let requests = std::mem::take(
            &mut table
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .requests,
        );
        if !requests.is_empty() {
            tracing::debug!(pending = requests.len(), "connection closed, rejecting requests");
        }
        for request in requests.into_values() {
            request.resolver.reject(ClientError::Closed);
        }
    }
}

impl PendingRequest {
    fn matches(&self, event: &InboundEvent) -> bool {
        if event.kind() != self.reply {
            return false;
        }
        match &self.context {
            Some(context) => event.context() == Some(context.as_str()),
            None => true,
        }
    }
}

/// Issues commands whose answer arrives later as a separate event.
#[derive(Clone)]
pub struct Correlator {
    connection: Connection,
    table: Arc<Mutex<PendingTable>>,
}

impl std::fmt::Debug for Correlator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Correlator")
            .field("pending", &self.pending())
            .finish()
    }
}

impl Correlator {
    pub fn new(connection: Connection) -> Self {
        let table: Arc<Mutex<PendingTable>> = Arc::default();
        let pending = Arc::clone(&table);
        connection.on_close(move || PendingTable::reject_all(&pending));
        Self { connection, table }
    }

    /// Send `message` and complete with the first `reply` event that matches
    /// `context` (or any `reply` event when `context` is `None`).
    pub fn request(
        &self,
        message: &OutboundMessage,
        reply: EventKind,
        context: Option<&str>,
    ) -> Completion<InboundEvent> {
        let (resolver, completion) = deferred();

        let (id, first_for_kind) = {
            let mut table = self.table.lock().unwrap_or_else(PoisonError::into_inner);
            let id = RequestId(table.next_id);
            table.next_id += 1;
            table.requests.insert(
                id,
                PendingRequest {
                    reply,
                    context: context.map(str::to_string),
                    resolver: resolver.clone(),
                },
            );
            (id, table.watching.insert(reply))
        };

        if first_for_kind {
            let table = Arc::clone(&self.table);
            self.connection
                .on(reply, move |event| PendingTable::settle(&table, event));
        }

        tracing::debug!(
            request = message.event_name(),
            reply = %reply,
            context = context.unwrap_or("*"),
            "awaiting reply"
        );

        if let Err(e) = self.connection.try_send(message) {
            self.table
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .requests
                .remove(&id);
            resolver.reject(e);
        }

        completion
    }

    /// Number of requests still waiting for a reply.
    pub fn pending(&self) -> usize {
        self.table
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .requests
            .len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use deckbridge_core::RegistrationFrame;
    use std::time::Duration;

    fn correlator() -> (Connection, Correlator) {
        let connection = Connection::with_endpoint(
            "ws://127.0.0.1:1",
            RegistrationFrame::new("registerPlugin", "plugin"),
        );
        let correlator = Correlator::new(connection.clone());
        (connection, correlator)
    }

    fn get_settings(context: &str) -> OutboundMessage {
        OutboundMessage::GetSettings {
            context: context.into(),
        }
    }

    fn settings_reply(context: &str, value: u32) -> String {
        format!(
            r#"{{"event":"didReceiveSettings","action":"com.example.a","context":"{context}","device":"d","payload":{{"settings":{{"value":{value}}}}}}}"#
        )
    }

    fn settings_of(event: &InboundEvent) -> serde_json::Value {
        match event {
            InboundEvent::DidReceiveSettings(e) => e.payload.settings.clone(),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn replies_are_matched_by_context() {
        let (connection, correlator) = correlator();
        let a = correlator.request(
            &get_settings("A"),
            EventKind::DidReceiveSettings,
            Some("A"),
        );
        let mut b = correlator.request(
            &get_settings("B"),
            EventKind::DidReceiveSettings,
            Some("B"),
        );
        // One connection listener serves both.
        assert_eq!(connection.listener_count(EventKind::DidReceiveSettings), 1);

        connection.handle_text(&settings_reply("A", 1));

        let a = a.await.unwrap();
        assert_eq!(settings_of(&a)["value"], 1);
        assert_eq!(correlator.pending(), 1);
        assert!(
            tokio::time::timeout(Duration::from_millis(20), &mut b)
                .await
                .is_err()
        );

        connection.handle_text(&settings_reply("B", 2));
        assert_eq!(settings_of(&b.await.unwrap())["value"], 2);
        assert_eq!(correlator.pending(), 0);
    }

    #[tokio::test]
    async fn non_matching_replies_leave_request_waiting() {
        let (connection, correlator) = correlator();
        let mut pending = correlator.request(
            &get_settings("A"),
            EventKind::DidReceiveSettings,
            Some("A"),
        );

        connection.handle_text(&settings_reply("other", 9));
        connection.handle_text(r#"{"event":"didReceiveGlobalSettings","payload":{"settings":{}}}"#);

        assert!(
            tokio::time::timeout(Duration::from_millis(20), &mut pending)
                .await
                .is_err()
        );
        assert_eq!(correlator.pending(), 1);

        connection.handle_text(&settings_reply("A", 3));
        assert_eq!(settings_of(&pending.await.unwrap())["value"], 3);
    }

    #[tokio::test]
    async fn one_reply_settles_every_request_for_the_same_context() {
        let (connection, correlator) = correlator();
        let first = correlator.request(
            &get_settings("A"),
            EventKind::DidReceiveSettings,
            Some("A"),
        );
        let second = correlator.request(
            &get_settings("A"),
            EventKind::DidReceiveSettings,
            Some("A"),
        );

        connection.handle_text(&settings_reply("A", 5));
        assert_eq!(settings_of(&first.await.unwrap())["value"], 5);
        assert_eq!(settings_of(&second.await.unwrap())["value"], 5);
    }

    #[tokio::test]
    async fn request_after_close_is_rejected() {
        // Nothing listens on port 1.
        let (connection, correlator) = correlator();
        connection.connect();
        connection.closed().await;

        let pending = correlator.request(
            &get_settings("A"),
            EventKind::DidReceiveSettings,
            Some("A"),
        );

        assert!(matches!(pending.await, Err(ClientError::Closed)));
        assert_eq!(correlator.pending(), 0);
    }

    #[tokio::test]
    async fn close_rejects_waiting_requests() {
        let (connection, correlator) = correlator();
        let a = correlator.request(
            &get_settings("A"),
            EventKind::DidReceiveSettings,
            Some("A"),
        );
        let global = correlator.request(
            &OutboundMessage::GetGlobalSettings {
                context: "plugin".into(),
            },
            EventKind::DidReceiveGlobalSettings,
            None,
        );
        assert_eq!(correlator.pending(), 2);

        connection.connect();
        connection.closed().await;

        assert!(matches!(a.await, Err(ClientError::Closed)));
        assert!(matches!(global.await, Err(ClientError::Closed)));
        assert_eq!(correlator.pending(), 0);
    }

    #[tokio::test]
    async fn unscoped_request_takes_any_reply() {
        let (connection, correlator) = correlator();
        let pending = correlator.request(
            &OutboundMessage::GetGlobalSettings {
                context: "plugin".into(),
            },
            EventKind::DidReceiveGlobalSettings,
            None,
        );

        connection.handle_text(
            r#"{"event":"didReceiveGlobalSettings","payload":{"settings":{"name":"Elgato"}}}"#,
        );

        let InboundEvent::DidReceiveGlobalSettings { payload } = pending.await.unwrap() else {
            panic!("expected didReceiveGlobalSettings");
        };
        assert_eq!(payload.settings, serde_json::json!({"name": "Elgato"}));
    }
}
