//! # Remote-event dispatch and response correlation.
//!
//! Inbound [`EventCall`]s name a handler in the [`HandlerTable`] supplied by
//! the owning application. The dispatcher invokes the handler with the
//! call's request name, its normalized arguments, and a [`Responder`]
//! synthesized for this call. Invoking the responder — synchronously or
//! from an async task later — sends the correlated
//! [`EventResponse`](crate::messages::EventResponse) back over the channel:
//!
//! ```text
//! child ── {event, requestName, args, eventId} ──► dispatch()
//!             │
//!             ├─ handler registered ──► handler(request_name, args, Responder)
//!             │                                           │
//!             │                     responder.respond(result)
//!             │                                           ▼
//! child ◄── {event: "response", result, eventId} ── outbound writer
//!             │
//!             └─ unknown name ──► warn, call dropped, no response
//! ```
//!
//! `Responder::respond` consumes the responder, so a handler can never send
//! two responses for one call. A handler that never responds leaves the
//! child's correlated waiter pending; no timeout is imposed here.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::mpsc;

use crate::messages::{EventCall, EventResponse};

use super::core::Outgoing;

/// Handler invoked for a remote event call.
///
/// Receives the call's request name, its arguments, and the responder that
/// sends the correlated reply.
pub type EventHandler = Arc<dyn Fn(Option<&str>, Vec<Value>, Responder) + Send + Sync>;

/// Mapping from event name to handler, supplied at supervisor construction.
#[derive(Default, Clone)]
pub struct HandlerTable {
    map: HashMap<String, EventHandler>,
}

impl HandlerTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a handler under `name`, replacing any previous one.
    pub fn register<F>(mut self, name: impl Into<String>, handler: F) -> Self
    where
        F: Fn(Option<&str>, Vec<Value>, Responder) + Send + Sync + 'static,
    {
        self.map.insert(name.into(), Arc::new(handler));
        self
    }

    /// True when no handlers are registered.
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Routes one event call.
    ///
    /// Unknown handler names are logged as a warning and dropped without a
    /// response; this is a recovered condition, not an error.
    pub(crate) fn dispatch(&self, call: EventCall, outbound: &mpsc::UnboundedSender<Outgoing>) {
        let Some(handler) = self.map.get(&call.event) else {
            log::warn!("unknown event method called: {}", call.event);
            return;
        };
        let responder = Responder {
            event_id: call.event_id,
            outbound: outbound.clone(),
        };
        handler(call.request_name.as_deref(), call.args, responder);
    }
}

/// One-shot response callback correlated to a single event call.
///
/// Owns the call's `eventId`; consuming [`Responder::respond`] makes a
/// second response per call unrepresentable. Cheap to move into an async
/// task for deferred replies.
pub struct Responder {
    event_id: Value,
    outbound: mpsc::UnboundedSender<Outgoing>,
}

impl Responder {
    /// Correlation token of the originating call.
    pub fn event_id(&self) -> &Value {
        &self.event_id
    }

    /// Sends the correlated response carrying `result`.
    ///
    /// Delivery is fire-and-forget; a disconnected channel drops the
    /// response the same way a vanished child would.
    pub fn respond(self, result: Value) {
        let response = EventResponse::new(result, self.event_id);
        let _ = self
            .outbound
            .send(Outgoing::Message(response.into_message()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages::{fields, Inbound, Message};
    use serde_json::json;

    fn call(v: Value) -> EventCall {
        match Inbound::classify(v.as_object().cloned().unwrap()) {
            Inbound::Event(call) => call,
            other => panic!("expected event call, got {other:?}"),
        }
    }

    fn recv_message(rx: &mut mpsc::UnboundedReceiver<Outgoing>) -> Message {
        match rx.try_recv().expect("expected an outgoing message") {
            Outgoing::Message(msg) => msg,
            Outgoing::Disconnect => panic!("unexpected disconnect"),
        }
    }

    #[tokio::test]
    async fn registered_handler_sends_exactly_one_correlated_response() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let table = HandlerTable::new().register("ping", |_req, _args, responder| {
            responder.respond(json!("pong"));
        });

        table.dispatch(
            call(json!({"event": "ping", "eventId": "42", "args": []})),
            &tx,
        );

        let msg = recv_message(&mut rx);
        assert_eq!(msg.get(fields::EVENT), Some(&json!("response")));
        assert_eq!(msg.get(fields::RESULT), Some(&json!("pong")));
        assert_eq!(msg.get(fields::EVENT_ID), Some(&json!("42")));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn interleaved_calls_keep_their_own_event_ids() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let table = HandlerTable::new().register("echo", |req, _args, responder| {
            responder.respond(json!(req.unwrap_or("")));
        });

        table.dispatch(
            call(json!({"event": "echo", "requestName": "first", "eventId": 1})),
            &tx,
        );
        table.dispatch(
            call(json!({"event": "echo", "requestName": "second", "eventId": 2})),
            &tx,
        );

        let first = recv_message(&mut rx);
        assert_eq!(first.get(fields::EVENT_ID), Some(&json!(1)));
        assert_eq!(first.get(fields::RESULT), Some(&json!("first")));
        let second = recv_message(&mut rx);
        assert_eq!(second.get(fields::EVENT_ID), Some(&json!(2)));
        assert_eq!(second.get(fields::RESULT), Some(&json!("second")));
    }

    #[tokio::test]
    async fn unknown_event_name_sends_no_response() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let table = HandlerTable::new();
        table.dispatch(call(json!({"event": "ghost", "eventId": 7})), &tx);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn responder_can_reply_from_a_later_task() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let table = HandlerTable::new().register("defer", |_req, args, responder| {
            tokio::spawn(async move {
                responder.respond(args.into_iter().next().unwrap_or(json!(null)));
            });
        });

        table.dispatch(
            call(json!({"event": "defer", "args": ["late"], "eventId": "d1"})),
            &tx,
        );

        let msg = rx.recv().await.expect("deferred response");
        let msg = match msg {
            Outgoing::Message(msg) => msg,
            Outgoing::Disconnect => panic!("unexpected disconnect"),
        };
        assert_eq!(msg.get(fields::RESULT), Some(&json!("late")));
        assert_eq!(msg.get(fields::EVENT_ID), Some(&json!("d1")));
    }

    #[tokio::test]
    async fn handler_receives_normalized_args() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let table = HandlerTable::new().register("count", |_req, args, responder| {
            responder.respond(json!(args.len()));
        });

        table.dispatch(call(json!({"event": "count", "eventId": 0})), &tx);
        let msg = recv_message(&mut rx);
        assert_eq!(msg.get(fields::RESULT), Some(&json!(0)));
    }
}
