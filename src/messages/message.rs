//! # Structured channel messages and inbound classification.
//!
//! Messages on the structured channel are open-ended, field-keyed records
//! ([`Message`]). There is no fixed schema; the supervisor routes each
//! inbound record structurally by inspecting which fields are present.
//! [`Inbound`] is the closed, tagged classification of that inspection:
//!
//! ```text
//! inbound Message
//!    │
//!    ├─ result == "log"   ──► Inbound::Log(LogRecord)      → log sink
//!    ├─ has "event" field ──► Inbound::Event(EventCall)    → handler table
//!    └─ otherwise         ──► Inbound::Generic(Message)    → subscription registry
//! ```
//!
//! The `error` field is orthogonal to classification: a message carrying it
//! is logged before routing and then processed normally.
//!
//! ## Wire conventions
//! - Log marker: `result == "log"` ([`LOG_MARKER`]).
//! - Event responses carry the marker `"response"` in their `event` field
//!   ([`RESPONSE_MARKER`]) and are correlated by `eventId`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// An open field-keyed record, the unit of exchange on the structured channel.
///
/// Field order is preserved (`serde_json` with `preserve_order`), which makes
/// the registry's first-recognized-key scan deterministic.
pub type Message = serde_json::Map<String, Value>;

/// `result` value marking a message as a log record.
pub const LOG_MARKER: &str = "log";

/// `event` value marking an outbound message as an event response.
pub const RESPONSE_MARKER: &str = "response";

/// Well-known field names used by the routing conventions.
pub mod fields {
    /// Child-side error report, logged before routing.
    pub const ERROR: &str = "error";
    /// Log-kind discriminant (compared against [`super::LOG_MARKER`]).
    pub const RESULT: &str = "result";
    /// Remote-event handler name.
    pub const EVENT: &str = "event";
    /// Request name forwarded to the handler as its first argument.
    pub const REQUEST_NAME: &str = "requestName";
    /// Ordered handler arguments.
    pub const ARGS: &str = "args";
    /// Correlation token tying an event call to its response.
    pub const EVENT_ID: &str = "eventId";
}

/// Tagged classification of an inbound channel message.
#[derive(Debug, Clone)]
pub enum Inbound {
    /// A log-shaped message, forwarded to the log sink verbatim.
    Log(LogRecord),
    /// A remote-event invocation expecting a correlated response.
    Event(EventCall),
    /// Everything else; offered to the subscription registry.
    Generic(Message),
}

impl Inbound {
    /// Classifies a message by shape.
    ///
    /// Priority is fixed: log marker first, then the `event` field, then
    /// generic. A message that is both log-shaped and carries an `event`
    /// field is a log record.
    pub fn classify(msg: Message) -> Self {
        let is_log = msg
            .get(fields::RESULT)
            .and_then(Value::as_str)
            .map(|marker| marker == LOG_MARKER)
            .unwrap_or(false);
        if is_log {
            return Inbound::Log(LogRecord { raw: msg });
        }
        if msg.contains_key(fields::EVENT) {
            return Inbound::Event(EventCall::from_message(msg));
        }
        Inbound::Generic(msg)
    }
}

/// A log-shaped message flowing from child to parent.
///
/// The supervisor forwards log records to the external sink and never stores
/// them; the full record is preserved so the sink can pick whatever fields
/// it understands.
#[derive(Debug, Clone)]
pub struct LogRecord {
    raw: Message,
}

impl LogRecord {
    /// Borrows the full record.
    pub fn raw(&self) -> &Message {
        &self.raw
    }

    /// Consumes the record, yielding the full message.
    pub fn into_inner(self) -> Message {
        self.raw
    }
}

/// A remote-event invocation parsed from an inbound message.
///
/// Carries the handler name, an optional request name, the ordered argument
/// list (normalized to empty when absent or malformed) and the correlation
/// token echoed back in the response.
#[derive(Debug, Clone)]
pub struct EventCall {
    /// Handler name looked up in the handler table.
    pub event: String,
    /// Request name forwarded to the handler as its first argument.
    pub request_name: Option<String>,
    /// Ordered handler arguments.
    pub args: Vec<Value>,
    /// Correlation token; echoed verbatim in the response.
    pub event_id: Value,
}

impl EventCall {
    /// Extracts the call fields from a message known to carry `event`.
    fn from_message(mut msg: Message) -> Self {
        let event = match msg.remove(fields::EVENT) {
            Some(Value::String(name)) => name,
            Some(other) => other.to_string(),
            None => String::new(),
        };
        let request_name = msg
            .remove(fields::REQUEST_NAME)
            .and_then(|v| v.as_str().map(str::to_owned));
        // Non-array args are treated the same as absent args.
        let args = match msg.remove(fields::ARGS) {
            Some(Value::Array(args)) => args,
            _ => Vec::new(),
        };
        let event_id = msg.remove(fields::EVENT_ID).unwrap_or(Value::Null);
        Self {
            event,
            request_name,
            args,
            event_id,
        }
    }
}

/// The correlated reply to an [`EventCall`], sent parent → child.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventResponse {
    /// Always [`RESPONSE_MARKER`].
    pub event: String,
    /// Handler result, as produced by the response callback.
    pub result: Value,
    /// Correlation token copied from the originating call.
    #[serde(rename = "eventId")]
    pub event_id: Value,
}

impl EventResponse {
    /// Builds a response carrying the marker and the given correlation token.
    pub fn new(result: Value, event_id: Value) -> Self {
        Self {
            event: RESPONSE_MARKER.to_string(),
            result,
            event_id,
        }
    }

    /// Converts the response into a plain channel message.
    pub fn into_message(self) -> Message {
        let mut msg = Message::new();
        msg.insert(fields::EVENT.into(), Value::String(self.event));
        msg.insert(fields::RESULT.into(), self.result);
        msg.insert(fields::EVENT_ID.into(), self.event_id);
        msg
    }
}
