//! # procvisor
//!
//! **Procvisor** is a child-process supervision library for Rust.
//!
//! It launches worker subprocesses, keeps a typed communication channel
//! with each, and routes inbound messages either to one-shot/repeating
//! subscribers (publish/subscribe matching on message fields) or to
//! registered remote-event handlers that produce a correlated response.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!  ┌───────────────────────────────────────────────────────────────────┐
//!  │  MessageSupervisor (one per worker)                               │
//!  │  - structured channel (JSON lines over the worker's stdio pair)   │
//!  │  - SubscriptionRegistry (field/value → callbacks, once-flag)      │
//!  │  - HandlerTable (remote events → correlated EventResponse)        │
//!  │  - LogSink (forwarded log records, external collaborator)         │
//!  │  - DebugPortAllocator (injected; unique inspector port per child) │
//!  └──────┬────────────────────────────────────────────────────────────┘
//!         │ inbound Message, fixed priority:
//!         │   "error" field → logged (processing continues)
//!         ├── result == "log"  ──► LogSink::handle
//!         ├── "event" present  ──► HandlerTable ──► Responder ──► child
//!         └── otherwise        ──► SubscriptionRegistry (first-key scan)
//!
//!  ┌───────────────────────────────────────────────────────────────────┐
//!  │  StreamLauncher (one per raw child)                               │
//!  │  - piped stdio, detached, kill_on_drop                            │
//!  │  - ChildBus: Output (optionally per-line) / Fault / Exited        │
//!  │  - process-wide shutdown token → SIGINT to live children          │
//!  └───────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ### Concurrency model
//! Each supervised child is a real OS process; all coordination happens
//! through the structured channel or the piped streams, never shared
//! memory. Within the parent, dispatch runs message-at-a-time on the
//! channel's reader task, so two messages never interleave mid-dispatch;
//! `send` is fire-and-forget and event responses are matched purely by
//! `eventId`, with no built-in timeout.
//!
//! ## Example
//! ```no_run
//! use std::sync::Arc;
//! use procvisor::{
//!     DebugPortAllocator, HandlerTable, SupervisorBuilder, SupervisorConfig,
//! };
//! use serde_json::json;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let handlers = HandlerTable::new().register("ping", |_req, _args, responder| {
//!         responder.respond(json!("pong"));
//!     });
//!
//!     let allocator = Arc::new(DebugPortAllocator::default());
//!     let supervisor = SupervisorBuilder::new(SupervisorConfig::new("/opt/workers/storage"))
//!         .with_handlers(handlers)
//!         .with_port_allocator(allocator)
//!         .spawn()?;
//!
//!     supervisor.subscribe_once("status", json!("ready"), |msg| {
//!         println!("worker is up: {msg:?}");
//!     });
//!     Ok(())
//! }
//! ```

mod channel;
mod config;
mod error;
mod launcher;
mod messages;
mod sink;
mod supervisor;

pub use channel::{ChildBus, ChildEvent, StdioStream};
pub use config::{StreamConfig, SupervisorConfig};
pub use error::{LaunchError, SupervisorError};
pub use launcher::StreamLauncher;
pub use messages::{
    fields, EventCall, EventResponse, Inbound, LogRecord, Message, LOG_MARKER, RESPONSE_MARKER,
};
pub use sink::{LogSink, StdoutSink};
pub use supervisor::{
    DebugMode, DebugPortAllocator, EventHandler, ExitCallback, HandlerTable, MessageSupervisor,
    Responder, SubscriptionCallback, SubscriptionRegistry, SupervisorBuilder,
    DEFAULT_DEBUG_PORT_BASE,
};
