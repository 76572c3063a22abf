//! Message supervisor: forked workers, structured routing, correlation.
//!
//! ## Contents
//! - [`core`]: [`MessageSupervisor`] / [`SupervisorBuilder`] lifecycle and
//!   the channel reader/writer/monitor tasks
//! - [`registry`]: [`SubscriptionRegistry`] field/value routing
//! - [`handlers`]: [`HandlerTable`] / [`Responder`] remote-event dispatch
//! - [`ports`]: [`DebugPortAllocator`] / [`DebugMode`] inspector ports
//!
//! See `core` for the system-level wiring diagram.

mod core;
mod handlers;
mod ports;
mod registry;

pub use self::core::{ExitCallback, MessageSupervisor, SupervisorBuilder};
pub use handlers::{EventHandler, HandlerTable, Responder};
pub use ports::{DebugMode, DebugPortAllocator, DEFAULT_DEBUG_PORT_BASE};
pub use registry::{SubscriptionCallback, SubscriptionRegistry};
