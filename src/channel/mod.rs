//! Child events: types and broadcast bus.
//!
//! This module groups the event **data model** and the **bus** used by the
//! stream launcher to publish what its child does (output, faults, exit).
//!
//! ## Contents
//! - [`ChildEvent`], [`StdioStream`] closed event classification
//! - [`ChildBus`] thin wrapper over `tokio::sync::broadcast`

mod bus;
mod event;

pub use bus::ChildBus;
pub use event::{ChildEvent, StdioStream};
