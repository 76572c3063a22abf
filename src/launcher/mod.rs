//! Stream launcher: piped children and process-wide cleanup signals.
//!
//! ## Contents
//! - [`StreamLauncher`] spawns a piped, detached child and publishes
//!   [`ChildEvent`](crate::ChildEvent)s
//! - `signals` one-shot process-wide shutdown token used by every launcher

pub(crate) mod signals;
mod stream;

pub use stream::StreamLauncher;
