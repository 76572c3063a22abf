//! # Child process events emitted by the stream launcher.
//!
//! [`ChildEvent`] is a closed, tagged variant over the finite set of things
//! a piped child can tell its parent: output data, a runtime fault, and
//! exit. Consumers dispatch via pattern matching; there is no string-keyed
//! event lookup.
//!
//! ## Example
//! ```rust
//! use procvisor::{ChildEvent, StdioStream};
//!
//! let ev = ChildEvent::output(StdioStream::Stdout, "ready");
//! match ev {
//!     ChildEvent::Output { stream, text } => {
//!         assert_eq!(stream, StdioStream::Stdout);
//!         assert_eq!(text, "ready");
//!     }
//!     _ => unreachable!(),
//! }
//! ```

use std::sync::Arc;

/// Which piped output stream produced a chunk or line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StdioStream {
    /// Child standard output.
    Stdout,
    /// Child standard error.
    Stderr,
}

impl StdioStream {
    /// Stable label for logs (`stdout` / `stderr`).
    pub fn as_label(self) -> &'static str {
        match self {
            StdioStream::Stdout => "stdout",
            StdioStream::Stderr => "stderr",
        }
    }
}

/// Event emitted by a supervised piped child.
#[derive(Debug, Clone)]
pub enum ChildEvent {
    /// Output data, tagged by stream.
    ///
    /// With line splitting enabled each event carries one line (trailing
    /// newline and `\r` removed); otherwise `text` is a raw chunk.
    Output {
        /// Originating stream.
        stream: StdioStream,
        /// Line or raw chunk, lossily decoded as UTF-8.
        text: String,
    },

    /// Runtime fault reported by the child's streams or wait handle.
    ///
    /// Faults with no live receiver escalate instead of being dropped; see
    /// [`ChildBus::publish_fault`](super::ChildBus::publish_fault).
    Fault {
        /// Human-readable fault description.
        reason: Arc<str>,
    },

    /// The child exited.
    Exited {
        /// Exit code; `None` when terminated by a signal.
        code: Option<i32>,
    },
}

impl ChildEvent {
    /// Creates an output event.
    #[inline]
    pub fn output(stream: StdioStream, text: impl Into<String>) -> Self {
        ChildEvent::Output {
            stream,
            text: text.into(),
        }
    }

    /// Creates a fault event.
    #[inline]
    pub fn fault(reason: impl Into<Arc<str>>) -> Self {
        ChildEvent::Fault {
            reason: reason.into(),
        }
    }

    /// Creates an exit event.
    #[inline]
    pub fn exited(code: Option<i32>) -> Self {
        ChildEvent::Exited { code }
    }
}
