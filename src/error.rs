//! Error types used by the procvisor launchers and supervisor.
//!
//! This module defines two main error enums:
//!
//! - [`LaunchError`] — errors raised by the stream launcher lifecycle.
//! - [`SupervisorError`] — errors raised by the message supervisor.
//!
//! Both types provide helper methods (`as_label`, `as_message`) for
//! logging/metrics. Usage errors (start-when-started, send-when-not-started)
//! are synchronous and fatal to the call only, never to the process; child
//! creation failures carry the underlying OS error.

use std::io;
use thiserror::Error;

/// # Errors produced by the [`StreamLauncher`](crate::StreamLauncher) lifecycle.
///
/// These represent misuse of the launcher API or failures to create the
/// child process itself. Runtime child faults are not errors here — they
/// flow through the event channel as [`ChildEvent::Fault`](crate::ChildEvent).
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum LaunchError {
    /// `start()` was called while a child was already live.
    #[error("child process already started: {name}")]
    AlreadyStarted {
        /// Launcher display name.
        name: String,
    },

    /// `send()` or `stop()` was called with no live child.
    #[error("child process not started or killed: {name}")]
    NotStarted {
        /// Launcher display name.
        name: String,
    },

    /// The OS failed to create the child process.
    #[error("failed to spawn child process {name}: {source}")]
    Spawn {
        /// Launcher display name.
        name: String,
        /// Underlying OS error.
        #[source]
        source: io::Error,
    },

    /// A required piped stream was unavailable after spawn.
    #[error("child process {name} is missing a piped {stream} stream")]
    Stdio {
        /// Launcher display name.
        name: String,
        /// Which stream was missing ("stdin", "stdout", "stderr").
        stream: &'static str,
    },

    /// Writing to the child's input stream failed.
    #[error("failed to write to child process {name}: {source}")]
    Write {
        /// Launcher display name.
        name: String,
        /// Underlying OS error.
        #[source]
        source: io::Error,
    },
}

impl LaunchError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use procvisor::LaunchError;
    ///
    /// let err = LaunchError::NotStarted { name: "worker".into() };
    /// assert_eq!(err.as_label(), "launch_not_started");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            LaunchError::AlreadyStarted { .. } => "launch_already_started",
            LaunchError::NotStarted { .. } => "launch_not_started",
            LaunchError::Spawn { .. } => "launch_spawn_failed",
            LaunchError::Stdio { .. } => "launch_stdio_missing",
            LaunchError::Write { .. } => "launch_write_failed",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        self.to_string()
    }

    /// Indicates whether the error is an API usage error (as opposed to an
    /// OS-level failure).
    pub fn is_usage(&self) -> bool {
        matches!(
            self,
            LaunchError::AlreadyStarted { .. } | LaunchError::NotStarted { .. }
        )
    }
}

/// # Errors produced by the [`MessageSupervisor`](crate::MessageSupervisor).
///
/// These represent failures to establish the structured channel. Inbound
/// routing never fails: unknown event names are logged as warnings and
/// unmatched messages are dropped silently.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum SupervisorError {
    /// The OS failed to create the worker process.
    #[error("failed to spawn worker {name}: {source}")]
    Spawn {
        /// Supervisor display name.
        name: String,
        /// Underlying OS error.
        #[source]
        source: io::Error,
    },

    /// A channel stream was unavailable after spawn.
    #[error("worker {name} is missing a piped {stream} stream")]
    Stdio {
        /// Supervisor display name.
        name: String,
        /// Which stream was missing ("stdin", "stdout").
        stream: &'static str,
    },
}

impl SupervisorError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            SupervisorError::Spawn { .. } => "supervisor_spawn_failed",
            SupervisorError::Stdio { .. } => "supervisor_stdio_missing",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        self.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_are_stable() {
        let err = LaunchError::AlreadyStarted {
            name: "geth".into(),
        };
        assert_eq!(err.as_label(), "launch_already_started");
        assert!(err.is_usage());

        let err = LaunchError::Spawn {
            name: "geth".into(),
            source: io::Error::new(io::ErrorKind::NotFound, "no such file"),
        };
        assert_eq!(err.as_label(), "launch_spawn_failed");
        assert!(!err.is_usage());
        assert!(err.as_message().contains("geth"));
    }

    #[test]
    fn supervisor_labels_are_stable() {
        let err = SupervisorError::Stdio {
            name: "storage".into(),
            stream: "stdout",
        };
        assert_eq!(err.as_label(), "supervisor_stdio_missing");
        assert!(err.as_message().contains("stdout"));
    }
}
