//! # Launcher and supervisor configuration.
//!
//! Provides [`StreamConfig`] for the stream launcher and [`SupervisorConfig`]
//! for the message supervisor.
//!
//! ## Sentinel values
//! - `bus_capacity` is clamped to a minimum of 1 by the bus.
//! - `SupervisorConfig::name = None` → derived from the worker path's file
//!   stem.

use std::path::{Path, PathBuf};

/// Configuration for a [`StreamLauncher`](crate::StreamLauncher).
///
/// Defines:
/// - **Identity**: display name used in errors and logs
/// - **Command line**: program and arguments for the child
/// - **Output chunking**: raw chunks vs per-line events
#[derive(Clone, Debug)]
pub struct StreamConfig {
    /// Display name for errors and logs.
    pub name: String,

    /// Program to execute.
    pub command: String,

    /// Arguments passed to the child.
    pub args: Vec<String>,

    /// When `true`, output is emitted as one event per line; when `false`,
    /// raw chunks are emitted as they arrive.
    pub split_lines: bool,

    /// Capacity of the child-event broadcast ring buffer.
    ///
    /// Slow receivers that lag behind more than `bus_capacity` events will
    /// observe `Lagged` and skip older items. Minimum value is 1.
    pub bus_capacity: usize,
}

impl StreamConfig {
    /// Creates a configuration with defaults (`split_lines = false`,
    /// `bus_capacity = 1024`).
    pub fn new(name: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            command: command.into(),
            args: Vec::new(),
            split_lines: false,
            bus_capacity: 1024,
        }
    }

    /// Sets child arguments.
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Enables or disables per-line output events.
    pub fn with_split_lines(mut self, split: bool) -> Self {
        self.split_lines = split;
        self
    }
}

/// Configuration for a [`MessageSupervisor`](crate::MessageSupervisor).
///
/// ## Field semantics
/// - `worker`: path to the worker executable (the structured channel rides
///   its stdin/stdout pair)
/// - `name`: display name; derived from `worker`'s file stem when `None`
/// - `silent`: forwarded to the log sink, which may suppress console echo
#[derive(Clone, Debug)]
pub struct SupervisorConfig {
    /// Worker executable driven over the structured channel.
    pub worker: PathBuf,

    /// Arguments passed to the worker.
    pub args: Vec<String>,

    /// Display name; `None` derives it from the worker path.
    pub name: Option<String>,

    /// Suppress console echo of forwarded log records.
    pub silent: bool,
}

impl SupervisorConfig {
    /// Creates a configuration for the given worker executable.
    pub fn new(worker: impl Into<PathBuf>) -> Self {
        Self {
            worker: worker.into(),
            args: Vec::new(),
            name: None,
            silent: false,
        }
    }

    /// Sets worker arguments.
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Sets an explicit display name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Marks the supervisor silent.
    pub fn with_silent(mut self, silent: bool) -> Self {
        self.silent = silent;
        self
    }

    /// Resolves the display name: the explicit one, or the worker file stem.
    pub fn display_name(&self) -> String {
        if let Some(name) = &self.name {
            return name.clone();
        }
        Path::new(&self.worker)
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.worker.to_string_lossy().into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_name_wins() {
        let cfg = SupervisorConfig::new("/opt/workers/storage-worker").with_name("storage");
        assert_eq!(cfg.display_name(), "storage");
    }

    #[test]
    fn name_derives_from_worker_stem() {
        let cfg = SupervisorConfig::new("/opt/workers/storage-worker.bin");
        assert_eq!(cfg.display_name(), "storage-worker");
    }
}
