//! # StreamLauncher: piped child processes with tagged output events.
//!
//! [`StreamLauncher`] spawns a detached child with all three standard
//! streams piped and publishes what the child does as [`ChildEvent`]s on a
//! broadcast bus:
//!
//! ```text
//! start()
//!   ├─ spawn child (detached, stdio piped, kill_on_drop)
//!   ├─ reader task (stdout) ──► ChildEvent::Output { Stdout, .. } ──► ChildBus
//!   ├─ reader task (stderr) ──► ChildEvent::Output { Stderr, .. } ──► ChildBus
//!   └─ monitor task ──► child.wait() ──► ChildEvent::Exited ──► ChildBus
//!            ▲
//!            │ stop() / process-wide shutdown token
//!            └── SIGINT to the child's process group, then await exit
//! ```
//!
//! With `split_lines` enabled, output is emitted one line per event
//! (trailing newline and carriage return removed); otherwise raw chunks are
//! forwarded as they arrive. Spawn failures surface synchronously from
//! `start()`; runtime stream faults are published as [`ChildEvent::Fault`]
//! and escalate when nobody listens.

use std::process::Stdio;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::{Child, ChildStdin, Command};
use tokio_util::sync::CancellationToken;

use crate::channel::{ChildBus, ChildEvent, StdioStream};
use crate::config::StreamConfig;
use crate::error::LaunchError;

use super::signals;

#[cfg(windows)]
const CREATE_NO_WINDOW: u32 = 0x0800_0000;

/// Handle to the live child, cleared on `stop()`.
struct RunningChild {
    stop: CancellationToken,
}

/// Spawns a piped child process and publishes its output, faults and exit
/// as [`ChildEvent`]s.
///
/// At most one child is live per launcher; `start()` while started is a
/// usage error, as is `send()`/`stop()` without a live child.
pub struct StreamLauncher {
    cfg: StreamConfig,
    bus: ChildBus,
    stdin: Option<ChildStdin>,
    running: Option<RunningChild>,
}

impl StreamLauncher {
    /// Creates a launcher; no process is spawned until [`StreamLauncher::start`].
    pub fn new(cfg: StreamConfig) -> Self {
        let bus = ChildBus::new(cfg.bus_capacity);
        Self {
            cfg,
            bus,
            stdin: None,
            running: None,
        }
    }

    /// Launcher display name.
    pub fn name(&self) -> &str {
        &self.cfg.name
    }

    /// True while a child is live (started and not yet stopped).
    pub fn is_started(&self) -> bool {
        self.running.is_some()
    }

    /// Subscribes to the child's event stream.
    ///
    /// Subscribe **before** `start()` to observe everything the child does;
    /// a receiver only sees events published after it was created.
    pub fn events(&self) -> tokio::sync::broadcast::Receiver<ChildEvent> {
        self.bus.subscribe()
    }

    /// Spawns the child process and wires up readers and the exit monitor.
    ///
    /// # Errors
    /// - [`LaunchError::AlreadyStarted`] when a child is already live.
    /// - [`LaunchError::Spawn`] when the OS refuses to create the process.
    /// - [`LaunchError::Stdio`] when a piped stream is unavailable.
    pub fn start(&mut self) -> Result<(), LaunchError> {
        if self.running.is_some() {
            return Err(LaunchError::AlreadyStarted {
                name: self.cfg.name.clone(),
            });
        }

        let mut cmd = Command::new(&self.cfg.command);
        cmd.args(&self.cfg.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        #[cfg(unix)]
        cmd.process_group(0);
        #[cfg(windows)]
        cmd.creation_flags(CREATE_NO_WINDOW);

        let mut child = cmd.spawn().map_err(|source| LaunchError::Spawn {
            name: self.cfg.name.clone(),
            source,
        })?;

        let stdin = child.stdin.take().ok_or(LaunchError::Stdio {
            name: self.cfg.name.clone(),
            stream: "stdin",
        })?;
        let stdout = child.stdout.take().ok_or(LaunchError::Stdio {
            name: self.cfg.name.clone(),
            stream: "stdout",
        })?;
        let stderr = child.stderr.take().ok_or(LaunchError::Stdio {
            name: self.cfg.name.clone(),
            stream: "stderr",
        })?;

        spawn_reader(
            self.bus.clone(),
            StdioStream::Stdout,
            stdout,
            self.cfg.split_lines,
        );
        spawn_reader(
            self.bus.clone(),
            StdioStream::Stderr,
            stderr,
            self.cfg.split_lines,
        );

        let stop = CancellationToken::new();
        spawn_monitor(self.bus.clone(), child, stop.clone());

        self.stdin = Some(stdin);
        self.running = Some(RunningChild { stop });
        log::info!("started child process {}", self.cfg.name);
        Ok(())
    }

    /// Writes raw bytes to the child's input stream.
    ///
    /// # Errors
    /// - [`LaunchError::NotStarted`] when no child is live.
    /// - [`LaunchError::Write`] when the write fails.
    pub async fn send(&mut self, data: &[u8]) -> Result<(), LaunchError> {
        let stdin = self.stdin.as_mut().ok_or(LaunchError::NotStarted {
            name: self.cfg.name.clone(),
        })?;
        stdin
            .write_all(data)
            .await
            .map_err(|source| LaunchError::Write {
                name: self.cfg.name.clone(),
                source,
            })?;
        stdin.flush().await.map_err(|source| LaunchError::Write {
            name: self.cfg.name.clone(),
            source,
        })
    }

    /// Requests orderly termination: clears the owned handle and interrupts
    /// the child. The monitor publishes [`ChildEvent::Exited`] once the
    /// child is gone.
    ///
    /// # Errors
    /// - [`LaunchError::NotStarted`] when already stopped; the cleared
    ///   handle doubles as the double-stop guard.
    pub fn stop(&mut self) -> Result<(), LaunchError> {
        let running = self.running.take().ok_or(LaunchError::NotStarted {
            name: self.cfg.name.clone(),
        })?;
        self.stdin = None;
        running.stop.cancel();
        log::info!("stopping child process {}", self.cfg.name);
        Ok(())
    }
}

/// Reads one output stream and publishes tagged events until EOF.
fn spawn_reader<R>(bus: ChildBus, stream: StdioStream, reader: R, split_lines: bool)
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        if split_lines {
            read_lines(bus, stream, reader).await;
        } else {
            read_chunks(bus, stream, reader).await;
        }
    });
}

/// Per-line mode: one event per line, newline and trailing `\r` stripped.
async fn read_lines<R>(bus: ChildBus, stream: StdioStream, reader: R)
where
    R: AsyncRead + Unpin,
{
    use tokio::io::AsyncBufReadExt;

    let mut lines = tokio::io::BufReader::new(reader).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                bus.publish(ChildEvent::output(stream, line));
            }
            Ok(None) => break,
            Err(err) => {
                bus.publish_fault(&format!("{} read failed: {err}", stream.as_label()));
                break;
            }
        }
    }
}

/// Raw mode: chunks forwarded as they arrive, lossily decoded as UTF-8.
async fn read_chunks<R>(bus: ChildBus, stream: StdioStream, mut reader: R)
where
    R: AsyncRead + Unpin,
{
    let mut buf = [0u8; 4096];
    loop {
        match reader.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => {
                let text = String::from_utf8_lossy(&buf[..n]).into_owned();
                bus.publish(ChildEvent::output(stream, text));
            }
            Err(err) => {
                bus.publish_fault(&format!("{} read failed: {err}", stream.as_label()));
                break;
            }
        }
    }
}

/// Owns the child handle: waits for exit, reacts to `stop()` and to the
/// process-wide shutdown token by interrupting the child.
fn spawn_monitor(bus: ChildBus, mut child: Child, stop: CancellationToken) {
    let shutdown = signals::shutdown_token().child_token();
    tokio::spawn(async move {
        let mut interrupted = false;
        loop {
            tokio::select! {
                status = child.wait() => {
                    match status {
                        Ok(status) => {
                            bus.publish(ChildEvent::exited(status.code()));
                        }
                        Err(err) => {
                            bus.publish_fault(&format!("wait failed: {err}"));
                        }
                    }
                    break;
                }
                _ = stop.cancelled(), if !interrupted => {
                    interrupted = true;
                    interrupt(&mut child);
                }
                _ = shutdown.cancelled(), if !interrupted => {
                    interrupted = true;
                    interrupt(&mut child);
                }
            }
        }
    });
}

/// Delivers an interrupt to the child (SIGINT on unix, hard kill elsewhere).
///
/// The child is launched as its own process-group leader, so the signal is
/// sent to the negated pid and reaches any grandchildren it forked.
fn interrupt(child: &mut Child) {
    #[cfg(unix)]
    if let Some(pid) = child.id() {
        unsafe {
            libc::kill(-(pid as libc::pid_t), libc::SIGINT);
        }
    }
    #[cfg(not(unix))]
    {
        let _ = child.start_kill();
    }
}
