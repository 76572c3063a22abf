//! # MessageSupervisor: a worker child driven over a structured channel.
//!
//! The supervisor forks a worker executable, owns the structured channel
//! riding its piped stdin/stdout pair (one JSON object per line), and
//! routes every inbound message to exactly one consumer:
//!
//! ```text
//! worker stdout ──► reader task ──► classify (fixed priority)
//!                        │  "error" field? log it, keep going
//!                        ├─ result == "log"   ──► LogSink::handle
//!                        ├─ has "event" field ──► HandlerTable::dispatch ──┐
//!                        └─ otherwise         ──► SubscriptionRegistry     │
//!                                                                          │
//! worker stdin  ◄── writer task ◄── outbound queue ◄── send() / Responder ┘
//!
//! monitor task ──► child.wait() ──► exit callback (exclusive) or info log
//!        ▲
//!        └── kill(signal) control
//! ```
//!
//! Dispatch runs message-at-a-time on the reader task, so two messages
//! never interleave mid-dispatch; handlers and subscription callbacks may
//! themselves defer work, in which case response ordering relative to
//! request ordering is theirs to manage.
//!
//! When the parent itself runs under a debugger, each worker is launched
//! with `--inspect-brk=<port>` using a port from the injected
//! [`DebugPortAllocator`], plus a piped (and drained) stderr; otherwise
//! stderr is inherited and only the channel pair is piped.

use std::process::Stdio;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStderr, ChildStdin, ChildStdout, Command};
use tokio::sync::mpsc;

use crate::config::SupervisorConfig;
use crate::error::SupervisorError;
use crate::messages::{codec, fields, Inbound, Message};
use crate::sink::{LogSink, StdoutSink};

use super::handlers::HandlerTable;
use super::ports::{DebugMode, DebugPortAllocator};
use super::registry::SubscriptionRegistry;

/// Callback invoked exclusively with the worker's exit code.
pub type ExitCallback = Box<dyn FnOnce(Option<i32>) + Send + 'static>;

/// Items handed to the writer task.
pub(crate) enum Outgoing {
    /// A message forwarded as-is over the channel.
    Message(Message),
    /// Close the channel; the worker observes EOF and exits on its own.
    Disconnect,
}

/// Control requests handled by the monitor task.
enum Control {
    /// Forcibly terminate the worker, optionally with a unix signal number.
    Kill(Option<i32>),
}

/// Builder for constructing a supervisor with optional collaborators.
///
/// ## Example
/// ```no_run
/// use procvisor::{HandlerTable, SupervisorBuilder, SupervisorConfig};
/// use serde_json::json;
///
/// # async fn demo() -> Result<(), procvisor::SupervisorError> {
/// let handlers = HandlerTable::new().register("ping", |_req, _args, responder| {
///     responder.respond(json!("pong"));
/// });
/// let supervisor = SupervisorBuilder::new(SupervisorConfig::new("/opt/workers/storage"))
///     .with_handlers(handlers)
///     .spawn()?;
/// supervisor.subscribe("status", json!("ready"), |msg| {
///     println!("worker ready: {msg:?}");
/// });
/// # Ok(())
/// # }
/// ```
pub struct SupervisorBuilder {
    cfg: SupervisorConfig,
    handlers: HandlerTable,
    sink: Option<Arc<dyn LogSink>>,
    exit: Option<ExitCallback>,
    allocator: Option<Arc<DebugPortAllocator>>,
    debug: Option<DebugMode>,
}

impl SupervisorBuilder {
    /// Creates a builder with no handlers, the stdout sink, and detected
    /// debug mode.
    pub fn new(cfg: SupervisorConfig) -> Self {
        Self {
            cfg,
            handlers: HandlerTable::new(),
            sink: None,
            exit: None,
            allocator: None,
            debug: None,
        }
    }

    /// Sets the remote-event handler table.
    pub fn with_handlers(mut self, handlers: HandlerTable) -> Self {
        self.handlers = handlers;
        self
    }

    /// Sets the log-record sink collaborator.
    pub fn with_sink(mut self, sink: Arc<dyn LogSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Sets the exit callback, invoked exclusively with the exit code.
    pub fn with_exit_callback<F>(mut self, callback: F) -> Self
    where
        F: FnOnce(Option<i32>) + Send + 'static,
    {
        self.exit = Some(Box::new(callback));
        self
    }

    /// Injects the debug-port allocator shared across supervisors.
    pub fn with_port_allocator(mut self, allocator: Arc<DebugPortAllocator>) -> Self {
        self.allocator = Some(allocator);
        self
    }

    /// Overrides debug-mode detection (useful in tests).
    pub fn with_debug_mode(mut self, debug: DebugMode) -> Self {
        self.debug = Some(debug);
        self
    }

    /// Forks the worker and wires the channel tasks.
    ///
    /// # Errors
    /// - [`SupervisorError::Spawn`] when the OS refuses to create the worker.
    /// - [`SupervisorError::Stdio`] when a channel stream is unavailable.
    pub fn spawn(self) -> Result<MessageSupervisor, SupervisorError> {
        let name = self.cfg.display_name();
        let debug = self.debug.unwrap_or_else(DebugMode::detect);
        let debug_port = if debug.is_enabled() {
            // The process-wide fallback keeps ports distinct even across
            // supervisors that never saw an injected allocator.
            let allocator = self.allocator.unwrap_or_else(super::ports::shared_default);
            Some(allocator.allocate())
        } else {
            None
        };

        let mut cmd = Command::new(&self.cfg.worker);
        if let Some(port) = debug_port {
            cmd.arg(format!("--inspect-brk={port}"));
        }
        cmd.args(&self.cfg.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(if debug_port.is_some() {
                Stdio::piped()
            } else {
                Stdio::inherit()
            })
            .kill_on_drop(true);

        let mut child = cmd.spawn().map_err(|source| SupervisorError::Spawn {
            name: name.clone(),
            source,
        })?;

        let stdin = child.stdin.take().ok_or(SupervisorError::Stdio {
            name: name.clone(),
            stream: "stdin",
        })?;
        let stdout = child.stdout.take().ok_or(SupervisorError::Stdio {
            name: name.clone(),
            stream: "stdout",
        })?;
        if let Some(stderr) = child.stderr.take() {
            spawn_stderr_drain(name.clone(), stderr);
        }

        let sink = self
            .sink
            .unwrap_or_else(|| Arc::new(StdoutSink::new(name.clone(), self.cfg.silent)));
        let registry = Arc::new(SubscriptionRegistry::new());
        let connected = Arc::new(AtomicBool::new(true));

        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let (control_tx, control_rx) = mpsc::unbounded_channel();

        spawn_writer(name.clone(), stdin, outbound_rx, Arc::clone(&connected));
        spawn_reader(
            name.clone(),
            stdout,
            self.handlers,
            Arc::clone(&registry),
            sink,
            outbound_tx.clone(),
        );
        spawn_monitor(
            name.clone(),
            child,
            control_rx,
            self.exit,
            Arc::clone(&connected),
        );

        log::info!("spawned worker {name}");
        Ok(MessageSupervisor {
            name,
            debug_port,
            connected,
            outbound: outbound_tx,
            control: control_tx,
            registry,
        })
    }
}

/// Supervises one worker child over the structured channel.
///
/// Owns the subscription registry and the channel endpoints; the worker
/// process is torn down when the supervisor is dropped (`kill_on_drop`).
pub struct MessageSupervisor {
    name: String,
    debug_port: Option<u16>,
    connected: Arc<AtomicBool>,
    outbound: mpsc::UnboundedSender<Outgoing>,
    control: mpsc::UnboundedSender<Control>,
    registry: Arc<SubscriptionRegistry>,
}

impl MessageSupervisor {
    /// Supervisor display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Inspector port allocated for this worker, when launched in debug mode.
    pub fn debug_port(&self) -> Option<u16> {
        self.debug_port
    }

    /// True while the channel is open and the worker has not exited.
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    /// Forwards a message as-is over the channel.
    ///
    /// Returns `false` without side effect when the channel is
    /// disconnected, `true` once the message is queued for the writer.
    pub fn send(&self, msg: Message) -> bool {
        if !self.is_connected() {
            return false;
        }
        self.outbound.send(Outgoing::Message(msg)).is_ok()
    }

    /// Closes the structured channel.
    ///
    /// The worker observes EOF on its end and is expected to exit on its
    /// own; this does not forcibly terminate it.
    pub fn disconnect(&self) {
        self.connected.store(false, Ordering::SeqCst);
        let _ = self.outbound.send(Outgoing::Disconnect);
    }

    /// Forcibly terminates the worker.
    ///
    /// On unix `signal` selects the delivered signal (default `SIGTERM`);
    /// elsewhere the worker is killed outright.
    pub fn kill(&self, signal: Option<i32>) {
        let _ = self.control.send(Control::Kill(signal));
    }

    /// Registers a repeating subscription for `(key, value)`.
    pub fn subscribe<F>(&self, key: impl Into<String>, value: Value, callback: F)
    where
        F: Fn(&Message) + Send + Sync + 'static,
    {
        self.registry.subscribe(key, value, callback);
    }

    /// Registers a subscription removed automatically after its first match.
    pub fn subscribe_once<F>(&self, key: impl Into<String>, value: Value, callback: F)
    where
        F: Fn(&Message) + Send + Sync + 'static,
    {
        self.registry.subscribe_once(key, value, callback);
    }

    /// Removes subscriptions under `key`; see
    /// [`SubscriptionRegistry::unsubscribe`].
    pub fn unsubscribe(&self, key: &str, value: Option<&Value>) {
        self.registry.unsubscribe(key, value);
    }

    /// Clears the entire registry.
    pub fn unsubscribe_all(&self) {
        self.registry.unsubscribe_all();
    }

    /// Shared handle to the subscription registry.
    pub fn registry(&self) -> &Arc<SubscriptionRegistry> {
        &self.registry
    }
}

/// Writer task: serializes outbound messages onto the worker's stdin.
fn spawn_writer(
    name: String,
    mut stdin: ChildStdin,
    mut rx: mpsc::UnboundedReceiver<Outgoing>,
    connected: Arc<AtomicBool>,
) {
    tokio::spawn(async move {
        while let Some(out) = rx.recv().await {
            match out {
                Outgoing::Message(msg) => {
                    let line = codec::encode(&msg);
                    if let Err(err) = stdin.write_all(line.as_bytes()).await {
                        log::error!("channel write to {name} failed: {err}");
                        connected.store(false, Ordering::SeqCst);
                        break;
                    }
                    if let Err(err) = stdin.flush().await {
                        log::error!("channel flush to {name} failed: {err}");
                        connected.store(false, Ordering::SeqCst);
                        break;
                    }
                }
                Outgoing::Disconnect => break,
            }
        }
        // Dropping stdin closes the channel; the worker sees EOF.
    });
}

/// Reader task: classifies each inbound line and routes it to exactly one
/// of the sink, the handler table, or the subscription registry.
fn spawn_reader(
    name: String,
    stdout: ChildStdout,
    handlers: HandlerTable,
    registry: Arc<SubscriptionRegistry>,
    sink: Arc<dyn LogSink>,
    outbound: mpsc::UnboundedSender<Outgoing>,
) {
    tokio::spawn(async move {
        let mut lines = BufReader::new(stdout).lines();
        loop {
            let line = match lines.next_line().await {
                Ok(Some(line)) => line,
                Ok(None) => break,
                Err(err) => {
                    log::error!("channel read from {name} failed: {err}");
                    break;
                }
            };
            if line.trim().is_empty() {
                continue;
            }
            let Some(msg) = codec::decode(&line) else {
                log::warn!("discarding malformed channel message from {name}");
                continue;
            };
            if let Some(err) = msg.get(fields::ERROR) {
                log::error!("{name} reported error: {err}");
            }
            match Inbound::classify(msg) {
                Inbound::Log(record) => sink.handle(&record).await,
                Inbound::Event(call) => handlers.dispatch(call, &outbound),
                Inbound::Generic(generic) => {
                    registry.dispatch(&generic);
                }
            }
        }
    });
}

/// Monitor task: owns the child handle, reacts to kill requests, reports
/// exit through the callback or the log.
fn spawn_monitor(
    name: String,
    mut child: Child,
    mut control: mpsc::UnboundedReceiver<Control>,
    exit: Option<ExitCallback>,
    connected: Arc<AtomicBool>,
) {
    tokio::spawn(async move {
        let mut exit = exit;
        let mut control_open = true;
        loop {
            tokio::select! {
                status = child.wait() => {
                    connected.store(false, Ordering::SeqCst);
                    let code = status.ok().and_then(|s| s.code());
                    if let Some(callback) = exit.take() {
                        callback(code);
                    } else if let Some(code) = code.filter(|c| *c != 0) {
                        log::info!("child process {name} exited with code {code}");
                    }
                    break;
                }
                ctrl = control.recv(), if control_open => {
                    match ctrl {
                        Some(Control::Kill(signal)) => kill_child(&mut child, signal),
                        None => control_open = false,
                    }
                }
            }
        }
    });
}

/// Drains a piped stderr (debug mode) into the log.
fn spawn_stderr_drain(name: String, stderr: ChildStderr) {
    tokio::spawn(async move {
        let mut lines = BufReader::new(stderr).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            log::debug!("[{name}:stderr] {line}");
        }
    });
}

/// Delivers the requested signal (unix) or kills outright (elsewhere).
fn kill_child(child: &mut Child, signal: Option<i32>) {
    #[cfg(unix)]
    {
        if let Some(pid) = child.id() {
            let signal = signal.unwrap_or(libc::SIGTERM);
            unsafe {
                libc::kill(pid as libc::pid_t, signal);
            }
            return;
        }
        let _ = child.start_kill();
    }
    #[cfg(not(unix))]
    {
        let _ = signal;
        let _ = child.start_kill();
    }
}
