//! # Cross-platform OS signal handling for child cleanup.
//!
//! The listener is installed **exactly once per process**, regardless of how
//! many launchers start and stop children: every `start()` derives a child
//! token from the shared [`shutdown_token`], so repeated start/stop cycles
//! never accumulate duplicate handlers. When the process receives a
//! termination signal, the token cancels and every live child is sent an
//! interrupt; `kill_on_drop` covers parent exit without a signal.
//!
//! ## Signals
//! **Unix platforms:**
//! - `SIGINT` (Ctrl-C in terminal)
//! - `SIGTERM` (default kill signal, used by systemd/Kubernetes)
//! - `SIGQUIT` (quit signal, often used for core dumps or hard stop)
//!
//! **Windows platforms:**
//! - `Ctrl-C` via [`tokio::signal::ctrl_c`]

use std::sync::OnceLock;

use tokio_util::sync::CancellationToken;

static SHUTDOWN: OnceLock<CancellationToken> = OnceLock::new();

/// Returns the process-wide shutdown token, installing the signal listener
/// on first use.
///
/// Must be called from within a tokio runtime.
pub fn shutdown_token() -> CancellationToken {
    SHUTDOWN
        .get_or_init(|| {
            let token = CancellationToken::new();
            let trigger = token.clone();
            tokio::spawn(async move {
                if wait_for_shutdown_signal().await.is_ok() {
                    trigger.cancel();
                }
            });
            token
        })
        .clone()
}

/// Waits for a termination signal.
///
/// Returns `Ok(())` when any signal is received, or `Err` if signal
/// registration fails.
#[cfg(unix)]
async fn wait_for_shutdown_signal() -> std::io::Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigquit = signal(SignalKind::quit())?;

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {},
        _ = sigint.recv()  => {},
        _ = sigterm.recv() => {},
        _ = sigquit.recv() => {},
    }
    Ok(())
}

/// Waits for a termination signal.
///
/// Returns `Ok(())` when any signal is received, or `Err` if signal
/// registration fails.
#[cfg(not(unix))]
async fn wait_for_shutdown_signal() -> std::io::Result<()> {
    tokio::signal::ctrl_c().await
}
