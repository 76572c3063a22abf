//! # Debug port allocation and debug-mode detection.
//!
//! When the parent itself runs under a debugger, each supervised worker is
//! launched with its own inspector port so multiple children can be attached
//! to without collision. [`DebugPortAllocator`] owns the counter state and
//! is injected into supervisor construction; sharing one allocator across
//! supervisors is what guarantees distinct ports. Construction without an
//! injected allocator falls back to a single process-wide default, so the
//! guarantee holds there too.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, OnceLock};

/// Base port the default allocator counts up from.
pub const DEFAULT_DEBUG_PORT_BASE: u16 = 60_000;

/// Hands out `base + counter` ports, one per debug-enabled supervisor.
///
/// The counter increments monotonically and ports are never reused; the
/// first allocation returns `base + 1`.
#[derive(Debug)]
pub struct DebugPortAllocator {
    base: u16,
    next: AtomicU32,
}

impl DebugPortAllocator {
    /// Creates an allocator counting up from the given base.
    pub fn new(base: u16) -> Self {
        Self {
            base,
            next: AtomicU32::new(1),
        }
    }

    /// Allocates the next port, clamped at the top of the port range.
    pub fn allocate(&self) -> u16 {
        let n = self.next.fetch_add(1, Ordering::Relaxed);
        u32::from(self.base)
            .saturating_add(n)
            .min(u32::from(u16::MAX)) as u16
    }
}

impl Default for DebugPortAllocator {
    fn default() -> Self {
        Self::new(DEFAULT_DEBUG_PORT_BASE)
    }
}

/// Process-wide allocator used when supervisor construction does not
/// inject one; all such supervisors share it, so their ports never
/// collide with each other.
pub(crate) fn shared_default() -> Arc<DebugPortAllocator> {
    static SHARED: OnceLock<Arc<DebugPortAllocator>> = OnceLock::new();
    Arc::clone(SHARED.get_or_init(|| Arc::new(DebugPortAllocator::default())))
}

/// Whether the parent process was launched under a debugger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebugMode {
    /// No debugger; workers are launched with the channel only.
    Disabled,
    /// Debugger present; each worker gets its own inspector port.
    Enabled,
}

impl DebugMode {
    /// Detects debug mode from the parent's own invocation flags.
    pub fn detect() -> Self {
        let flagged = std::env::args()
            .any(|arg| arg.contains("--debug") || arg.contains("--inspect"));
        if flagged {
            DebugMode::Enabled
        } else {
            DebugMode::Disabled
        }
    }

    /// True when a debugger is attached.
    pub fn is_enabled(self) -> bool {
        matches!(self, DebugMode::Enabled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn ports_are_distinct_and_monotonic() {
        let alloc = DebugPortAllocator::new(60_000);
        assert_eq!(alloc.allocate(), 60_001);
        assert_eq!(alloc.allocate(), 60_002);
        assert_eq!(alloc.allocate(), 60_003);
    }

    #[test]
    fn shared_allocator_never_collides() {
        let alloc = Arc::new(DebugPortAllocator::default());
        let a = alloc.allocate();
        let b = alloc.allocate();
        assert_ne!(a, b);
        assert!(a > DEFAULT_DEBUG_PORT_BASE);
        assert!(b > DEFAULT_DEBUG_PORT_BASE);
    }

    #[test]
    fn default_fallback_is_one_allocator_per_process() {
        assert!(Arc::ptr_eq(&shared_default(), &shared_default()));
    }

    #[test]
    fn allocation_clamps_at_the_top_of_the_port_range() {
        let alloc = DebugPortAllocator::new(u16::MAX - 1);
        assert_eq!(alloc.allocate(), u16::MAX);
        assert_eq!(alloc.allocate(), u16::MAX);
        assert_eq!(alloc.allocate(), u16::MAX);
    }
}
