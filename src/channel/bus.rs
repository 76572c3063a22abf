//! # Broadcast bus for child events.
//!
//! [`ChildBus`] is a thin wrapper around [`tokio::sync::broadcast`] carrying
//! [`ChildEvent`]s from the launcher's reader/monitor tasks to any number of
//! consumers.
//!
//! ## Rules
//! - **Non-blocking publish**: `publish()` never blocks.
//! - **Bounded capacity**: a single ring buffer stores recent events; slow
//!   receivers observe `RecvError::Lagged(n)` and skip `n` oldest items.
//! - **No persistence**: ordinary events are dropped when nobody listens.
//! - **Faults are never silent**: [`ChildBus::publish_fault`] panics when no
//!   receiver exists, forcing visibility of unobserved child errors instead
//!   of swallowing them.

use tokio::sync::broadcast;

use super::event::ChildEvent;

/// Broadcast channel for child events.
///
/// Cheap to clone (internally holds an `Arc`-backed sender); multiple
/// publishers may publish concurrently and each receiver gets a clone of
/// every event sent after it subscribed.
#[derive(Clone, Debug)]
pub struct ChildBus {
    tx: broadcast::Sender<ChildEvent>,
}

impl ChildBus {
    /// Creates a new bus with the given channel capacity (clamped to 1).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (tx, _rx) = broadcast::channel::<ChildEvent>(capacity);
        Self { tx }
    }

    /// Publishes an event to all active receivers.
    ///
    /// Returns the number of receivers that will observe it; `0` means the
    /// event was dropped.
    pub fn publish(&self, ev: ChildEvent) -> usize {
        self.tx.send(ev).unwrap_or(0)
    }

    /// Publishes a fault, escalating when nobody is listening.
    ///
    /// Child errors must not fail silently: when no receiver exists the
    /// fault is logged and the calling task panics. From a detached reader
    /// task the panic tears down that task (and aborts the process under
    /// `panic = "abort"`); the error log line is always emitted first.
    pub fn publish_fault(&self, reason: &str) {
        let delivered = self.publish(ChildEvent::fault(reason.to_string()));
        if delivered == 0 {
            log::error!("unobserved child fault: {reason}");
            panic!("unobserved child fault: {reason}");
        }
    }

    /// Creates a new receiver observing subsequent events.
    pub fn subscribe(&self) -> broadcast::Receiver<ChildEvent> {
        self.tx.subscribe()
    }

    /// Number of currently attached receivers.
    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::StdioStream;

    #[tokio::test]
    async fn delivers_to_subscriber_in_order() {
        let bus = ChildBus::new(16);
        let mut rx = bus.subscribe();
        bus.publish(ChildEvent::output(StdioStream::Stdout, "a"));
        bus.publish(ChildEvent::exited(Some(0)));

        match rx.recv().await.unwrap() {
            ChildEvent::Output { stream, text } => {
                assert_eq!(stream, StdioStream::Stdout);
                assert_eq!(text, "a");
            }
            other => panic!("unexpected event: {other:?}"),
        }
        assert!(matches!(
            rx.recv().await.unwrap(),
            ChildEvent::Exited { code: Some(0) }
        ));
    }

    #[tokio::test]
    async fn ordinary_events_without_receivers_are_dropped() {
        let bus = ChildBus::new(4);
        assert_eq!(bus.publish(ChildEvent::output(StdioStream::Stderr, "x")), 0);
    }

    #[tokio::test]
    async fn fault_with_receiver_is_delivered_not_escalated() {
        let bus = ChildBus::new(4);
        let mut rx = bus.subscribe();
        bus.publish_fault("broken pipe");
        match rx.recv().await.unwrap() {
            ChildEvent::Fault { reason } => assert_eq!(&*reason, "broken pipe"),
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    #[should_panic(expected = "unobserved child fault")]
    async fn unobserved_fault_panics() {
        let bus = ChildBus::new(4);
        bus.publish_fault("broken pipe");
    }
}
