//! # Subscription registry: field/value routing for generic messages.
//!
//! The registry maps a field name to an ordered list of
//! `(expected value, callback, once)` entries. Inbound generic messages are
//! routed by scanning the message's **own fields in wire order** and
//! stopping at the first field name that is a registered key; only that one
//! key's list is consulted, even when other message fields are registered
//! too. Within the selected list, every entry whose expected value equals
//! the message's field value fires, in registration order.
//!
//! ```text
//! dispatch({status: "done", phase: 2})
//!    │  scan fields in wire order
//!    ├─ "status" registered? ── yes ─► filter list by value == "done"
//!    │                                  ├─ fire matching callbacks in order
//!    │                                  └─ drop fired `once` entries
//!    └─ "phase" is never consulted (single-key routing)
//! ```
//!
//! Dispatch is copy-then-mutate: the matching entries are snapshotted under
//! the lock, callbacks run with the lock released, and `once` removal is
//! applied afterwards by callback identity. A callback may therefore
//! subscribe or unsubscribe reentrantly without invalidating the scan, and
//! a `once` subscription observes its own firing.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use serde_json::Value;

use crate::messages::Message;

/// Callback invoked with the full matching message.
pub type SubscriptionCallback = Arc<dyn Fn(&Message) + Send + Sync>;

/// One registered `(expected value, callback, once)` entry.
struct Entry {
    value: Value,
    callback: SubscriptionCallback,
    once: bool,
}

/// Field/value subscription registry with single-key dispatch.
///
/// Shared between user tasks and the supervisor's reader task; a mutex
/// serializes access so the scan-then-mutate step stays atomic per message.
#[derive(Default)]
pub struct SubscriptionRegistry {
    inner: Mutex<HashMap<String, Vec<Entry>>>,
}

impl SubscriptionRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a repeating subscription for `(key, value)`.
    ///
    /// Multiple subscriptions may share a key with different values, and
    /// multiple may share the same `(key, value)` pair — all matching ones
    /// fire on dispatch.
    pub fn subscribe<F>(&self, key: impl Into<String>, value: Value, callback: F)
    where
        F: Fn(&Message) + Send + Sync + 'static,
    {
        self.add(key.into(), value, Arc::new(callback), false);
    }

    /// Registers a subscription removed automatically after its first match.
    pub fn subscribe_once<F>(&self, key: impl Into<String>, value: Value, callback: F)
    where
        F: Fn(&Message) + Send + Sync + 'static,
    {
        self.add(key.into(), value, Arc::new(callback), true);
    }

    fn add(&self, key: String, value: Value, callback: SubscriptionCallback, once: bool) {
        let mut inner = self.inner.lock().expect("registry lock poisoned");
        inner.entry(key).or_default().push(Entry {
            value,
            callback,
            once,
        });
    }

    /// Removes subscriptions under `key`.
    ///
    /// Without a value the whole list is cleared; the key itself stays
    /// registered, so the dispatch scan still stops on it. With a value,
    /// only entries whose expected value is equal are removed.
    pub fn unsubscribe(&self, key: &str, value: Option<&Value>) {
        let mut inner = self.inner.lock().expect("registry lock poisoned");
        match value {
            None => {
                if let Some(list) = inner.get_mut(key) {
                    list.clear();
                }
            }
            Some(value) => {
                if let Some(list) = inner.get_mut(key) {
                    list.retain(|entry| entry.value != *value);
                }
            }
        }
    }

    /// Clears the entire registry. Idempotent.
    pub fn unsubscribe_all(&self) {
        self.inner.lock().expect("registry lock poisoned").clear();
    }

    /// True when no subscriptions exist under any key.
    pub fn is_empty(&self) -> bool {
        self.inner
            .lock()
            .expect("registry lock poisoned")
            .values()
            .all(Vec::is_empty)
    }

    /// Routes a generic message; returns `true` when at least one callback
    /// fired.
    ///
    /// Messages whose fields match no registered key are dropped silently.
    pub fn dispatch(&self, msg: &Message) -> bool {
        let (key, matched) = {
            let inner = self.inner.lock().expect("registry lock poisoned");
            let Some((key, list)) = msg
                .iter()
                .find_map(|(field, _)| inner.get_key_value(field))
            else {
                return false;
            };
            let value = &msg[key.as_str()];
            let matched: Vec<(SubscriptionCallback, bool)> = list
                .iter()
                .filter(|entry| entry.value == *value)
                .map(|entry| (Arc::clone(&entry.callback), entry.once))
                .collect();
            (key.clone(), matched)
        };

        if matched.is_empty() {
            return false;
        }

        for (callback, _) in &matched {
            callback(msg);
        }

        let fired_once: Vec<&SubscriptionCallback> = matched
            .iter()
            .filter(|(_, once)| *once)
            .map(|(cb, _)| cb)
            .collect();
        if !fired_once.is_empty() {
            let mut inner = self.inner.lock().expect("registry lock poisoned");
            if let Some(list) = inner.get_mut(&key) {
                list.retain(|entry| {
                    !(entry.once
                        && fired_once
                            .iter()
                            .any(|cb| Arc::ptr_eq(*cb, &entry.callback)))
                });
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn msg(v: Value) -> Message {
        v.as_object().cloned().expect("object literal")
    }

    #[test]
    fn once_fires_exactly_once_and_repeating_fires_every_time() {
        let registry = SubscriptionRegistry::new();
        let ready = Arc::new(AtomicUsize::new(0));
        let done = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&ready);
        registry.subscribe("status", json!("ready"), move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        let counter = Arc::clone(&done);
        registry.subscribe_once("status", json!("done"), move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        assert!(registry.dispatch(&msg(json!({"status": "ready"}))));
        assert!(registry.dispatch(&msg(json!({"status": "done"}))));
        // The once entry is gone; the third delivery matches nothing.
        assert!(!registry.dispatch(&msg(json!({"status": "done"}))));
        assert!(registry.dispatch(&msg(json!({"status": "ready"}))));

        assert_eq!(ready.load(Ordering::SeqCst), 2);
        assert_eq!(done.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn only_the_first_recognized_field_is_routed() {
        let registry = SubscriptionRegistry::new();
        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&first);
        registry.subscribe("alpha", json!(1), move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        let counter = Arc::clone(&second);
        registry.subscribe("beta", json!(2), move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        // Both fields are registered keys; wire order picks "alpha" only.
        registry.dispatch(&msg(json!({"alpha": 1, "beta": 2})));
        assert_eq!(first.load(Ordering::SeqCst), 1);
        assert_eq!(second.load(Ordering::SeqCst), 0);

        // Reversed wire order picks "beta".
        registry.dispatch(&msg(json!({"beta": 2, "alpha": 1})));
        assert_eq!(first.load(Ordering::SeqCst), 1);
        assert_eq!(second.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn all_matching_entries_fire_in_registration_order() {
        let registry = SubscriptionRegistry::new();
        let order = Arc::new(Mutex::new(Vec::new()));

        for tag in ["a", "b"] {
            let order = Arc::clone(&order);
            registry.subscribe("phase", json!("boot"), move |_| {
                order.lock().unwrap().push(tag);
            });
        }
        let order_c = Arc::clone(&order);
        registry.subscribe("phase", json!("halt"), move |_| {
            order_c.lock().unwrap().push("c");
        });

        registry.dispatch(&msg(json!({"phase": "boot"})));
        assert_eq!(*order.lock().unwrap(), vec!["a", "b"]);
    }

    #[test]
    fn unmatched_value_fires_nothing_and_returns_false() {
        let registry = SubscriptionRegistry::new();
        registry.subscribe("status", json!("ready"), |_| panic!("must not fire"));
        assert!(!registry.dispatch(&msg(json!({"status": "failed"}))));
        assert!(!registry.dispatch(&msg(json!({"other": "ready"}))));
    }

    #[test]
    fn unsubscribe_by_value_removes_only_matching_entries() {
        let registry = SubscriptionRegistry::new();
        let hits = Arc::new(AtomicUsize::new(0));

        for expected in ["ready", "done"] {
            let counter = Arc::clone(&hits);
            registry.subscribe("status", json!(expected), move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
            });
        }

        registry.unsubscribe("status", Some(&json!("ready")));
        registry.dispatch(&msg(json!({"status": "ready"})));
        registry.dispatch(&msg(json!({"status": "done"})));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn cleared_key_still_stops_the_scan() {
        let registry = SubscriptionRegistry::new();
        let hits = Arc::new(AtomicUsize::new(0));

        registry.subscribe("alpha", json!(1), |_| {});
        let counter = Arc::clone(&hits);
        registry.subscribe("beta", json!(2), move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        // An emptied list keeps the key registered; the scan still stops on it.
        registry.unsubscribe("alpha", None);
        assert!(!registry.dispatch(&msg(json!({"alpha": 1, "beta": 2}))));
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn unsubscribe_all_is_idempotent() {
        let registry = SubscriptionRegistry::new();
        registry.subscribe("status", json!("ready"), |_| {});
        registry.unsubscribe_all();
        assert!(registry.is_empty());
        registry.unsubscribe_all();
        assert!(registry.is_empty());
        assert!(!registry.dispatch(&msg(json!({"status": "ready"}))));
    }

    #[test]
    fn reentrant_subscribe_from_a_callback_does_not_deadlock() {
        let registry = Arc::new(SubscriptionRegistry::new());
        let inner = Arc::clone(&registry);
        registry.subscribe_once("status", json!("ready"), move |_| {
            inner.subscribe("status", json!("late"), |_| {});
        });

        assert!(registry.dispatch(&msg(json!({"status": "ready"}))));
        // The reentrant subscription landed and the once entry is gone.
        assert!(!registry.is_empty());
        assert!(!registry.dispatch(&msg(json!({"status": "ready"}))));
    }
}
