//! Change fan-out: synchronous callbacks and prefix subscriptions.

use std::{
    panic::{AssertUnwindSafe, catch_unwind},
    sync::{
        Arc, Mutex, MutexGuard, PoisonError, Weak,
        atomic::{AtomicU64, Ordering},
    },
};

use chrono::{DateTime, Utc};
use tokio::sync::mpsc::{self, Receiver, Sender, error::TrySendError};
use tokio_stream::wrappers::ReceiverStream;
use tracing::{error, warn};

use super::{Differences, Snapshot};
use crate::tree::{KeyDiff, key_ops::key_matches};

/// Handle returned by [`Coordinator::register_callback`](super::Coordinator::register_callback).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CallbackId(u64);

/// Invoked after each install with `(new, old, differences)`.
pub type ConfigCallback = dyn Fn(&Snapshot, &Snapshot, &Differences) + Send + Sync;

const SUBSCRIPTION_BUFFER: usize = 16;

#[derive(Default)]
pub(super) struct Callbacks {
    next_id: AtomicU64,
    entries: Mutex<Vec<(CallbackId, Arc<ConfigCallback>)>>,
}

impl Callbacks {
    fn entries(&self) -> MutexGuard<'_, Vec<(CallbackId, Arc<ConfigCallback>)>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(super) fn register(&self, callback: Arc<ConfigCallback>) -> CallbackId {
        let id = CallbackId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.entries().push((id, callback));
        id
    }

    pub(super) fn unregister(&self, id: CallbackId) -> bool {
        let mut entries = self.entries();
        let before = entries.len();
        entries.retain(|(entry, _)| *entry != id);
        entries.len() != before
    }

    /// Runs every callback. A panicking callback is logged and the rest
    /// still run.
    pub(super) fn invoke_all(&self, new: &Snapshot, old: &Snapshot, diff: &Differences) {
        let callbacks: Vec<_> = self.entries().clone();
        for (id, callback) in callbacks {
            invoke(id, callback.as_ref(), new, old, diff);
        }
    }
}

pub(super) fn invoke(
    id: CallbackId,
    callback: &ConfigCallback,
    new: &Snapshot,
    old: &Snapshot,
    diff: &Differences,
) {
    if catch_unwind(AssertUnwindSafe(|| callback(new, old, diff))).is_err() {
        error!(callback = id.0, "Configuration callback panicked");
    }
}

/// A change delivered to a subscription.
#[derive(Debug, Clone)]
pub struct ConfigChange {
    /// Pattern the subscription was registered with
    pub prefix: String,
    /// Changed keys under the prefix; `None` means everything changed
    pub keys: Option<Vec<String>>,
    /// The newly installed snapshot
    pub snapshot: Arc<Snapshot>,
    /// When the change was installed
    pub timestamp: DateTime<Utc>,
}

struct Subscriber {
    id: u64,
    pattern: String,
    sender: Sender<ConfigChange>,
}

/// Subscriber list shared by the coordinator and live subscriptions.
#[derive(Default)]
pub(super) struct Subscribers {
    next_id: AtomicU64,
    entries: Mutex<Vec<Subscriber>>,
}

impl Subscribers {
    fn entries(&self) -> MutexGuard<'_, Vec<Subscriber>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(super) fn subscribe(self: &Arc<Self>, pattern: &str) -> Subscription {
        let (sender, receiver) = mpsc::channel(SUBSCRIPTION_BUFFER);
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);

        self.entries().push(Subscriber {
            id,
            pattern: pattern.to_string(),
            sender,
        });

        Subscription {
            guard: SubscriptionGuard {
                id,
                owner: Arc::downgrade(self),
            },
            receiver,
        }
    }

    /// Sends the change to each subscriber whose pattern it touches.
    /// Subscribers whose receiver is gone are dropped.
    pub(super) fn publish(&self, snapshot: &Arc<Snapshot>, diff: &Differences) {
        let timestamp = Utc::now();

        self.entries().retain(|sub| {
            if !touches(&diff.keys, &sub.pattern) {
                return true;
            }

            let change = ConfigChange {
                prefix: sub.pattern.clone(),
                keys: diff.keys.changed_under(&sub.pattern),
                snapshot: snapshot.clone(),
                timestamp,
            };

            match sub.sender.try_send(change) {
                Ok(()) => true,
                Err(TrySendError::Full(_)) => {
                    warn!(pattern = %sub.pattern, "Subscriber lagging, change dropped");
                    true
                }
                Err(TrySendError::Closed(_)) => false,
            }
        });
    }

    fn unsubscribe(&self, id: u64) {
        self.entries().retain(|sub| sub.id != id);
    }

    #[cfg(test)]
    pub(super) fn len(&self) -> usize {
        self.entries().len()
    }
}

fn touches(diff: &KeyDiff, pattern: &str) -> bool {
    if !pattern.contains('*') {
        return diff.contains(pattern);
    }

    match diff {
        KeyDiff::All => true,
        KeyDiff::Changed(changed) => changed.iter().any(|key| key_matches(key, pattern)),
    }
}

/// A subscription handle that unsubscribes when dropped.
///
/// Dropping the handle (or the stream made from it) removes the subscriber,
/// so UI components going out of scope clean up after themselves.
pub struct Subscription {
    guard: SubscriptionGuard,
    receiver: Receiver<ConfigChange>,
}

impl Subscription {
    /// Waits for the next change. `None` once the coordinator is gone.
    pub async fn recv(&mut self) -> Option<ConfigChange> {
        self.receiver.recv().await
    }

    /// Returns a change if one is already queued.
    pub fn try_recv(&mut self) -> Option<ConfigChange> {
        self.receiver.try_recv().ok()
    }

    /// Converts the subscription into a stream that still unsubscribes
    /// when dropped.
    pub fn into_stream(self) -> SubscriptionStream {
        SubscriptionStream {
            inner: ReceiverStream::new(self.receiver),
            _guard: self.guard,
        }
    }
}

/// Stream of changes for one subscription.
pub struct SubscriptionStream {
    inner: ReceiverStream<ConfigChange>,
    _guard: SubscriptionGuard,
}

impl futures::Stream for SubscriptionStream {
    type Item = ConfigChange;

    fn poll_next(
        mut self: std::pin::Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Option<Self::Item>> {
        std::pin::Pin::new(&mut self.inner).poll_next(cx)
    }
}

struct SubscriptionGuard {
    id: u64,
    owner: Weak<Subscribers>,
}

impl Drop for SubscriptionGuard {
    fn drop(&mut self) {
        if let Some(owner) = self.owner.upgrade() {
            owner.unsubscribe(self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use std::sync::atomic::AtomicUsize;

    use futures::StreamExt;

    use super::*;
    use crate::tree::ValueTree;

    fn installed(pairs: &[(&str, &str)]) -> (Arc<Snapshot>, Differences) {
        let base = Snapshot::empty();
        let old = Snapshot::new(
            ValueTree::from_pairs([("fleet.base", "1")]),
            base.tdb().clone(),
            false,
        );
        let new = Snapshot::new(
            ValueTree::from_pairs(pairs.iter().copied()),
            old.tdb().clone(),
            false,
        );
        let diff = Differences::compute(&new, Some(&old));
        (Arc::new(new), diff)
    }

    #[test]
    fn panicking_callback_does_not_stop_the_rest() {
        let callbacks = Callbacks::default();
        let calls = Arc::new(AtomicUsize::new(0));

        callbacks.register(Arc::new(|_: &Snapshot, _: &Snapshot, _: &Differences| {
            panic!("boom");
        }));
        let counter = calls.clone();
        callbacks.register(Arc::new(move |_: &Snapshot, _: &Snapshot, _: &Differences| {
            counter.fetch_add(1, Ordering::SeqCst);
        }));

        let (new, diff) = installed(&[("fleet.a", "1")]);
        callbacks.invoke_all(&new, &Snapshot::empty(), &diff);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn unregister_removes_only_that_callback() {
        let callbacks = Callbacks::default();
        let first = callbacks.register(Arc::new(|_: &Snapshot, _: &Snapshot, _: &Differences| {}));
        let second = callbacks.register(Arc::new(|_: &Snapshot, _: &Snapshot, _: &Differences| {}));

        assert_ne!(first, second);
        assert!(callbacks.unregister(first));
        assert!(!callbacks.unregister(first));
        assert_eq!(callbacks.entries().len(), 1);
    }

    #[tokio::test]
    async fn subscriber_receives_only_matching_changes() {
        let subscribers = Arc::new(Subscribers::default());
        let mut ui = subscribers.subscribe("fleet.ui");
        let mut mail = subscribers.subscribe("fleet.mail");

        let (snapshot, diff) = installed(&[("fleet.ui.port", "8081")]);
        subscribers.publish(&snapshot, &diff);

        let change = ui.recv().await.unwrap();
        assert_eq!(change.prefix, "fleet.ui");
        assert_eq!(change.snapshot.get("fleet.ui.port"), Some("8081"));
        assert!(mail.try_recv().is_none());
    }

    #[tokio::test]
    async fn wildcard_pattern_matches_segments() {
        let subscribers = Arc::new(Subscribers::default());
        let mut sub = subscribers.subscribe("fleet.*.port");

        let (snapshot, diff) = installed(&[("fleet.ui.port", "8081"), ("fleet.other", "x")]);
        subscribers.publish(&snapshot, &diff);

        assert!(sub.recv().await.is_some());
    }

    #[tokio::test]
    async fn dropping_subscription_unsubscribes() {
        let subscribers = Arc::new(Subscribers::default());
        let sub = subscribers.subscribe("fleet");
        let stream = subscribers.subscribe("fleet").into_stream();
        assert_eq!(subscribers.len(), 2);

        drop(sub);
        assert_eq!(subscribers.len(), 1);
        drop(stream);
        assert_eq!(subscribers.len(), 0);
    }

    #[tokio::test]
    async fn stream_yields_published_changes() {
        let subscribers = Arc::new(Subscribers::default());
        let mut stream = subscribers.subscribe("fleet.a").into_stream();

        let (snapshot, diff) = installed(&[("fleet.a", "1")]);
        subscribers.publish(&snapshot, &diff);

        let change = stream.next().await.unwrap();
        assert_eq!(change.keys, Some(vec!["fleet.a".to_string()]));
    }
}
