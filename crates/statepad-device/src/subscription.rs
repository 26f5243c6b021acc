use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, PoisonError, Weak};
use std::time::Duration;

use crossbeam_channel::{RecvTimeoutError, TryIter, TryRecvError};

use crate::events::{DeviceEvent, EventReceiver};
use crate::manager::Inner;

/// Which events a subscriber wants while notifications are suppressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubscriptionKind {
    /// Action consumers. Observations are withheld while any
    /// [`SuppressionGuard`] is alive.
    Actions,
    /// Always receives every observation.
    Raw,
}

pub(crate) type SubscriptionId = u64;

/// Event stream token. Dropping it unsubscribes.
#[derive(Debug)]
pub struct Subscription {
    id: SubscriptionId,
    kind: SubscriptionKind,
    rx: EventReceiver,
    inner: Weak<Inner>,
}

impl Subscription {
    pub(crate) fn new(
        id: SubscriptionId,
        kind: SubscriptionKind,
        rx: EventReceiver,
        inner: Weak<Inner>,
    ) -> Self {
        Self { id, kind, rx, inner }
    }

    pub fn kind(&self) -> SubscriptionKind {
        self.kind
    }

    pub fn receiver(&self) -> &EventReceiver {
        &self.rx
    }

    pub fn try_recv(&self) -> Result<DeviceEvent, TryRecvError> {
        self.rx.try_recv()
    }

    pub fn try_iter(&self) -> TryIter<'_, DeviceEvent> {
        self.rx.try_iter()
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Result<DeviceEvent, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }

    /// Removes this subscriber from the manager. Safe to call repeatedly;
    /// events already queued stay readable.
    pub fn unsubscribe(&mut self) {
        let Some(inner) = self.inner.upgrade() else {
            return;
        };
        self.inner = Weak::new();
        let mut subs = inner
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        subs.retain(|sub| sub.id != self.id);
        log::trace!("subscription {} removed", self.id);
    }

    pub fn is_active(&self) -> bool {
        self.inner.strong_count() > 0
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

/// Withholds observations from [`SubscriptionKind::Actions`] subscribers
/// while alive. Guards nest.
#[derive(Debug)]
pub struct SuppressionGuard {
    counter: Arc<AtomicUsize>,
}

impl SuppressionGuard {
    pub(crate) fn new(counter: Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::AcqRel);
        Self { counter }
    }
}

impl Drop for SuppressionGuard {
    fn drop(&mut self) {
        self.counter.fetch_sub(1, Ordering::AcqRel);
    }
}
