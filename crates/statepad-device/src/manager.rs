use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::Instant;

use ahash::AHashMap;
use crossbeam_channel::{unbounded, Sender};
use statepad_layout::{ControlValue, LayoutRegistry, StateFormat};

use crate::error::{Error, Result};
use crate::events::{DeviceEvent, Observation};
use crate::session::DeviceSession;
use crate::subscription::{Subscription, SubscriptionId, SubscriptionKind, SuppressionGuard};
use crate::tree::ControlTree;
use crate::types::{DeviceId, DeviceInfo, DeviceStatus};

pub(crate) struct Subscriber {
    pub(crate) id: SubscriptionId,
    pub(crate) kind: SubscriptionKind,
    pub(crate) tx: Sender<DeviceEvent>,
}

enum DeviceEntry {
    Usable(Arc<DeviceSession>),
    Unusable { info: DeviceInfo, reason: String },
}

impl DeviceEntry {
    fn status(&self) -> DeviceStatus {
        match self {
            DeviceEntry::Usable(session) => {
                let tree = session.tree();
                DeviceStatus {
                    info: session.info().clone(),
                    layout: Some((Arc::from(tree.layout().name()), tree.variant().clone())),
                    unusable_reason: None,
                    degraded: session.is_degraded(),
                }
            }
            DeviceEntry::Unusable { info, reason } => DeviceStatus {
                info: info.clone(),
                layout: None,
                unusable_reason: Some(reason.clone()),
                degraded: false,
            },
        }
    }
}

/// Shared state used by the manager and subscription tokens.
pub(crate) struct Inner {
    pub(crate) subscribers: Mutex<Vec<Subscriber>>,
    devices: RwLock<AHashMap<DeviceId, DeviceEntry>>,
    suppression: Arc<AtomicUsize>,
    next_subscription: AtomicU64,
}

impl std::fmt::Debug for Inner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Inner")
            .field("suppression", &self.suppression.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

/// Platform-facing entry point: tracks connected devices, decodes their
/// state buffers and fans observations out to subscribers.
#[derive(Clone)]
pub struct DeviceManager {
    registry: Arc<LayoutRegistry>,
    inner: Arc<Inner>,
}

impl DeviceManager {
    pub fn new(registry: Arc<LayoutRegistry>) -> Self {
        let inner = Arc::new(Inner {
            subscribers: Mutex::new(Vec::new()),
            devices: RwLock::new(AHashMap::new()),
            suppression: Arc::new(AtomicUsize::new(0)),
            next_subscription: AtomicU64::new(1),
        });
        Self { registry, inner }
    }

    pub fn registry(&self) -> &Arc<LayoutRegistry> {
        &self.registry
    }

    /// Resolves a layout and variant for the device. Devices nothing fits
    /// are kept as present but unusable.
    pub fn connect(&self, info: DeviceInfo) -> DeviceStatus {
        let id = info.id;
        let entry = match self.open(&info) {
            Ok(session) => {
                let tree = session.tree();
                log::debug!(
                    "device {id} ({}) connected as {} [{}]",
                    info.name,
                    tree.layout().name(),
                    tree.variant()
                );
                DeviceEntry::Usable(Arc::new(session))
            }
            Err(err) => {
                log::warn!("device {id} ({}) is unusable: {err}", info.name);
                DeviceEntry::Unusable {
                    info: info.clone(),
                    reason: err.to_string(),
                }
            }
        };

        let status = entry.status();
        let replaced = self
            .inner
            .devices
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, entry);
        if replaced.is_some() {
            log::debug!("device {id} reconnected, previous state dropped");
        }

        self.broadcast(&DeviceEvent::Connected {
            info,
            usable: status.is_usable(),
            layout: status.layout.as_ref().map(|(name, _)| Arc::clone(name)),
            variant: status.layout.as_ref().map(|(_, variant)| variant.clone()),
        });
        status
    }

    fn open(&self, info: &DeviceInfo) -> Result<DeviceSession> {
        let found = self.registry.match_device(info.format, &info.capabilities)?;
        let tree = ControlTree::build(found.layout, found.variant)?;
        Ok(DeviceSession::new(info.clone(), Arc::new(tree)))
    }

    pub fn disconnect(&self, id: DeviceId) -> Result<()> {
        let removed = self
            .inner
            .devices
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id);
        if removed.is_none() {
            return Err(Error::NotFound(id));
        }
        log::debug!("device {id} disconnected");
        self.broadcast(&DeviceEvent::Disconnected(id));
        Ok(())
    }

    /// Session of a usable device.
    pub fn session(&self, id: DeviceId) -> Result<Arc<DeviceSession>> {
        let devices = self
            .inner
            .devices
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        match devices.get(&id) {
            Some(DeviceEntry::Usable(session)) => Ok(Arc::clone(session)),
            Some(DeviceEntry::Unusable { reason, .. }) => Err(Error::Unusable {
                id,
                reason: reason.clone(),
            }),
            None => Err(Error::NotFound(id)),
        }
    }

    /// Known devices ordered by id, usable or not.
    pub fn devices(&self) -> Vec<DeviceStatus> {
        let devices = self
            .inner
            .devices
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        let mut list: Vec<DeviceStatus> = devices.values().map(DeviceEntry::status).collect();
        list.sort_by_key(|status| status.info.id);
        list
    }

    pub fn ingest(&self, id: DeviceId, raw: &[u8], format: StateFormat) -> Result<usize> {
        self.ingest_at(id, raw, format, Instant::now())
    }

    /// Publishes a buffer and broadcasts one observation per changed
    /// control. Returns the number of changed controls.
    pub fn ingest_at(
        &self,
        id: DeviceId,
        raw: &[u8],
        format: StateFormat,
        now: Instant,
    ) -> Result<usize> {
        let session = self.session(id)?;
        let pair = match session.ingest_at(raw, format, now) {
            Ok(pair) => pair,
            Err(err) => {
                self.broadcast(&DeviceEvent::Degraded {
                    id,
                    error: err.to_string(),
                });
                return Err(err);
            }
        };

        let changes = session.changes_in(&pair);
        let count = changes.len();
        for change in changes {
            log::trace!("device {id}: {} = {}", change.path, change.value);
            self.broadcast(&DeviceEvent::Observation(Observation {
                device: id,
                path: change.path,
                kind: change.kind,
                value: change.value,
                previous: change.previous,
                noisy: change.noisy,
                leaf: change.leaf,
                timestamp: pair.current.timestamp(),
                sequence: pair.current.sequence(),
            }));
        }
        Ok(count)
    }

    pub fn read_value(&self, id: DeviceId, path: &str) -> Result<ControlValue> {
        self.session(id)?.read(path)
    }

    /// Subscribes to device events. Dropping the token unsubscribes.
    pub fn subscribe(&self, kind: SubscriptionKind) -> Subscription {
        let (tx, rx) = unbounded();
        let id = self.inner.next_subscription.fetch_add(1, Ordering::Relaxed);
        self.inner
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Subscriber { id, kind, tx });
        Subscription::new(id, kind, rx, Arc::downgrade(&self.inner))
    }

    /// Withholds observations from action subscribers until the guard drops.
    pub fn suppress(&self) -> SuppressionGuard {
        SuppressionGuard::new(Arc::clone(&self.inner.suppression))
    }

    pub fn is_suppressed(&self) -> bool {
        self.inner.suppression.load(Ordering::Acquire) > 0
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn broadcast(&self, event: &DeviceEvent) {
        let suppressed =
            matches!(event, DeviceEvent::Observation(_)) && self.is_suppressed();
        let mut subs = self
            .inner
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        subs.retain(|sub| {
            if suppressed && sub.kind == SubscriptionKind::Actions {
                return true;
            }
            sub.tx.send(event.clone()).is_ok()
        });
    }
}

impl std::fmt::Debug for DeviceManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceManager")
            .field("layouts", &self.registry.len())
            .field("inner", &self.inner)
            .finish()
    }
}
