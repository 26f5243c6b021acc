use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Instant;

use statepad_layout::{ControlKind, ControlValue, StateFormat};

use crate::error::{Error, Result};
use crate::state::{StateBuffer, StatePair};
use crate::tree::{ControlTree, NodeId};
use crate::types::DeviceInfo;

/// A control whose value differs between the previous and current buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct ControlChange {
    pub node: NodeId,
    pub path: Arc<str>,
    pub kind: ControlKind,
    pub value: ControlValue,
    pub previous: ControlValue,
    pub noisy: bool,
    /// `false` for sticks and d-pads composed from their children.
    pub leaf: bool,
}

/// Decoding state of one connected device.
///
/// A single thread ingests buffers; any number of threads may read.
#[derive(Debug)]
pub struct DeviceSession {
    info: DeviceInfo,
    tree: Arc<ControlTree>,
    state: RwLock<Arc<StatePair>>,
    sequence: AtomicU64,
    degraded: AtomicBool,
}

impl DeviceSession {
    /// Starts with the layout's default state as the current buffer.
    pub fn new(info: DeviceInfo, tree: Arc<ControlTree>) -> Self {
        let initial = StateBuffer::new(tree.layout().default_state(), Instant::now(), 0);
        Self {
            info,
            tree,
            state: RwLock::new(Arc::new(StatePair::initial(initial))),
            sequence: AtomicU64::new(0),
            degraded: AtomicBool::new(false),
        }
    }

    pub fn info(&self) -> &DeviceInfo {
        &self.info
    }

    pub fn tree(&self) -> &Arc<ControlTree> {
        &self.tree
    }

    pub fn is_degraded(&self) -> bool {
        self.degraded.load(Ordering::Acquire)
    }

    /// The current `(previous, current)` pair.
    pub fn snapshot(&self) -> Arc<StatePair> {
        let guard = self.state.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&guard)
    }

    pub fn ingest(&self, raw: &[u8], format: StateFormat) -> Result<Arc<StatePair>> {
        self.ingest_at(raw, format, Instant::now())
    }

    /// Validates `raw` and publishes it as the current buffer. A rejected
    /// buffer leaves the state untouched and marks the session degraded
    /// until the next good buffer.
    pub fn ingest_at(&self, raw: &[u8], format: StateFormat, now: Instant) -> Result<Arc<StatePair>> {
        if let Err(err) = self.check(raw, format) {
            self.degraded.store(true, Ordering::Release);
            log::warn!("device {} rejected state buffer: {err}", self.info.id);
            return Err(err);
        }

        let sequence = self.sequence.fetch_add(1, Ordering::AcqRel) + 1;
        let buffer = StateBuffer::new(raw, now, sequence);

        let mut guard = self.state.write().unwrap_or_else(PoisonError::into_inner);
        let next = Arc::new(guard.advance(buffer));
        *guard = Arc::clone(&next);
        drop(guard);

        if self.degraded.swap(false, Ordering::AcqRel) {
            log::debug!("device {} recovered", self.info.id);
        }
        Ok(next)
    }

    fn check(&self, raw: &[u8], format: StateFormat) -> Result<()> {
        let layout = self.tree.layout();
        if format != layout.state_format() {
            return Err(Error::FormatMismatch {
                expected: layout.state_format(),
                actual: format,
            });
        }
        let expected = layout.size_in_bytes() as usize;
        if raw.len() != expected {
            return Err(Error::StateSizeMismatch {
                expected,
                actual: raw.len(),
            });
        }
        Ok(())
    }

    /// Value of `path` in the current buffer.
    pub fn read(&self, path: &str) -> Result<ControlValue> {
        let pair = self.snapshot();
        self.tree.read(pair.current.bytes(), path)
    }

    /// Current minus previous value, without scaling by time. Zero until a
    /// second buffer has arrived.
    pub fn delta(&self, path: &str) -> Result<ControlValue> {
        let pair = self.snapshot();
        let current = self.tree.read(pair.current.bytes(), path)?;
        match &pair.previous {
            Some(previous) => {
                let previous = self.tree.read(previous.bytes(), path)?;
                Ok(current.delta(&previous))
            }
            None => Ok(current.zero_like()),
        }
    }

    /// Every readable control whose value changed with the last buffer.
    pub fn changes(&self) -> Vec<ControlChange> {
        self.changes_in(&self.snapshot())
    }

    pub(crate) fn changes_in(&self, pair: &StatePair) -> Vec<ControlChange> {
        let Some(previous) = &pair.previous else {
            return Vec::new();
        };

        let mut changes = Vec::new();
        for (id, node) in self.tree.nodes() {
            let Some(kind) = node.kind() else { continue };
            if !self.tree.is_readable(id) {
                continue;
            }
            let (Ok(value), Ok(before)) = (
                self.tree.read_node(pair.current.bytes(), id),
                self.tree.read_node(previous.bytes(), id),
            ) else {
                continue;
            };
            if value != before {
                changes.push(ControlChange {
                    node: id,
                    path: Arc::clone(node.path()),
                    kind,
                    value,
                    previous: before,
                    noisy: node.is_noisy(),
                    leaf: node.is_leaf(),
                });
            }
        }
        changes
    }

    /// Paths of leaf controls that changed with the last buffer.
    pub fn changed_controls(&self) -> Vec<Arc<str>> {
        self.changes()
            .into_iter()
            .filter(|c| c.leaf)
            .map(|c| c.path)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use statepad_layout::{
        Capabilities, ControlDescriptor, FormatCode, LayoutDescriptor, VariantTag,
    };

    fn session() -> DeviceSession {
        let layout = LayoutDescriptor::builder("pad", StateFormat::HID, 5)
            .control(ControlDescriptor::builder("a", FormatCode::Bit))
            .control(ControlDescriptor::builder("b", FormatCode::Bit).bit(1))
            .control(ControlDescriptor::builder("stick/x", FormatCode::SignedShort).offset(1))
            .control(ControlDescriptor::builder("stick/y", FormatCode::SignedShort).offset(3))
            .build()
            .unwrap();
        let tree = ControlTree::build(Arc::new(layout), VariantTag::new("")).unwrap();
        let info = DeviceInfo::new(1, "pad", StateFormat::HID, Capabilities::new());
        DeviceSession::new(info, Arc::new(tree))
    }

    #[test]
    fn rejects_wrong_format_and_size() {
        let s = session();
        assert!(matches!(
            s.ingest(&[0; 5], StateFormat::ANDROID_GAME_CONTROLLER),
            Err(Error::FormatMismatch { .. })
        ));
        assert!(s.is_degraded());
        assert!(matches!(
            s.ingest(&[0; 4], StateFormat::HID),
            Err(Error::StateSizeMismatch { expected: 5, actual: 4 })
        ));
        // state is untouched by rejected buffers
        assert_eq!(s.snapshot().current.sequence(), 0);

        s.ingest(&[1, 0, 0, 0, 0], StateFormat::HID).unwrap();
        assert!(!s.is_degraded());
        assert_eq!(s.read("a").unwrap(), ControlValue::Scalar(1.0));
    }

    #[test]
    fn delta_is_zero_without_previous() {
        let s = session();
        assert_eq!(s.delta("a").unwrap(), ControlValue::Scalar(0.0));
        assert_eq!(s.delta("stick").unwrap(), ControlValue::Vector2(0.0, 0.0));
    }

    #[test]
    fn delta_between_buffers() {
        let s = session();
        s.ingest(&[0, 0, 0, 0, 0], StateFormat::HID).unwrap();
        let x = i16::MAX.to_le_bytes();
        s.ingest(&[1, x[0], x[1], 0, 0], StateFormat::HID).unwrap();
        assert_eq!(s.delta("a").unwrap(), ControlValue::Scalar(1.0));
        assert_eq!(s.delta("stick").unwrap(), ControlValue::Vector2(1.0, 0.0));
    }

    #[test]
    fn changed_controls_lists_leaves() {
        let s = session();
        s.ingest(&[0, 0, 0, 0, 0], StateFormat::HID).unwrap();
        let x = i16::MAX.to_le_bytes();
        s.ingest(&[2, x[0], x[1], 0, 0], StateFormat::HID).unwrap();

        let changed: Vec<String> = s.changed_controls().iter().map(|p| p.to_string()).collect();
        assert_eq!(changed, vec!["b".to_string(), "stick/x".to_string()]);

        let composite = s.changes().into_iter().find(|c| !c.leaf).unwrap();
        assert_eq!(&*composite.path, "stick");
        assert_eq!(composite.kind, ControlKind::Stick);
    }

    #[test]
    fn sequence_increases() {
        let s = session();
        for expected in 1..=3 {
            let pair = s.ingest(&[0; 5], StateFormat::HID).unwrap();
            assert_eq!(pair.current.sequence(), expected);
        }
    }
}
