use std::sync::Arc;
use std::time::Instant;

use crossbeam_channel::Receiver;
use statepad_layout::{ControlKind, ControlValue, VariantTag};

use crate::types::{DeviceId, DeviceInfo};

/// A control that changed with an ingested buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub device: DeviceId,
    pub path: Arc<str>,
    pub kind: ControlKind,
    pub value: ControlValue,
    pub previous: ControlValue,
    pub noisy: bool,
    /// `false` for sticks and d-pads composed from their children.
    pub leaf: bool,
    pub timestamp: Instant,
    /// Sequence number of the buffer that produced this observation.
    pub sequence: u64,
}

impl Observation {
    pub fn magnitude(&self) -> f32 {
        self.value.magnitude()
    }
}

/// Events emitted by the manager about device lifecycle and input.
#[derive(Debug, Clone)]
pub enum DeviceEvent {
    /// A device appeared. `layout` and `variant` are set when it is usable.
    Connected {
        info: DeviceInfo,
        usable: bool,
        layout: Option<Arc<str>>,
        variant: Option<VariantTag>,
    },
    Disconnected(DeviceId),
    Observation(Observation),
    /// A buffer was rejected; the device keeps its last good state.
    Degraded { id: DeviceId, error: String },
}

/// Receiving end for device events subscription.
pub type EventReceiver = Receiver<DeviceEvent>;
