use std::sync::Arc;

use statepad_layout::{Capabilities, StateFormat, VariantTag};

/// Platform-assigned identifier of a connected device.
pub type DeviceId = u32;

/// What the platform reports when a device appears.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceInfo {
    pub id: DeviceId,
    pub name: String,
    pub format: StateFormat,
    pub capabilities: Capabilities,
}

impl DeviceInfo {
    pub fn new(id: DeviceId, name: &str, format: StateFormat, capabilities: Capabilities) -> Self {
        Self {
            id,
            name: name.to_string(),
            format,
            capabilities,
        }
    }
}

/// A connected device as seen by the manager.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceStatus {
    pub info: DeviceInfo,
    /// Layout name and resolved variant, when the device is usable.
    pub layout: Option<(Arc<str>, VariantTag)>,
    /// Why the device cannot be decoded, when it is unusable.
    pub unusable_reason: Option<String>,
    /// The last buffer was rejected.
    pub degraded: bool,
}

impl DeviceStatus {
    pub fn is_usable(&self) -> bool {
        self.layout.is_some()
    }
}
