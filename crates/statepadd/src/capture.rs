//! Recorded device sessions.
//!
//! ```yaml
//! version: 1
//! device:
//!   name: Generic Pad
//!   format: AGC
//!   capabilities: [gamepad, dpad_buttons]
//! frames:
//!   - at_ms: 0
//!     data: "00 00 ..."
//! rebind:
//!   expect: button
//!   timeout_ms: 5000
//! ```

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use statepad_device::{DeviceId, DeviceInfo};
use statepad_layout::{Capabilities, Capability, StateFormat};
use statepad_rebind::{ExpectedControl, RebindConfig};

use crate::error::{Error, Result};
use crate::hex::parse_hex;

const DEFAULT_DEVICE_ID: DeviceId = 1;

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Capture {
    pub version: u8,
    pub device: CaptureDevice,
    #[serde(default)]
    pub frames: Vec<CaptureFrame>,
    /// Replay time after the last frame, used to let a rebind time out.
    #[serde(default)]
    pub duration_ms: Option<u64>,
    #[serde(default)]
    pub rebind: Option<RebindSpec>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CaptureDevice {
    #[serde(default)]
    pub id: Option<DeviceId>,
    pub name: String,
    pub format: String,
    #[serde(default)]
    pub capabilities: Vec<String>,
    #[serde(default)]
    pub vendor_id: Option<u16>,
    #[serde(default)]
    pub product_id: Option<u16>,
    #[serde(default)]
    pub buttons: u16,
    #[serde(default)]
    pub axes: u16,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CaptureFrame {
    pub at_ms: u64,
    pub data: String,
    /// Overrides the device format for this frame.
    #[serde(default)]
    pub format: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RebindSpec {
    #[serde(default)]
    pub expect: Option<String>,
    #[serde(default)]
    pub timeout_ms: u64,
    #[serde(default)]
    pub threshold: Option<f32>,
    #[serde(default)]
    pub noisy_threshold: Option<f32>,
    #[serde(default)]
    pub exclude: Vec<String>,
    #[serde(default)]
    pub cancel: Vec<String>,
    #[serde(default)]
    pub composite: Vec<String>,
    #[serde(default)]
    pub existing: Vec<ExistingSpec>,
    #[serde(default)]
    pub suppress_actions: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExistingSpec {
    pub part: String,
    pub path: String,
}

/// A frame ready for ingestion.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub at: Duration,
    pub bytes: Vec<u8>,
    pub format: StateFormat,
}

#[derive(Deserialize)]
struct VersionedCapture {
    version: u8,
}

impl Capture {
    pub fn parse(input: &str) -> Result<Capture> {
        let VersionedCapture { version } = serde_yaml::from_str(input)?;
        match version {
            1 => Ok(serde_yaml::from_str(input)?),
            _ => Err(Error::UnsupportedVersion(version)),
        }
    }

    pub fn load(path: &Path) -> Result<Capture> {
        let input = std::fs::read_to_string(path)?;
        Self::parse(&input)
    }

    pub fn device_id(&self) -> DeviceId {
        self.device.id.unwrap_or(DEFAULT_DEVICE_ID)
    }

    pub fn format(&self) -> Result<StateFormat> {
        parse_format(&self.device.format)
    }

    pub fn device_info(&self) -> Result<DeviceInfo> {
        let device = &self.device;
        let mut caps = Capabilities::new().buttons(device.buttons).axes(device.axes);
        for name in &device.capabilities {
            let capability =
                Capability::parse(name).ok_or_else(|| Error::InvalidCapability(name.clone()))?;
            caps = caps.with(capability);
        }
        caps.vendor_id = device.vendor_id;
        caps.product_id = device.product_id;
        Ok(DeviceInfo::new(self.device_id(), &device.name, self.format()?, caps))
    }

    /// Decoded frames in capture order.
    pub fn frames(&self) -> Result<Vec<Frame>> {
        let device_format = self.format()?;
        self.frames
            .iter()
            .enumerate()
            .map(|(index, frame)| {
                let decode = || -> Result<Frame> {
                    let format = match &frame.format {
                        Some(code) => parse_format(code)?,
                        None => device_format,
                    };
                    Ok(Frame {
                        at: Duration::from_millis(frame.at_ms),
                        bytes: parse_hex(&frame.data)?,
                        format,
                    })
                };
                decode().map_err(|err| Error::Frame {
                    index,
                    source: Box::new(err),
                })
            })
            .collect()
    }

    /// Replay length: `duration_ms` or the last frame's time.
    pub fn duration(&self) -> Duration {
        let last = self.frames.iter().map(|f| f.at_ms).max().unwrap_or(0);
        Duration::from_millis(self.duration_ms.unwrap_or(last).max(last))
    }

    pub fn rebind_config(&self) -> Result<Option<RebindConfig>> {
        self.rebind.as_ref().map(RebindSpec::to_config).transpose()
    }
}

impl RebindSpec {
    pub fn to_config(&self) -> Result<RebindConfig> {
        let mut config = RebindConfig::new()
            .timeout(Duration::from_millis(self.timeout_ms))
            .composite(self.composite.iter().cloned());
        if let Some(expect) = &self.expect {
            let expected: ExpectedControl = expect.parse().map_err(Error::InvalidExpected)?;
            config = config.expect(expected);
        }
        if let Some(threshold) = self.threshold {
            config = config.threshold(threshold);
        }
        if let Some(threshold) = self.noisy_threshold {
            config = config.noisy_threshold(threshold);
        }
        if let Some(suppress) = self.suppress_actions {
            config = config.suppress_actions(suppress);
        }
        for path in &self.exclude {
            config = config.exclude(path);
        }
        for path in &self.cancel {
            config = config.cancel_with(path);
        }
        for existing in &self.existing {
            config = config.existing(&existing.part, &existing.path);
        }
        Ok(config)
    }
}

fn parse_format(code: &str) -> Result<StateFormat> {
    code.parse().map_err(Error::InvalidFormat)
}

#[cfg(test)]
mod tests {
    use super::*;
    use statepad_layout::ControlKind;

    const CAPTURE: &str = r#"
version: 1
device:
  name: Generic Pad
  format: AGC
  capabilities: [gamepad, dpad_axes]
  vendor_id: 0x045e
  product_id: 0x02e0
frames:
  - at_ms: 0
    data: "00 01"
  - at_ms: 16
    data: "0x0003"
    format: "HID"
rebind:
  expect: stick
  timeout_ms: 5000
  composite: [up, down]
"#;

    #[test]
    fn parses_capture() {
        let capture = Capture::parse(CAPTURE).unwrap();
        let info = capture.device_info().unwrap();
        assert_eq!(info.id, 1);
        assert_eq!(info.format, StateFormat::ANDROID_GAME_CONTROLLER);
        assert!(info.capabilities.has(Capability::DpadAxes));
        assert_eq!(info.capabilities.vendor_id, Some(0x045e));

        let frames = capture.frames().unwrap();
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[1].bytes, vec![0x00, 0x03]);
        assert_eq!(frames[1].format, StateFormat::HID);
        assert_eq!(capture.duration(), Duration::from_millis(16));

        let config = capture.rebind_config().unwrap().unwrap();
        assert_eq!(config.expected, Some(ExpectedControl::Kind(ControlKind::Stick)));
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert_eq!(config.composite_parts, vec!["up".to_string(), "down".to_string()]);
    }

    #[test]
    fn rejects_unknown_version() {
        let yaml = "version: 3\ndevice: {name: pad, format: HID}\n";
        assert!(matches!(Capture::parse(yaml), Err(Error::UnsupportedVersion(3))));
    }

    #[test]
    fn rejects_unknown_fields() {
        let yaml = "version: 1\ndevice: {name: pad, format: HID, colour: red}\n";
        assert!(matches!(Capture::parse(yaml), Err(Error::Yaml(_))));
    }

    #[test]
    fn frame_errors_carry_index() {
        let yaml = "version: 1\ndevice: {name: pad, format: HID}\nframes:\n  - {at_ms: 0, data: '00'}\n  - {at_ms: 1, data: 'xyz'}\n";
        let capture = Capture::parse(yaml).unwrap();
        assert!(matches!(capture.frames(), Err(Error::Frame { index: 1, .. })));
    }
}
