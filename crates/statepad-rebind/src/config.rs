use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use statepad_device::DeviceId;
use statepad_layout::{ControlKind, ControlValue};

pub const DEFAULT_ACTUATION_THRESHOLD: f32 = 0.5;

/// Constraint on the type of control a rebind may resolve to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExpectedControl {
    /// Buttons, or axes pressed past the actuation threshold.
    Button,
    Axis,
    /// Any two-dimensional control: sticks, d-pads and raw vectors.
    Vector2,
    /// Exactly this kind.
    Kind(ControlKind),
}

impl ExpectedControl {
    pub fn accepts(&self, kind: ControlKind, value: &ControlValue) -> bool {
        let scalar = value.as_scalar().is_some();
        match self {
            ExpectedControl::Button => {
                scalar && matches!(kind, ControlKind::Button | ControlKind::Axis)
            }
            ExpectedControl::Axis => scalar && kind == ControlKind::Axis,
            ExpectedControl::Vector2 => !scalar,
            ExpectedControl::Kind(expected) => kind == *expected,
        }
    }

    /// Whether composed controls such as whole sticks can satisfy this.
    pub fn wants_composite(&self) -> bool {
        match self {
            ExpectedControl::Vector2 => true,
            ExpectedControl::Kind(kind) => kind.is_composite(),
            _ => false,
        }
    }
}

impl FromStr for ExpectedControl {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "button" => Ok(ExpectedControl::Button),
            "axis" => Ok(ExpectedControl::Axis),
            "vector2" | "vector" => Ok(ExpectedControl::Vector2),
            other => ControlKind::parse(other)
                .map(ExpectedControl::Kind)
                .ok_or_else(|| format!("unknown control type: {s}")),
        }
    }
}

impl fmt::Display for ExpectedControl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExpectedControl::Button => f.write_str("button"),
            ExpectedControl::Axis => f.write_str("axis"),
            ExpectedControl::Vector2 => f.write_str("vector2"),
            ExpectedControl::Kind(kind) => write!(f, "{kind:?}"),
        }
    }
}

/// A binding of one composite part that exists before the rebind starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExistingBinding {
    pub part: String,
    pub path: String,
}

impl ExistingBinding {
    pub fn new(part: &str, path: &str) -> Self {
        Self {
            part: part.to_string(),
            path: path.to_string(),
        }
    }
}

/// Rebind parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct RebindConfig {
    pub expected: Option<ExpectedControl>,
    /// Paths that never match, such as the currently bound control.
    pub excluded_paths: Vec<String>,
    /// Actuating one of these cancels the rebind.
    pub cancel_paths: Vec<String>,
    pub actuation_threshold: f32,
    /// Noisy controls are ignored unless they reach this magnitude.
    pub noisy_threshold: Option<f32>,
    /// Zero waits forever.
    pub timeout: Duration,
    pub suppress_action_notifications: bool,
    /// Part names of a composite binding, bound in order. Empty for a
    /// single binding.
    pub composite_parts: Vec<String>,
    pub existing_bindings: Vec<ExistingBinding>,
    /// Only observe these devices.
    pub devices: Option<Vec<DeviceId>>,
}

impl Default for RebindConfig {
    fn default() -> Self {
        Self {
            expected: None,
            excluded_paths: Vec::new(),
            cancel_paths: Vec::new(),
            actuation_threshold: DEFAULT_ACTUATION_THRESHOLD,
            noisy_threshold: None,
            timeout: Duration::ZERO,
            suppress_action_notifications: true,
            composite_parts: Vec::new(),
            existing_bindings: Vec::new(),
            devices: None,
        }
    }
}

impl RebindConfig {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn expect(mut self, expected: ExpectedControl) -> Self {
        self.expected = Some(expected);
        self
    }

    #[must_use]
    pub fn exclude(mut self, path: &str) -> Self {
        self.excluded_paths.push(path.to_string());
        self
    }

    #[must_use]
    pub fn cancel_with(mut self, path: &str) -> Self {
        self.cancel_paths.push(path.to_string());
        self
    }

    #[must_use]
    pub fn threshold(mut self, threshold: f32) -> Self {
        self.actuation_threshold = threshold;
        self
    }

    #[must_use]
    pub fn noisy_threshold(mut self, threshold: f32) -> Self {
        self.noisy_threshold = Some(threshold);
        self
    }

    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn suppress_actions(mut self, suppress: bool) -> Self {
        self.suppress_action_notifications = suppress;
        self
    }

    #[must_use]
    pub fn composite<I, S>(mut self, parts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.composite_parts = parts.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn existing(mut self, part: &str, path: &str) -> Self {
        self.existing_bindings.push(ExistingBinding::new(part, path));
        self
    }

    #[must_use]
    pub fn devices(mut self, devices: &[DeviceId]) -> Self {
        self.devices = Some(devices.to_vec());
        self
    }

    pub fn is_composite(&self) -> bool {
        !self.composite_parts.is_empty()
    }

    /// Number of bindings the rebind produces.
    pub fn part_count(&self) -> usize {
        self.composite_parts.len().max(1)
    }
}
