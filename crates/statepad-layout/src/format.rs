use std::fmt;
use std::str::FromStr;

/// Four-character code identifying the byte layout of a state report.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct StateFormat([u8; 4]);

impl StateFormat {
    /// Android game controller state (`"AGC "`).
    pub const ANDROID_GAME_CONTROLLER: StateFormat = StateFormat(*b"AGC ");
    /// Raw HID input report (`"HID "`).
    pub const HID: StateFormat = StateFormat(*b"HID ");

    pub const fn new(code: [u8; 4]) -> Self {
        Self(code)
    }

    pub const fn code(&self) -> [u8; 4] {
        self.0
    }
}

impl FromStr for StateFormat {
    type Err = String;

    /// Parses up to four ASCII characters, padding with spaces.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() || s.len() > 4 || !s.is_ascii() {
            return Err(format!("invalid state format \"{s}\""));
        }
        let mut code = [b' '; 4];
        code[..s.len()].copy_from_slice(s.as_bytes());
        Ok(Self(code))
    }
}

impl fmt::Display for StateFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = String::from_utf8_lossy(&self.0);
        f.write_str(text.trim_end())
    }
}

impl fmt::Debug for StateFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StateFormat(\"{}\")", String::from_utf8_lossy(&self.0))
    }
}

/// Value range of a multi-bit field read as a pressed/released button,
/// e.g. one direction of a hat switch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiscreteRange {
    pub min: u32,
    pub max: u32,
    pub wrap_at: Option<u32>,
    pub null_value: u32,
}

impl DiscreteRange {
    pub const fn new(min: u32, max: u32) -> Self {
        Self {
            min,
            max,
            wrap_at: None,
            null_value: 0,
        }
    }

    #[must_use]
    pub const fn wrapping_at(mut self, wrap_at: u32) -> Self {
        self.wrap_at = Some(wrap_at);
        self
    }

    #[must_use]
    pub const fn with_null(mut self, null_value: u32) -> Self {
        self.null_value = null_value;
        self
    }

    /// Whether raw value `v` falls into the pressed range.
    pub fn contains(&self, v: u32) -> bool {
        if v == self.null_value {
            return false;
        }
        if self.min > self.max {
            let wrap_at = match self.wrap_at {
                Some(w) if w != self.null_value => w,
                _ => self.min,
            };
            (v >= self.min && v <= wrap_at) || v <= self.max
        } else {
            v >= self.min && v <= self.max
        }
    }

    /// A raw value that decodes as pressed.
    pub fn pressed_value(&self) -> u32 {
        if self.min > self.max {
            self.min
        } else {
            self.min + (self.max - self.min) / 2
        }
    }
}

/// Encoding of a single control inside a state buffer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FormatCode {
    Bit,
    Byte,
    SignedShort,
    UnsignedShort,
    Float32,
    Vector2,
    DiscreteButton(DiscreteRange),
}

impl FormatCode {
    /// Width of the format when a control does not declare one.
    pub const fn natural_bits(&self) -> u32 {
        match self {
            FormatCode::Bit => 1,
            FormatCode::Byte => 8,
            FormatCode::SignedShort | FormatCode::UnsignedShort => 16,
            FormatCode::Float32 => 32,
            FormatCode::Vector2 => 64,
            FormatCode::DiscreteButton(_) => 4,
        }
    }

    /// Whether a control of this format may be `bits` wide.
    ///
    /// Integer bit fields take any width up to 32 bits. Fixed formats must
    /// occupy the same number of bytes as their natural width.
    pub fn accepts_width(&self, bits: u32) -> bool {
        match self {
            FormatCode::Bit | FormatCode::DiscreteButton(_) => (1..=32).contains(&bits),
            FormatCode::Float32 | FormatCode::Vector2 => bits == self.natural_bits(),
            _ => bits > 0 && bits.div_ceil(8) == self.natural_bits().div_ceil(8),
        }
    }

    /// Formats whose decoded values are centered on zero.
    pub const fn is_signed(&self) -> bool {
        matches!(
            self,
            FormatCode::SignedShort | FormatCode::Float32 | FormatCode::Vector2
        )
    }

    pub const fn default_kind(&self) -> ControlKind {
        match self {
            FormatCode::Bit | FormatCode::DiscreteButton(_) => ControlKind::Button,
            FormatCode::Vector2 => ControlKind::Vector2,
            _ => ControlKind::Axis,
        }
    }

    /// Short textual code used in layout files.
    pub const fn code(&self) -> &'static str {
        match self {
            FormatCode::Bit => "BIT",
            FormatCode::Byte => "BYTE",
            FormatCode::SignedShort => "SHRT",
            FormatCode::UnsignedShort => "USHT",
            FormatCode::Float32 => "FLT",
            FormatCode::Vector2 => "VEC2",
            FormatCode::DiscreteButton(_) => "DISC",
        }
    }

    /// Parses a textual code. Discrete buttons carry a range and are built
    /// separately.
    pub fn parse(code: &str) -> Option<FormatCode> {
        Some(match code.trim().to_ascii_uppercase().as_str() {
            "BIT" => FormatCode::Bit,
            "BYTE" => FormatCode::Byte,
            "SHRT" => FormatCode::SignedShort,
            "USHT" => FormatCode::UnsignedShort,
            "FLT" => FormatCode::Float32,
            "VEC2" => FormatCode::Vector2,
            _ => return None,
        })
    }
}

impl fmt::Display for FormatCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Logical shape of a control, independent of its wire encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControlKind {
    Button,
    Axis,
    Stick,
    Dpad,
    Vector2,
}

impl ControlKind {
    pub const fn is_composite(&self) -> bool {
        matches!(
            self,
            ControlKind::Stick | ControlKind::Dpad | ControlKind::Vector2
        )
    }

    pub fn parse(name: &str) -> Option<ControlKind> {
        Some(match name.trim().to_ascii_lowercase().as_str() {
            "button" | "discrete_button" => ControlKind::Button,
            "axis" | "trigger" => ControlKind::Axis,
            "stick" => ControlKind::Stick,
            "dpad" => ControlKind::Dpad,
            "vector2" => ControlKind::Vector2,
            _ => return None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_format_pads_and_trims() {
        let tag: StateFormat = "AGC".parse().unwrap();
        assert_eq!(tag, StateFormat::ANDROID_GAME_CONTROLLER);
        assert_eq!(tag.to_string(), "AGC");
        assert_eq!("HID ".parse::<StateFormat>(), Ok(StateFormat::HID));
        assert!("TOOLONG".parse::<StateFormat>().is_err());
        assert!("".parse::<StateFormat>().is_err());
    }

    #[test]
    fn width_agreement() {
        assert!(FormatCode::Bit.accepts_width(1));
        assert!(FormatCode::Bit.accepts_width(4));
        assert!(!FormatCode::Bit.accepts_width(33));
        assert!(FormatCode::Byte.accepts_width(7));
        assert!(!FormatCode::Byte.accepts_width(12));
        assert!(FormatCode::SignedShort.accepts_width(16));
        assert!(!FormatCode::SignedShort.accepts_width(32));
        assert!(!FormatCode::Float32.accepts_width(24));
        assert!(FormatCode::Vector2.accepts_width(64));
    }

    #[test]
    fn discrete_range_plain() {
        let right = DiscreteRange::new(2, 4);
        assert!(!right.contains(1));
        assert!(right.contains(2));
        assert!(right.contains(4));
        assert!(!right.contains(5));
        assert!(right.contains(right.pressed_value()));
    }

    #[test]
    fn discrete_range_wrapping() {
        // hat "up": NW(8), N(1), NE(2); 0 is centered
        let up = DiscreteRange::new(8, 2).wrapping_at(9);
        assert!(!up.contains(0));
        assert!(up.contains(1));
        assert!(up.contains(2));
        assert!(!up.contains(3));
        assert!(up.contains(8));
        assert!(up.contains(9));
        assert!(up.contains(up.pressed_value()));
    }

    #[test]
    fn parses_codes() {
        assert_eq!(FormatCode::parse("shrt"), Some(FormatCode::SignedShort));
        assert_eq!(FormatCode::parse("FLT"), Some(FormatCode::Float32));
        assert_eq!(FormatCode::parse("QUAT"), None);
        assert_eq!(ControlKind::parse("Stick"), Some(ControlKind::Stick));
    }
}
