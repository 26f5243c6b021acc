//! Layouts shipped with the library.

mod android;
mod xbox_macos;

use crate::descriptor::{ControlBuilder, ControlDescriptor, LayoutDescriptor};
use crate::format::FormatCode;
use crate::Result;

pub use android::{ANDROID_AXIS_OFFSET, ANDROID_STATE_SIZE};

/// All built-in layouts, more specific ones first.
pub fn layouts() -> Result<Vec<LayoutDescriptor>> {
    let android = android::android_game_controller()?;
    Ok(vec![
        android::dualshock4_android(&android)?,
        android::xbox_one_android(&android)?,
        android,
        xbox_macos::wired()?,
        xbox_macos::native()?,
        xbox_macos::wireless()?,
        xbox_macos::wireless_v2()?,
    ])
}

fn button(name: &str, byte: u32, bit: u32) -> ControlBuilder {
    ControlDescriptor::builder(name, FormatCode::Bit).offset(byte).bit(bit)
}

fn axis(name: &str, format: FormatCode, byte: u32, params: &str) -> ControlBuilder {
    let control = ControlDescriptor::builder(name, format).offset(byte);
    if params.is_empty() {
        control
    } else {
        control.parameters(params)
    }
}

/// `x`, `y` and the four half-axis directions of a stick whose components
/// sit at `x_byte` and `y_byte`.
fn stick(
    name: &str,
    format: FormatCode,
    x_byte: u32,
    y_byte: u32,
    params: &StickParams<'_>,
) -> Vec<ControlBuilder> {
    let child = |leaf: &str, byte: u32, p: &str| axis(&format!("{name}/{leaf}"), format, byte, p);
    vec![
        child("x", x_byte, params.x),
        child("y", y_byte, params.y),
        child("left", x_byte, params.left),
        child("right", x_byte, params.right),
        child("up", y_byte, params.up),
        child("down", y_byte, params.down),
    ]
}

struct StickParams<'a> {
    x: &'a str,
    y: &'a str,
    left: &'a str,
    right: &'a str,
    up: &'a str,
    down: &'a str,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::StateFormat;
    use crate::registry::LayoutRegistry;
    use crate::variant::{Capabilities, Capability};

    #[test]
    fn builtin_layouts_build() {
        let registry = LayoutRegistry::with_builtin().unwrap();
        assert_eq!(registry.len(), 7);
        for layout in registry.iter() {
            assert!(!layout.controls().is_empty(), "{}", layout.name());
        }
    }

    #[test]
    fn android_variants_resolve() {
        let registry = LayoutRegistry::with_builtin().unwrap();
        let caps = Capabilities::new()
            .with(Capability::Gamepad)
            .with(Capability::DpadAxes);
        let found = registry
            .match_device(StateFormat::ANDROID_GAME_CONTROLLER, &caps)
            .unwrap();
        assert_eq!(found.layout.name(), "AndroidGameController");
        assert_eq!(found.variant.as_str(), "Gamepad;DpadAxes");

        let sony = Capabilities::new().with(Capability::Gamepad).product(0x054c, 0x09cc);
        let found = registry
            .match_device(StateFormat::ANDROID_GAME_CONTROLLER, &sony)
            .unwrap();
        assert_eq!(found.layout.display_name(), "Android DualShock 4 Gamepad");
        assert_eq!(found.variant.as_str(), "Gamepad;DpadAxes");
    }

    #[test]
    fn xbox_layouts_match_by_product() {
        let registry = LayoutRegistry::with_builtin().unwrap();
        let cases = [
            (0x028e, "XboxGamepadMacOS"),
            (0x02ea, "XboxGamepadMacOSNative"),
            (0x02e0, "XboxGamepadMacOSWireless"),
            (0x0b13, "XboxGamepadMacOSWirelessV2"),
        ];
        for (pid, name) in cases {
            let caps = Capabilities::new().product(0x045e, pid);
            let found = registry.match_device(StateFormat::HID, &caps).unwrap();
            assert_eq!(found.layout.name(), name);
        }
    }
}
