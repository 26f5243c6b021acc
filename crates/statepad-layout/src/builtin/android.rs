use crate::descriptor::{ControlDescriptor, LayoutBuilder, LayoutDescriptor};
use crate::format::{ControlKind, FormatCode, StateFormat};
use crate::variant::{Capability, CapabilityPredicate};
use crate::Result;

use super::{axis, button, stick, StickParams};

const MAX_BUTTONS: u32 = 220;
const MAX_AXES: u32 = 48;

/// Byte offset of the axis block: the key bitfield rounded up to whole
/// 32-bit words.
pub const ANDROID_AXIS_OFFSET: u32 = 4 * MAX_BUTTONS.div_ceil(32);
pub const ANDROID_STATE_SIZE: u32 = ANDROID_AXIS_OFFSET + 4 * MAX_AXES;

const GAMEPAD: &str = "Gamepad";
const JOYSTICK: &str = "Joystick";
const DPAD_AXES: &str = "DpadAxes";
const DPAD_BUTTONS: &str = "DpadButtons";

mod key {
    pub(super) const DPAD_UP: u32 = 19;
    pub(super) const DPAD_DOWN: u32 = 20;
    pub(super) const DPAD_LEFT: u32 = 21;
    pub(super) const DPAD_RIGHT: u32 = 22;
    pub(super) const BUTTON_A: u32 = 96;
    pub(super) const BUTTON_B: u32 = 97;
    pub(super) const BUTTON_X: u32 = 99;
    pub(super) const BUTTON_Y: u32 = 100;
    pub(super) const BUTTON_L1: u32 = 102;
    pub(super) const BUTTON_R1: u32 = 103;
    pub(super) const BUTTON_THUMBL: u32 = 106;
    pub(super) const BUTTON_THUMBR: u32 = 107;
    pub(super) const BUTTON_START: u32 = 108;
    pub(super) const BUTTON_SELECT: u32 = 109;
    pub(super) const BUTTON_1: u32 = 188;
}

mod axis_id {
    pub(super) const X: u32 = 0;
    pub(super) const Y: u32 = 1;
    pub(super) const Z: u32 = 11;
    pub(super) const RZ: u32 = 14;
    pub(super) const HAT_X: u32 = 15;
    pub(super) const HAT_Y: u32 = 16;
    pub(super) const GAS: u32 = 22;
    pub(super) const BRAKE: u32 = 23;
}

const fn axis_byte(id: u32) -> u32 {
    ANDROID_AXIS_OFFSET + id * 4
}

const STICK: StickParams<'static> = StickParams {
    x: "",
    y: "invert",
    left: "clamp=1,clampMin=-1,clampMax=0,invert",
    right: "clamp=1,clampMin=0,clampMax=1",
    up: "invert,clamp=1,clampMin=-1.0,clampMax=0.0",
    down: "invert=false,clamp=1,clampMin=0,clampMax=1.0",
};

const HAT_POSITIVE: &str = "clamp=3,clampConstant=0,clampMin=0,clampMax=1";
const HAT_NEGATIVE: &str = "clamp=3,clampConstant=0,clampMin=-1,clampMax=0,invert";
const TRIGGER: &str = "clamp=1,clampMin=0,clampMax=1.0";

pub(super) fn android_game_controller() -> Result<LayoutDescriptor> {
    let pad_key = |name: &str, code: u32| button(name, 0, code).variant(GAMEPAD);
    let flt = FormatCode::Float32;

    LayoutDescriptor::builder(
        "AndroidGameController",
        StateFormat::ANDROID_GAME_CONTROLLER,
        ANDROID_STATE_SIZE,
    )
    .display_name("Android Gamepad")
    // d-pad reported as key presses
    .control(
        button("dpad", 0, key::DPAD_UP)
            .size(4)
            .kind(ControlKind::Dpad)
            .variant(DPAD_BUTTONS),
    )
    .control(button("dpad/up", 0, key::DPAD_UP).variant(DPAD_BUTTONS))
    .control(button("dpad/down", 0, key::DPAD_DOWN).variant(DPAD_BUTTONS))
    .control(button("dpad/left", 0, key::DPAD_LEFT).variant(DPAD_BUTTONS))
    .control(button("dpad/right", 0, key::DPAD_RIGHT).variant(DPAD_BUTTONS))
    .control(pad_key("buttonSouth", key::BUTTON_A))
    .control(pad_key("buttonWest", key::BUTTON_X))
    .control(pad_key("buttonNorth", key::BUTTON_Y))
    .control(pad_key("buttonEast", key::BUTTON_B))
    .control(pad_key("leftStickPress", key::BUTTON_THUMBL))
    .control(pad_key("rightStickPress", key::BUTTON_THUMBR))
    .control(pad_key("leftShoulder", key::BUTTON_L1))
    .control(pad_key("rightShoulder", key::BUTTON_R1))
    .control(pad_key("start", key::BUTTON_START))
    .control(pad_key("select", key::BUTTON_SELECT))
    // d-pad reported as hat axes
    .control(
        ControlDescriptor::builder("dpad", FormatCode::Vector2)
            .offset(axis_byte(axis_id::HAT_X))
            .kind(ControlKind::Dpad)
            .variant(DPAD_AXES),
    )
    .control(axis("dpad/right", flt, axis_byte(axis_id::HAT_X), HAT_POSITIVE).variant(DPAD_AXES))
    .control(axis("dpad/left", flt, axis_byte(axis_id::HAT_X), HAT_NEGATIVE).variant(DPAD_AXES))
    .control(axis("dpad/down", flt, axis_byte(axis_id::HAT_Y), HAT_POSITIVE).variant(DPAD_AXES))
    .control(axis("dpad/up", flt, axis_byte(axis_id::HAT_Y), HAT_NEGATIVE).variant(DPAD_AXES))
    .control(axis("leftTrigger", flt, axis_byte(axis_id::BRAKE), TRIGGER).variant(GAMEPAD))
    .control(axis("rightTrigger", flt, axis_byte(axis_id::GAS), TRIGGER).variant(GAMEPAD))
    .controls(
        stick("leftStick", flt, axis_byte(axis_id::X), axis_byte(axis_id::Y), &STICK)
            .into_iter()
            .map(|c| c.variant(GAMEPAD)),
    )
    // Z and RZ are not adjacent
    .controls(
        stick("rightStick", flt, axis_byte(axis_id::Z), axis_byte(axis_id::RZ), &STICK)
            .into_iter()
            .map(|c| c.variant(GAMEPAD)),
    )
    // plain joysticks expose a single stick and trigger
    .control(button("trigger", 0, key::BUTTON_1).variant(JOYSTICK))
    .controls(
        stick("stick", flt, axis_byte(axis_id::X), axis_byte(axis_id::Y), &STICK)
            .into_iter()
            .map(|c| c.variant(JOYSTICK)),
    )
    .variant(
        CapabilityPredicate::any()
            .require(Capability::Joystick)
            .exclude(Capability::Gamepad),
        JOYSTICK,
    )
    .variant(
        CapabilityPredicate::any()
            .require(Capability::Gamepad)
            .require(Capability::DpadAxes),
        "Gamepad;DpadAxes",
    )
    .variant(
        CapabilityPredicate::any().require(Capability::Gamepad),
        "Gamepad;DpadButtons",
    )
    .build()
}

/// Sony pads always report the d-pad on the hat axes.
pub(super) fn dualshock4_android(base: &LayoutDescriptor) -> Result<LayoutDescriptor> {
    const SONY: u16 = 0x054c;
    LayoutBuilder::extend("DualShock4GamepadAndroid", base)
        .display_name("Android DualShock 4 Gamepad")
        .clear_variants()
        .variant(CapabilityPredicate::any().product(SONY, 0x05c4), "Gamepad;DpadAxes")
        .variant(CapabilityPredicate::any().product(SONY, 0x09cc), "Gamepad;DpadAxes")
        .build()
}

pub(super) fn xbox_one_android(base: &LayoutDescriptor) -> Result<LayoutDescriptor> {
    const MICROSOFT: u16 = 0x045e;
    LayoutBuilder::extend("XboxOneGamepadAndroid", base)
        .display_name("Android Xbox One Controller")
        .clear_variants()
        .variant(CapabilityPredicate::any().product(MICROSOFT, 0x02e0), "Gamepad;DpadAxes")
        .variant(CapabilityPredicate::any().product(MICROSOFT, 0x02fd), "Gamepad;DpadAxes")
        .variant(CapabilityPredicate::any().product(MICROSOFT, 0x0b13), "Gamepad;DpadAxes")
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::decode;
    use crate::descriptor::VariantTag;
    use crate::value::ControlValue;

    fn control<'a>(
        layout: &'a LayoutDescriptor,
        tag: &'a VariantTag,
        name: &str,
    ) -> &'a ControlDescriptor {
        layout
            .active_controls(tag)
            .find(|c| c.name() == name)
            .unwrap()
    }

    #[test]
    fn state_size() {
        assert_eq!(ANDROID_AXIS_OFFSET, 28);
        assert_eq!(ANDROID_STATE_SIZE, 220);
    }

    #[test]
    fn hat_axes_split_into_directions() {
        let layout = android_game_controller().unwrap();
        let tag = VariantTag::new("Gamepad;DpadAxes");
        let mut buf = vec![0u8; ANDROID_STATE_SIZE as usize];
        let hat_x = axis_byte(axis_id::HAT_X) as usize;
        buf[hat_x..hat_x + 4].copy_from_slice(&(-1.0f32).to_le_bytes());

        let left = control(&layout, &tag, "dpad/left");
        let right = control(&layout, &tag, "dpad/right");
        assert_eq!(decode(&buf, left), Ok(ControlValue::Scalar(1.0)));
        assert_eq!(decode(&buf, right), Ok(ControlValue::Scalar(0.0)));
    }

    #[test]
    fn right_stick_y_reads_rz() {
        let layout = android_game_controller().unwrap();
        let tag = VariantTag::new("Gamepad;DpadButtons");
        let mut buf = vec![0u8; ANDROID_STATE_SIZE as usize];
        let rz = axis_byte(axis_id::RZ) as usize;
        buf[rz..rz + 4].copy_from_slice(&0.25f32.to_le_bytes());

        let y = control(&layout, &tag, "rightStick/y");
        assert_eq!(y.bit_offset(), 84 * 8);
        assert_eq!(decode(&buf, y), Ok(ControlValue::Scalar(-0.25)));
    }

    #[test]
    fn key_bits_map_to_buttons() {
        let layout = android_game_controller().unwrap();
        let tag = VariantTag::new("Gamepad;DpadButtons");
        let mut buf = vec![0u8; ANDROID_STATE_SIZE as usize];
        // KEYCODE_BUTTON_A = 96 -> word 3, bit 0
        buf[12] = 0x01;
        assert_eq!(
            decode(&buf, control(&layout, &tag, "buttonSouth")),
            Ok(ControlValue::Scalar(1.0))
        );
        assert_eq!(
            decode(&buf, control(&layout, &tag, "buttonEast")),
            Ok(ControlValue::Scalar(0.0))
        );
    }
}
