use crate::descriptor::{ControlBuilder, ControlDescriptor, LayoutDescriptor};
use crate::format::{ControlKind, DiscreteRange, FormatCode, StateFormat};
use crate::variant::CapabilityPredicate;
use crate::Result;

use super::{axis, button, stick, StickParams};

const MICROSOFT: u16 = 0x045e;
const STICK_ZERO: u64 = 32767;

fn for_products(predicates: &[u16]) -> impl Iterator<Item = CapabilityPredicate> + '_ {
    predicates
        .iter()
        .map(|&pid| CapabilityPredicate::any().product(MICROSOFT, pid))
}

fn face_buttons(byte: u32, bits: &ButtonBits) -> Vec<ControlBuilder> {
    vec![
        button("start", byte, bits.start).display_name("Start"),
        button("select", byte, bits.select).display_name("Select"),
        button("leftStickPress", byte, bits.left_thumb),
        button("rightStickPress", byte, bits.right_thumb),
        button("leftShoulder", byte, bits.left_shoulder),
        button("rightShoulder", byte, bits.right_shoulder),
        button("buttonSouth", byte, bits.a).display_name("A"),
        button("buttonEast", byte, bits.b).display_name("B"),
        button("buttonWest", byte, bits.x).display_name("X"),
        button("buttonNorth", byte, bits.y).display_name("Y"),
    ]
}

fn dpad_buttons(byte: u32, first_bit: u32) -> Vec<ControlBuilder> {
    vec![
        button("dpad", byte, first_bit).size(4).kind(ControlKind::Dpad),
        button("dpad/up", byte, first_bit),
        button("dpad/down", byte, first_bit + 1),
        button("dpad/left", byte, first_bit + 2),
        button("dpad/right", byte, first_bit + 3),
    ]
}

struct ButtonBits {
    start: u32,
    select: u32,
    left_thumb: u32,
    right_thumb: u32,
    left_shoulder: u32,
    right_shoulder: u32,
    a: u32,
    b: u32,
    x: u32,
    y: u32,
}

const SIGNED_STICK_Y_UP: StickParams<'static> = StickParams {
    x: "",
    y: "invert",
    left: "",
    right: "",
    up: "clamp=1,clampMin=-1,clampMax=0,invert=true",
    down: "clamp=1,clampMin=0,clampMax=1,invert=false",
};

const SIGNED_STICK_Y_DOWN: StickParams<'static> = StickParams {
    x: "",
    y: "",
    left: "",
    right: "",
    up: "clamp=1,clampMin=0,clampMax=1,invert=false",
    down: "clamp=1,clampMin=-1,clampMax=0,invert=true",
};

const CENTERED: &str = "normalize,normalizeMin=0,normalizeMax=1,normalizeZero=0.5";

const UNSIGNED_STICK: StickParams<'static> = StickParams {
    x: CENTERED,
    y: "invert,normalize,normalizeMin=0,normalizeMax=1,normalizeZero=0.5",
    left: "normalize,normalizeMin=0,normalizeMax=1,normalizeZero=0.5,clamp=1,clampMin=0,clampMax=0.5,invert",
    right: "normalize,normalizeMin=0,normalizeMax=1,normalizeZero=0.5,clamp=1,clampMin=0.5,clampMax=1",
    up: "normalize,normalizeMin=0,normalizeMax=1,normalizeZero=0.5,clamp=1,clampMin=0,clampMax=0.5,invert",
    down: "normalize,normalizeMin=0,normalizeMax=1,normalizeZero=0.5,clamp=1,clampMin=0.5,clampMax=1,invert=false",
};

const WIRELESS_TRIGGER: &str = "normalize,normalizeMin=0,normalizeMax=0.01560998";

/// Pads driven by the 360Controller kernel extension.
pub(super) fn wired() -> Result<LayoutDescriptor> {
    let shrt = FormatCode::SignedShort;
    let bits = ButtonBits {
        start: 4,
        select: 5,
        left_thumb: 6,
        right_thumb: 7,
        left_shoulder: 8,
        right_shoulder: 9,
        a: 12,
        b: 13,
        x: 14,
        y: 15,
    };

    let mut builder = LayoutDescriptor::builder("XboxGamepadMacOS", StateFormat::HID, 14)
        .display_name("Xbox Controller")
        .controls(dpad_buttons(2, 0))
        .controls(face_buttons(2, &bits))
        .control(axis("leftTrigger", FormatCode::Byte, 4, ""))
        .control(axis("rightTrigger", FormatCode::Byte, 5, ""))
        .controls(stick("leftStick", shrt, 6, 8, &SIGNED_STICK_Y_UP))
        .controls(stick("rightStick", shrt, 10, 12, &SIGNED_STICK_Y_UP));
    for predicate in for_products(&[0x028e, 0x02d1, 0x02dd]) {
        builder = builder.variant(predicate, "Gamepad");
    }
    builder.build()
}

/// Pads handled by the system HID driver on recent macOS versions.
pub(super) fn native() -> Result<LayoutDescriptor> {
    let shrt = FormatCode::SignedShort;
    let bits = ButtonBits {
        start: 2,
        select: 3,
        a: 4,
        b: 5,
        x: 6,
        y: 7,
        left_shoulder: 12,
        right_shoulder: 13,
        left_thumb: 14,
        right_thumb: 15,
    };

    let mut builder = LayoutDescriptor::builder("XboxGamepadMacOSNative", StateFormat::HID, 18)
        .display_name("Xbox Controller")
        .controls(dpad_buttons(4, 8))
        .controls(face_buttons(4, &bits))
        .control(axis("leftTrigger", FormatCode::Byte, 6, ""))
        .control(axis("rightTrigger", FormatCode::Byte, 8, ""))
        .controls(stick("leftStick", shrt, 10, 12, &SIGNED_STICK_Y_DOWN))
        .controls(stick("rightStick", shrt, 14, 16, &SIGNED_STICK_Y_DOWN));
    for predicate in for_products(&[0x02ea, 0x0b12]) {
        builder = builder.variant(predicate, "Gamepad");
    }
    builder.build()
}

fn hat(name: &str, range: DiscreteRange) -> ControlBuilder {
    ControlDescriptor::builder(name, FormatCode::DiscreteButton(range))
        .offset(13)
        .size(4)
}

fn wireless_layout(name: &str, select_bit: u32, products: &[u16]) -> Result<LayoutDescriptor> {
    let usht = FormatCode::UnsignedShort;
    let bits = ButtonBits {
        start: 11,
        select: select_bit,
        left_thumb: 13,
        right_thumb: 14,
        left_shoulder: 6,
        right_shoulder: 7,
        a: 0,
        b: 1,
        x: 3,
        y: 4,
    };

    // sticks rest at the middle of the unsigned range
    let centered = |controls: Vec<ControlBuilder>| {
        controls.into_iter().enumerate().map(|(i, c)| {
            if i < 2 {
                c.default_state(STICK_ZERO)
            } else {
                c
            }
        })
    };

    let mut builder = LayoutDescriptor::builder(name, StateFormat::HID, 18)
        .display_name("Wireless Xbox Controller")
        .controls(centered(stick("leftStick", usht, 1, 3, &UNSIGNED_STICK)))
        .controls(centered(stick("rightStick", usht, 5, 7, &UNSIGNED_STICK)))
        .control(axis("leftTrigger", usht, 9, WIRELESS_TRIGGER))
        .control(axis("rightTrigger", usht, 11, WIRELESS_TRIGGER))
        .control(button("dpad", 13, 0).size(4).kind(ControlKind::Dpad))
        .control(hat("dpad/up", DiscreteRange::new(8, 2).wrapping_at(9)))
        .control(hat("dpad/right", DiscreteRange::new(2, 4)))
        .control(hat("dpad/down", DiscreteRange::new(4, 6)))
        .control(hat("dpad/left", DiscreteRange::new(6, 8)))
        .controls(face_buttons(14, &bits));
    for predicate in for_products(products) {
        builder = builder.variant(predicate, "Gamepad");
    }
    builder.build()
}

/// Bluetooth pads reporting unsigned sticks and a hat switch.
pub(super) fn wireless() -> Result<LayoutDescriptor> {
    wireless_layout("XboxGamepadMacOSWireless", 16, &[0x02e0, 0x02fd])
}

/// Later firmware moves View to bit 10.
pub(super) fn wireless_v2() -> Result<LayoutDescriptor> {
    wireless_layout("XboxGamepadMacOSWirelessV2", 10, &[0x0b13])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::decode;
    use crate::descriptor::VariantTag;
    use crate::value::ControlValue;

    fn read(layout: &LayoutDescriptor, buf: &[u8], name: &str) -> ControlValue {
        let tag = VariantTag::new("Gamepad");
        let desc = layout
            .active_controls(&tag)
            .find(|c| c.name() == name)
            .unwrap();
        decode(buf, desc).unwrap()
    }

    #[test]
    fn wired_stick_y_is_inverted() {
        let layout = wired().unwrap();
        let mut buf = [0u8; 14];
        buf[8..10].copy_from_slice(&i16::MIN.to_le_bytes());
        assert_eq!(read(&layout, &buf, "leftStick/y"), ControlValue::Scalar(1.0));
        assert_eq!(read(&layout, &buf, "leftStick/up"), ControlValue::Scalar(1.0));
        assert_eq!(read(&layout, &buf, "leftStick/down"), ControlValue::Scalar(0.0));
    }

    #[test]
    fn wireless_default_state_is_centered() {
        let layout = wireless().unwrap();
        let buf = layout.default_state();
        for name in ["leftStick/x", "leftStick/y", "rightStick/x", "rightStick/y"] {
            let v = read(&layout, &buf, name);
            assert!(v.approx_eq(&ControlValue::Scalar(0.0), 1e-4), "{name}: {v}");
        }
    }

    #[test]
    fn wireless_hat_and_buttons() {
        let layout = wireless().unwrap();
        let mut buf = layout.default_state();
        buf[13] = 3; // east
        buf[14] = 0b0000_0001; // A
        buf[16] = 0b0000_0001; // bit 16: View
        assert_eq!(read(&layout, &buf, "dpad/right"), ControlValue::Scalar(1.0));
        assert_eq!(read(&layout, &buf, "dpad/up"), ControlValue::Scalar(0.0));
        assert_eq!(read(&layout, &buf, "buttonSouth"), ControlValue::Scalar(1.0));
        assert_eq!(read(&layout, &buf, "select"), ControlValue::Scalar(1.0));

        let v2 = wireless_v2().unwrap();
        assert_eq!(read(&v2, &buf, "select"), ControlValue::Scalar(0.0));
    }

    #[test]
    fn wireless_trigger_full_scale() {
        let layout = wireless().unwrap();
        let mut buf = layout.default_state();
        buf[9..11].copy_from_slice(&1023u16.to_le_bytes());
        let v = read(&layout, &buf, "leftTrigger");
        assert!(v.approx_eq(&ControlValue::Scalar(1.0), 1e-3), "{v}");
    }
}
