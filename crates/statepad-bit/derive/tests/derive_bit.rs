use statepad_bit_derive::Bit;
use statepad_bit_mask::{Bitable, Bitmask};

#[derive(Bit, Debug, Clone, Copy, PartialEq, Eq)]
enum Source {
    Keyboard,
    Dpad,
    Gamepad,
    Joystick,
}

#[test]
fn variants_get_consecutive_bits() {
    assert_eq!(Source::Keyboard.bit(), 1);
    assert_eq!(Source::Dpad.bit(), 2);
    assert_eq!(Source::Gamepad.bit(), 4);
    assert_eq!(Source::Joystick.index(), 3);
}

#[test]
fn derived_flags_work_in_masks() {
    let mask = Bitmask::new(&[Source::Gamepad, Source::Dpad]);
    assert!(mask.contains(Source::Gamepad));
    assert!(!mask.contains(Source::Joystick));
    assert_eq!(mask.value(), 0b0110);
}
