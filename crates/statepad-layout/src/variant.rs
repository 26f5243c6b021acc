use statepad_bit_derive::Bit;
use statepad_bit_mask::Bitmask;

use crate::descriptor::{LayoutDescriptor, VariantTag};
use crate::{LayoutError, Result};

/// Feature flags reported by the platform for a connected device.
#[derive(Bit, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    Gamepad,
    Joystick,
    DpadButtons,
    DpadAxes,
    Virtual,
    Bluetooth,
    Rumble,
}

impl Capability {
    pub const ALL: [Capability; 7] = [
        Capability::Gamepad,
        Capability::Joystick,
        Capability::DpadButtons,
        Capability::DpadAxes,
        Capability::Virtual,
        Capability::Bluetooth,
        Capability::Rumble,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Capability::Gamepad => "gamepad",
            Capability::Joystick => "joystick",
            Capability::DpadButtons => "dpad_buttons",
            Capability::DpadAxes => "dpad_axes",
            Capability::Virtual => "virtual",
            Capability::Bluetooth => "bluetooth",
            Capability::Rumble => "rumble",
        }
    }

    pub fn parse(name: &str) -> Option<Capability> {
        let name = name.trim();
        Self::ALL
            .into_iter()
            .find(|c| c.name().eq_ignore_ascii_case(name))
    }
}

pub type CapabilityFlags = Bitmask<Capability>;

/// What the platform layer knows about a device.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Capabilities {
    pub flags: CapabilityFlags,
    pub button_count: u16,
    pub axis_count: u16,
    pub vendor_id: Option<u16>,
    pub product_id: Option<u16>,
}

impl Capabilities {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, capability: Capability) -> Self {
        self.flags.insert(capability);
        self
    }

    #[must_use]
    pub fn buttons(mut self, count: u16) -> Self {
        self.button_count = count;
        self
    }

    #[must_use]
    pub fn axes(mut self, count: u16) -> Self {
        self.axis_count = count;
        self
    }

    #[must_use]
    pub fn product(mut self, vendor_id: u16, product_id: u16) -> Self {
        self.vendor_id = Some(vendor_id);
        self.product_id = Some(product_id);
        self
    }

    pub fn has(&self, capability: Capability) -> bool {
        self.flags.contains(capability)
    }
}

/// Condition on [`Capabilities`] selecting a layout variant.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CapabilityPredicate {
    pub require: CapabilityFlags,
    pub exclude: CapabilityFlags,
    pub vendor_id: Option<u16>,
    pub product_id: Option<u16>,
    pub min_buttons: Option<u16>,
    pub min_axes: Option<u16>,
}

impl CapabilityPredicate {
    /// Matches every device.
    pub fn any() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn require(mut self, capability: Capability) -> Self {
        self.require.insert(capability);
        self
    }

    #[must_use]
    pub fn exclude(mut self, capability: Capability) -> Self {
        self.exclude.insert(capability);
        self
    }

    #[must_use]
    pub fn vendor(mut self, vendor_id: u16) -> Self {
        self.vendor_id = Some(vendor_id);
        self
    }

    #[must_use]
    pub fn product(mut self, vendor_id: u16, product_id: u16) -> Self {
        self.vendor_id = Some(vendor_id);
        self.product_id = Some(product_id);
        self
    }

    #[must_use]
    pub fn min_buttons(mut self, count: u16) -> Self {
        self.min_buttons = Some(count);
        self
    }

    #[must_use]
    pub fn min_axes(mut self, count: u16) -> Self {
        self.min_axes = Some(count);
        self
    }

    pub fn matches(&self, caps: &Capabilities) -> bool {
        caps.flags.is_superset(&self.require)
            && !caps.flags.intersects(&self.exclude)
            && self.vendor_id.map_or(true, |id| caps.vendor_id == Some(id))
            && self.product_id.map_or(true, |id| caps.product_id == Some(id))
            && self.min_buttons.map_or(true, |n| caps.button_count >= n)
            && self.min_axes.map_or(true, |n| caps.axis_count >= n)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct VariantRule {
    pub predicate: CapabilityPredicate,
    pub tag: VariantTag,
}

/// Picks the variant of `layout` for a device. Rules are tried in
/// declaration order and the first match wins; otherwise the layout's
/// default variant applies.
pub fn resolve_variant(layout: &LayoutDescriptor, caps: &Capabilities) -> Result<VariantTag> {
    let matched = layout
        .variant_rules()
        .iter()
        .find(|rule| rule.predicate.matches(caps))
        .map(|rule| &rule.tag)
        .or(layout.default_variant());

    match matched {
        Some(tag) => {
            log::debug!("layout {} resolved variant \"{tag}\"", layout.name());
            Ok(tag.clone())
        }
        None => Err(LayoutError::NoMatchingVariant {
            layout: layout.name().to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::StateFormat;

    fn layout() -> LayoutDescriptor {
        LayoutDescriptor::builder("pad", StateFormat::ANDROID_GAME_CONTROLLER, 4)
            .variant(
                CapabilityPredicate::any()
                    .require(Capability::Joystick)
                    .exclude(Capability::Gamepad),
                "Joystick",
            )
            .variant(
                CapabilityPredicate::any()
                    .require(Capability::Gamepad)
                    .require(Capability::DpadAxes),
                "Gamepad;DpadAxes",
            )
            .variant(CapabilityPredicate::any().require(Capability::Gamepad), "Gamepad;DpadButtons")
            .build()
            .unwrap()
    }

    #[test]
    fn first_matching_rule_wins() {
        let caps = Capabilities::new()
            .with(Capability::Gamepad)
            .with(Capability::DpadAxes)
            .with(Capability::Joystick);
        let tag = resolve_variant(&layout(), &caps).unwrap();
        assert_eq!(tag.as_str(), "Gamepad;DpadAxes");
    }

    #[test]
    fn resolution_is_deterministic() {
        let caps = Capabilities::new().with(Capability::Gamepad);
        let l = layout();
        let first = resolve_variant(&l, &caps).unwrap();
        for _ in 0..10 {
            assert_eq!(resolve_variant(&l, &caps).unwrap(), first);
        }
        assert_eq!(first.as_str(), "Gamepad;DpadButtons");
    }

    #[test]
    fn exclusion_is_honoured() {
        let caps = Capabilities::new().with(Capability::Joystick);
        assert_eq!(resolve_variant(&layout(), &caps).unwrap().as_str(), "Joystick");
    }

    #[test]
    fn no_match_without_default() {
        let caps = Capabilities::new().with(Capability::Rumble);
        assert!(matches!(
            resolve_variant(&layout(), &caps),
            Err(LayoutError::NoMatchingVariant { .. })
        ));
    }

    #[test]
    fn default_variant_applies() {
        let l = LayoutDescriptor::builder("pad", StateFormat::HID, 1)
            .variant(CapabilityPredicate::any().product(0x045e, 0x02ea), "Native")
            .default_variant("Fallback")
            .build()
            .unwrap();
        let other = Capabilities::new().product(0x045e, 0x0b13);
        assert_eq!(resolve_variant(&l, &other).unwrap().as_str(), "Fallback");
        let native = Capabilities::new().product(0x045e, 0x02ea);
        assert_eq!(resolve_variant(&l, &native).unwrap().as_str(), "Native");
    }

    #[test]
    fn counts_are_minimums() {
        let p = CapabilityPredicate::any().min_buttons(10).min_axes(4);
        assert!(p.matches(&Capabilities::new().buttons(12).axes(4)));
        assert!(!p.matches(&Capabilities::new().buttons(9).axes(6)));
    }

    #[test]
    fn capability_names_round_trip() {
        for cap in Capability::ALL {
            assert_eq!(Capability::parse(cap.name()), Some(cap));
        }
        assert_eq!(Capability::parse("DPAD_AXES"), Some(Capability::DpadAxes));
    }
}
