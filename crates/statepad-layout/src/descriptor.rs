use std::collections::BTreeSet;
use std::fmt;

use ahash::AHashSet;

use crate::format::{ControlKind, FormatCode, StateFormat};
use crate::processor::ProcessorChain;
use crate::variant::{CapabilityPredicate, VariantRule};
use crate::{LayoutError, Result};

/// Active variant selection, possibly several tags joined by `;`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VariantTag(Box<str>);

impl VariantTag {
    pub fn new(tag: &str) -> Self {
        Self(tag.trim().into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn tags(&self) -> impl Iterator<Item = &str> {
        split_tags(&self.0)
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.tags().any(|t| t.eq_ignore_ascii_case(tag))
    }

    /// Whether a control declared for `variant` is part of this selection.
    /// Controls without a variant are always active.
    pub fn activates(&self, variant: Option<&str>) -> bool {
        match variant {
            None => true,
            Some(v) => split_tags(v).any(|t| self.contains(t)),
        }
    }
}

impl fmt::Display for VariantTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for VariantTag {
    fn from(tag: &str) -> Self {
        VariantTag::new(tag)
    }
}

fn split_tags(s: &str) -> impl Iterator<Item = &str> {
    s.split(';').map(str::trim).filter(|t| !t.is_empty())
}

/// Where one control lives in a state buffer and how to read it.
#[derive(Debug, Clone, PartialEq)]
pub struct ControlDescriptor {
    name: Box<str>,
    bit_offset: u32,
    bit_size: u32,
    format: FormatCode,
    kind: ControlKind,
    variant: Option<Box<str>>,
    processors: ProcessorChain,
    display_name: Option<Box<str>>,
    noisy: bool,
    default_state: Option<u64>,
}

impl ControlDescriptor {
    pub fn builder(name: &str, format: FormatCode) -> ControlBuilder {
        ControlBuilder::new(name, format)
    }

    /// Full `/`-separated path, e.g. `leftStick/x`.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parent(&self) -> Option<&str> {
        self.name.rsplit_once('/').map(|(parent, _)| parent)
    }

    pub fn leaf_name(&self) -> &str {
        self.name.rsplit_once('/').map_or(&*self.name, |(_, leaf)| leaf)
    }

    pub fn bit_offset(&self) -> u32 {
        self.bit_offset
    }

    pub fn bit_size(&self) -> u32 {
        self.bit_size
    }

    pub fn bit_end(&self) -> u64 {
        u64::from(self.bit_offset) + u64::from(self.bit_size)
    }

    pub fn format(&self) -> FormatCode {
        self.format
    }

    pub fn kind(&self) -> ControlKind {
        self.kind
    }

    pub fn variant(&self) -> Option<&str> {
        self.variant.as_deref()
    }

    pub fn processors(&self) -> &ProcessorChain {
        &self.processors
    }

    pub fn display_name(&self) -> &str {
        self.display_name.as_deref().unwrap_or_else(|| self.leaf_name())
    }

    pub fn is_noisy(&self) -> bool {
        self.noisy
    }

    pub fn default_state(&self) -> Option<u64> {
        self.default_state
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Processors {
    Chain(ProcessorChain),
    Parameters(String),
}

/// Builder for [`ControlDescriptor`].
///
/// Offsets are given as a byte plus a bit within it. Width defaults to the
/// format's natural width and kind to the format's default kind.
#[derive(Debug, Clone, PartialEq)]
pub struct ControlBuilder {
    name: String,
    format: FormatCode,
    byte: u32,
    bit: u32,
    size: Option<u32>,
    kind: Option<ControlKind>,
    variant: Option<String>,
    processors: Processors,
    display_name: Option<String>,
    noisy: bool,
    default_state: Option<u64>,
}

impl ControlBuilder {
    pub fn new(name: &str, format: FormatCode) -> Self {
        Self {
            name: name.to_string(),
            format,
            byte: 0,
            bit: 0,
            size: None,
            kind: None,
            variant: None,
            processors: Processors::Chain(ProcessorChain::new()),
            display_name: None,
            noisy: false,
            default_state: None,
        }
    }

    #[must_use]
    pub fn offset(mut self, byte: u32) -> Self {
        self.byte = byte;
        self
    }

    #[must_use]
    pub fn bit(mut self, bit: u32) -> Self {
        self.bit = bit;
        self
    }

    #[must_use]
    pub fn size(mut self, bits: u32) -> Self {
        self.size = Some(bits);
        self
    }

    #[must_use]
    pub fn kind(mut self, kind: ControlKind) -> Self {
        self.kind = Some(kind);
        self
    }

    #[must_use]
    pub fn variant(mut self, variant: &str) -> Self {
        self.variant = Some(variant.to_string());
        self
    }

    /// Processor parameters, e.g. `"clamp=1,clampMin=0,clampMax=1"`.
    #[must_use]
    pub fn parameters(mut self, params: &str) -> Self {
        self.processors = Processors::Parameters(params.to_string());
        self
    }

    #[must_use]
    pub fn processors(mut self, chain: ProcessorChain) -> Self {
        self.processors = Processors::Chain(chain);
        self
    }

    #[must_use]
    pub fn display_name(mut self, name: &str) -> Self {
        self.display_name = Some(name.to_string());
        self
    }

    #[must_use]
    pub fn noisy(mut self, noisy: bool) -> Self {
        self.noisy = noisy;
        self
    }

    #[must_use]
    pub fn default_state(mut self, raw: u64) -> Self {
        self.default_state = Some(raw);
        self
    }

    pub fn build(self) -> Result<ControlDescriptor> {
        let bit_size = self.size.unwrap_or_else(|| self.format.natural_bits());
        if !self.format.accepts_width(bit_size) {
            return Err(LayoutError::FormatMismatch {
                control: self.name,
                format: self.format.code(),
                bits: bit_size,
            });
        }

        let processors = match self.processors {
            Processors::Chain(chain) => chain,
            Processors::Parameters(params) => ProcessorChain::parse(&params, self.format)
                .map_err(|source| LayoutError::InvalidParameters {
                    control: self.name.clone(),
                    source,
                })?,
        };

        let bit_offset = self
            .byte
            .checked_mul(8)
            .and_then(|bits| bits.checked_add(self.bit))
            .ok_or_else(|| LayoutError::OutOfBounds {
                layout: String::new(),
                control: self.name.clone(),
                end: u64::from(self.byte) * 8 + u64::from(self.bit) + u64::from(bit_size),
                size: 0,
            })?;

        Ok(ControlDescriptor {
            bit_offset,
            bit_size,
            kind: self.kind.unwrap_or_else(|| self.format.default_kind()),
            variant: self.variant.map(Into::into),
            processors,
            display_name: self.display_name.map(Into::into),
            noisy: self.noisy,
            default_state: self.default_state,
            format: self.format,
            name: self.name.into(),
        })
    }
}

impl From<ControlDescriptor> for ControlBuilder {
    fn from(desc: ControlDescriptor) -> Self {
        Self {
            name: desc.name.into(),
            format: desc.format,
            byte: desc.bit_offset / 8,
            bit: desc.bit_offset % 8,
            size: Some(desc.bit_size),
            kind: Some(desc.kind),
            variant: desc.variant.map(Into::into),
            processors: Processors::Chain(desc.processors),
            display_name: desc.display_name.map(Into::into),
            noisy: desc.noisy,
            default_state: desc.default_state,
        }
    }
}

/// Immutable description of a device's state buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutDescriptor {
    name: Box<str>,
    display_name: Option<Box<str>>,
    state_format: StateFormat,
    size_in_bytes: u32,
    controls: Vec<ControlDescriptor>,
    variant_rules: Vec<VariantRule>,
    default_variant: Option<VariantTag>,
}

impl LayoutDescriptor {
    pub fn builder(name: &str, format: StateFormat, size_in_bytes: u32) -> LayoutBuilder {
        LayoutBuilder::new(name, format, size_in_bytes)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn display_name(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.name)
    }

    pub fn state_format(&self) -> StateFormat {
        self.state_format
    }

    pub fn size_in_bytes(&self) -> u32 {
        self.size_in_bytes
    }

    pub fn controls(&self) -> &[ControlDescriptor] {
        &self.controls
    }

    pub fn variant_rules(&self) -> &[VariantRule] {
        &self.variant_rules
    }

    pub fn default_variant(&self) -> Option<&VariantTag> {
        self.default_variant.as_ref()
    }

    /// Controls active under `variant`, in declaration order.
    pub fn active_controls<'a>(
        &'a self,
        variant: &'a VariantTag,
    ) -> impl Iterator<Item = &'a ControlDescriptor> + 'a {
        self.controls.iter().filter(move |c| variant.activates(c.variant()))
    }

    /// Every variant tag mentioned by rules, the default or a control.
    pub fn known_variants(&self) -> Vec<VariantTag> {
        let mut tags: BTreeSet<VariantTag> = BTreeSet::new();
        tags.extend(self.variant_rules.iter().map(|r| r.tag.clone()));
        tags.extend(self.default_variant.clone());
        for control in &self.controls {
            if let Some(v) = control.variant() {
                tags.extend(split_tags(v).map(VariantTag::new));
            }
        }
        tags.into_iter().collect()
    }

    /// A zeroed buffer with every declared default written.
    pub fn default_state(&self) -> Vec<u8> {
        let mut buf = vec![0u8; self.size_in_bytes as usize];
        for control in &self.controls {
            if let Some(raw) = control.default_state() {
                let written = statepad_bit_mask::write_bits(
                    &mut buf,
                    control.bit_offset(),
                    control.bit_size(),
                    raw,
                );
                debug_assert!(written.is_ok(), "{} escaped layout validation", control.name());
            }
        }
        buf
    }
}

/// Builder for [`LayoutDescriptor`]. Validation happens in [`build`].
///
/// [`build`]: LayoutBuilder::build
#[derive(Debug, Clone)]
pub struct LayoutBuilder {
    name: String,
    display_name: Option<String>,
    state_format: StateFormat,
    size_in_bytes: u32,
    controls: Vec<ControlBuilder>,
    variant_rules: Vec<VariantRule>,
    default_variant: Option<VariantTag>,
}

impl LayoutBuilder {
    pub fn new(name: &str, format: StateFormat, size_in_bytes: u32) -> Self {
        Self {
            name: name.to_string(),
            display_name: None,
            state_format: format,
            size_in_bytes,
            controls: Vec::new(),
            variant_rules: Vec::new(),
            default_variant: None,
        }
    }

    /// Starts from a copy of `base`: its format, size, controls and
    /// variant rules. The display name is not inherited.
    pub fn extend(name: &str, base: &LayoutDescriptor) -> Self {
        Self {
            name: name.to_string(),
            display_name: None,
            state_format: base.state_format,
            size_in_bytes: base.size_in_bytes,
            controls: base.controls.iter().cloned().map(ControlBuilder::from).collect(),
            variant_rules: base.variant_rules.clone(),
            default_variant: base.default_variant.clone(),
        }
    }

    #[must_use]
    pub fn display_name(mut self, name: &str) -> Self {
        self.display_name = Some(name.to_string());
        self
    }

    #[must_use]
    pub fn format(mut self, format: StateFormat) -> Self {
        self.state_format = format;
        self
    }

    #[must_use]
    pub fn size(mut self, size_in_bytes: u32) -> Self {
        self.size_in_bytes = size_in_bytes;
        self
    }

    /// Adds a control, replacing one with the same name and variant.
    #[must_use]
    pub fn control(mut self, control: ControlBuilder) -> Self {
        let existing = self.controls.iter().position(|c| {
            c.name.eq_ignore_ascii_case(&control.name)
                && match (&c.variant, &control.variant) {
                    (None, None) => true,
                    (Some(a), Some(b)) => a.eq_ignore_ascii_case(b),
                    _ => false,
                }
        });
        match existing {
            Some(i) => self.controls[i] = control,
            None => self.controls.push(control),
        }
        self
    }

    #[must_use]
    pub fn controls<I: IntoIterator<Item = ControlBuilder>>(self, controls: I) -> Self {
        controls.into_iter().fold(self, LayoutBuilder::control)
    }

    /// Removes every control named `name`, whatever its variant.
    #[must_use]
    pub fn remove_control(mut self, name: &str) -> Self {
        self.controls.retain(|c| !c.name.eq_ignore_ascii_case(name));
        self
    }

    #[must_use]
    pub fn variant(mut self, predicate: CapabilityPredicate, tag: &str) -> Self {
        self.variant_rules.push(VariantRule {
            predicate,
            tag: VariantTag::new(tag),
        });
        self
    }

    #[must_use]
    pub fn clear_variants(mut self) -> Self {
        self.variant_rules.clear();
        self.default_variant = None;
        self
    }

    #[must_use]
    pub fn default_variant(mut self, tag: &str) -> Self {
        self.default_variant = Some(VariantTag::new(tag));
        self
    }

    pub fn build(self) -> Result<LayoutDescriptor> {
        let (name, size_in_bytes) = (&self.name, self.size_in_bytes);
        let controls = self
            .controls
            .into_iter()
            .map(|control| {
                control.build().map_err(|err| match err {
                    LayoutError::OutOfBounds { control, end, .. } => LayoutError::OutOfBounds {
                        layout: name.clone(),
                        control,
                        end,
                        size: size_in_bytes,
                    },
                    other => other,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let layout = LayoutDescriptor {
            name: self.name.into(),
            display_name: self.display_name.map(Into::into),
            state_format: self.state_format,
            size_in_bytes: self.size_in_bytes,
            controls,
            variant_rules: self.variant_rules,
            default_variant: self.default_variant,
        };
        validate(&layout)?;
        Ok(layout)
    }
}

fn validate(layout: &LayoutDescriptor) -> Result<()> {
    let limit = u64::from(layout.size_in_bytes) * 8;
    for control in &layout.controls {
        if control.bit_end() > limit {
            return Err(LayoutError::OutOfBounds {
                layout: layout.name.to_string(),
                control: control.name.to_string(),
                end: control.bit_end(),
                size: layout.size_in_bytes,
            });
        }
    }

    // Names must be unique under every selection the layout can produce,
    // including the empty one and each tag on its own.
    let mut selections = layout.known_variants();
    selections.push(VariantTag::new(""));
    for selection in &selections {
        let mut seen: AHashSet<String> = AHashSet::new();
        for control in layout.active_controls(selection) {
            if !seen.insert(control.name.to_ascii_lowercase()) {
                return Err(LayoutError::DuplicateControl {
                    layout: layout.name.to_string(),
                    control: control.name.to_string(),
                    variant: selection.to_string(),
                });
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::DiscreteRange;

    fn button(name: &str, bit: u32) -> ControlBuilder {
        ControlDescriptor::builder(name, FormatCode::Bit).bit(bit)
    }

    #[test]
    fn control_path_parts() {
        let desc = ControlDescriptor::builder("leftStick/x", FormatCode::Float32)
            .build()
            .unwrap();
        assert_eq!(desc.parent(), Some("leftStick"));
        assert_eq!(desc.leaf_name(), "x");
        assert_eq!(desc.display_name(), "x");
        assert_eq!(desc.kind(), ControlKind::Axis);
        assert_eq!(desc.bit_size(), 32);
    }

    #[test]
    fn variant_tag_selection() {
        let tag = VariantTag::new("Gamepad;DpadAxes");
        assert!(tag.activates(None));
        assert!(tag.activates(Some("gamepad")));
        assert!(tag.activates(Some("Joystick;DpadAxes")));
        assert!(!tag.activates(Some("DpadButtons")));
    }

    #[test]
    fn rejects_out_of_bounds() {
        let err = LayoutDescriptor::builder("t", StateFormat::HID, 2)
            .control(ControlDescriptor::builder("wide", FormatCode::UnsignedShort).offset(1))
            .build()
            .unwrap_err();
        assert!(matches!(err, LayoutError::OutOfBounds { end: 24, size: 2, .. }));
    }

    #[test]
    fn rejects_width_mismatch() {
        let err = LayoutDescriptor::builder("t", StateFormat::HID, 4)
            .control(ControlDescriptor::builder("b", FormatCode::Byte).size(12))
            .build()
            .unwrap_err();
        assert!(matches!(err, LayoutError::FormatMismatch { bits: 12, .. }));
    }

    #[test]
    fn rejects_bad_parameters() {
        let err = LayoutDescriptor::builder("t", StateFormat::HID, 4)
            .control(ControlDescriptor::builder("a", FormatCode::Float32).parameters("clamp=9"))
            .build()
            .unwrap_err();
        assert!(matches!(err, LayoutError::InvalidParameters { .. }));
    }

    #[test]
    fn same_name_in_disjoint_variants_is_allowed() {
        let layout = LayoutDescriptor::builder("t", StateFormat::HID, 4)
            .control(button("dpad/up", 0).variant("DpadButtons"))
            .control(ControlDescriptor::builder("dpad/up", FormatCode::Byte).offset(1).variant("DpadAxes"))
            .build()
            .unwrap();
        assert_eq!(layout.controls().len(), 2);
        assert_eq!(layout.known_variants().len(), 2);
    }

    #[test]
    fn duplicate_name_in_one_selection_is_rejected() {
        let err = LayoutDescriptor::builder("t", StateFormat::HID, 4)
            .control(button("a", 0))
            .control(button("a", 1).variant("Gamepad"))
            .build()
            .unwrap_err();
        assert!(matches!(err, LayoutError::DuplicateControl { .. }));
    }

    #[test]
    fn combined_selection_is_checked() {
        let err = LayoutDescriptor::builder("t", StateFormat::HID, 4)
            .control(button("x", 0).variant("A"))
            .control(button("X", 1).variant("B"))
            .default_variant("A;B")
            .build()
            .unwrap_err();
        assert!(matches!(
            err,
            LayoutError::DuplicateControl { ref variant, .. } if variant == "A;B"
        ));
    }

    #[test]
    fn same_slot_replaces_control() {
        let layout = LayoutDescriptor::builder("t", StateFormat::HID, 4)
            .control(button("a", 0))
            .control(button("A", 5))
            .build()
            .unwrap();
        assert_eq!(layout.controls().len(), 1);
        assert_eq!(layout.controls()[0].bit_offset(), 5);
    }

    #[test]
    fn extend_copies_and_overrides() {
        let base = LayoutDescriptor::builder("base", StateFormat::HID, 4)
            .display_name("Base Pad")
            .control(button("a", 0))
            .control(button("b", 1))
            .default_variant("Gamepad")
            .build()
            .unwrap();
        let derived = LayoutBuilder::extend("derived", &base)
            .display_name("Derived Pad")
            .control(button("b", 7))
            .control(button("c", 2))
            .remove_control("a")
            .build()
            .unwrap();

        assert_eq!(derived.display_name(), "Derived Pad");
        assert_eq!(derived.state_format(), StateFormat::HID);
        let names: Vec<_> = derived.controls().iter().map(ControlDescriptor::name).collect();
        assert_eq!(names, vec!["b", "c"]);
        assert_eq!(derived.controls()[0].bit_offset(), 7);
        assert_eq!(derived.default_variant(), Some(&VariantTag::new("Gamepad")));
        // base is untouched
        assert_eq!(base.controls().len(), 2);
    }

    #[test]
    fn default_state_writes_raw_codes() {
        let layout = LayoutDescriptor::builder("t", StateFormat::HID, 5)
            .control(
                ControlDescriptor::builder("x", FormatCode::UnsignedShort)
                    .offset(1)
                    .default_state(32767),
            )
            .control(
                ControlDescriptor::builder("hat", FormatCode::DiscreteButton(DiscreteRange::new(2, 4).with_null(15)))
                    .offset(4)
                    .size(4)
                    .default_state(15),
            )
            .build()
            .unwrap();
        assert_eq!(layout.default_state(), vec![0, 0xff, 0x7f, 0, 0x0f]);
    }

    #[test]
    fn default_state_fills_to_last_bit() {
        let layout = LayoutDescriptor::builder("t", StateFormat::HID, 2)
            .control(
                ControlDescriptor::builder("top", FormatCode::Bit)
                    .offset(1)
                    .bit(4)
                    .size(4)
                    .default_state(0x1f),
            )
            .build()
            .unwrap();
        // only the field's own four bits are written
        assert_eq!(layout.default_state(), vec![0, 0xf0]);
    }
}
