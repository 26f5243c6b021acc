use crate::descriptor::{ControlBuilder, ControlDescriptor, LayoutBuilder, LayoutDescriptor};
use crate::format::{ControlKind, DiscreteRange, FormatCode, StateFormat};
use crate::registry::LayoutRegistry;
use crate::variant::{Capability, CapabilityPredicate};
use crate::{LayoutError, Result};

use super::layout::{LayoutV1, LayoutV1Control, LayoutV1Variant};
use super::Error;

impl LayoutV1 {
    pub(crate) fn to_descriptor(&self, registry: &LayoutRegistry) -> Result<LayoutDescriptor> {
        debug_assert_eq!(self.version, 1);

        let format = self
            .format
            .as_deref()
            .map(|f| f.parse::<StateFormat>().map_err(Error::InvalidStateFormat))
            .transpose()?;

        let mut builder = match &self.extends {
            Some(base) => {
                let base = registry
                    .get(base)
                    .ok_or_else(|| LayoutError::UnknownLayout(base.clone()))?;
                LayoutBuilder::extend(&self.name, &base)
            }
            None => match (format, self.size) {
                (Some(format), Some(size)) => LayoutBuilder::new(&self.name, format, size),
                _ => return Err(Error::MissingBase(self.name.clone()).into()),
            },
        };

        if let Some(format) = format {
            builder = builder.format(format);
        }
        if let Some(size) = self.size {
            builder = builder.size(size);
        }
        if let Some(display_name) = &self.display_name {
            builder = builder.display_name(display_name);
        }
        if let Some(variants) = &self.variants {
            builder = builder.clear_variants();
            for variant in variants {
                builder = builder.variant(parse_predicate(variant)?, &variant.tag);
            }
        }
        if let Some(tag) = &self.default_variant {
            builder = builder.default_variant(tag);
        }
        for name in &self.remove {
            builder = builder.remove_control(name);
        }
        for control in &self.controls {
            builder = builder.control(parse_control(control)?);
        }

        builder.build()
    }
}

fn parse_predicate(variant: &LayoutV1Variant) -> Result<CapabilityPredicate> {
    let capability = |name: &String| {
        Capability::parse(name).ok_or_else(|| Error::InvalidCapability(name.clone()))
    };

    let mut predicate = CapabilityPredicate::any();
    for name in &variant.require {
        predicate = predicate.require(capability(name)?);
    }
    for name in &variant.exclude {
        predicate = predicate.exclude(capability(name)?);
    }
    predicate.vendor_id = variant.vendor_id;
    predicate.product_id = variant.product_id;
    predicate.min_buttons = variant.min_buttons;
    predicate.min_axes = variant.min_axes;
    Ok(predicate)
}

fn parse_format(control: &LayoutV1Control) -> Result<FormatCode> {
    let code = control.format.trim();
    if code.eq_ignore_ascii_case("discrete_button") || code.eq_ignore_ascii_case("DISC") {
        let field = |value: Option<u32>, field: &'static str| {
            value.ok_or_else(|| Error::MissingField {
                control: control.name.clone(),
                field,
            })
        };
        let mut range = DiscreteRange::new(field(control.min, "min")?, field(control.max, "max")?);
        if let Some(wrap_at) = control.wrap_at {
            range = range.wrapping_at(wrap_at);
        }
        if let Some(null) = control.null {
            range = range.with_null(null);
        }
        return Ok(FormatCode::DiscreteButton(range));
    }

    FormatCode::parse(code).ok_or_else(|| {
        Error::InvalidFormat {
            control: control.name.clone(),
            code: control.format.clone(),
        }
        .into()
    })
}

fn parse_control(control: &LayoutV1Control) -> Result<ControlBuilder> {
    let format = parse_format(control)?;
    let mut builder = ControlDescriptor::builder(&control.name, format)
        .offset(control.offset)
        .bit(control.bit)
        .noisy(control.noisy);

    if let Some(size) = control.size {
        builder = builder.size(size);
    }
    if let Some(kind) = &control.kind {
        let kind = ControlKind::parse(kind).ok_or_else(|| Error::InvalidKind {
            control: control.name.clone(),
            kind: kind.clone(),
        })?;
        builder = builder.kind(kind);
    }
    if let Some(variant) = &control.variant {
        builder = builder.variant(variant);
    }
    if let Some(params) = &control.parameters {
        builder = builder.parameters(params);
    }
    if let Some(display_name) = &control.display_name {
        builder = builder.display_name(display_name);
    }
    if let Some(raw) = control.default {
        builder = builder.default_state(raw);
    }
    Ok(builder)
}
