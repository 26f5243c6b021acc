use std::sync::Arc;

use ahash::AHashMap;

use crate::descriptor::{LayoutDescriptor, VariantTag};
use crate::format::StateFormat;
use crate::variant::{resolve_variant, Capabilities};
use crate::{builtin, LayoutError, Result};

/// A layout chosen for a device together with its resolved variant.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceMatch {
    pub layout: Arc<LayoutDescriptor>,
    pub variant: VariantTag,
}

/// Layouts keyed by device-type name, kept in registration order.
#[derive(Debug, Default, Clone)]
pub struct LayoutRegistry {
    layouts: Vec<Arc<LayoutDescriptor>>,
    index: AHashMap<Box<str>, usize>,
}

impl LayoutRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding the built-in layouts.
    pub fn with_builtin() -> Result<Self> {
        let mut registry = Self::new();
        for layout in builtin::layouts()? {
            registry.register(layout)?;
        }
        Ok(registry)
    }

    pub fn register(&mut self, layout: LayoutDescriptor) -> Result<Arc<LayoutDescriptor>> {
        let key: Box<str> = layout.name().to_ascii_lowercase().into();
        if self.index.contains_key(&key) {
            return Err(LayoutError::DuplicateLayout(layout.name().to_string()));
        }
        log::debug!(
            "registered layout {} ({}, {} bytes, {} controls)",
            layout.name(),
            layout.state_format(),
            layout.size_in_bytes(),
            layout.controls().len()
        );
        let layout = Arc::new(layout);
        self.index.insert(key, self.layouts.len());
        self.layouts.push(Arc::clone(&layout));
        Ok(layout)
    }

    pub fn get(&self, name: &str) -> Option<Arc<LayoutDescriptor>> {
        self.index
            .get(name.to_ascii_lowercase().as_str())
            .map(|&i| Arc::clone(&self.layouts[i]))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name.to_ascii_lowercase().as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<LayoutDescriptor>> {
        self.layouts.iter()
    }

    pub fn len(&self) -> usize {
        self.layouts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layouts.is_empty()
    }

    /// Finds the first registered layout for `format` whose variant resolves
    /// for `caps`.
    pub fn match_device(&self, format: StateFormat, caps: &Capabilities) -> Result<DeviceMatch> {
        let mut unresolved = None;
        for layout in self.layouts.iter().filter(|l| l.state_format() == format) {
            match resolve_variant(layout, caps) {
                Ok(variant) => {
                    return Ok(DeviceMatch {
                        layout: Arc::clone(layout),
                        variant,
                    })
                }
                Err(err @ LayoutError::NoMatchingVariant { .. }) => {
                    unresolved.get_or_insert(err);
                }
                Err(err) => return Err(err),
            }
        }
        Err(unresolved.unwrap_or(LayoutError::UnknownFormat(format)))
    }
}
