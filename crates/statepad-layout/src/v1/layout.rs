use serde::Deserialize;

/// Layout file, version 1.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct LayoutV1 {
    pub version: u8,
    pub name: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub extends: Option<String>,
    #[serde(default)]
    pub format: Option<String>,
    #[serde(default)]
    pub size: Option<u32>,
    #[serde(default)]
    pub default_variant: Option<String>,
    /// Replaces the base layout's rules when present.
    #[serde(default)]
    pub variants: Option<Vec<LayoutV1Variant>>,
    #[serde(default)]
    pub remove: Vec<String>,
    #[serde(default)]
    pub controls: Vec<LayoutV1Control>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct LayoutV1Variant {
    pub tag: String,
    #[serde(default)]
    pub require: Vec<String>,
    #[serde(default)]
    pub exclude: Vec<String>,
    #[serde(default)]
    pub vendor_id: Option<u16>,
    #[serde(default)]
    pub product_id: Option<u16>,
    #[serde(default)]
    pub min_buttons: Option<u16>,
    #[serde(default)]
    pub min_axes: Option<u16>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct LayoutV1Control {
    pub name: String,
    pub format: String,
    /// Byte offset.
    #[serde(default)]
    pub offset: u32,
    /// Bit within the byte at `offset`.
    #[serde(default)]
    pub bit: u32,
    /// Width in bits.
    #[serde(default)]
    pub size: Option<u32>,
    #[serde(default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub variant: Option<String>,
    #[serde(default)]
    pub parameters: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub noisy: bool,
    #[serde(default)]
    pub default: Option<u64>,
    // discrete buttons
    #[serde(default)]
    pub min: Option<u32>,
    #[serde(default)]
    pub max: Option<u32>,
    #[serde(default)]
    pub wrap_at: Option<u32>,
    #[serde(default)]
    pub null: Option<u32>,
}
