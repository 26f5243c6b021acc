mod builtin;
mod codec;
mod descriptor;
mod format;
mod params;
mod parse;
mod processor;
mod registry;
mod v1;
mod value;
mod variant;
mod workspace;

use thiserror::Error;

pub use builtin::{layouts as builtin_layouts, ANDROID_AXIS_OFFSET, ANDROID_STATE_SIZE};
pub use codec::{decode, decode_raw, encode, CodecError, CodecResult};
pub use descriptor::{ControlBuilder, ControlDescriptor, LayoutBuilder, LayoutDescriptor, VariantTag};
pub use format::{ControlKind, DiscreteRange, FormatCode, StateFormat};
pub use parse::parse_layout;
pub use processor::{InvertDomain, ParameterError, Processor, ProcessorChain};
pub use registry::{DeviceMatch, LayoutRegistry};
pub use v1::Error as LayoutFileError;
pub use value::ControlValue;
pub use variant::{
    resolve_variant, Capabilities, Capability, CapabilityFlags, CapabilityPredicate, VariantRule,
};
pub use workspace::LayoutWorkspace;

#[derive(Debug, Error)]
pub enum LayoutError {
    #[error("layout \"{layout}\": control \"{control}\" ends at bit {end}, beyond {size} bytes")]
    OutOfBounds {
        layout: String,
        control: String,
        end: u64,
        size: u32,
    },
    #[error("control \"{control}\" cannot be {bits} bits wide in format {format}")]
    FormatMismatch {
        control: String,
        format: &'static str,
        bits: u32,
    },
    #[error("layout \"{layout}\" declares \"{control}\" twice under variant \"{variant}\"")]
    DuplicateControl {
        layout: String,
        control: String,
        variant: String,
    },
    #[error("control \"{control}\": {source}")]
    InvalidParameters {
        control: String,
        #[source]
        source: ParameterError,
    },
    #[error("layout \"{layout}\" has no variant for this device")]
    NoMatchingVariant { layout: String },
    #[error("layout already registered: {0}")]
    DuplicateLayout(String),
    #[error("unknown layout: {0}")]
    UnknownLayout(String),
    #[error("no layout for state format \"{0}\"")]
    UnknownFormat(StateFormat),

    #[error("yaml deserialize error: {0}")]
    YamlDeserializeError(#[from] serde_yaml::Error),
    #[error("unsupported version: {0}")]
    UnsupportedVersion(u8),
    #[error("v1 layout error: {0}")]
    V1LayoutError(#[from] v1::Error),
    #[error("environment variable not set: {0}")]
    EnvVarNotSet(String),
    #[error("path is not a directory: {0}")]
    PathIsNotDirectory(String),
    #[error("path error: {0}")]
    PathError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, LayoutError>;
