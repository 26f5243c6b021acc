use statepad_layout::{CodecError, LayoutError, StateFormat};
use thiserror::Error;

use crate::types::DeviceId;

/// Error type for device sessions and the device manager.
#[derive(Debug, Error)]
pub enum Error {
    /// A state buffer arrived with a different format tag than the layout's.
    #[error("state format mismatch: expected \"{expected}\", got \"{actual}\"")]
    FormatMismatch {
        expected: StateFormat,
        actual: StateFormat,
    },
    /// A state buffer has a different length than the layout's.
    #[error("state size mismatch: expected {expected} bytes, got {actual}")]
    StateSizeMismatch { expected: usize, actual: usize },
    #[error("device not found: {0}")]
    NotFound(DeviceId),
    /// The device is connected but no layout or variant fits it.
    #[error("device {id} is unusable: {reason}")]
    Unusable { id: DeviceId, reason: String },
    #[error("unknown control: {0}")]
    UnknownControl(String),
    /// The path names a group that has no value of its own.
    #[error("control has no readable value: {0}")]
    NotReadable(String),
    #[error("control declared twice: {0}")]
    DuplicateControl(String),
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),
    #[error("layout error: {0}")]
    Layout(#[from] LayoutError),
}

/// Convenient result alias for device operations.
pub type Result<T> = std::result::Result<T, Error>;
