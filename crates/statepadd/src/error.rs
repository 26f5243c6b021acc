use thiserror::Error;

/// Error type for captures and replays.
#[derive(Debug, Error)]
pub enum Error {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("capture deserialize error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("unsupported capture version: {0}")]
    UnsupportedVersion(u8),
    #[error("invalid hex: {0}")]
    InvalidHex(String),
    #[error("frame {index}: {source}")]
    Frame {
        index: usize,
        #[source]
        source: Box<Error>,
    },
    #[error("invalid state format: {0}")]
    InvalidFormat(String),
    #[error("invalid capability: {0}")]
    InvalidCapability(String),
    #[error("invalid expected control: {0}")]
    InvalidExpected(String),
    #[error("device {id} is unusable: {reason}")]
    Unusable { id: u32, reason: String },
    #[error("device error: {0}")]
    Device(#[from] statepad_device::Error),
    #[error("layout error: {0}")]
    Layout(#[from] statepad_layout::LayoutError),
    #[error("rebind error: {0}")]
    Rebind(#[from] statepad_rebind::RebindError),
}

/// Convenient result alias for capture operations.
pub type Result<T> = std::result::Result<T, Error>;
