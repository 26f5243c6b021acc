use thiserror::Error;

/// Error type for rebind sessions.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RebindError {
    /// `start` was called on a session that already left `Idle`.
    #[error("rebind session already started")]
    AlreadyStarted,
    /// A composite part has no name.
    #[error("composite part {0} has an empty name")]
    EmptyComposite(usize),
}

/// Convenient result alias for rebind operations.
pub type Result<T> = std::result::Result<T, RebindError>;
