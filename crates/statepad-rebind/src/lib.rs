//! Interactive rebinding: resolve which physical control the user actuated.

mod config;
mod error;
mod matcher;
mod session;

pub use crate::config::{
    ExistingBinding, ExpectedControl, RebindConfig, DEFAULT_ACTUATION_THRESHOLD,
};
pub use crate::error::{RebindError, Result};
pub use crate::matcher::{
    begin_rebind, begin_rebind_at, RebindHandle, RebindMatcher, RebindStatus,
};
pub use crate::session::{
    Binding, CancelReason, RebindResult, RebindSession, RebindState, RebindWarning,
};
