mod error;
mod events;
mod manager;
mod recency;
mod session;
mod state;
mod subscription;
mod tree;
mod types;

pub use crate::error::{Error, Result};
pub use crate::events::{DeviceEvent, EventReceiver, Observation};
pub use crate::manager::DeviceManager;
pub use crate::recency::{
    next_update_time, DeviceRecency, OutputThrottle, DEFAULT_OUTPUT_FREQUENCY,
    DEFAULT_RECENT_THRESHOLD,
};
pub use crate::session::{ControlChange, DeviceSession};
pub use crate::state::{StateBuffer, StatePair};
pub use crate::subscription::{Subscription, SubscriptionKind, SuppressionGuard};
pub use crate::tree::{ControlNode, ControlTree, NodeId};
pub use crate::types::{DeviceId, DeviceInfo, DeviceStatus};
