//! Emergency lifecycle coordination.

mod coordinator;
mod state;

pub use coordinator::{CoordinatorConfig, EmergencyCoordinator};
pub use state::{CoordinatorStatus, RejectReason, TriggerOutcome};
