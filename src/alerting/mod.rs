//! Alerting module: local alert orchestration and notification dispatch.

mod dispatch;
mod local;
pub mod message;

pub use dispatch::{DispatchConfig, DispatchGate, DispatchOutcome};
pub use local::{AlertChannel, LocalAlertOrchestrator, LogAlertChannel};
