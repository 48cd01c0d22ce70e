//! Coordinator state: one tagged union advanced only under the
//! coordinator's lock.
//!
//! The original bug class this guards against is a pair of independent
//! booleans (`is_active`, `is_cancelled`) drifting out of sync between
//! two monitoring loops. Here the phase is a single value, and the
//! generation counter is the claim token that decides races between the
//! countdown timer, cancellation, and send-now.

use std::time::Duration;

use tokio::time::Instant;

use crate::domain::{AlertId, EmergencyAlert};

/// Phase of the global emergency state machine.
#[derive(Debug, Clone)]
pub(crate) enum Phase {
    /// No emergency in progress
    Idle,
    /// Alert created, countdown running, cancellation possible
    CountingDown {
        /// The active alert
        alert: EmergencyAlert,
    },
    /// Countdown claimed by dispatch; transport I/O in flight
    Dispatching {
        /// The active alert
        alert: EmergencyAlert,
        /// Cancellation arrived while dispatch was in flight; once the
        /// outcome is recorded a `Sent` degrades to a cancellation notice
        cancel_requested: bool,
    },
    /// Dispatch succeeded; alert held through a grace window so a late
    /// cancellation can still send a notice
    Sent {
        /// The dispatched alert
        alert: EmergencyAlert,
    },
}

impl Phase {
    /// Short name for logs and status snapshots
    pub(crate) fn name(&self) -> &'static str {
        match self {
            Phase::Idle => "idle",
            Phase::CountingDown { .. } => "counting_down",
            Phase::Dispatching { .. } => "dispatching",
            Phase::Sent { .. } => "sent",
        }
    }

    /// The alert currently occupying the state machine, if any
    pub(crate) fn active_alert(&self) -> Option<&EmergencyAlert> {
        match self {
            Phase::Idle => None,
            Phase::CountingDown { alert } => Some(alert),
            Phase::Dispatching { alert, .. } => Some(alert),
            Phase::Sent { alert } => Some(alert),
        }
    }
}

/// The process-wide emergency state, owned by the coordinator.
#[derive(Debug)]
pub(crate) struct CoordinatorState {
    /// Current lifecycle phase
    pub phase: Phase,
    /// Guard window: no trigger of any origin is accepted before this
    pub cancelled_until: Option<Instant>,
    /// Cooldown window: sensor-originated triggers rejected before this
    pub cooldown_until: Option<Instant>,
    /// Claim token; bumped on every transition that invalidates a
    /// pending timer task
    pub generation: u64,
}

impl CoordinatorState {
    pub(crate) fn new() -> Self {
        Self {
            phase: Phase::Idle,
            cancelled_until: None,
            cooldown_until: None,
            generation: 0,
        }
    }
}

/// Why a trigger request was rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// Another alert is already active
    AlertActive,
    /// Inside the post-cancellation guard window
    GuardWindow,
    /// Inside the cooldown window (sensor-originated triggers only)
    Cooldown,
}

impl std::fmt::Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RejectReason::AlertActive => write!(f, "alert already active"),
            RejectReason::GuardWindow => write!(f, "inside guard window"),
            RejectReason::Cooldown => write!(f, "inside cooldown window"),
        }
    }
}

/// Net effect of a trigger request.
///
/// A rejection is a normal outcome, not an error: racing triggers are
/// resolved silently and the losing caller simply observes `Rejected`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TriggerOutcome {
    /// A new alert was created and its countdown started
    Accepted(AlertId),
    /// No alert was created and no side effects occurred
    Rejected(RejectReason),
}

impl TriggerOutcome {
    /// Check whether the trigger was accepted
    pub fn is_accepted(&self) -> bool {
        matches!(self, TriggerOutcome::Accepted(_))
    }

    /// The created alert's ID, when accepted
    pub fn alert_id(&self) -> Option<&AlertId> {
        match self {
            TriggerOutcome::Accepted(id) => Some(id),
            TriggerOutcome::Rejected(_) => None,
        }
    }
}

/// Point-in-time snapshot of the coordinator for presentation layers.
#[derive(Debug, Clone)]
pub struct CoordinatorStatus {
    /// Current phase name
    pub phase: &'static str,
    /// The active alert, if one exists
    pub active_alert: Option<EmergencyAlert>,
    /// Time left on the guard window
    pub guard_remaining: Option<Duration>,
    /// Time left on the cooldown window
    pub cooldown_remaining: Option<Duration>,
}
