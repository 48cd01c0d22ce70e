//! The emergency lifecycle coordinator.
//!
//! Single shared arbiter between the foreground and background
//! monitoring contexts. All transitions go through one mutex-guarded
//! state value; the lock is never held across an await, and every
//! spawned timer carries a generation token it must re-validate before
//! acting, so a cancelled countdown can never dispatch.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use parking_lot::Mutex;
use tokio::sync::broadcast;
use tokio::time::Instant;

use crate::alerting::{DispatchGate, DispatchOutcome, LocalAlertOrchestrator};
use crate::domain::{AlertId, AlertStatus, AlertType, EmergencyAlert, EmergencyEvent, TriggerSource};
use crate::providers::AlertHistorySink;

use super::state::{CoordinatorState, Phase, RejectReason, TriggerOutcome};
use super::CoordinatorStatus;

/// Configuration for the emergency coordinator.
///
/// All windows are policy, not structure; the original system shipped
/// several different cancellation-window durations across revisions, so
/// every one of them is an input here.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct CoordinatorConfig {
    /// Countdown between trigger and dispatch
    pub countdown: Duration,
    /// Guard window installed after a cancellation; blocks all triggers
    pub guard_window: Duration,
    /// Cooldown window installed after any resolved emergency; blocks
    /// sensor-originated triggers only
    pub cooldown: Duration,
    /// How long a `Sent` alert is held for late cancellation-with-notice
    pub sent_grace: Duration,
    /// Capacity of the lifecycle event broadcast channel
    pub event_capacity: usize,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            countdown: Duration::from_secs(30),
            guard_window: Duration::from_secs(30),
            cooldown: Duration::from_secs(5 * 60),
            sent_grace: Duration::from_secs(2 * 60),
            event_capacity: 64,
        }
    }
}

/// Serializes the emergency lifecycle across monitoring contexts.
///
/// Entry points (`trigger`, `cancel`, `send_now`) may be called
/// concurrently from any context; exactly one net effect is observed
/// per alert.
pub struct EmergencyCoordinator {
    config: CoordinatorConfig,
    state: Mutex<CoordinatorState>,
    orchestrator: Arc<LocalAlertOrchestrator>,
    gate: Arc<DispatchGate>,
    history: Arc<dyn AlertHistorySink>,
    events: broadcast::Sender<EmergencyEvent>,
}

impl EmergencyCoordinator {
    /// Create a coordinator in the idle state.
    pub fn new(
        config: CoordinatorConfig,
        orchestrator: Arc<LocalAlertOrchestrator>,
        gate: Arc<DispatchGate>,
        history: Arc<dyn AlertHistorySink>,
    ) -> Arc<Self> {
        let (events, _) = broadcast::channel(config.event_capacity.max(1));
        Arc::new(Self {
            config,
            state: Mutex::new(CoordinatorState::new()),
            orchestrator,
            gate,
            history,
            events,
        })
    }

    /// Subscribe to lifecycle events.
    pub fn subscribe(&self) -> broadcast::Receiver<EmergencyEvent> {
        self.events.subscribe()
    }

    /// Get configuration.
    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    /// Request a new emergency.
    ///
    /// Rejected silently (no alert, no side effects) while another alert
    /// is active, inside the guard window, or — for sensor-originated
    /// requests only — inside the cooldown window.
    pub async fn trigger(
        self: &Arc<Self>,
        source: TriggerSource,
        alert_type: AlertType,
    ) -> TriggerOutcome {
        let now = Instant::now();

        let (alert, generation) = {
            let mut state = self.state.lock();

            if !matches!(state.phase, Phase::Idle) {
                tracing::debug!(%source, %alert_type, "trigger rejected: alert already active");
                return TriggerOutcome::Rejected(RejectReason::AlertActive);
            }
            if let Some(until) = state.cancelled_until {
                if now < until {
                    tracing::debug!(%source, %alert_type, "trigger rejected: guard window");
                    return TriggerOutcome::Rejected(RejectReason::GuardWindow);
                }
            }
            if source == TriggerSource::Sensor {
                if let Some(until) = state.cooldown_until {
                    if now < until {
                        tracing::debug!(%alert_type, "trigger rejected: cooldown window");
                        return TriggerOutcome::Rejected(RejectReason::Cooldown);
                    }
                }
            }

            let mut alert = EmergencyAlert::new(alert_type);
            alert.start_countdown();
            state.generation += 1;
            state.phase = Phase::CountingDown {
                alert: alert.clone(),
            };
            (alert, state.generation)
        };

        let alert_id = alert.id().clone();
        tracing::info!(
            alert_id = %alert_id,
            %alert_type,
            %source,
            countdown_secs = self.config.countdown.as_secs(),
            "emergency triggered, countdown started"
        );
        self.emit(EmergencyEvent::Triggered {
            alert_id: alert_id.clone(),
            alert_type,
            source,
            timestamp: Utc::now(),
        });

        // Countdown timer first so its deadline is anchored to the
        // trigger, then local alerting.
        let coordinator = Arc::clone(self);
        let countdown = self.config.countdown;
        let timer_id = alert_id.clone();
        tokio::spawn(async move {
            tokio::time::sleep(countdown).await;
            coordinator.on_countdown_elapsed(timer_id, generation).await;
        });

        self.orchestrator.start().await;

        // A cancel or reset may have landed while start was in flight;
        // its stop can complete before our start does, which would leave
        // the channels sounding with no alert left to stop them.
        let resolved_meanwhile = {
            let state = self.state.lock();
            state
                .phase
                .active_alert()
                .map_or(true, |active| active.id() != &alert_id)
        };
        if resolved_meanwhile {
            tracing::debug!(
                alert_id = %alert_id,
                "alert resolved during local alert start, stopping channels"
            );
            self.orchestrator.stop().await;
        }

        TriggerOutcome::Accepted(alert_id)
    }

    /// Cancel the active alert.
    ///
    /// Returns `false` (no-op) for an unknown or foreign alert id. On a
    /// match, the state transition is applied atomically before any
    /// other effect is visible; local alerting then stops within one
    /// orchestration round-trip even if a dispatch is still in flight.
    /// A cancellation arriving after dispatch recorded `Sent` degrades
    /// to a queued cancellation notice.
    pub async fn cancel(&self, alert_id: &AlertId) -> bool {
        let now = Instant::now();

        enum Followup {
            Suppressed(EmergencyAlert),
            InFlight,
            NoticeOwed(EmergencyAlert),
        }

        let followup = {
            let mut state = self.state.lock();
            match &mut state.phase {
                Phase::CountingDown { alert } if alert.id() == alert_id => {
                    alert.mark_cancelled();
                    let resolved = alert.clone();
                    state.generation += 1;
                    state.phase = Phase::Idle;
                    state.cancelled_until = Some(now + self.config.guard_window);
                    state.cooldown_until = Some(now + self.config.cooldown);
                    Followup::Suppressed(resolved)
                }
                Phase::Dispatching { alert, cancel_requested } if alert.id() == alert_id => {
                    *cancel_requested = true;
                    Followup::InFlight
                }
                Phase::Sent { alert } if alert.id() == alert_id => {
                    let resolved = alert.clone();
                    state.generation += 1;
                    state.phase = Phase::Idle;
                    state.cancelled_until = Some(now + self.config.guard_window);
                    Followup::NoticeOwed(resolved)
                }
                _ => {
                    tracing::debug!(%alert_id, "cancel ignored: no matching active alert");
                    return false;
                }
            }
        };

        match followup {
            Followup::Suppressed(alert) => {
                tracing::info!(alert_id = %alert_id, "alert cancelled before dispatch");
                self.emit(EmergencyEvent::Cancelled {
                    alert_id: alert_id.clone(),
                    timestamp: Utc::now(),
                });
                self.record_history(alert);
            }
            Followup::InFlight => {
                // Dispatch already claimed the alert; its outcome decides
                // whether a cancellation notice is owed. Local alerting
                // still stops immediately.
                tracing::info!(alert_id = %alert_id, "cancel requested while dispatch in flight");
            }
            Followup::NoticeOwed(alert) => {
                tracing::info!(alert_id = %alert_id, "alert cancelled after send, notice queued");
                self.emit(EmergencyEvent::Cancelled {
                    alert_id: alert_id.clone(),
                    timestamp: Utc::now(),
                });
                self.queue_cancellation_notice(alert);
            }
        }

        self.orchestrator.stop().await;
        true
    }

    /// Skip the countdown and dispatch the active alert immediately.
    ///
    /// Returns `false` for an unknown or foreign alert id, or when no
    /// countdown is running.
    pub async fn send_now(self: &Arc<Self>, alert_id: &AlertId) -> bool {
        let claimed = {
            let mut state = self.state.lock();
            match &state.phase {
                Phase::CountingDown { alert } if alert.id() == alert_id => {
                    let alert = alert.clone();
                    state.generation += 1;
                    state.phase = Phase::Dispatching {
                        alert: alert.clone(),
                        cancel_requested: false,
                    };
                    Some(alert)
                }
                _ => None,
            }
        };

        match claimed {
            Some(alert) => {
                tracing::info!(alert_id = %alert_id, "countdown skipped, dispatching now");
                self.run_dispatch(alert).await;
                true
            }
            None => {
                tracing::debug!(%alert_id, "send_now ignored: no matching countdown");
                false
            }
        }
    }

    /// Manual override: drop any active alert and clear both windows.
    pub async fn reset(&self) {
        let resolved = {
            let mut state = self.state.lock();
            let resolved = state.phase.active_alert().cloned().map(|mut alert| {
                if !alert.is_resolved() {
                    alert.mark_cancelled();
                }
                alert
            });
            state.generation += 1;
            state.phase = Phase::Idle;
            state.cancelled_until = None;
            state.cooldown_until = None;
            resolved
        };

        if let Some(alert) = resolved {
            tracing::info!(alert_id = %alert.id(), "coordinator reset, active alert dropped");
            self.record_history(alert);
        } else {
            tracing::info!("coordinator reset");
        }
        self.orchestrator.stop().await;
    }

    /// Snapshot of the current phase and window deadlines.
    pub fn status(&self) -> CoordinatorStatus {
        let now = Instant::now();
        let state = self.state.lock();
        let remaining = |deadline: Option<Instant>| {
            deadline.and_then(|t| (t > now).then(|| t - now))
        };
        CoordinatorStatus {
            phase: state.phase.name(),
            active_alert: state.phase.active_alert().cloned(),
            guard_remaining: remaining(state.cancelled_until),
            cooldown_remaining: remaining(state.cooldown_until),
        }
    }

    /// Countdown expiry: claim the alert for dispatch if nothing else
    /// resolved it first.
    async fn on_countdown_elapsed(self: &Arc<Self>, alert_id: AlertId, generation: u64) {
        let claimed = {
            let mut state = self.state.lock();
            if state.generation != generation {
                // Cancelled, sent early, or reset while we slept
                return;
            }
            match &state.phase {
                Phase::CountingDown { alert } if *alert.id() == alert_id => {
                    let alert = alert.clone();
                    state.phase = Phase::Dispatching {
                        alert: alert.clone(),
                        cancel_requested: false,
                    };
                    Some(alert)
                }
                _ => None,
            }
        };

        if let Some(alert) = claimed {
            tracing::info!(alert_id = %alert_id, "countdown elapsed, dispatching");
            self.run_dispatch(alert).await;
        }
    }

    /// Dispatch the claimed alert and record the outcome.
    ///
    /// Runs on a spawned task, never on a thread servicing sensor
    /// samples. The claim was taken before calling this, so a racing
    /// cancellation can only request a notice, not suppress the send.
    async fn run_dispatch(self: &Arc<Self>, alert: EmergencyAlert) {
        let alert_id = alert.id().clone();
        let outcome = self.gate.dispatch(&alert).await;
        let now = Instant::now();

        enum After {
            HoldForGrace(u64),
            Notice(EmergencyAlert),
            Nothing,
        }

        let recorded = {
            let mut state = self.state.lock();
            let (cancel_requested, alert) = match &mut state.phase {
                Phase::Dispatching { alert, cancel_requested } if *alert.id() == alert_id => {
                    (*cancel_requested, alert)
                }
                // Reset intervened; nothing left to record
                _ => return,
            };

            match outcome {
                DispatchOutcome::Sent { contact_ids, location } => {
                    alert.mark_sent(contact_ids, location);
                    let resolved = alert.clone();
                    state.cooldown_until = Some(now + self.config.cooldown);
                    state.generation += 1;

                    if cancel_requested {
                        state.phase = Phase::Idle;
                        state.cancelled_until = Some(now + self.config.guard_window);
                        (resolved.clone(), After::Notice(resolved))
                    } else {
                        let generation = state.generation;
                        state.phase = Phase::Sent {
                            alert: resolved.clone(),
                        };
                        (resolved, After::HoldForGrace(generation))
                    }
                }
                DispatchOutcome::Skipped | DispatchOutcome::Failed => {
                    alert.mark_failed();
                    let resolved = alert.clone();
                    state.generation += 1;
                    state.phase = Phase::Idle;
                    state.cooldown_until = Some(now + self.config.cooldown);
                    if cancel_requested {
                        state.cancelled_until = Some(now + self.config.guard_window);
                    }
                    (resolved, After::Nothing)
                }
            }
        };
        let (resolved, after) = recorded;

        match resolved.status() {
            AlertStatus::Sent => {
                tracing::info!(
                    alert_id = %alert_id,
                    contacts = resolved.notified_contact_ids().len(),
                    "alert dispatched"
                );
                self.emit(EmergencyEvent::Dispatched {
                    alert_id: alert_id.clone(),
                    contact_ids: resolved.notified_contact_ids().to_vec(),
                    timestamp: Utc::now(),
                });
            }
            _ => {
                tracing::warn!(alert_id = %alert_id, "alert dispatch failed");
                self.emit(EmergencyEvent::DispatchFailed {
                    alert_id: alert_id.clone(),
                    timestamp: Utc::now(),
                });
            }
        }
        self.record_history(resolved.clone());
        self.orchestrator.stop().await;

        match after {
            After::HoldForGrace(generation) => {
                let coordinator = Arc::clone(self);
                let grace = self.config.sent_grace;
                tokio::spawn(async move {
                    tokio::time::sleep(grace).await;
                    coordinator.clear_sent(generation);
                });
            }
            After::Notice(alert) => self.queue_cancellation_notice(alert),
            After::Nothing => {}
        }
    }

    /// Clear a `Sent` alert once its grace window lapses.
    fn clear_sent(&self, generation: u64) {
        let mut state = self.state.lock();
        if state.generation != generation {
            return;
        }
        if let Phase::Sent { alert } = &state.phase {
            tracing::debug!(alert_id = %alert.id(), "sent alert cleared after grace window");
            state.generation += 1;
            state.phase = Phase::Idle;
        }
    }

    /// Send the cancellation notice owed for an already-sent alert.
    fn queue_cancellation_notice(&self, alert: EmergencyAlert) {
        self.emit(EmergencyEvent::CancellationNoticeQueued {
            alert_id: alert.id().clone(),
            timestamp: Utc::now(),
        });
        let gate = Arc::clone(&self.gate);
        tokio::spawn(async move {
            let alert_id = alert.id().clone();
            match gate.dispatch_cancellation(&alert).await {
                DispatchOutcome::Sent { .. } => {
                    tracing::info!(alert_id = %alert_id, "cancellation notice delivered");
                }
                _ => {
                    tracing::warn!(alert_id = %alert_id, "cancellation notice not delivered");
                }
            }
        });
    }

    fn emit(&self, event: EmergencyEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }

    /// History is fire-and-forget; a failing sink never aborts the flow.
    fn record_history(&self, alert: EmergencyAlert) {
        let history = Arc::clone(&self.history);
        tokio::spawn(async move {
            if let Err(error) = history.append(&alert).await {
                tracing::warn!(alert_id = %alert.id(), %error, "failed to append alert history");
            }
        });
    }
}

impl std::fmt::Debug for EmergencyCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmergencyCoordinator")
            .field("config", &self.config)
            .field("phase", &self.state.lock().phase.name())
            .finish()
    }
}
