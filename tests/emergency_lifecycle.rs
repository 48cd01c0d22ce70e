//! Integration tests for the emergency lifecycle coordinator.
//!
//! All timing runs on tokio's paused clock, so countdown/cancellation
//! races are exercised deterministically at millisecond precision. The
//! transport is a scripted stub; no I/O happens.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use fallsentry::{
    AlertChannel, AlertStatus, AlertType, Contact, CoordinatorConfig, DispatchConfig, DispatchGate,
    EmergencyCoordinator, InMemoryHistory, LocalAlertOrchestrator, NotificationTransport,
    RejectReason, SentryError, StaticContactProvider, TransportError, TriggerOutcome,
    TriggerSource,
};

/// Transport stub that replays scripted results and records deliveries.
struct ScriptedTransport {
    script: Mutex<VecDeque<Result<(), TransportError>>>,
    sent: Mutex<Vec<String>>,
    attempts: Mutex<u32>,
}

impl ScriptedTransport {
    fn always_ok() -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(VecDeque::new()),
            sent: Mutex::new(Vec::new()),
            attempts: Mutex::new(0),
        })
    }

    fn scripted(script: Vec<Result<(), TransportError>>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into()),
            sent: Mutex::new(Vec::new()),
            attempts: Mutex::new(0),
        })
    }

    fn attempts(&self) -> u32 {
        *self.attempts.lock()
    }

    fn sent(&self) -> Vec<String> {
        self.sent.lock().clone()
    }
}

#[async_trait::async_trait]
impl NotificationTransport for ScriptedTransport {
    async fn send(&self, _recipients: &[String], body: &str) -> Result<(), TransportError> {
        *self.attempts.lock() += 1;
        let result = self.script.lock().pop_front().unwrap_or(Ok(()));
        if result.is_ok() {
            self.sent.lock().push(body.to_string());
        }
        result
    }
}

struct Harness {
    coordinator: Arc<EmergencyCoordinator>,
    transport: Arc<ScriptedTransport>,
    history: Arc<InMemoryHistory>,
}

fn harness_with(
    config: CoordinatorConfig,
    transport: Arc<ScriptedTransport>,
) -> Harness {
    let contacts = Arc::new(StaticContactProvider::new(vec![Contact::new(
        "Alice", "+15550100",
    )]));
    let gate = Arc::new(DispatchGate::new(
        DispatchConfig::default(),
        contacts,
        transport.clone(),
    ));
    let orchestrator = Arc::new(LocalAlertOrchestrator::with_log_channels());
    let history = Arc::new(InMemoryHistory::new());
    let coordinator = EmergencyCoordinator::new(config, orchestrator, gate, history.clone());
    Harness {
        coordinator,
        transport,
        history,
    }
}

fn default_harness() -> Harness {
    harness_with(CoordinatorConfig::default(), ScriptedTransport::always_ok())
}

/// Let spawned tasks (history appends, notices) run to completion.
async fn settle() {
    tokio::time::sleep(Duration::from_millis(1)).await;
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_triggers_accept_exactly_one() {
    let h = default_harness();

    // Foreground and background fire simultaneously
    let (a, b) = tokio::join!(
        h.coordinator.trigger(TriggerSource::Sensor, AlertType::Fall),
        h.coordinator.trigger(TriggerSource::Sensor, AlertType::Impact),
    );

    assert_ne!(a.is_accepted(), b.is_accepted(), "exactly one must win");
    assert_eq!(h.coordinator.status().phase, "counting_down");
}

#[tokio::test(start_paused = true)]
async fn test_trigger_rejected_while_alert_active() {
    let h = default_harness();

    let first = h
        .coordinator
        .trigger(TriggerSource::Sensor, AlertType::Fall)
        .await;
    assert!(first.is_accepted());

    let second = h
        .coordinator
        .trigger(TriggerSource::Manual, AlertType::Manual)
        .await;
    assert_eq!(
        second,
        TriggerOutcome::Rejected(RejectReason::AlertActive)
    );
}

#[tokio::test(start_paused = true)]
async fn test_guard_window_blocks_both_origins_after_cancel() {
    let h = default_harness();

    let outcome = h
        .coordinator
        .trigger(TriggerSource::Sensor, AlertType::Fall)
        .await;
    let alert_id = outcome.alert_id().unwrap().clone();
    assert!(h.coordinator.cancel(&alert_id).await);

    // Inside the guard window: sensor and manual are both rejected
    let sensor = h
        .coordinator
        .trigger(TriggerSource::Sensor, AlertType::Fall)
        .await;
    assert_eq!(sensor, TriggerOutcome::Rejected(RejectReason::GuardWindow));

    let manual = h
        .coordinator
        .trigger(TriggerSource::Manual, AlertType::Manual)
        .await;
    assert_eq!(manual, TriggerOutcome::Rejected(RejectReason::GuardWindow));
}

#[tokio::test(start_paused = true)]
async fn test_manual_bypasses_cooldown_but_sensor_does_not() {
    let config = CoordinatorConfig {
        guard_window: Duration::from_secs(1),
        cooldown: Duration::from_secs(300),
        ..CoordinatorConfig::default()
    };
    let h = harness_with(config, ScriptedTransport::always_ok());

    let outcome = h
        .coordinator
        .trigger(TriggerSource::Sensor, AlertType::Fall)
        .await;
    let alert_id = outcome.alert_id().unwrap().clone();
    h.coordinator.cancel(&alert_id).await;

    // Past the guard window, still inside the cooldown
    tokio::time::sleep(Duration::from_secs(2)).await;

    let sensor = h
        .coordinator
        .trigger(TriggerSource::Sensor, AlertType::Fall)
        .await;
    assert_eq!(sensor, TriggerOutcome::Rejected(RejectReason::Cooldown));

    let manual = h
        .coordinator
        .trigger(TriggerSource::Manual, AlertType::Manual)
        .await;
    assert!(manual.is_accepted());
}

#[tokio::test(start_paused = true)]
async fn test_cancel_just_before_expiry_suppresses_dispatch() {
    let h = default_harness();

    let outcome = h
        .coordinator
        .trigger(TriggerSource::Sensor, AlertType::Fall)
        .await;
    let alert_id = outcome.alert_id().unwrap().clone();

    tokio::time::sleep(Duration::from_millis(29_999)).await;
    assert!(h.coordinator.cancel(&alert_id).await);

    // Let the countdown timer fire and observe its stale claim
    tokio::time::sleep(Duration::from_millis(10)).await;
    settle().await;

    assert_eq!(h.transport.attempts(), 0, "dispatch must be suppressed");
    assert_eq!(h.coordinator.status().phase, "idle");

    let alerts = h.history.alerts();
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].status(), AlertStatus::Cancelled);
}

#[tokio::test(start_paused = true)]
async fn test_cancel_just_after_expiry_degrades_to_notice() {
    let h = default_harness();

    let outcome = h
        .coordinator
        .trigger(TriggerSource::Sensor, AlertType::Fall)
        .await;
    let alert_id = outcome.alert_id().unwrap().clone();

    // Countdown fires at 30 s; we cancel 1 ms later
    tokio::time::sleep(Duration::from_millis(30_001)).await;
    assert!(h.transport.attempts() > 0, "dispatch already happened");
    assert!(h.coordinator.cancel(&alert_id).await);
    settle().await;

    // The original send stands; a cancellation notice was delivered on top
    let sent = h.transport.sent();
    assert!(sent.iter().any(|body| body.starts_with("EMERGENCY")));
    assert!(sent.iter().any(|body| body.starts_with("CANCELLED")));

    let alerts = h.history.alerts();
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].status(), AlertStatus::Sent);
}

#[tokio::test(start_paused = true)]
async fn test_countdown_expiry_dispatches_and_enters_grace() {
    let h = default_harness();

    h.coordinator
        .trigger(TriggerSource::Sensor, AlertType::Impact)
        .await;
    tokio::time::sleep(Duration::from_secs(31)).await;
    settle().await;

    assert_eq!(h.transport.sent().len(), 1);
    // Alert held through the grace window
    assert_eq!(h.coordinator.status().phase, "sent");

    // Grace lapses (default 2 min) and the coordinator clears to idle
    tokio::time::sleep(Duration::from_secs(121)).await;
    assert_eq!(h.coordinator.status().phase, "idle");

    let alerts = h.history.alerts();
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].status(), AlertStatus::Sent);
    assert_eq!(alerts[0].notified_contact_ids().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_sensor_trigger_rejected_during_post_send_cooldown() {
    let h = default_harness();

    h.coordinator
        .trigger(TriggerSource::Sensor, AlertType::Fall)
        .await;
    // Through countdown, dispatch, and the grace window
    tokio::time::sleep(Duration::from_secs(160)).await;
    assert_eq!(h.coordinator.status().phase, "idle");

    // Cooldown (5 min from dispatch) still in effect
    let sensor = h
        .coordinator
        .trigger(TriggerSource::Sensor, AlertType::Fall)
        .await;
    assert_eq!(sensor, TriggerOutcome::Rejected(RejectReason::Cooldown));
}

#[tokio::test(start_paused = true)]
async fn test_send_now_skips_countdown() {
    let h = default_harness();

    let outcome = h
        .coordinator
        .trigger(TriggerSource::Manual, AlertType::Manual)
        .await;
    let alert_id = outcome.alert_id().unwrap().clone();

    assert!(h.coordinator.send_now(&alert_id).await);
    settle().await;

    assert_eq!(h.transport.sent().len(), 1);
    assert_eq!(h.coordinator.status().phase, "sent");
}

#[tokio::test(start_paused = true)]
async fn test_send_now_with_foreign_id_is_noop() {
    let h = default_harness();

    h.coordinator
        .trigger(TriggerSource::Sensor, AlertType::Fall)
        .await;
    assert!(!h.coordinator.send_now(&fallsentry::AlertId::new()).await);
    assert_eq!(h.transport.attempts(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_cancel_with_foreign_id_is_noop() {
    let h = default_harness();

    h.coordinator
        .trigger(TriggerSource::Sensor, AlertType::Fall)
        .await;
    assert!(!h.coordinator.cancel(&fallsentry::AlertId::new()).await);
    assert_eq!(h.coordinator.status().phase, "counting_down");
}

#[tokio::test(start_paused = true)]
async fn test_dispatch_failure_marks_alert_failed_without_recountdown() {
    let transport = ScriptedTransport::scripted(vec![
        Err(TransportError::Transient("radio busy".into())),
        Err(TransportError::Transient("radio busy".into())),
        Err(TransportError::Transient("radio busy".into())),
    ]);
    let h = harness_with(CoordinatorConfig::default(), transport);

    h.coordinator
        .trigger(TriggerSource::Sensor, AlertType::Fall)
        .await;
    tokio::time::sleep(Duration::from_secs(31)).await;
    // Allow retries and their backoff to play out
    tokio::time::sleep(Duration::from_secs(5)).await;
    settle().await;

    assert_eq!(h.transport.attempts(), 3, "bounded retry count");
    assert_eq!(h.coordinator.status().phase, "idle");

    let alerts = h.history.alerts();
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].status(), AlertStatus::Failed);
}

#[tokio::test(start_paused = true)]
async fn test_retry_then_success_records_sent() {
    let transport = ScriptedTransport::scripted(vec![
        Err(TransportError::Transient("radio busy".into())),
        Ok(()),
    ]);
    let h = harness_with(CoordinatorConfig::default(), transport);

    h.coordinator
        .trigger(TriggerSource::Sensor, AlertType::Fall)
        .await;
    tokio::time::sleep(Duration::from_secs(35)).await;
    settle().await;

    assert_eq!(h.transport.attempts(), 2);
    let alerts = h.history.alerts();
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].status(), AlertStatus::Sent);
}

#[tokio::test(start_paused = true)]
async fn test_reset_clears_active_alert_and_windows() {
    let h = default_harness();

    let outcome = h
        .coordinator
        .trigger(TriggerSource::Sensor, AlertType::Fall)
        .await;
    let alert_id = outcome.alert_id().unwrap().clone();
    h.coordinator.cancel(&alert_id).await;

    // Guard window active; a trigger would be rejected without the reset
    h.coordinator.reset().await;

    let after = h
        .coordinator
        .trigger(TriggerSource::Sensor, AlertType::Fall)
        .await;
    assert!(after.is_accepted());
}

/// Channel whose start only takes effect after a device delay,
/// mimicking asynchronous hardware bring-up.
struct SlowStartChannel {
    active: AtomicBool,
    start_delay: Duration,
}

impl SlowStartChannel {
    fn new(start_delay: Duration) -> Self {
        Self {
            active: AtomicBool::new(false),
            start_delay,
        }
    }
}

#[async_trait::async_trait]
impl AlertChannel for SlowStartChannel {
    fn name(&self) -> &str {
        "siren"
    }

    async fn start(&self) -> Result<(), SentryError> {
        tokio::time::sleep(self.start_delay).await;
        self.active.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn stop(&self) -> Result<(), SentryError> {
        self.active.store(false, Ordering::SeqCst);
        Ok(())
    }

    async fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }
}

#[tokio::test(start_paused = true)]
async fn test_cancel_during_slow_channel_start_leaves_no_alarm_on() {
    let channel = Arc::new(SlowStartChannel::new(Duration::from_millis(100)));
    let orchestrator = Arc::new(LocalAlertOrchestrator::new(vec![channel.clone()]));
    let contacts = Arc::new(StaticContactProvider::new(vec![Contact::new(
        "Alice", "+15550100",
    )]));
    let gate = Arc::new(DispatchGate::new(
        DispatchConfig::default(),
        contacts,
        ScriptedTransport::always_ok(),
    ));
    let coordinator = EmergencyCoordinator::new(
        CoordinatorConfig::default(),
        orchestrator,
        gate,
        Arc::new(InMemoryHistory::new()),
    );

    // Trigger parks inside the channel's slow start
    let background = Arc::clone(&coordinator);
    let trigger_task = tokio::spawn(async move {
        background
            .trigger(TriggerSource::Sensor, AlertType::Fall)
            .await
    });
    settle().await;
    assert_eq!(coordinator.status().phase, "counting_down");
    let alert_id = coordinator.status().active_alert.unwrap().id().clone();

    // Cancellation completes while the start is still in flight
    assert!(coordinator.cancel(&alert_id).await);
    assert_eq!(coordinator.status().phase, "idle");

    // The late start lands afterwards; it must not leave the channel on
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(trigger_task.await.unwrap().is_accepted());
    assert!(!channel.is_active().await, "channel left active after cancel");
}

#[tokio::test(start_paused = true)]
async fn test_events_are_broadcast_to_subscribers() {
    let h = default_harness();
    let mut events = h.coordinator.subscribe();

    let outcome = h
        .coordinator
        .trigger(TriggerSource::Sensor, AlertType::Fall)
        .await;
    let alert_id = outcome.alert_id().unwrap().clone();
    h.coordinator.cancel(&alert_id).await;

    let first = events.recv().await.unwrap();
    assert_eq!(first.event_type(), "triggered");
    let second = events.recv().await.unwrap();
    assert_eq!(second.event_type(), "cancelled");
}
