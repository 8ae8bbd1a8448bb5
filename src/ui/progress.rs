// Progress monitor
//
// The backend has no push channel, so progress is polled. The monitor is split in two:
// - ProgressMachine: pure state transitions, driven with explicit instants
// - ProgressMonitor: a tokio task that owns the machine, the poll interval and the
//   hide countdown, and feeds it processing-flag changes and query results
//
// States: Idle → Polling → VisibleCompleted → Hidden (Hidden behaves like Idle).

use crate::metrics::Metrics;
use crate::models::{CoreConfig, ProgressInfo};
use crate::services::backend::{BackendClient, RpcBridge};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

/// Phase of the progress indicator lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorPhase {
    /// Nothing has been polled yet
    Idle,

    /// Querying the backend every tick
    Polling,

    /// A 100% snapshot arrived; polling stopped and a hide is pending
    VisibleCompleted,

    /// Indicator cleared after the grace period
    Hidden,
}

/// What a view needs to render the progress indicator
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressView {
    pub phase: MonitorPhase,
    pub visible: bool,
    pub snapshot: Option<ProgressInfo>,
    pub hide_pending: bool,
}

/// Transition events, mostly useful for logging and tests
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressEvent {
    PollingStarted,
    SnapshotReceived { percentage: f64 },
    PollingStopped,
    HideScheduled { at: Instant },
    HideCancelled,
    Hidden,
}

/// Timing of the monitor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonitorConfig {
    pub poll_interval: Duration,
    pub grace_period: Duration,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        MonitorConfig::from(&CoreConfig::default())
    }
}

impl From<&CoreConfig> for MonitorConfig {
    fn from(config: &CoreConfig) -> Self {
        Self {
            poll_interval: config.poll_interval(),
            grace_period: config.hide_grace_period(),
        }
    }
}

/// Pure progress state machine
#[derive(Debug, Clone)]
pub struct ProgressMachine {
    phase: MonitorPhase,
    snapshot: Option<ProgressInfo>,
    visible: bool,
    hide_at: Option<Instant>,
    /// The pending hide was scheduled by a 100% snapshot
    hide_on_completion: bool,
    grace_period: Duration,
}

impl ProgressMachine {
    pub fn new(grace_period: Duration) -> Self {
        Self {
            phase: MonitorPhase::Idle,
            snapshot: None,
            visible: false,
            hide_at: None,
            hide_on_completion: false,
            grace_period,
        }
    }

    pub fn phase(&self) -> MonitorPhase {
        self.phase
    }

    pub fn is_polling(&self) -> bool {
        self.phase == MonitorPhase::Polling
    }

    /// When the pending hide fires, if one is pending
    pub fn hide_deadline(&self) -> Option<Instant> {
        self.hide_at
    }

    pub fn view(&self) -> ProgressView {
        ProgressView {
            phase: self.phase,
            visible: self.visible,
            snapshot: self.snapshot.clone(),
            hide_pending: self.hide_at.is_some(),
        }
    }

    /// The processing flag changed.
    ///
    /// A job starting always (re)enters polling, including while a hide
    /// countdown from the previous job is still running; the countdown is
    /// left alone until fresh progress arrives.
    pub fn processing_changed(&mut self, processing: bool) -> Vec<ProgressEvent> {
        if processing && self.phase != MonitorPhase::Polling {
            self.phase = MonitorPhase::Polling;
            vec![ProgressEvent::PollingStarted]
        } else {
            Vec::new()
        }
    }

    /// A poll returned a snapshot
    pub fn snapshot_received(&mut self, info: ProgressInfo, now: Instant) -> Vec<ProgressEvent> {
        let mut events = vec![ProgressEvent::SnapshotReceived {
            percentage: info.percentage,
        }];
        let complete = info.is_complete();

        self.snapshot = Some(info);
        self.visible = true;

        if complete {
            if self.phase == MonitorPhase::Polling {
                events.push(ProgressEvent::PollingStopped);
            }
            self.phase = MonitorPhase::VisibleCompleted;
            // A repeated 100% keeps its countdown; any other pending hide restarts
            if !self.hide_on_completion {
                events.extend(self.cancel_hide());
                events.extend(self.schedule_hide(now));
                self.hide_on_completion = true;
            }
        } else {
            events.extend(self.cancel_hide());
        }

        events
    }

    /// A poll returned nothing, or failed.
    ///
    /// While a job is processing the last snapshot stays on screen. Otherwise
    /// the grace countdown starts, unless one is already pending.
    pub fn no_progress(&mut self, processing: bool, now: Instant) -> Vec<ProgressEvent> {
        if processing {
            Vec::new()
        } else {
            self.schedule_hide(now)
        }
    }

    /// The hide countdown elapsed
    pub fn hide_elapsed(&mut self, processing: bool) -> Vec<ProgressEvent> {
        if self.hide_at.take().is_none() {
            return Vec::new();
        }
        self.hide_on_completion = false;

        self.snapshot = None;
        self.visible = false;

        let mut events = vec![ProgressEvent::Hidden];
        // A job started during the countdown keeps the poll running
        if self.phase == MonitorPhase::Polling && processing {
            return events;
        }
        if self.phase == MonitorPhase::Polling {
            events.push(ProgressEvent::PollingStopped);
        }
        self.phase = MonitorPhase::Hidden;
        events
    }

    fn cancel_hide(&mut self) -> Option<ProgressEvent> {
        self.hide_on_completion = false;
        self.hide_at.take().map(|_| ProgressEvent::HideCancelled)
    }

    fn schedule_hide(&mut self, now: Instant) -> Vec<ProgressEvent> {
        if self.hide_at.is_some() {
            return Vec::new();
        }
        let at = now + self.grace_period;
        self.hide_at = Some(at);
        vec![ProgressEvent::HideScheduled { at }]
    }
}

/// Polling task bound to a view's lifetime.
///
/// Created with [`ProgressMonitor::spawn`]; torn down with
/// [`shutdown()`](Self::shutdown) or by dropping it. Teardown aborts the task,
/// which drops the poll interval, any in-flight query and any pending hide
/// timer together, so nothing fires or mutates afterwards.
pub struct ProgressMonitor {
    view_rx: watch::Receiver<ProgressView>,
    event_tx: broadcast::Sender<ProgressEvent>,
    task: Option<JoinHandle<()>>,
}

impl ProgressMonitor {
    /// Start monitoring on the current tokio runtime
    pub fn spawn<B: RpcBridge>(
        backend: BackendClient<B>,
        processing: watch::Receiver<bool>,
        config: MonitorConfig,
        metrics: Arc<Metrics>,
    ) -> Self {
        let machine = ProgressMachine::new(config.grace_period);
        let (view_tx, view_rx) = watch::channel(machine.view());
        let (event_tx, _) = broadcast::channel(256);

        let task = tokio::spawn(run_monitor(
            backend,
            processing,
            machine,
            config.poll_interval,
            view_tx,
            event_tx.clone(),
            metrics,
        ));

        tracing::debug!(
            "Progress monitor started (interval {:?}, grace {:?})",
            config.poll_interval,
            config.grace_period
        );

        Self {
            view_rx,
            event_tx,
            task: Some(task),
        }
    }

    /// Latest view state
    pub fn view(&self) -> ProgressView {
        self.view_rx.borrow().clone()
    }

    pub fn subscribe_view(&self) -> watch::Receiver<ProgressView> {
        self.view_rx.clone()
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<ProgressEvent> {
        self.event_tx.subscribe()
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    /// Stop polling and cancel any pending hide
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            tracing::debug!("Progress monitor stopped");
        }
    }
}

impl Drop for ProgressMonitor {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn run_monitor<B: RpcBridge>(
    backend: BackendClient<B>,
    mut processing: watch::Receiver<bool>,
    mut machine: ProgressMachine,
    poll_interval: Duration,
    view_tx: watch::Sender<ProgressView>,
    event_tx: broadcast::Sender<ProgressEvent>,
    metrics: Arc<Metrics>,
) {
    let publish = |machine: &ProgressMachine, events: Vec<ProgressEvent>| {
        for event in events {
            tracing::debug!("Progress monitor: {:?}", event);
            let _ = event_tx.send(event);
        }
        let view = machine.view();
        view_tx.send_if_modified(|current| {
            if *current == view {
                false
            } else {
                *current = view;
                true
            }
        });
    };

    let mut ticker = time::interval(poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let mut processing_open = true;
    let initially = *processing.borrow_and_update();
    let events = machine.processing_changed(initially);
    publish(&machine, events);

    loop {
        let deadline = machine.hide_deadline();

        tokio::select! {
            biased;

            _ = time::sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                let events = machine.hide_elapsed(*processing.borrow());
                publish(&machine, events);
            }

            changed = processing.changed(), if processing_open => {
                if changed.is_err() {
                    // Controller gone; treat as not processing from here on
                    processing_open = false;
                    continue;
                }
                let events = machine.processing_changed(*processing.borrow_and_update());
                if events.contains(&ProgressEvent::PollingStarted) {
                    ticker.reset_immediately();
                }
                publish(&machine, events);
            }

            _ = ticker.tick(), if machine.is_polling() => {
                metrics.record_progress_query();
                let result = backend.query_progress().await;
                let now = Instant::now();
                let processing_now = processing_open && *processing.borrow();

                let events = match result {
                    Ok(Some(info)) => {
                        metrics.record_snapshot();
                        machine.snapshot_received(info, now)
                    }
                    Ok(None) => machine.no_progress(processing_now, now),
                    Err(e) => {
                        tracing::warn!("Progress query failed, treating as no progress: {}", e);
                        metrics.record_progress_query_failure();
                        machine.no_progress(processing_now, now)
                    }
                };
                publish(&machine, events);
            }

            else => break,
        }
    }

    tracing::debug!("Progress monitor has nothing left to wait for");
}
