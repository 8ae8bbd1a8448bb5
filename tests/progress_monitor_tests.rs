//! Integration tests for ProgressMonitor on a paused tokio clock
//!
//! These tests verify that the monitor correctly:
//! - Polls only while a job is processing
//! - Stops polling at 100% and hides once after the grace period
//! - Keeps the last snapshot while processing, and restarts the countdown on fresh progress
//! - Treats failed queries as "no progress"
//! - Does nothing at all after teardown

mod common;

use add_logo_processor_core::services::{JobError, Operation};
use add_logo_processor_core::ui::{MonitorPhase, ProgressEvent};
use add_logo_processor_core::{AppContext, CoreConfig, ImageSettings, Metrics};
use common::{ScriptedBridge, progress, settle};
use std::sync::Arc;
use tokio::sync::broadcast::{self, error::TryRecvError};
use tokio::task::JoinHandle;
use tokio::time::{Duration, sleep};

/// Grace period of the default configuration
const GRACE: Duration = Duration::from_secs(2);

async fn loaded_context(bridge: &Arc<ScriptedBridge>) -> AppContext<ScriptedBridge> {
    let context = AppContext::new(Arc::clone(bridge), &CoreConfig::default());
    context.load().await.unwrap();
    context
}

/// Start an image job that stays running until the bridge releases it
fn start_job(context: &AppContext<ScriptedBridge>) -> JoinHandle<Result<(), JobError>> {
    let jobs = context.jobs().clone();
    tokio::spawn(async move { jobs.submit_images(ImageSettings::default()).await })
}

/// Everything buffered on an event receiver
fn drain(rx: &mut broadcast::Receiver<ProgressEvent>) -> Vec<ProgressEvent> {
    let mut events = Vec::new();
    loop {
        match rx.try_recv() {
            Ok(event) => events.push(event),
            Err(TryRecvError::Lagged(_)) => continue,
            Err(_) => return events,
        }
    }
}

fn count_scheduled(events: &[ProgressEvent]) -> usize {
    events
        .iter()
        .filter(|e| matches!(e, ProgressEvent::HideScheduled { .. }))
        .count()
}

#[tokio::test(start_paused = true)]
async fn test_idle_monitor_does_not_poll() {
    let bridge = ScriptedBridge::new();
    let context = loaded_context(&bridge).await;
    let monitor = context.start_progress_monitor();

    sleep(Duration::from_secs(1)).await;

    assert_eq!(bridge.call_count(Operation::ProgressInfo), 0);
    assert_eq!(monitor.view().phase, MonitorPhase::Idle);
    assert!(!monitor.view().visible);
}

#[tokio::test(start_paused = true)]
async fn test_completion_stops_polling_and_hides_once() {
    let bridge = ScriptedBridge::new();
    bridge.hold_jobs();
    bridge.set_progress(Some(progress(40.0)));
    let context = loaded_context(&bridge).await;
    let monitor = context.start_progress_monitor();
    let mut events = monitor.subscribe_events();

    let _job = start_job(&context);
    sleep(Duration::from_millis(100)).await;

    let view = monitor.view();
    assert_eq!(view.phase, MonitorPhase::Polling);
    assert!(view.visible);
    assert_eq!(view.snapshot.unwrap().percentage, 40.0);

    bridge.set_progress(Some(progress(100.0)));
    sleep(Duration::from_millis(50)).await;

    let view = monitor.view();
    assert_eq!(view.phase, MonitorPhase::VisibleCompleted);
    assert!(view.visible);
    assert!(view.hide_pending);

    // No further queries while the completed indicator counts down
    let queries = bridge.call_count(Operation::ProgressInfo);
    sleep(GRACE / 2).await;
    assert_eq!(bridge.call_count(Operation::ProgressInfo), queries);
    assert!(monitor.view().visible);

    sleep(GRACE).await;

    let view = monitor.view();
    assert_eq!(view.phase, MonitorPhase::Hidden);
    assert!(!view.visible);
    assert!(view.snapshot.is_none());

    let events = drain(&mut events);
    assert_eq!(count_scheduled(&events), 1);
    assert!(events.contains(&ProgressEvent::PollingStopped));
    assert_eq!(events.last(), Some(&ProgressEvent::Hidden));
}

#[tokio::test(start_paused = true)]
async fn test_no_progress_while_processing_keeps_snapshot() {
    let bridge = ScriptedBridge::new();
    bridge.hold_jobs();
    bridge.set_progress(Some(progress(40.0)));
    let context = loaded_context(&bridge).await;
    let monitor = context.start_progress_monitor();

    let job = start_job(&context);
    sleep(Duration::from_millis(100)).await;

    bridge.set_progress(None);
    sleep(GRACE * 2).await;

    let view = monitor.view();
    assert!(view.visible, "indicator must not flicker while processing");
    assert!(!view.hide_pending);
    assert_eq!(view.snapshot.unwrap().percentage, 40.0);

    // Job ends without ever reporting 100%
    bridge.release_images();
    job.await.unwrap().unwrap();
    sleep(Duration::from_millis(100)).await;
    assert!(monitor.view().hide_pending);

    sleep(GRACE).await;

    let view = monitor.view();
    assert_eq!(view.phase, MonitorPhase::Hidden);
    assert!(!view.visible);

    let queries = bridge.call_count(Operation::ProgressInfo);
    sleep(Duration::from_secs(1)).await;
    assert_eq!(bridge.call_count(Operation::ProgressInfo), queries);
}

#[tokio::test(start_paused = true)]
async fn test_fresh_progress_cancels_countdown_after_cancel() {
    let bridge = ScriptedBridge::new();
    bridge.hold_jobs();
    bridge.set_progress(Some(progress(30.0)));
    let context = loaded_context(&bridge).await;
    let monitor = context.start_progress_monitor();

    let _job = start_job(&context);
    sleep(Duration::from_millis(100)).await;

    context.cancel().await.unwrap();
    assert!(!context.is_processing());

    // Backend has nothing to report any more: the countdown starts
    bridge.set_progress(None);
    sleep(Duration::from_millis(100)).await;
    assert!(monitor.view().hide_pending);

    // A late snapshot arrives before the grace period ends
    sleep(GRACE / 2).await;
    bridge.set_progress(Some(progress(35.0)));
    sleep(Duration::from_millis(50)).await;

    let view = monitor.view();
    assert!(!view.hide_pending);
    assert!(view.visible);
    assert_eq!(view.snapshot.unwrap().percentage, 35.0);

    sleep(GRACE * 2).await;
    assert!(monitor.view().visible, "stale countdown must not fire");

    bridge.set_progress(None);
    sleep(GRACE + Duration::from_millis(100)).await;

    let view = monitor.view();
    assert_eq!(view.phase, MonitorPhase::Hidden);
    assert!(!view.visible);
}

#[tokio::test(start_paused = true)]
async fn test_late_completion_gets_full_grace_period() {
    let bridge = ScriptedBridge::new();
    bridge.hold_jobs();
    bridge.set_progress(Some(progress(50.0)));
    let context = loaded_context(&bridge).await;
    let monitor = context.start_progress_monitor();

    let _job = start_job(&context);
    sleep(Duration::from_millis(100)).await;
    context.cancel().await.unwrap();

    bridge.set_progress(None);
    sleep(Duration::from_millis(100)).await;
    assert!(monitor.view().hide_pending);

    // Completion reported just before the "no progress" countdown would end
    sleep(GRACE - Duration::from_millis(400)).await;
    bridge.set_progress(Some(progress(100.0)));
    sleep(Duration::from_millis(50)).await;
    assert_eq!(monitor.view().phase, MonitorPhase::VisibleCompleted);

    // Past the old deadline, the completed indicator is still shown
    sleep(Duration::from_millis(500)).await;
    let view = monitor.view();
    assert!(view.visible);
    assert!(view.hide_pending);
    assert_eq!(view.snapshot.unwrap().percentage, 100.0);

    sleep(GRACE).await;

    let view = monitor.view();
    assert_eq!(view.phase, MonitorPhase::Hidden);
    assert!(!view.visible);
}

#[tokio::test(start_paused = true)]
async fn test_new_job_during_countdown_keeps_indicator() {
    let bridge = ScriptedBridge::new();
    bridge.hold_jobs();
    bridge.set_progress(Some(progress(100.0)));
    let context = loaded_context(&bridge).await;
    let monitor = context.start_progress_monitor();

    let first = start_job(&context);
    sleep(Duration::from_millis(50)).await;
    assert_eq!(monitor.view().phase, MonitorPhase::VisibleCompleted);

    bridge.release_images();
    first.await.unwrap().unwrap();

    bridge.set_progress(Some(progress(10.0)));
    let _second = start_job(&context);
    sleep(Duration::from_millis(50)).await;

    let view = monitor.view();
    assert_eq!(view.phase, MonitorPhase::Polling);
    assert!(!view.hide_pending);

    sleep(GRACE * 2).await;

    let view = monitor.view();
    assert!(view.visible);
    assert_eq!(view.snapshot.unwrap().percentage, 10.0);
}

#[tokio::test(start_paused = true)]
async fn test_poll_errors_count_as_no_progress() {
    let bridge = ScriptedBridge::new();
    bridge.hold_jobs();
    bridge.set_progress(Some(progress(50.0)));
    let context = loaded_context(&bridge).await;
    let monitor = context.start_progress_monitor();

    let job = start_job(&context);
    sleep(Duration::from_millis(100)).await;

    bridge.fail(Operation::ProgressInfo);
    sleep(Duration::from_secs(1)).await;

    let view = monitor.view();
    assert!(view.visible);
    assert_eq!(view.snapshot.unwrap().percentage, 50.0);
    assert!(monitor.is_running());
    assert!(Metrics::get(&context.metrics().progress_query_failures) > 0);

    bridge.release_images();
    job.await.unwrap().unwrap();
    sleep(GRACE + Duration::from_millis(100)).await;

    let view = monitor.view();
    assert_eq!(view.phase, MonitorPhase::Hidden);
    assert!(!view.visible);
}

#[tokio::test(start_paused = true)]
async fn test_slow_queries_never_overlap() {
    let bridge = ScriptedBridge::new();
    bridge.hold_jobs();
    bridge.set_progress_delay(Duration::from_millis(50));
    bridge.set_progress(Some(progress(5.0)));
    let context = loaded_context(&bridge).await;
    let _monitor = context.start_progress_monitor();

    let _job = start_job(&context);
    sleep(Duration::from_secs(1)).await;

    let queries = bridge.call_count(Operation::ProgressInfo);
    assert_eq!(bridge.max_progress_in_flight(), 1);
    // Missed ticks are skipped, not replayed in a burst
    assert!((10..=25).contains(&queries), "unexpected query count {}", queries);
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_mid_poll_stops_everything() {
    let bridge = ScriptedBridge::new();
    bridge.hold_jobs();
    bridge.set_progress_delay(Duration::from_millis(100));
    bridge.set_progress(Some(progress(20.0)));
    let context = loaded_context(&bridge).await;
    let monitor = context.start_progress_monitor();
    let view_rx = monitor.subscribe_view();

    let _job = start_job(&context);
    settle().await;
    assert_eq!(bridge.call_count(Operation::ProgressInfo), 1);
    let before = monitor.view();

    monitor.shutdown();
    sleep(Duration::from_secs(5)).await;

    assert_eq!(bridge.call_count(Operation::ProgressInfo), 1);
    assert_eq!(*view_rx.borrow(), before);
    assert!(view_rx.has_changed().is_err(), "monitor task must be gone");
}

#[tokio::test(start_paused = true)]
async fn test_drop_cancels_pending_hide() {
    let bridge = ScriptedBridge::new();
    bridge.hold_jobs();
    bridge.set_progress(Some(progress(100.0)));
    let context = loaded_context(&bridge).await;
    let monitor = context.start_progress_monitor();
    let view_rx = monitor.subscribe_view();

    let _job = start_job(&context);
    sleep(Duration::from_millis(50)).await;
    assert!(monitor.view().hide_pending);

    let queries = bridge.call_count(Operation::ProgressInfo);
    drop(monitor);
    sleep(GRACE * 2).await;

    let view = view_rx.borrow().clone();
    assert!(view.visible, "hide timer must not fire after teardown");
    assert!(view.hide_pending);
    assert_eq!(bridge.call_count(Operation::ProgressInfo), queries);
}
