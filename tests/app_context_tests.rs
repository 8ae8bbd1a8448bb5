//! End-to-end tests through AppContext: edit, submit, watch progress

mod common;

use add_logo_processor_core::services::{BackendError, Operation};
use add_logo_processor_core::ui::{MonitorPhase, SettingsForm, VideoForm};
use add_logo_processor_core::{AppContext, CoreConfig, Metrics};
use common::{ScriptedBridge, progress, settle, strings};
use std::sync::Arc;
use tokio::time::{Duration, sleep};

#[tokio::test]
async fn test_reveal_locations_call_backend() {
    let bridge = ScriptedBridge::new();
    let context = AppContext::new(Arc::clone(&bridge), &CoreConfig::default());

    context.reveal_config_location().await.unwrap();
    context.reveal_log_location().await.unwrap();

    assert_eq!(bridge.call_count(Operation::OpenConfigFolder), 1);
    assert_eq!(bridge.call_count(Operation::OpenLogFolder), 1);
}

#[tokio::test]
async fn test_reveal_failure_is_reported_not_fatal() {
    let bridge = ScriptedBridge::new();
    bridge.fail(Operation::OpenLogFolder);
    let context = AppContext::new(Arc::clone(&bridge), &CoreConfig::default());

    let err = context.reveal_log_location().await.unwrap_err();

    assert!(matches!(err, BackendError::Bridge(_)));
    assert!(context.reveal_config_location().await.is_ok());
}

#[tokio::test(start_paused = true)]
async fn test_edit_submit_and_watch_video_job() {
    let bridge = ScriptedBridge::new();
    bridge.hold_jobs();
    let context = AppContext::new(Arc::clone(&bridge), &CoreConfig::default());

    let form = SettingsForm::new(VideoForm::default());
    let _sync = context.attach_video_form(form.clone());
    let monitor = context.start_progress_monitor();
    context.load().await.unwrap();
    settle().await;

    form.edit(|f| {
        f.should_convert_format = true;
        f.format = "webm".to_string();
    });
    context.toggle_video_codec_favorite("av1");
    settle().await;

    let jobs = context.jobs().clone();
    let snapshot = form.snapshot();
    let job = tokio::spawn(async move { jobs.submit_videos(snapshot).await });

    bridge.set_progress(Some(progress(60.0)));
    sleep(Duration::from_millis(100)).await;
    assert!(context.is_processing());
    assert_eq!(monitor.view().phase, MonitorPhase::Polling);
    assert_eq!(monitor.view().snapshot.unwrap().percentage, 60.0);

    bridge.set_progress(Some(progress(100.0)));
    bridge.release_videos();
    job.await.unwrap().unwrap();
    sleep(Duration::from_secs(3)).await;

    assert!(!context.is_processing());
    assert_eq!(monitor.view().phase, MonitorPhase::Hidden);

    let sent = &bridge.payloads(Operation::ProcessVideos)[0]["videoSettings"];
    assert_eq!(sent["format"], "webm");
    assert_eq!(
        sent["codecFavoriteList"],
        serde_json::to_value(strings(&["h264", "hevc", "vp9", "av1"])).unwrap()
    );

    let metrics = context.metrics();
    assert_eq!(Metrics::get(&metrics.jobs_submitted), 1);
    assert!(Metrics::get(&metrics.snapshots_received) > 0);
    metrics.log_summary();
}
