//! Shared test helpers: an in-memory backend with scripted responses
#![allow(dead_code)]

use add_logo_processor_core::ProgressInfo;
use add_logo_processor_core::models::{Configuration, VideoSettings};
use add_logo_processor_core::services::{BridgeError, Operation, RpcBridge};
use serde_json::{Value, json};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;

/// Holds job-start calls open until released, so `processing` stays true
#[derive(Default)]
pub struct Gate {
    held: AtomicBool,
    notify: Notify,
}

impl Gate {
    async fn pass(&self) {
        if self.held.load(Ordering::SeqCst) {
            self.notify.notified().await;
        }
    }
}

/// Backend stand-in whose every response can be changed mid-test
#[derive(Default)]
pub struct ScriptedBridge {
    configuration: Mutex<Value>,
    image_formats: Mutex<Vec<String>>,
    video_formats: Mutex<Vec<String>>,
    video_codecs: Mutex<Vec<String>>,
    progress: Mutex<Option<ProgressInfo>>,
    progress_delay: Mutex<Option<Duration>>,
    failing: Mutex<HashSet<Operation>>,
    calls: Mutex<Vec<(Operation, Value)>>,
    progress_in_flight: AtomicUsize,
    max_progress_in_flight: AtomicUsize,
    pub image_gate: Gate,
    pub video_gate: Gate,
}

impl ScriptedBridge {
    pub fn new() -> Arc<Self> {
        let bridge = Self::default();
        *bridge.configuration.lock().unwrap() =
            serde_json::to_value(Configuration::default()).unwrap();
        *bridge.image_formats.lock().unwrap() = strings(&["png", "jpg", "webp"]);
        *bridge.video_formats.lock().unwrap() = strings(&["mp4", "mkv", "mov", "webm"]);
        *bridge.video_codecs.lock().unwrap() = strings(&["h264", "hevc", "vp9", "av1"]);
        Arc::new(bridge)
    }

    pub fn set_configuration(&self, configuration: Value) {
        *self.configuration.lock().unwrap() = configuration;
    }

    pub fn set_video_settings(&self, video: &VideoSettings) {
        let mut configuration = self.configuration.lock().unwrap();
        configuration["videoSettings"] = serde_json::to_value(video).unwrap();
    }

    pub fn set_progress(&self, progress: Option<ProgressInfo>) {
        *self.progress.lock().unwrap() = progress;
    }

    /// Make every progress query take `delay` before answering
    pub fn set_progress_delay(&self, delay: Duration) {
        *self.progress_delay.lock().unwrap() = Some(delay);
    }

    pub fn fail(&self, operation: Operation) {
        self.failing.lock().unwrap().insert(operation);
    }

    pub fn recover(&self, operation: Operation) {
        self.failing.lock().unwrap().remove(&operation);
    }

    pub fn hold_jobs(&self) {
        self.image_gate.held.store(true, Ordering::SeqCst);
        self.video_gate.held.store(true, Ordering::SeqCst);
    }

    pub fn release_images(&self) {
        self.image_gate.notify.notify_one();
    }

    pub fn release_videos(&self) {
        self.video_gate.notify.notify_one();
    }

    pub fn call_count(&self, operation: Operation) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(op, _)| *op == operation)
            .count()
    }

    /// Payloads sent for `operation`, oldest first
    pub fn payloads(&self, operation: Operation) -> Vec<Value> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(op, _)| *op == operation)
            .map(|(_, payload)| payload.clone())
            .collect()
    }

    /// Most progress queries that were ever outstanding at once
    pub fn max_progress_in_flight(&self) -> usize {
        self.max_progress_in_flight.load(Ordering::SeqCst)
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

impl RpcBridge for ScriptedBridge {
    async fn call(&self, operation: Operation, payload: Value) -> Result<Value, BridgeError> {
        self.calls.lock().unwrap().push((operation, payload));

        match operation {
            Operation::ProcessImages => self.image_gate.pass().await,
            Operation::ProcessVideos => self.video_gate.pass().await,
            Operation::ProgressInfo => {
                let in_flight = self.progress_in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                self.max_progress_in_flight.fetch_max(in_flight, Ordering::SeqCst);

                let delay = *self.progress_delay.lock().unwrap();
                if let Some(delay) = delay {
                    tokio::time::sleep(delay).await;
                }
                self.progress_in_flight.fetch_sub(1, Ordering::SeqCst);
            }
            _ => {}
        }

        if self.failing.lock().unwrap().contains(&operation) {
            return Err(BridgeError::Rejected {
                operation: operation.name(),
                message: "scripted failure".to_string(),
            });
        }

        let response = match operation {
            Operation::LoadConfig => self.configuration.lock().unwrap().clone(),
            Operation::SupportedImageFormats => json!(*self.image_formats.lock().unwrap()),
            Operation::SupportedVideoFormats => json!(*self.video_formats.lock().unwrap()),
            Operation::SupportedVideoCodecs => json!(*self.video_codecs.lock().unwrap()),
            Operation::ProgressInfo => match &*self.progress.lock().unwrap() {
                Some(info) => serde_json::to_value(info).unwrap(),
                None => Value::Null,
            },
            _ => Value::Null,
        };
        Ok(response)
    }
}

pub fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

/// Snapshot at `percentage`, with counts that do not have to agree with it
pub fn progress(percentage: f64) -> ProgressInfo {
    ProgressInfo::new("Processing", percentage as u64, 100, percentage)
}

/// Let spawned tasks run; time is paused in these tests, so this is instant
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(1)).await;
}
