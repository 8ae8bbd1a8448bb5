// Settings store
//
// This module provides the SettingsStore which owns the in-memory copy of the
// persisted configuration behind Arc<RwLock<T>> and emits change events for views.

use crate::models::{Configuration, ImageSettings, SupportedCapabilities, VideoSettings};
use crate::models::toggle_favorite;
use crate::services::backend::{BackendClient, BackendError, RpcBridge};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use thiserror::Error;
use tokio::sync::{broadcast, watch};

/// Change events emitted when the store is modified
#[derive(Clone, Debug, PartialEq)]
pub enum SettingsChange {
    /// First successful load; emitted exactly once per store
    Initialized,

    /// A later explicit reload replaced the configuration
    Reloaded,

    /// A load attempt failed; the store kept its previous contents
    LoadFailed { message: String },

    ImageSettingsChanged,

    VideoSettingsChanged,
}

/// Errors raised while loading the store
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("backend unavailable ({failed} of 4 startup calls failed): {first}")]
    BackendUnavailable {
        failed: usize,
        #[source]
        first: BackendError,
    },
}

#[derive(Debug, Default)]
struct StoreState {
    configuration: Option<Configuration>,
    capabilities: SupportedCapabilities,
}

/// Owner of the persisted configuration for the life of the application.
///
/// - [`load()`](Self::load) fetches configuration and capability enumerations concurrently
/// - getters return clones and never block on the backend
/// - [`update_image_settings()`](Self::update_image_settings) /
///   [`update_video_settings()`](Self::update_video_settings) replace one half of the
///   aggregate wholesale; they never talk to the backend
/// - [`subscribe()`](Self::subscribe) delivers [`SettingsChange`] events
///
/// Cloning is cheap and every clone observes the same store, so views receive
/// a handle rather than reaching for global state.
pub struct SettingsStore {
    state: Arc<RwLock<StoreState>>,

    /// Flips to true after the first successful load and never back
    initialized: Arc<watch::Sender<bool>>,

    change_tx: broadcast::Sender<SettingsChange>,
}

impl SettingsStore {
    /// Create an uninitialized store with a broadcast buffer of 100 events
    pub fn new() -> Self {
        let (change_tx, _) = broadcast::channel(100);
        let (initialized, _) = watch::channel(false);
        Self {
            state: Arc::new(RwLock::new(StoreState::default())),
            initialized: Arc::new(initialized),
            change_tx,
        }
    }

    fn read_state(&self) -> RwLockReadGuard<'_, StoreState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, StoreState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn emit(&self, change: SettingsChange) {
        // Ignore send errors - it's OK if no one is listening
        let _ = self.change_tx.send(change);
    }

    /// Load configuration and capabilities from the backend.
    ///
    /// All four calls run concurrently. If any of them fails the whole load
    /// fails and the store keeps what it had; each failure is logged. Nothing
    /// retries on its own: a reload is always an explicit call.
    pub async fn load<B: RpcBridge>(
        &self,
        backend: &BackendClient<B>,
    ) -> Result<Configuration, StoreError> {
        tracing::info!("Loading configuration and capabilities from backend");

        let (configuration, image_formats, video_formats, video_codecs) = tokio::join!(
            backend.load_configuration(),
            backend.image_formats(),
            backend.video_formats(),
            backend.video_codecs(),
        );

        let mut failures = Vec::new();
        let configuration = keep_ok(configuration, "load configuration", &mut failures);
        let image_formats = keep_ok(image_formats, "enumerate image formats", &mut failures);
        let video_formats = keep_ok(video_formats, "enumerate video formats", &mut failures);
        let video_codecs = keep_ok(video_codecs, "enumerate video codecs", &mut failures);

        let (Some(configuration), Some(image_formats), Some(video_formats), Some(video_codecs)) =
            (configuration, image_formats, video_formats, video_codecs)
        else {
            let failed = failures.len();
            let first = failures.remove(0);
            tracing::error!(
                "Settings load failed ({} call(s) failed), store left as it was",
                failed
            );
            self.emit(SettingsChange::LoadFailed {
                message: first.to_string(),
            });
            return Err(StoreError::BackendUnavailable { failed, first });
        };

        {
            let mut state = self.write_state();
            state.configuration = Some(configuration.clone());
            state.capabilities = SupportedCapabilities {
                image_formats,
                video_formats,
                video_codecs,
            };
        }

        let first_load = self.initialized.send_if_modified(|initialized| {
            if *initialized {
                false
            } else {
                *initialized = true;
                true
            }
        });

        if first_load {
            tracing::info!("Settings store initialized");
            self.emit(SettingsChange::Initialized);
        } else {
            tracing::info!("Settings store reloaded");
            self.emit(SettingsChange::Reloaded);
        }

        Ok(configuration)
    }

    pub fn is_initialized(&self) -> bool {
        *self.initialized.borrow()
    }

    /// Receiver that observes the uninitialized → initialized transition
    pub fn subscribe_initialized(&self) -> watch::Receiver<bool> {
        self.initialized.subscribe()
    }

    /// Subscribe to change events
    pub fn subscribe(&self) -> broadcast::Receiver<SettingsChange> {
        self.change_tx.subscribe()
    }

    /// Current configuration, `None` until loaded
    pub fn configuration(&self) -> Option<Configuration> {
        self.read_state().configuration.clone()
    }

    pub fn image_settings(&self) -> Option<ImageSettings> {
        self.read_state()
            .configuration
            .as_ref()
            .map(|c| c.image_settings.clone())
    }

    pub fn video_settings(&self) -> Option<VideoSettings> {
        self.read_state()
            .configuration
            .as_ref()
            .map(|c| c.video_settings.clone())
    }

    /// Capability enumerations; empty until loaded
    pub fn capabilities(&self) -> SupportedCapabilities {
        self.read_state().capabilities.clone()
    }

    /// Replace the image settings. No-op before the first load.
    pub fn update_image_settings(&self, settings: ImageSettings) -> Vec<SettingsChange> {
        let changed = {
            let mut state = self.write_state();
            match state.configuration.as_mut() {
                Some(config) if config.image_settings != settings => {
                    config.image_settings = settings;
                    true
                }
                Some(_) => false,
                None => {
                    tracing::debug!("Ignoring image settings update before initialization");
                    false
                }
            }
        };

        self.changes(changed, SettingsChange::ImageSettingsChanged)
    }

    /// Replace the video settings. No-op before the first load.
    pub fn update_video_settings(&self, settings: VideoSettings) -> Vec<SettingsChange> {
        let changed = {
            let mut state = self.write_state();
            match state.configuration.as_mut() {
                Some(config) if config.video_settings != settings => {
                    config.video_settings = settings;
                    true
                }
                Some(_) => false,
                None => {
                    tracing::debug!("Ignoring video settings update before initialization");
                    false
                }
            }
        };

        self.changes(changed, SettingsChange::VideoSettingsChanged)
    }

    fn changes(&self, changed: bool, change: SettingsChange) -> Vec<SettingsChange> {
        if changed {
            self.emit(change.clone());
            vec![change]
        } else {
            Vec::new()
        }
    }

    /// Add or remove a video format from the favorites list
    pub fn toggle_video_format_favorite(&self, format: &str) -> Vec<SettingsChange> {
        let Some(mut settings) = self.video_settings() else {
            return Vec::new();
        };
        let added = toggle_favorite(&mut settings.format_favorite_list, format);
        tracing::debug!("Favorite format {} {}", format, if added { "added" } else { "removed" });
        self.update_video_settings(settings)
    }

    /// Add or remove a video codec from the favorites list
    pub fn toggle_video_codec_favorite(&self, codec: &str) -> Vec<SettingsChange> {
        let Some(mut settings) = self.video_settings() else {
            return Vec::new();
        };
        let added = toggle_favorite(&mut settings.codec_favorite_list, codec);
        tracing::debug!("Favorite codec {} {}", codec, if added { "added" } else { "removed" });
        self.update_video_settings(settings)
    }
}

fn keep_ok<T>(
    result: Result<T, BackendError>,
    what: &str,
    failures: &mut Vec<BackendError>,
) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::error!("Failed to {}: {}", what, e);
            failures.push(e);
            None
        }
    }
}

impl Default for SettingsStore {
    fn default() -> Self {
        Self::new()
    }
}

// Every clone shares the same state and channels
impl Clone for SettingsStore {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            initialized: Arc::clone(&self.initialized),
            change_tx: self.change_tx.clone(),
        }
    }
}
