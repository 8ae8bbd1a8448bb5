// Application context - Wires the synchronization core together
//
// This module contains the AppContext which owns one instance of:
// - BackendClient (typed calls over the RPC bridge)
// - SettingsStore (canonical configuration)
// - JobController (submission, cancellation, processing flag)
// - Metrics
//
// Views receive the context by reference and get scoped handles back
// (FormSync, ProgressMonitor) whose teardown is tied to the view.

use crate::metrics::Metrics;
use crate::models::{Configuration, CoreConfig, ImageSettings};
use crate::services::backend::{BackendClient, BackendError, RpcBridge};
use crate::services::jobs::{JobController, JobError};
use crate::services::validation::{SchemaValidator, SettingsValidator};
use crate::state::{SettingsChange, SettingsStore, StoreError};
use crate::ui::form::{SettingsForm, VideoForm};
use crate::ui::form_sync::FormSync;
use crate::ui::progress::{MonitorConfig, ProgressMonitor};
use std::future::Future;
use std::sync::Arc;

/// Explicit context object shared by every view
///
/// # Example
/// ```ignore
/// let context = AppContext::new(Arc::new(bridge), &core_config);
/// context.load().await?;
///
/// let form = SettingsForm::new(ImageSettings::default());
/// let _sync = context.attach_image_form(form.clone());
/// let _monitor = context.start_progress_monitor();
///
/// context.submit_images(form.snapshot()).await?;
/// ```
pub struct AppContext<B> {
    backend: BackendClient<B>,
    store: SettingsStore,
    jobs: JobController<B>,
    metrics: Arc<Metrics>,
    monitor_config: MonitorConfig,
}

impl<B: RpcBridge> AppContext<B> {
    /// Create a context using the default [`SchemaValidator`]
    pub fn new(bridge: Arc<B>, core_config: &CoreConfig) -> Self {
        Self::with_validator(bridge, core_config, Arc::new(SchemaValidator))
    }

    /// Create a context with a custom settings validator
    pub fn with_validator(
        bridge: Arc<B>,
        core_config: &CoreConfig,
        validator: Arc<dyn SettingsValidator>,
    ) -> Self {
        let backend = BackendClient::new(bridge);
        let store = SettingsStore::new();
        let metrics = Arc::new(Metrics::new());
        let jobs = JobController::new(
            backend.clone(),
            store.clone(),
            validator,
            Arc::clone(&metrics),
        );

        tracing::info!("Application context created");

        Self {
            backend,
            store,
            jobs,
            metrics,
            monitor_config: MonitorConfig::from(core_config),
        }
    }

    pub fn store(&self) -> &SettingsStore {
        &self.store
    }

    pub fn jobs(&self) -> &JobController<B> {
        &self.jobs
    }

    pub fn backend(&self) -> &BackendClient<B> {
        &self.backend
    }

    pub fn metrics(&self) -> &Arc<Metrics> {
        &self.metrics
    }

    pub fn monitor_config(&self) -> MonitorConfig {
        self.monitor_config
    }

    /// Load, or explicitly reload, configuration and capabilities
    pub async fn load(&self) -> Result<Configuration, StoreError> {
        self.store.load(&self.backend).await
    }

    /// Bind an image form to the store for the lifetime of the returned handle
    pub fn attach_image_form(&self, form: SettingsForm<ImageSettings>) -> FormSync {
        FormSync::attach(self.store.clone(), form, Arc::clone(&self.metrics), "image")
    }

    /// Bind a video form to the store for the lifetime of the returned handle
    pub fn attach_video_form(&self, form: SettingsForm<VideoForm>) -> FormSync {
        FormSync::attach(self.store.clone(), form, Arc::clone(&self.metrics), "video")
    }

    /// Start a progress monitor that follows this context's processing flag
    pub fn start_progress_monitor(&self) -> ProgressMonitor {
        ProgressMonitor::spawn(
            self.backend.clone(),
            self.jobs.subscribe_processing(),
            self.monitor_config,
            Arc::clone(&self.metrics),
        )
    }

    pub async fn submit_images(&self, form: ImageSettings) -> Result<(), JobError> {
        self.jobs.submit_images(form).await
    }

    pub async fn submit_videos(&self, form: VideoForm) -> Result<(), JobError> {
        self.jobs.submit_videos(form).await
    }

    /// Cancel the running job; the processing flag is already cleared when
    /// this returns
    pub fn cancel(&self) -> impl Future<Output = Result<(), JobError>> + Send + use<B> {
        self.jobs.cancel()
    }

    pub fn is_processing(&self) -> bool {
        self.jobs.is_processing()
    }

    pub fn toggle_video_format_favorite(&self, format: &str) -> Vec<SettingsChange> {
        self.store.toggle_video_format_favorite(format)
    }

    pub fn toggle_video_codec_favorite(&self, codec: &str) -> Vec<SettingsChange> {
        self.store.toggle_video_codec_favorite(codec)
    }

    /// Ask the backend to show where the configuration file lives
    pub async fn reveal_config_location(&self) -> Result<(), BackendError> {
        self.backend
            .reveal_config_location()
            .await
            .inspect_err(|e| tracing::warn!("Failed to reveal configuration location: {}", e))
    }

    /// Ask the backend to show where log files live
    pub async fn reveal_log_location(&self) -> Result<(), BackendError> {
        self.backend
            .reveal_log_location()
            .await
            .inspect_err(|e| tracing::warn!("Failed to reveal log location: {}", e))
    }
}
