use crate::metrics::Metrics;
use crate::models::{ImageSettings, VideoSettings};
use crate::services::backend::{BackendClient, BackendError, RpcBridge};
use crate::services::validation::{SettingsValidator, ValidationErrors};
use crate::state::SettingsStore;
use crate::ui::form::{FormModel, VideoForm};
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;
use tokio::sync::watch;

/// Kind of bulk job
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobKind {
    Image,
    Video,
}

/// Errors returned from job submission and cancellation
#[derive(Error, Debug)]
pub enum JobError {
    #[error(transparent)]
    Invalid(#[from] ValidationErrors),

    #[error("a job is already being processed")]
    AlreadyProcessing,

    #[error("settings have not been loaded yet")]
    NotInitialized,

    #[error("{kind:?} job submission rejected: {source}")]
    SubmissionRejected {
        kind: JobKind,
        #[source]
        source: BackendError,
    },

    #[error("cancellation ignored by backend: {0}")]
    CancellationIgnored(#[source] BackendError),
}

/// Submits jobs to the backend and owns the local `processing` flag.
///
/// # Processing flag
///
/// The flag goes up right before the backend start call and comes down on
/// every exit path: success, rejection, or the submit future being dropped.
/// [`cancel()`](Self::cancel) lowers it immediately without waiting for the
/// backend. Each submission carries a generation number so that a stale
/// submission finishing late never lowers the flag of a newer one.
pub struct JobController<B> {
    backend: BackendClient<B>,
    store: SettingsStore,
    validator: Arc<dyn SettingsValidator>,
    metrics: Arc<Metrics>,
    processing: Arc<watch::Sender<bool>>,
    generation: Arc<AtomicU64>,
}

impl<B> Clone for JobController<B> {
    fn clone(&self) -> Self {
        Self {
            backend: self.backend.clone(),
            store: self.store.clone(),
            validator: Arc::clone(&self.validator),
            metrics: Arc::clone(&self.metrics),
            processing: Arc::clone(&self.processing),
            generation: Arc::clone(&self.generation),
        }
    }
}

/// Lowers the processing flag when dropped, unless a newer job owns it
struct ProcessingGuard {
    processing: Arc<watch::Sender<bool>>,
    generation: Arc<AtomicU64>,
    owned: u64,
}

impl Drop for ProcessingGuard {
    fn drop(&mut self) {
        if self.generation.load(Ordering::SeqCst) == self.owned {
            self.processing.send_replace(false);
        }
    }
}

impl<B: RpcBridge> JobController<B> {
    pub fn new(
        backend: BackendClient<B>,
        store: SettingsStore,
        validator: Arc<dyn SettingsValidator>,
        metrics: Arc<Metrics>,
    ) -> Self {
        let (processing, _) = watch::channel(false);
        Self {
            backend,
            store,
            validator,
            metrics,
            processing: Arc::new(processing),
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn is_processing(&self) -> bool {
        *self.processing.borrow()
    }

    /// Receiver that observes the processing flag
    pub fn subscribe_processing(&self) -> watch::Receiver<bool> {
        self.processing.subscribe()
    }

    /// Raise the processing flag, failing if it is already up
    fn begin(&self) -> Result<ProcessingGuard, JobError> {
        let raised = self.processing.send_if_modified(|processing| {
            if *processing {
                false
            } else {
                *processing = true;
                true
            }
        });

        if !raised {
            return Err(JobError::AlreadyProcessing);
        }

        let owned = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(ProcessingGuard {
            processing: Arc::clone(&self.processing),
            generation: Arc::clone(&self.generation),
            owned,
        })
    }

    fn invalid(&self, kind: JobKind, errors: ValidationErrors) -> JobError {
        tracing::warn!("{:?} job not submitted, {}", kind, errors);
        self.metrics.record_job_invalid();
        JobError::Invalid(errors)
    }

    fn rejected(&self, kind: JobKind, source: BackendError) -> JobError {
        tracing::error!("{:?} job rejected by backend: {}", kind, source);
        self.metrics.record_job_rejected();
        JobError::SubmissionRejected { kind, source }
    }

    /// Submit an image job with the form values as-is.
    ///
    /// Resolves when the backend finishes the job or rejects it.
    pub async fn submit_images(&self, form: ImageSettings) -> Result<(), JobError> {
        let kind = JobKind::Image;
        let settings = form.into_settings(None);

        self.validator
            .validate_image(&settings, &self.store.capabilities())
            .map_err(|e| self.invalid(kind, e))?;

        let _guard = self.begin()?;
        self.metrics.record_job_submitted();
        tracing::info!(
            "Submitting image job: {} -> {}",
            settings.input_directory,
            settings.output_directory
        );

        self.backend
            .start_image_job(&settings)
            .await
            .map_err(|e| self.rejected(kind, e))?;

        tracing::info!("Image job finished");
        Ok(())
    }

    /// Submit a video job.
    ///
    /// The form is merged over the store's last known video settings so the
    /// favorites lists, which the form does not carry, are sent unchanged.
    pub async fn submit_videos(&self, form: VideoForm) -> Result<(), JobError> {
        let kind = JobKind::Video;
        let base = self.store.video_settings().ok_or(JobError::NotInitialized)?;
        let settings: VideoSettings = form.into_settings(Some(&base));

        self.validator
            .validate_video(&settings, &self.store.capabilities())
            .map_err(|e| self.invalid(kind, e))?;

        let _guard = self.begin()?;
        self.metrics.record_job_submitted();
        tracing::info!(
            "Submitting video job: {} -> {} ({}/{})",
            settings.input_directory,
            settings.output_directory,
            settings.format,
            settings.codec
        );

        self.backend
            .start_video_job(&settings)
            .await
            .map_err(|e| self.rejected(kind, e))?;

        tracing::info!("Video job finished");
        Ok(())
    }

    /// Ask the backend to cancel the running job.
    ///
    /// The processing flag is lowered before this returns, not when the
    /// returned future completes; the backend's answer only affects logging.
    pub fn cancel(&self) -> impl Future<Output = Result<(), JobError>> + Send + use<B> {
        // Invalidate any in-flight guard so its drop leaves the flag alone
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.processing.send_replace(false);
        self.metrics.record_cancellation();
        tracing::info!("Cancellation requested, processing flag cleared");

        let backend = self.backend.clone();
        async move {
            backend.cancel_job().await.map_err(|e| {
                tracing::warn!("Backend did not accept cancellation: {}", e);
                JobError::CancellationIgnored(e)
            })
        }
    }
}
