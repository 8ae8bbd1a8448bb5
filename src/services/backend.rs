use crate::models::{Configuration, ImageSettings, ProgressInfo, VideoSettings};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use thiserror::Error;

/// Backend operations reachable through the bridge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    LoadConfig,
    SupportedImageFormats,
    SupportedVideoFormats,
    SupportedVideoCodecs,
    ProcessImages,
    ProcessVideos,
    CancelProcess,
    ProgressInfo,
    OpenConfigFolder,
    OpenLogFolder,
}

impl Operation {
    /// Name the backend registers the operation under
    pub fn name(self) -> &'static str {
        match self {
            Operation::LoadConfig => "load_config",
            Operation::SupportedImageFormats => "get_supported_image_formats",
            Operation::SupportedVideoFormats => "get_supported_video_formats",
            Operation::SupportedVideoCodecs => "get_supported_video_codecs",
            Operation::ProcessImages => "process_images",
            Operation::ProcessVideos => "process_videos",
            Operation::CancelProcess => "cancel_process",
            Operation::ProgressInfo => "get_progress_info",
            Operation::OpenConfigFolder => "open_config_folder",
            Operation::OpenLogFolder => "open_log_folder",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Failure reported by the bridge itself
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BridgeError {
    #[error("backend rejected {operation}: {message}")]
    Rejected {
        operation: &'static str,
        message: String,
    },

    #[error("bridge transport failure: {0}")]
    Transport(String),
}

/// Asynchronous call-and-await channel to the processing backend.
///
/// The core never looks past this trait: whatever hosts the core (a webview
/// shell, an IPC pipe, an in-process service) implements `call` and the
/// typed [`BackendClient`] does the rest.
pub trait RpcBridge: Send + Sync + 'static {
    fn call(
        &self,
        operation: Operation,
        payload: Value,
    ) -> impl Future<Output = Result<Value, BridgeError>> + Send;
}

/// Errors from a typed backend call
#[derive(Error, Debug)]
pub enum BackendError {
    #[error(transparent)]
    Bridge(#[from] BridgeError),

    #[error("failed to encode payload for {operation}: {source}")]
    Encode {
        operation: Operation,
        #[source]
        source: serde_json::Error,
    },

    #[error("unexpected response to {operation}: {source}")]
    Decode {
        operation: Operation,
        #[source]
        source: serde_json::Error,
    },
}

/// Typed wrapper over an [`RpcBridge`]
pub struct BackendClient<B> {
    bridge: Arc<B>,
}

impl<B> Clone for BackendClient<B> {
    fn clone(&self) -> Self {
        Self {
            bridge: Arc::clone(&self.bridge),
        }
    }
}

impl<B: RpcBridge> BackendClient<B> {
    pub fn new(bridge: Arc<B>) -> Self {
        Self { bridge }
    }

    pub fn bridge(&self) -> &Arc<B> {
        &self.bridge
    }

    async fn invoke(&self, operation: Operation, payload: Value) -> Result<Value, BackendError> {
        tracing::debug!("Calling backend operation {}", operation);
        Ok(self.bridge.call(operation, payload).await?)
    }

    async fn invoke_decoded<T: DeserializeOwned>(
        &self,
        operation: Operation,
    ) -> Result<T, BackendError> {
        let value = self.invoke(operation, Value::Null).await?;
        serde_json::from_value(value).map_err(|source| BackendError::Decode { operation, source })
    }

    /// Fetch the persisted configuration, migrating older shapes
    pub async fn load_configuration(&self) -> Result<Configuration, BackendError> {
        let operation = Operation::LoadConfig;
        let value = self.invoke(operation, Value::Null).await?;
        Configuration::from_value_lenient(value)
            .map_err(|source| BackendError::Decode { operation, source })
    }

    pub async fn image_formats(&self) -> Result<Vec<String>, BackendError> {
        self.invoke_decoded(Operation::SupportedImageFormats).await
    }

    pub async fn video_formats(&self) -> Result<Vec<String>, BackendError> {
        self.invoke_decoded(Operation::SupportedVideoFormats).await
    }

    pub async fn video_codecs(&self) -> Result<Vec<String>, BackendError> {
        self.invoke_decoded(Operation::SupportedVideoCodecs).await
    }

    /// Start an image job; resolves when the backend finishes or rejects it
    pub async fn start_image_job(&self, settings: &ImageSettings) -> Result<(), BackendError> {
        let operation = Operation::ProcessImages;
        let settings = serde_json::to_value(settings)
            .map_err(|source| BackendError::Encode { operation, source })?;
        self.invoke(operation, json!({ "imageSettings": settings }))
            .await
            .map(drop)
    }

    /// Start a video job; resolves when the backend finishes or rejects it
    pub async fn start_video_job(&self, settings: &VideoSettings) -> Result<(), BackendError> {
        let operation = Operation::ProcessVideos;
        let settings = serde_json::to_value(settings)
            .map_err(|source| BackendError::Encode { operation, source })?;
        self.invoke(operation, json!({ "videoSettings": settings }))
            .await
            .map(drop)
    }

    pub async fn cancel_job(&self) -> Result<(), BackendError> {
        self.invoke(Operation::CancelProcess, Value::Null)
            .await
            .map(drop)
    }

    /// Current job progress, `None` when the backend has nothing to report
    pub async fn query_progress(&self) -> Result<Option<ProgressInfo>, BackendError> {
        self.invoke_decoded(Operation::ProgressInfo).await
    }

    pub async fn reveal_config_location(&self) -> Result<(), BackendError> {
        self.invoke(Operation::OpenConfigFolder, Value::Null)
            .await
            .map(drop)
    }

    pub async fn reveal_log_location(&self) -> Result<(), BackendError> {
        self.invoke(Operation::OpenLogFolder, Value::Null)
            .await
            .map(drop)
    }
}
