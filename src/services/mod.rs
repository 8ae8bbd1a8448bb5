//! Services module - Backend access, validation and job submission.
//!
//! Everything here is framework-agnostic: no view code, only the logic that
//! talks to the processing backend through an opaque RPC bridge.
//!
//! # Components
//!
//! - [`RpcBridge`]: the transport capability the host provides. One method,
//!   `call(operation, payload)`, returning a JSON value.
//! - [`BackendClient`]: typed wrapper over the bridge. Encodes settings
//!   payloads and decodes configuration, capability lists and progress.
//! - [`SettingsValidator`]: the black-box check run before a job is submitted;
//!   [`SchemaValidator`] is the default implementation.
//! - [`JobController`]: submits image and video jobs, owns the `processing`
//!   flag and the cancellation path.
//!
//! # Usage Example
//!
//! ```ignore
//! use add_logo_processor_core::services::{BackendClient, JobController, SchemaValidator};
//!
//! let backend = BackendClient::new(Arc::new(bridge));
//! let jobs = JobController::new(backend, store, Arc::new(SchemaValidator), metrics);
//!
//! jobs.submit_images(form.snapshot()).await?;
//! ```

pub mod backend;
pub mod jobs;
pub mod validation;

pub use backend::{BackendClient, BackendError, BridgeError, Operation, RpcBridge};
pub use jobs::{JobController, JobError, JobKind};
pub use validation::{FieldError, SchemaValidator, SettingsValidator, ValidationErrors};
