// Add Logo Processor - client synchronization core
//
// This is the library crate containing the settings store, form sync, job
// submission and progress monitoring. The host application provides the RPC
// bridge to the processing backend and the views.

pub mod config;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod services;
pub mod state;
pub mod ui;

// Re-export commonly used types for convenience
pub use config::ConfigManager;
pub use metrics::Metrics;
pub use models::{Configuration, CoreConfig, ImageSettings, ProgressInfo, VideoSettings};
pub use services::{BackendClient, JobController, RpcBridge};
pub use state::{SettingsChange, SettingsStore};
pub use ui::AppContext;

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
