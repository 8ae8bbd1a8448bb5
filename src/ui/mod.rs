// UI module - View-facing side of the synchronization core
//
// This module contains:
// - SettingsForm / VideoForm: live form values with field-level change notification
// - FormSync: one-shot seeding and form → store sync
// - ProgressMonitor: progress polling and delayed-hide state machine
// - AppContext: context object that views receive and attach to

pub mod controller;
pub mod form;
pub mod form_sync;
pub mod progress;

pub use controller::AppContext;
pub use form::{FormModel, SettingsForm, VideoForm};
pub use form_sync::FormSync;
pub use progress::{
    MonitorConfig, MonitorPhase, ProgressEvent, ProgressMachine, ProgressMonitor, ProgressView,
};
