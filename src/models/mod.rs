//! Data models for the synchronization core.
//!
//! - [`ImageSettings`] / [`VideoSettings`]: the two halves of the persisted [`Configuration`]
//! - [`SupportedCapabilities`]: format and codec enumerations, read-only after startup
//! - [`ProgressInfo`]: one poll's worth of backend job progress
//! - [`CoreConfig`]: tunables of the client core itself (poll rate, grace period, logging)
//!
//! Settings structs serialize in camelCase to match the backend's payloads.
//! Mutation of the loaded configuration goes through
//! [`SettingsStore`](crate::state::SettingsStore).

pub mod config;
pub mod progress;
pub mod settings;

pub use config::CoreConfig;
pub use progress::ProgressInfo;
pub use settings::{
    Configuration, Corner, ImageSettings, SupportedCapabilities, VideoSettings, toggle_favorite,
};
