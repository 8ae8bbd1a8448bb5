use crate::models::CoreConfig;
use ::config::{Config, Environment, File, FileFormat};
use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use std::fs;

/// Prefix of environment variables that override `core.yaml`
/// (e.g. `ADD_LOGO_PROCESSOR_POLL_RATE_HZ=30`)
pub const ENV_PREFIX: &str = "ADD_LOGO_PROCESSOR";

/// Configuration manager for the client core's own settings.
///
/// Manages one file, `core.yaml`, holding [`CoreConfig`]. Values are layered:
/// built-in defaults, then the file, then `ADD_LOGO_PROCESSOR_*` environment
/// variables. The media settings themselves are not stored here; they belong
/// to the backend and reach the client through the settings store.
#[derive(Debug, Clone)]
pub struct ConfigManager {
    config_dir: Utf8PathBuf,
    core_config_path: Utf8PathBuf,
}

impl ConfigManager {
    /// Create a new ConfigManager with the specified configuration directory.
    ///
    /// # Arguments
    /// * `config_dir` - Directory containing `core.yaml` (created if missing)
    pub fn new<P: AsRef<Utf8Path>>(config_dir: P) -> Result<Self> {
        let config_dir = config_dir.as_ref().to_path_buf();

        if !config_dir.exists() {
            fs::create_dir_all(&config_dir)
                .with_context(|| format!("Failed to create config directory: {}", config_dir))?;
        }

        Ok(Self {
            core_config_path: config_dir.join("core.yaml"),
            config_dir,
        })
    }

    /// Load the core configuration, with environment overrides applied.
    ///
    /// # Returns
    /// The layered CoreConfig; defaults if neither the file nor any
    /// environment variable is present
    pub fn load_core_config(&self) -> Result<CoreConfig> {
        self.load_core_config_with(Environment::with_prefix(ENV_PREFIX))
    }

    fn load_core_config_with(&self, environment: Environment) -> Result<CoreConfig> {
        if !self.core_config_path.exists() {
            tracing::warn!(
                "Core config file not found at {}, using defaults",
                self.core_config_path
            );
        }

        let config: CoreConfig = Config::builder()
            .add_source(
                File::new(self.core_config_path.as_str(), FileFormat::Yaml).required(false),
            )
            .add_source(environment.try_parsing(true))
            .build()
            .with_context(|| format!("Failed to read core config: {}", self.core_config_path))?
            .try_deserialize()
            .with_context(|| format!("Failed to parse core config: {}", self.core_config_path))?;

        tracing::info!(
            "Loaded core config (poll rate {} Hz, grace period {:?})",
            config.poll_rate_hz,
            config.hide_grace_period()
        );
        Ok(config)
    }

    /// Save the core configuration file.
    ///
    /// # Arguments
    /// * `config` - The CoreConfig to save
    pub fn save_core_config(&self, config: &CoreConfig) -> Result<()> {
        let yaml_string =
            serde_yaml_ng::to_string(config).context("Failed to serialize core config to YAML")?;

        fs::write(&self.core_config_path, yaml_string)
            .with_context(|| format!("Failed to write core config: {}", self.core_config_path))?;

        tracing::info!("Saved core config to {}", self.core_config_path);
        Ok(())
    }

    /// Get the configuration directory path.
    pub fn config_dir(&self) -> &Utf8Path {
        &self.config_dir
    }

    pub fn core_config_path(&self) -> &Utf8Path {
        &self.core_config_path
    }
}
