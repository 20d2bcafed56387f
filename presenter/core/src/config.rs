//! TOML Configuration File Support
//!
//! Configuration is loaded from `$XDG_CONFIG_HOME/presenter/presenter.toml`
//! (typically `~/.config/presenter/presenter.toml`).
//!
//! # Configuration Priority
//!
//! Highest first:
//! 1. CLI arguments (applied by the binary through [`ConfigOverrides`])
//! 2. Environment variables (`PRESENTER_*`)
//! 3. TOML configuration file
//! 4. Default values
//!
//! # Example Configuration
//!
//! ```toml
//! [display]
//! swap_delay_ms = 300
//! repeat = false
//! background = "/srv/show/background.png"
//!
//! [staging]
//! auto_advance = true
//! preview_audio = "muted"
//!
//! [bridge]
//! capacity = 256
//!
//! [resolver]
//! file_server_port = 4312
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::bridge::BridgeConfig;
use crate::display::DisplayConfig;
use crate::locator::{FileServerResolver, FileUrlResolver, LocatorResolver};
use crate::staging::{PreviewAudioPolicy, StagingConfig};

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur when loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read config file
    #[error("Failed to read config file at {path}: {source}")]
    ReadError {
        /// The path that was attempted
        path: PathBuf,
        /// The underlying IO error
        source: std::io::Error,
    },

    /// Failed to parse TOML
    #[error("Failed to parse TOML config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Invalid configuration value
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Tracks where the configuration came from
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigSource {
    /// Command-line argument
    Cli,
    /// Environment variable
    Env,
    /// TOML configuration file
    File,
    /// Default value
    Default,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cli => write!(f, "CLI"),
            Self::Env => write!(f, "environment"),
            Self::File => write!(f, "config file"),
            Self::Default => write!(f, "default"),
        }
    }
}

// =============================================================================
// TOML Configuration Structures
// =============================================================================

/// `[display]` section
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayToml {
    /// Crossfade / teardown delay in milliseconds
    pub swap_delay_ms: Option<u64>,
    /// Repeat at start-up
    pub repeat: Option<bool>,
    /// Background image locator
    pub background: Option<String>,
}

/// `[staging]` section
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StagingToml {
    /// Push automatically on `ended`
    pub auto_advance: Option<bool>,
    /// `muted` or `audible`
    pub preview_audio: Option<PreviewAudioPolicy>,
}

/// `[bridge]` section
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeToml {
    /// Per-direction queue capacity
    pub capacity: Option<usize>,
}

/// `[resolver]` section
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverToml {
    /// Loopback file-server port; absent means `file://` URLs
    pub file_server_port: Option<u16>,
}

/// Top-level TOML configuration structure
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PresenterToml {
    /// Display section
    pub display: DisplayToml,
    /// Staging section
    pub staging: StagingToml,
    /// Bridge section
    pub bridge: BridgeToml,
    /// Resolver section
    pub resolver: ResolverToml,
}

// =============================================================================
// Main Configuration Struct
// =============================================================================

/// Assembled configuration for both surfaces and the relay
#[derive(Clone, Debug)]
pub struct PresenterConfig {
    /// Display engine settings
    pub display: DisplayConfig,
    /// Staging settings
    pub staging: StagingConfig,
    /// Bridge settings
    pub bridge: BridgeConfig,
    /// File-server port; `None` selects `file://` URLs
    pub file_server_port: Option<u16>,
    /// Path to the config file that was loaded (if any)
    pub config_file_path: Option<PathBuf>,
    source: ConfigSource,
}

impl Default for PresenterConfig {
    fn default() -> Self {
        Self {
            display: DisplayConfig::default(),
            staging: StagingConfig::default(),
            bridge: BridgeConfig::default(),
            file_server_port: None,
            config_file_path: None,
            source: ConfigSource::Default,
        }
    }
}

impl PresenterConfig {
    /// Where the highest-priority value came from
    #[must_use]
    pub fn source(&self) -> ConfigSource {
        self.source
    }

    /// Reject values the system cannot run with
    ///
    /// # Errors
    ///
    /// [`ConfigError::ValidationError`] describing the first bad value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.bridge.capacity == 0 {
            return Err(ConfigError::ValidationError(
                "bridge.capacity must be at least 1".to_string(),
            ));
        }
        if self.file_server_port == Some(0) {
            return Err(ConfigError::ValidationError(
                "resolver.file_server_port must not be 0".to_string(),
            ));
        }
        if self
            .display
            .background
            .as_deref()
            .is_some_and(|b| b.trim().is_empty())
        {
            return Err(ConfigError::ValidationError(
                "display.background must not be blank".to_string(),
            ));
        }
        Ok(())
    }

    /// Locator resolver matching the `[resolver]` settings
    #[must_use]
    pub fn resolver(&self) -> Arc<dyn LocatorResolver> {
        match self.file_server_port {
            Some(port) => Arc::new(FileServerResolver::new(port)),
            None => Arc::new(FileUrlResolver),
        }
    }
}

// =============================================================================
// Configuration Loading
// =============================================================================

/// Default configuration file path
///
/// `$XDG_CONFIG_HOME/presenter/presenter.toml`, or the platform equivalent.
#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("presenter").join("presenter.toml"))
}

/// Load configuration from the default path plus environment
///
/// # Errors
///
/// Returns an error if the config file exists but cannot be read or parsed.
/// A missing config file is not an error.
pub fn load_config() -> Result<PresenterConfig, ConfigError> {
    load_config_from_path(default_config_path())
}

/// Load configuration from a specific path plus environment
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed.
pub fn load_config_from_path(path: Option<PathBuf>) -> Result<PresenterConfig, ConfigError> {
    let mut config = PresenterConfig::default();

    if let Some(ref config_path) = path {
        if config_path.exists() {
            let toml_content =
                std::fs::read_to_string(config_path).map_err(|e| ConfigError::ReadError {
                    path: config_path.clone(),
                    source: e,
                })?;

            let toml_config: PresenterToml = toml::from_str(&toml_content)?;
            apply_toml_config(&mut config, &toml_config);
            config.config_file_path = Some(config_path.clone());
            config.source = ConfigSource::File;

            tracing::info!(path = %config_path.display(), "Loaded configuration from file");
        } else {
            tracing::debug!(
                path = %config_path.display(),
                "Config file not found, using defaults"
            );
        }
    }

    apply_env_config(&mut config);
    Ok(config)
}

fn apply_toml_config(config: &mut PresenterConfig, toml: &PresenterToml) {
    if let Some(delay) = toml.display.swap_delay_ms {
        config.display.swap_delay_ms = delay;
    }
    if let Some(repeat) = toml.display.repeat {
        config.display.repeat = repeat;
    }
    if toml.display.background.is_some() {
        config.display.background.clone_from(&toml.display.background);
    }

    if let Some(auto) = toml.staging.auto_advance {
        config.staging.auto_advance = auto;
    }
    if let Some(policy) = toml.staging.preview_audio {
        config.staging.preview_audio = policy;
    }

    if let Some(capacity) = toml.bridge.capacity {
        config.bridge.capacity = capacity;
    }

    if toml.resolver.file_server_port.is_some() {
        config.file_server_port = toml.resolver.file_server_port;
    }
}

fn apply_env_config(config: &mut PresenterConfig) {
    apply_env_from(config, |key| std::env::var(key).ok());
}

fn parse_flag(value: &str) -> bool {
    value != "0" && !value.eq_ignore_ascii_case("false") && !value.eq_ignore_ascii_case("off")
}

/// Apply `PRESENTER_*` overrides read through `lookup`
fn apply_env_from(config: &mut PresenterConfig, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(delay) = lookup("PRESENTER_SWAP_DELAY_MS").and_then(|v| v.parse::<u64>().ok()) {
        config.display.swap_delay_ms = delay;
        config.source = ConfigSource::Env;
    }
    if let Some(repeat) = lookup("PRESENTER_REPEAT") {
        config.display.repeat = parse_flag(&repeat);
        config.source = ConfigSource::Env;
    }
    if let Some(background) = lookup("PRESENTER_BACKGROUND") {
        config.display.background = Some(background).filter(|b| !b.is_empty());
        config.source = ConfigSource::Env;
    }
    if let Some(auto) = lookup("PRESENTER_AUTO_ADVANCE") {
        config.staging.auto_advance = parse_flag(&auto);
        config.source = ConfigSource::Env;
    }
    match lookup("PRESENTER_PREVIEW_AUDIO").as_deref() {
        Some("muted") => {
            config.staging.preview_audio = PreviewAudioPolicy::Muted;
            config.source = ConfigSource::Env;
        }
        Some("audible") => {
            config.staging.preview_audio = PreviewAudioPolicy::Audible;
            config.source = ConfigSource::Env;
        }
        Some(other) => tracing::warn!(value = other, "Ignoring PRESENTER_PREVIEW_AUDIO"),
        None => {}
    }
    if let Some(capacity) = lookup("PRESENTER_BRIDGE_CAPACITY").and_then(|v| v.parse::<usize>().ok()) {
        config.bridge.capacity = capacity;
        config.source = ConfigSource::Env;
    }
    if let Some(port) = lookup("PRESENTER_FILE_SERVER_PORT").and_then(|v| v.parse::<u16>().ok()) {
        config.file_server_port = Some(port);
        config.source = ConfigSource::Env;
    }
}

// =============================================================================
// CLI Override Support
// =============================================================================

/// Command-line overrides, applied after [`load_config`]
#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    /// Swap delay override
    pub swap_delay_ms: Option<u64>,
    /// Repeat override
    pub repeat: Option<bool>,
    /// Background override
    pub background: Option<String>,
    /// Auto-advance override
    pub auto_advance: Option<bool>,
    /// File-server port override
    pub file_server_port: Option<u16>,
}

impl ConfigOverrides {
    /// Apply overrides to a configuration
    pub fn apply(&self, config: &mut PresenterConfig) {
        if self.swap_delay_ms.is_some()
            || self.repeat.is_some()
            || self.background.is_some()
            || self.auto_advance.is_some()
            || self.file_server_port.is_some()
        {
            config.source = ConfigSource::Cli;
        }

        if let Some(delay) = self.swap_delay_ms {
            config.display.swap_delay_ms = delay;
        }
        if let Some(repeat) = self.repeat {
            config.display.repeat = repeat;
        }
        if let Some(ref background) = self.background {
            config.display.background = Some(background.clone());
        }
        if let Some(auto) = self.auto_advance {
            config.staging.auto_advance = auto;
        }
        if let Some(port) = self.file_server_port {
            config.file_server_port = Some(port);
        }
    }
}
