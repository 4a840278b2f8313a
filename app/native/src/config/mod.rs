//! Configuration module for surface-portal.
//!
//! The configuration file supports JSONC format (JSON with comments).
//! Both single-line (`//`) and multi-line (`/* */`) comments are allowed.
//! Every field is optional; missing sections fall back to their defaults.

pub mod color;
pub mod types;

use std::path::PathBuf;
use std::sync::OnceLock;

pub use color::{Rgba, parse_hex_color};
pub use types::{
    ConfigError, DragRoutingConfig, GeometryConfig, HitTestConfig, LoggingConfig, OverlayConfig,
    PortalConfig, config_paths, load_config as load_config_default, load_config_from_path,
    parse_config,
};

/// Global configuration instance, loaded once on first access.
static CONFIG: OnceLock<PortalConfig> = OnceLock::new();

/// Path to the currently loaded configuration file.
static CONFIG_PATH: OnceLock<PathBuf> = OnceLock::new();

/// Custom config path override (set via CLI --config flag).
static CUSTOM_CONFIG_PATH: OnceLock<PathBuf> = OnceLock::new();

/// Sets a custom configuration file path to use instead of the default search paths.
///
/// This must be called before `get_config()` to take effect.
///
/// # Returns
///
/// `true` if the path was set successfully, `false` if a path was already set.
pub fn set_custom_config_path(path: PathBuf) -> bool { CUSTOM_CONFIG_PATH.set(path).is_ok() }

/// Loads the configuration from the custom path or the default search paths.
///
/// # Errors
///
/// See [`load_config_from_path`].
pub fn load_config() -> Result<(PortalConfig, PathBuf), ConfigError> {
    CUSTOM_CONFIG_PATH
        .get()
        .map_or_else(load_config_default, |path| load_config_from_path(path))
}

fn load_or_default() -> PortalConfig {
    match load_config() {
        Ok((config, path)) => {
            tracing::debug!(path = %path.display(), "portal: loaded configuration");
            let _ = CONFIG_PATH.set(path);
            config
        }
        Err(ConfigError::NotFound) => {
            tracing::debug!("portal: no configuration file, using defaults");
            PortalConfig::default()
        }
        Err(err) => {
            tracing::warn!(error = %err, "portal: failed to load configuration, using defaults");
            PortalConfig::default()
        }
    }
}

/// Returns the global configuration instance, initializing it if necessary.
///
/// If no configuration file is found, or the file is invalid, returns the
/// default configuration.
pub fn get_config() -> &'static PortalConfig { CONFIG.get_or_init(load_or_default) }

/// Returns the path to the loaded configuration file, if any.
pub fn get_config_path() -> Option<&'static PathBuf> { CONFIG_PATH.get() }
