//! Configuration types for surface-portal.
//!
//! The configuration file supports JSONC format (JSON with comments).
//! Both single-line (`//`) and multi-line (`/* */`) comments are allowed.

use std::fs;
use std::path::{Path, PathBuf};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::color::{Rgba, parse_hex_color};

// ============================================================================
// Sections
// ============================================================================

/// Thresholds used when reconciling hosted view geometry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct GeometryConfig {
    /// Rectangles closer than this on every component are considered equal
    /// and are not written again.
    /// Default: 0.01
    pub frame_epsilon: f64,

    /// A hosted view whose width or height is at or below this extent is hidden.
    /// Default: 1.0
    pub min_visible_extent: f64,
}

impl Default for GeometryConfig {
    fn default() -> Self {
        Self {
            frame_epsilon: 0.01,
            min_visible_extent: 1.0,
        }
    }
}

/// Divider overlay drawn above hosted views.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct OverlayConfig {
    /// Whether split dividers are redrawn above hosted views.
    /// Default: true
    pub enabled: bool,

    /// Line thickness of a redrawn divider.
    /// Default: 1.0
    pub divider_thickness: f64,

    /// Divider color as `#RRGGBB` or `#RRGGBBAA`.
    /// Default: "#00000033"
    pub divider_color: String,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            divider_thickness: 1.0,
            divider_color: "#00000033".to_string(),
        }
    }
}

impl OverlayConfig {
    #[must_use]
    pub const fn is_enabled(&self) -> bool { self.enabled }

    /// Returns the divider color, falling back to the default on a bad value.
    #[must_use]
    pub fn color(&self) -> Rgba {
        parse_hex_color(&self.divider_color).unwrap_or_else(|err| {
            tracing::warn!(error = %err, "portal: invalid overlay divider color, using default");
            Rgba::new(0.0, 0.0, 0.0, 0.2)
        })
    }
}

/// Pointer routing above hosted views.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct HitTestConfig {
    /// Extra distance on each side of a divider that still grabs it.
    /// Default: 4.0
    pub divider_grab_expansion: f64,

    /// Panes at or below this extent count as collapsed.
    /// Default: 1.0
    pub collapsed_pane_threshold: f64,

    /// Width of the reserved sidebar resize strip.
    /// Default: 6.0
    pub sidebar_strip_width: f64,

    /// Consecutive passes without a sidebar edge before the cached strip is dropped.
    /// Default: 3
    pub sidebar_miss_limit: u32,

    /// A leftmost edge this close to the window edge means there is no sidebar.
    /// Default: 1.0
    pub sidebar_flush_tolerance: f64,
}

impl Default for HitTestConfig {
    fn default() -> Self {
        Self {
            divider_grab_expansion: 4.0,
            collapsed_pane_threshold: 1.0,
            sidebar_strip_width: 6.0,
            sidebar_miss_limit: 3,
            sidebar_flush_tolerance: 1.0,
        }
    }
}

/// Drag-and-drop routing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct DragRoutingConfig {
    /// Transfer formats whose drags bypass hosted views and go to the
    /// declarative layer's own drop handling.
    pub passthrough_types: Vec<String>,
}

impl Default for DragRoutingConfig {
    fn default() -> Self {
        Self {
            passthrough_types: vec![
                "surface-portal.tab-transfer".to_string(),
                "surface-portal.sidebar-reorder".to_string(),
            ],
        }
    }
}

impl DragRoutingConfig {
    /// Whether any of `types` is a passthrough format.
    #[must_use]
    pub fn is_passthrough<S: AsRef<str>>(&self, types: &[S]) -> bool {
        types
            .iter()
            .any(|kind| self.passthrough_types.iter().any(|known| known == kind.as_ref()))
    }
}

/// Log output of the binary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct LoggingConfig {
    /// Default filter directive. `RUST_LOG` takes precedence.
    /// Default: "info"
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self { Self { level: "info".to_string() } }
}

/// Root configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct PortalConfig {
    /// Geometry reconciliation thresholds.
    pub geometry: GeometryConfig,

    /// Divider overlay.
    pub overlay: OverlayConfig,

    /// Pointer hit-testing.
    pub hit_test: HitTestConfig,

    /// Drag-and-drop routing.
    pub drag_routing: DragRoutingConfig,

    /// Logging.
    pub logging: LoggingConfig,
}

// ============================================================================
// Loading
// ============================================================================

/// Errors that can occur when loading the configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// No configuration file was found in any of the expected locations.
    #[error("No configuration file found. Expected at ~/.config/surface-portal/config.jsonc")]
    NotFound,
    /// The configuration file exists but could not be read.
    #[error("Failed to read configuration file: {0}")]
    Io(#[from] std::io::Error),
    /// The configuration file contains invalid JSON.
    #[error("Failed to parse configuration file: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Configuration file names to search for (in priority order).
const CONFIG_FILE_NAMES: &[&str] = &["config.jsonc", "config.json"];

/// Directory name under each configuration root.
const CONFIG_DIR_NAME: &str = "surface-portal";

/// Returns the possible configuration file paths in priority order.
///
/// 1. `$XDG_CONFIG_HOME/surface-portal/config.jsonc` or `config.json`
/// 2. `~/.config/surface-portal/config.jsonc` or `config.json`
/// 3. The platform configuration directory
#[must_use]
pub fn config_paths() -> Vec<PathBuf> {
    let mut roots = Vec::new();

    if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME")
        && !xdg_config.is_empty()
    {
        roots.push(PathBuf::from(xdg_config));
    }
    if let Some(home) = dirs::home_dir() {
        roots.push(home.join(".config"));
    }
    if let Some(config_dir) = dirs::config_dir() {
        roots.push(config_dir);
    }

    let mut paths = Vec::new();
    for root in roots {
        for filename in CONFIG_FILE_NAMES {
            let path = root.join(CONFIG_DIR_NAME).join(filename);
            // XDG_CONFIG_HOME is commonly ~/.config
            if !paths.contains(&path) {
                paths.push(path);
            }
        }
    }
    paths
}

/// Loads the configuration from a specific path.
///
/// # Errors
///
/// Returns `ConfigError::NotFound` if the file does not exist,
/// `ConfigError::Io` if it could not be read and `ConfigError::Parse` if it
/// is not valid JSONC.
pub fn load_config_from_path(path: &Path) -> Result<(PortalConfig, PathBuf), ConfigError> {
    if !path.exists() {
        return Err(ConfigError::NotFound);
    }

    let file = fs::File::open(path)?;
    let reader = json_comments::StripComments::new(file);
    let config: PortalConfig = serde_json::from_reader(reader)?;
    Ok((config, path.to_path_buf()))
}

/// Loads the configuration from the first available config file.
///
/// # Errors
///
/// Returns `ConfigError::NotFound` if no configuration file exists in any of
/// the expected locations, or the error of the first file found.
pub fn load_config() -> Result<(PortalConfig, PathBuf), ConfigError> {
    config_paths()
        .into_iter()
        .find(|path| path.exists())
        .map_or(Err(ConfigError::NotFound), |path| load_config_from_path(&path))
}

/// Parses configuration from a JSONC string.
///
/// # Errors
///
/// Returns `ConfigError::Parse` if the text is not valid JSONC.
pub fn parse_config(text: &str) -> Result<PortalConfig, ConfigError> {
    let reader = json_comments::StripComments::new(text.as_bytes());
    Ok(serde_json::from_reader(reader)?)
}

#[cfg(test)]
#[allow(clippy::float_cmp)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PortalConfig::default();
        assert_eq!(config.geometry.frame_epsilon, 0.01);
        assert_eq!(config.geometry.min_visible_extent, 1.0);
        assert!(config.overlay.is_enabled());
        assert_eq!(config.hit_test.sidebar_miss_limit, 3);
        assert_eq!(config.drag_routing.passthrough_types.len(), 2);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_partial_config_keeps_other_defaults() {
        let config = parse_config(
            r#"{
                // only override the grab area
                "hitTest": { "dividerGrabExpansion": 8.0 }
            }"#,
        )
        .unwrap();

        assert_eq!(config.hit_test.divider_grab_expansion, 8.0);
        assert_eq!(config.hit_test.sidebar_strip_width, 6.0);
        assert_eq!(config.overlay, OverlayConfig::default());
    }

    #[test]
    fn test_block_comments_are_stripped() {
        let config = parse_config(
            r#"{
                /* overlay off */
                "overlay": { "enabled": false }
            }"#,
        )
        .unwrap();
        assert!(!config.overlay.is_enabled());
    }

    #[test]
    fn test_invalid_json_is_parse_error() {
        let err = parse_config("{ not json").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
        assert!(err.to_string().contains("Failed to parse"));
    }

    #[test]
    fn test_overlay_color_falls_back_on_garbage() {
        let overlay = OverlayConfig {
            divider_color: "teal".to_string(),
            ..OverlayConfig::default()
        };
        assert_eq!(overlay.color().a, 0.2);
    }

    #[test]
    fn test_passthrough_matching() {
        let routing = DragRoutingConfig::default();
        assert!(routing.is_passthrough(&["public.text", "surface-portal.tab-transfer"]));
        assert!(!routing.is_passthrough(&["public.file-url"]));
        assert!(!routing.is_passthrough::<&str>(&[]));
    }

    #[test]
    fn test_config_paths_end_with_file_names() {
        for path in config_paths() {
            let name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
            assert!(CONFIG_FILE_NAMES.contains(&name));
        }
    }

    #[test]
    fn test_missing_path_is_not_found() {
        let result = load_config_from_path(Path::new("/nonexistent/surface-portal.jsonc"));
        assert!(matches!(result, Err(ConfigError::NotFound)));
    }
}
