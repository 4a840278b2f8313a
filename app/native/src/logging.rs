//! Tracing subscriber setup for the binary.
//!
//! The library only emits `tracing` events; installing a subscriber is left to
//! whoever embeds it. The CLI calls [`init`] once with the configured level.

use tracing_subscriber::EnvFilter;

/// Builds the filter used by [`init`].
///
/// A non-empty `RUST_LOG` wins over `level`. An unparsable directive falls
/// back to `info`.
#[must_use]
pub fn build_filter(level: &str, env_override: Option<&str>) -> EnvFilter {
    let directive = env_override
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .unwrap_or(level);

    EnvFilter::try_new(directive).unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Installs a `fmt` subscriber writing to stderr.
///
/// Returns `false` if a global subscriber was already installed.
pub fn init(level: &str) -> bool {
    let env_override = std::env::var("RUST_LOG").ok();
    let filter = build_filter(level, env_override.as_deref());

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_uses_level_without_override() {
        let filter = build_filter("debug", None);
        assert_eq!(filter.to_string(), "debug");
    }

    #[test]
    fn test_env_override_wins() {
        let filter = build_filter("info", Some("surface_portal=trace"));
        assert_eq!(filter.to_string(), "surface_portal=trace");
    }

    #[test]
    fn test_blank_override_is_ignored() {
        let filter = build_filter("warn", Some("  "));
        assert_eq!(filter.to_string(), "warn");
    }

    #[test]
    fn test_invalid_level_falls_back_to_info() {
        let filter = build_filter("surface_portal=loud", None);
        assert_eq!(filter.to_string(), "info");
    }
}
