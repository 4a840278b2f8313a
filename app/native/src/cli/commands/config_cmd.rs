//! Config CLI commands.

use clap::Subcommand;

use crate::cli::output::print_highlighted_json;
use crate::config::{self, config_paths};
use crate::error::PortalResult;

/// Config inspection commands.
#[derive(Subcommand, Debug)]
#[command(next_display_order = None)]
pub enum ConfigCommands {
    /// Show the paths searched for the configuration file.
    ///
    /// Lists every candidate in priority order and marks the one in use.
    Path,

    /// Print the effective configuration.
    ///
    /// Missing options are filled in with their defaults, so the output shows
    /// every value the portal will actually use.
    #[command(after_long_help = r#"Examples:
  surface-portal config show
  surface-portal config show --raw > effective.json
  surface-portal --config ./portal.jsonc config show"#)]
    Show {
        /// Print plain JSON without highlighting.
        #[arg(long)]
        raw: bool,
    },
}

/// Execute config subcommands.
///
/// # Errors
///
/// Returns an error if the configuration cannot be serialized.
pub fn execute(cmd: &ConfigCommands) -> PortalResult<()> {
    match cmd {
        ConfigCommands::Path => {
            show_config_path();
            Ok(())
        }
        ConfigCommands::Show { raw } => show_config(*raw),
    }
}

fn show_config(raw: bool) -> PortalResult<()> {
    let value = serde_json::to_value(config::get_config())?;
    if raw {
        println!("{}", serde_json::to_string_pretty(&value)?);
    } else {
        print_highlighted_json(&value);
    }

    match config::get_config_path() {
        Some(path) => eprintln!("Loaded from: {}", path.display()),
        None => eprintln!("No configuration file loaded; showing defaults."),
    }
    Ok(())
}

fn show_config_path() {
    let active = config::get_config_path();
    println!("Configuration file search paths (in priority order):\n");

    let mut found_config = false;
    for (i, path) in config_paths().iter().enumerate() {
        let exists = path.exists();
        let marker = if active == Some(path) || (active.is_none() && exists && !found_config) {
            found_config = true;
            " (active)"
        } else if exists {
            " (exists)"
        } else {
            ""
        };

        println!("  {}. {}{}", i + 1, path.display(), marker);
    }

    if let Some(path) = active
        && !found_config
    {
        println!("\nUsing custom configuration: {}", path.display());
    } else if !found_config {
        println!("\nNo configuration file found. Defaults are in effect.");
    }
}
