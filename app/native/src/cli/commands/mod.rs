//! CLI command definitions using Clap.
//!
//! - `config_cmd` - Configuration file inspection
//! - `simulate` - Headless split layout simulation

use std::io;
use std::path::PathBuf;

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{Generator, Shell, generate};

use crate::error::{PortalError, PortalResult};
use crate::{config, logging, schema};

pub mod config_cmd;
pub mod simulate;

pub use config_cmd::ConfigCommands;
pub use simulate::SimulateArgs;

/// Application version from Cargo.toml.
const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// surface-portal - inspect and simulate the view portal.
#[derive(Parser, Debug)]
#[command(name = "surface-portal")]
#[command(author, version = APP_VERSION, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to a custom configuration file.
    ///
    /// Overrides the default configuration file search paths.
    /// Supports JSONC format (JSON with comments).
    #[arg(long, short, global = true, value_name = "PATH")]
    pub config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
#[command(next_display_order = None)]
pub enum Commands {
    /// Configuration file commands.
    ///
    /// Show where the configuration is looked up and what it resolves to.
    #[command(subcommand)]
    Config(ConfigCommands),

    /// Output the configuration JSON Schema.
    ///
    /// Outputs a JSON Schema to stdout that describes the structure of the
    /// configuration file. Can be redirected to a file for use with editors
    /// that support JSON Schema validation.
    Schema,

    /// Run the portal against a headless split layout.
    ///
    /// Builds a window with side-by-side panes, binds one hosted view per
    /// pane, runs the scheduled passes and prints the resulting snapshot.
    Simulate(SimulateArgs),

    /// Generate shell completions.
    ///
    /// Outputs shell completion script to stdout for the specified shell.
    ///
    /// Usage:
    ///   eval "$(surface-portal completions --shell zsh)"
    ///   surface-portal completions --shell fish > ~/.config/fish/completions/surface-portal.fish
    Completions {
        /// The shell to generate completions for.
        #[arg(long, short, value_enum)]
        shell: Shell,
    },
}

impl Cli {
    /// Returns the custom config path if specified via --config flag.
    #[must_use]
    pub fn config_path(&self) -> Option<PathBuf> { self.config.as_ref().map(PathBuf::from) }

    /// Execute the CLI command.
    ///
    /// # Errors
    ///
    /// Returns an error if the custom configuration file does not exist or
    /// the command fails.
    pub fn execute(&self) -> PortalResult<()> {
        if let Some(path) = self.config_path() {
            if !path.exists() {
                return Err(PortalError::ConfigError(format!(
                    "Configuration file not found: {}",
                    path.display()
                )));
            }
            config::set_custom_config_path(path);
        }

        logging::init(&config::get_config().logging.level);

        match &self.command {
            Commands::Config(cmd) => config_cmd::execute(cmd),
            Commands::Schema => {
                println!("{}", schema::generate_schema_json());
                Ok(())
            }
            Commands::Simulate(args) => simulate::execute(args),
            Commands::Completions { shell } => {
                Self::print_completions(*shell);
                Ok(())
            }
        }
    }

    /// Print shell completions to stdout.
    fn print_completions<G: Generator>(generator: G) {
        let mut cmd = Self::command();
        generate(generator, &mut cmd, "surface-portal", &mut io::stdout());
    }
}
