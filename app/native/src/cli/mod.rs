//! Command-line interface for surface-portal.
//!
//! The binary has no window system of its own. Its commands inspect the
//! configuration and drive the portal against the headless backend, which is
//! enough to see what a given configuration does to a split layout.

mod commands;
mod output;

use clap::Parser;
pub use commands::Cli;
pub use commands::simulate::{SimulateArgs, SimulationReport, run_simulation};

use crate::error::PortalResult;

/// Runs the CLI.
///
/// Parses command-line arguments and executes the appropriate command.
///
/// # Errors
///
/// Returns an error if the command execution fails.
pub fn run() -> PortalResult<()> {
    let cli = Cli::parse();
    cli.execute()
}
