//! Commands module
//!
//! Defines all CLI commands and their handlers.

mod calc;
mod hooks;

pub use calc::CalcArgs;
pub use hooks::HooksCommands;

use anyhow::Result;
use clap::Subcommand;

use crate::config::Config;

/// Top-level CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Suggest a gift amount, running configured hooks around it
    Calc(CalcArgs),
    /// Hook authoring tools
    Hooks {
        #[command(subcommand)]
        command: HooksCommands,
    },
}

/// Routes the command to the appropriate handler module.
pub async fn handle_command(command: Commands, config: &Config) -> Result<()> {
    match command {
        Commands::Calc(args) => calc::handle_calc_command(args, config).await,
        Commands::Hooks { command } => hooks::handle_hooks_command(command, config).await,
    }
}
