//! Giftwise CLI
//!
//! Gift amount suggestions, extensible with Lua hooks.

mod commands;
mod config;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, handle_command};
use config::Config;
use giftwise_core::error::HookAbort;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "giftwise")]
#[command(about = "Gift amount suggestions with Lua hooks", long_about = None)]
struct Cli {
    /// Host config file (defaults to <config dir>/giftwise/config.json)
    #[arg(long, env = "GIFTWISE_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.verbose);

    let config_path = match cli.config {
        Some(path) => path,
        None => config::default_config_path()?,
    };
    let config = Config {
        config_path,
        verbose: cli.verbose,
    };

    match handle_command(cli.command, &config).await {
        Ok(()) => Ok(()),
        Err(err) => match err.downcast_ref::<HookAbort>() {
            Some(abort) => abort.exit(),
            None => Err(err),
        },
    }
}

fn init_tracing(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("giftwise_cli={level},giftwise_hooks={level},giftwise_plugin={level}").into()
            }),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
