//! Hooks command handlers
//!
//! Tools for hook authors: validate the pipeline config, try loading scripts,
//! and generate Lua Language Server stubs for the host modules.

use anyhow::{Context, Result, bail};
use clap::Subcommand;
use colored::*;
use giftwise_core::config::{Phase, PipelineConfig};
use giftwise_hooks::loader::{LoadOptions, LoadReport, LoadResult, ScriptLoader};
use giftwise_hooks::{HostModuleRegistry, is_pipeline_active};
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use crate::config::{Config, HostConfig};

/// Hooks subcommands
#[derive(Subcommand)]
pub enum HooksCommands {
    /// Show the normalized hooks config and any validation errors
    Validate,
    /// Load hook scripts and report their format and entry point
    Check {
        /// Script paths, relative to the current directory
        #[arg(required = true)]
        scripts: Vec<PathBuf>,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Generate Lua stubs for the host modules
    Stubs {
        /// Write to this file instead of stdout
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
}

/// Handle hooks commands
pub async fn handle_hooks_command(command: HooksCommands, config: &Config) -> Result<()> {
    match command {
        HooksCommands::Validate => validate_config(config),
        HooksCommands::Check { scripts, json } => check_scripts(scripts, json, config).await,
        HooksCommands::Stubs { out } => write_stubs(out),
    }
}

fn validate_config(config: &Config) -> Result<()> {
    let host = HostConfig::load(&config.config_path)?;
    let (settings, errors) = PipelineConfig::from_host_config(&host.values);

    println!(
        "{} {}",
        "Config:".bold(),
        host.path.display().to_string().cyan()
    );
    println!("{}", serde_json::to_string_pretty(&settings)?);
    println!();

    for phase in [Phase::Before, Phase::After] {
        let state = if settings.is_phase_active(phase) {
            "active".green()
        } else {
            "inactive".dimmed()
        };
        println!("  {:<8} {}", phase.to_string(), state);
    }
    if !is_pipeline_active(&host.values) {
        println!("  {}", "No hooks will run.".yellow());
    }
    println!();

    if errors.is_empty() {
        println!("{}", "✓ Hooks config is valid".green().bold());
    } else {
        println!(
            "{}",
            format!("Found {} problem(s), defaults were used:", errors.len())
                .yellow()
                .bold()
        );
        for error in &errors {
            println!("  {} {}", "▸".yellow(), error);
        }
    }

    Ok(())
}

async fn check_scripts(scripts: Vec<PathBuf>, json: bool, config: &Config) -> Result<()> {
    let cwd = std::env::current_dir().context("Failed to read the current directory")?;
    let paths: Vec<PathBuf> = scripts
        .into_iter()
        .map(|p| if p.is_absolute() { p } else { cwd.join(p) })
        .collect();

    let loader = ScriptLoader::new(Arc::new(HostModuleRegistry::with_defaults()));
    let options = LoadOptions {
        verbose: config.verbose,
        validate_signature: true,
    };
    let loaded = loader.load_many(&paths, &options).await;

    if json {
        let report: Vec<LoadReport> = loaded.results.iter().map(LoadReport::from).collect();
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        for result in &loaded.results {
            print_load_result(result);
        }
        println!("{}", loaded.summary().bold());
    }

    if !loaded.all_succeeded {
        bail!("{} hook script(s) failed to load", loaded.errors.len());
    }
    Ok(())
}

fn print_load_result(result: &LoadResult) {
    let path = result.path.display().to_string();
    match (&result.script, &result.error) {
        (Some(script), _) => {
            println!("  {} {}", "✓".green(), path.bold());
            println!("    Format:     {}", script.format);
            println!("    Entry:      {}", script.entry);
            println!("    Parameters: {}", script.arity.params);
        }
        (None, Some(error)) => {
            println!("  {} {}", "✗".red(), path.bold());
            println!("    {}", error.to_string().red());
        }
        (None, None) => println!("  {} {}", "?".yellow(), path),
    }
    println!();
}

fn write_stubs(out: Option<PathBuf>) -> Result<()> {
    let stubs = HostModuleRegistry::with_defaults().generate_stubs();

    match out {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create directory {:?}", parent))?;
            }
            fs::write(&path, stubs)
                .with_context(|| format!("Failed to write stub file {:?}", path))?;
            println!("  {} {}", "Created".green(), path.display());
        }
        None => print!("{stubs}"),
    }

    Ok(())
}
