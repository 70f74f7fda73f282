//! Calc command
//!
//! Suggests a gift amount. The command runs inside the hook pipeline, so
//! before-phase hooks can change `currency` and `decimals` and after-phase
//! hooks see the rendered output.

use anyhow::Result;
use async_trait::async_trait;
use clap::Args;
use colored::*;
use giftwise_core::gift::{GiftInputs, round_to, suggest_amount};
use giftwise_hooks::{CommandOutput, HookPipeline, HostCommand, HostModuleRegistry};
use serde_json::{Map, Value, json};
use std::ffi::OsString;
use std::sync::Arc;

use crate::config::{Config, HostConfig};

const DEFAULT_CURRENCY: &str = "USD";
const DEFAULT_DECIMALS: u32 = 2;
const MAX_DECIMALS: u64 = 8;

/// Arguments of `giftwise calc`
#[derive(Args, Debug, Clone)]
pub struct CalcArgs {
    /// Typical spend for this kind of gift
    #[arg(long)]
    pub base: f64,

    /// How close the recipient is (1-10)
    #[arg(long, default_value_t = 5.0)]
    pub closeness: f64,

    /// How important the occasion is (1-10)
    #[arg(long, default_value_t = 5.0)]
    pub importance: f64,

    /// How nice the recipient has been (0-10)
    #[arg(long, default_value_t = 10.0)]
    pub niceness: f64,

    /// Upper bound for the suggestion
    #[arg(long)]
    pub budget: f64,

    /// Also print the structured result as JSON
    #[arg(long)]
    pub json: bool,
}

impl CalcArgs {
    fn inputs(&self) -> GiftInputs {
        GiftInputs {
            base: self.base,
            closeness: self.closeness,
            importance: self.importance,
            niceness: self.niceness,
            budget: self.budget,
        }
    }
}

/// The gift calculation as a hookable host command
pub struct CalcCommand {
    inputs: GiftInputs,
}

impl CalcCommand {
    pub fn new(inputs: GiftInputs) -> Self {
        Self { inputs }
    }
}

#[async_trait]
impl HostCommand for CalcCommand {
    fn name(&self) -> &str {
        "calc"
    }

    async fn run(&self, _args: &[String], config: &Map<String, Value>) -> Result<CommandOutput> {
        let currency = config
            .get("currency")
            .and_then(Value::as_str)
            .unwrap_or(DEFAULT_CURRENCY);
        let decimals = config
            .get("decimals")
            .and_then(Value::as_u64)
            .map(|d| d.min(MAX_DECIMALS) as u32)
            .unwrap_or(DEFAULT_DECIMALS);

        let amount = round_to(suggest_amount(&self.inputs)?, decimals);

        Ok(CommandOutput {
            output: format!("{:.*} {}", decimals as usize, amount, currency),
            result: json!({
                "amount": amount,
                "currency": currency,
                "decimals": decimals,
                "inputs": self.inputs,
            }),
        })
    }
}

/// Handle `giftwise calc`
pub async fn handle_calc_command(args: CalcArgs, config: &Config) -> Result<()> {
    let host = HostConfig::load(&config.config_path)?;
    let pipeline = HookPipeline::new(
        host.config_dir(),
        Arc::new(HostModuleRegistry::with_defaults()),
    );

    let argv = host_args(std::env::args_os().skip(1));
    let command = CalcCommand::new(args.inputs());
    let output = pipeline.run_with_hooks(&command, &argv, &host.values).await?;

    println!("{} {}", "Suggested gift:".bold(), output.output.green().bold());
    if args.json {
        println!("{}", serde_json::to_string_pretty(&output.result)?);
    }

    Ok(())
}

/// Command-line arguments as hooks see them; non-UTF-8 bytes are replaced
fn host_args(args: impl IntoIterator<Item = OsString>) -> Vec<String> {
    args.into_iter()
        .map(|arg| arg.to_string_lossy().into_owned())
        .collect()
}
