//! `linekit` binary: group, rebalance and summarise assembly-line element tables.

mod cli;
mod command;
mod config;
mod ingest;

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, EnumCommand};

fn main() -> Result<()> {
    let args = Cli::parse();
    init_tracing(&args.log_level)?;

    let options = config::load_balance_options(args.config_path.as_deref(), &args.overrides)?;
    debug!(
        walking_marker = %options.walking_marker,
        rule_numbering = ?options.rule_numbering,
        "options resolved"
    );

    match &args.command {
        EnumCommand::Group(cmd) => command::run_group(cmd, &options),
        EnumCommand::Move(cmd) => command::run_move(cmd, &options),
        EnumCommand::Summary(cmd) => command::run_summary(cmd, &options),
    }
}

fn init_tracing(log_level: &str) -> Result<()> {
    let filter = EnvFilter::try_new(log_level).context("invalid log level")?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|err| anyhow!(err))
        .context("initialize tracing subscriber")?;
    Ok(())
}
