mod config;
mod error;
mod event;
mod manager;
mod scanner;
mod stats;

use crate::config::{Config, FileConfig};
use crate::error::Error;
use crate::manager::Manager;
use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(version, about)]
struct CLI {
    /// Path to the input events file.
    #[arg(long)]
    input_file: PathBuf,

    /// Window size for the moving average, in minutes (must be a positive integer).
    #[arg(long, allow_negative_numbers = true)]
    window_size: Option<i64>,

    /// Path to the output file, or `-` for standard output
    /// [default: moving_averages_result.json].
    #[arg(long)]
    output_file: Option<PathBuf>,

    /// Path to an optional TOML configuration file.
    #[arg(long)]
    config: Option<PathBuf>,
}

fn main() {
    env_logger::Builder::new()
        .format_timestamp_millis()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    if let Err(error) = run_cli() {
        log::error!("{error:#?}");
        std::process::exit(exit_code(&error));
    }
}

fn run_cli() -> Result<()> {
    let args = CLI::parse();
    log::info!("{args:#?}");

    let file_cfg = match &args.config {
        Some(file) => FileConfig::from_file(file).context("failed to load config file")?,
        None => FileConfig::default(),
    };

    let cfg = Config::resolve(
        args.input_file,
        args.window_size,
        args.output_file,
        file_cfg,
    )
    .context("failed to construct cfg")?;
    log::info!("{cfg:#?}");

    Manager::new(cfg).run()?;

    Ok(())
}

fn exit_code(error: &anyhow::Error) -> i32 {
    let usage_error = error
        .chain()
        .any(|cause| matches!(cause.downcast_ref::<Error>(), Some(Error::InvalidArgument(_))));
    if usage_error { 2 } else { 1 }
}
