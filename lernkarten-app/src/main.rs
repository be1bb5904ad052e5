mod api;
mod cli;
mod config;
mod logging;

use anyhow::Result;
use clap::Parser; // needed for Cli::parse()
use tokio::runtime::Runtime;

use cli::commands::run_cli;
use cli::opts::Cli;
use config::AppConfig;

fn main() -> Result<()> {
    let args = Cli::parse();
    let config = AppConfig::from_cli(&args);
    logging::init_tracing(&config.log_level);

    let rt = Runtime::new()?;
    rt.block_on(run_cli(args.cmd, config))
}
