mod cli;
mod commands;
mod observability;
mod output;
mod snapshot;

use anyhow::Result;
use clap::Parser;

use cli::{Cli, Commands};
use ordersync_config::loader::load_config;
use output::print_error;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        print_error(&format!("{e:#}"));
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    let cfg = load_config(cli.config.as_deref()).map_err(anyhow::Error::msg)?;
    observability::init_tracing_with_level(&cfg.logging.level);

    match &cli.command {
        Commands::Plan(args) => {
            let provider = cfg.provider_context().map_err(anyhow::Error::msg)?;
            commands::plan::plan(provider, args)?;
        }
        Commands::Apply(args) => commands::apply::apply(&cfg, args).await?,
        Commands::Destroy(args) => commands::destroy::destroy(&cfg, args).await?,
        Commands::Wait(args) => commands::wait::wait(&cfg, args).await?,
    }

    Ok(())
}
