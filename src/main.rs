use anyhow::Context;
use atmo_processor::cli::{run, Cli};
use atmo_processor::utils::logging;
use clap::Parser;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose, cli.log_file.as_deref()).context("failed to initialise logging")?;

    run(cli).await.context("atmo-processor failed")
}
