use anyhow::Context;
use clap::Parser;
use reconscan::cli::Cli;
use reconscan::{logging, output};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    logging::init(cli.verbosity(), cli.log_file.as_deref())
        .context("failed to initialise logging")?;

    if let Err(e) = cli.run().await {
        tracing::debug!(error = ?e, "scan failed");
        output::print_error(&e.to_string());
        std::process::exit(e.exit_code());
    }

    Ok(())
}
