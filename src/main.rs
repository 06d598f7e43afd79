use std::process::ExitCode;

use anyhow::Context as _;
use clap::Parser as _;

#[tokio::main]
async fn main() -> ExitCode {
    if let Err(err) = try_main().await {
        eprintln!("{err:#}");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

async fn try_main() -> anyhow::Result<()> {
    sitecrawl::logging::init().context("init logging")?;

    let cli = sitecrawl::cli::Cli::parse();
    tracing::debug!(?cli, "parsed cli");

    sitecrawl::crawl::run(cli.crawl).await.context("crawl")?;

    Ok(())
}
