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
    courseline::logging::init().context("init logging")?;

    let cli = courseline::cli::Cli::parse();
    tracing::debug!(?cli, "parsed cli");

    match cli.command {
        courseline::cli::Command::Serve(args) => {
            courseline::app::serve(args).await.context("serve")?;
        }
        courseline::cli::Command::Ask(args) => {
            courseline::app::ask(args).await.context("ask")?;
        }
    }

    Ok(())
}
