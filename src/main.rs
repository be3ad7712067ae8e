//! Delegate - multi-provider LLM client with sub-agent delegation
//!
//! Main entry point for the CLI application.

use std::process::ExitCode;

use clap::Parser;
use delegate::cli::Cli;
use delegate::{CallContext, Config, DelegateError};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "delegate=debug,warn" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    match run(cli).await {
        Ok(output) => {
            println!("{}", output);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {:#}", e);
            let code = e
                .downcast_ref::<DelegateError>()
                .map(DelegateError::exit_code)
                .unwrap_or(1);
            ExitCode::from(code)
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<String> {
    let mut config = Config::load(cli.config.as_deref())?;
    cli.apply_overrides(&mut config);

    // Ctrl-C cancels the whole call tree
    let ctx = CallContext::new();
    let interrupt = ctx.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupted, cancelling");
            interrupt.cancel();
        }
    });

    Ok(cli.dispatch(&ctx, &config).await?)
}
