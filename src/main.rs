use std::io;
use std::process::ExitCode;

use clap::Parser;
use monies::cli::Cli;
use tracing::{Level, debug, subscriber};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = init_logging(cli.verbose) {
        eprintln!("Failed to initialize logging: {e}");
        return ExitCode::FAILURE;
    }
    debug!("monies {} starting", env!("CARGO_PKG_VERSION"));

    match cli.execute().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

/// Logs go to stderr; stdout carries command output. Below `-vvv` only this
/// crate is raised past warn.
fn init_logging(verbose: u8) -> anyhow::Result<()> {
    let directive = match verbose {
        0 => Level::WARN.to_string(),
        1 => format!("warn,monies={}", Level::INFO),
        2 => format!("warn,monies={}", Level::DEBUG),
        _ => Level::TRACE.to_string(),
    };

    // RUST_LOG wins over -v
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(directive)?,
    };

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(verbose >= 2)
        .with_thread_ids(verbose >= 3)
        .with_file(verbose >= 3)
        .with_line_number(verbose >= 3)
        .compact()
        .finish();

    subscriber::set_global_default(subscriber)?;

    Ok(())
}
