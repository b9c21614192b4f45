//! catalog-adapter - Main entry point
//!
//! Exit codes: `0` success, `2` a required input is missing, `3` any other
//! failure.

use std::process::ExitCode;

use tracing::{error, info};

use catalog_adapter::cli::Cli;
use catalog_adapter::error::{AdapterError, EXIT_INPUT_NOT_FOUND, EXIT_PROCESSING_ERROR};
use catalog_adapter::{generate, logging};

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e:#}");
            eprintln!("Error: {e:#}");
            ExitCode::from(exit_code_for(&e))
        }
    }
}

fn run() -> anyhow::Result<()> {
    let config = Cli::parse_args().into_run_config()?;
    logging::init(config.log_level, config.log_file.as_deref())?;

    info!("Starting adapter config generation");
    info!("Policy file: {}", config.policy.display());

    let summary = generate(&config)?;
    info!(
        "Done: {} combination(s), {} file(s) written",
        summary.combinations,
        summary.written.len()
    );
    Ok(())
}

/// Pick the exit code for an error bubbling out of `run`
fn exit_code_for(err: &anyhow::Error) -> u8 {
    let code = if let Some(adapter) = err.downcast_ref::<AdapterError>() {
        adapter.exit_code()
    } else if err
        .chain()
        .filter_map(|cause| cause.downcast_ref::<std::io::Error>())
        .any(|io| io.kind() == std::io::ErrorKind::NotFound)
    {
        EXIT_INPUT_NOT_FOUND
    } else {
        EXIT_PROCESSING_ERROR
    };
    u8::try_from(code).unwrap_or(1)
}
