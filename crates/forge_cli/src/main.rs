//! Forge CLI - Main entry point.
//!
//! Exit codes:
//! - 0: Success
//! - 1: General error
//! - 2: Invalid arguments or unknown project
//! - 3: Model invocation failure
//! - 4: Structured output could not be extracted
//! - 5: Persistence failure

use std::process::ExitCode;

use clap::Parser;
use forge_core::{ExtractionError, StoreError};
use forge_engine::{EngineError, GatewayError};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod commands;

use commands::{Cli, Commands};

/// CI-friendly exit codes
pub struct ExitCodes;

impl ExitCodes {
    pub const SUCCESS: u8 = 0;
    pub const GENERAL_ERROR: u8 = 1;
    pub const INVALID_ARGS: u8 = 2;
    pub const MODEL_ERROR: u8 = 3;
    pub const EXTRACTION_ERROR: u8 = 4;
    pub const PERSISTENCE_ERROR: u8 = 5;
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    init_logging(cli.global.verbose, cli.global.json_logs);

    let result = match cli.command {
        Commands::New(args) => commands::new::execute(args, &cli.global).await,
        Commands::Synthesize(args) => commands::synthesize::execute(args, &cli.global).await,
        Commands::Iterate(args) => commands::iterate::execute(args, &cli.global).await,
        Commands::Show(args) => commands::show::execute(args, &cli.global).await,
        Commands::Projects(args) => commands::projects::execute(args, &cli.global).await,
    };

    match result {
        Ok(()) => ExitCode::from(ExitCodes::SUCCESS),
        Err(e) => {
            let exit_code = categorize_error(&e);
            eprintln!("❌ Error: {:#}", e);
            ExitCode::from(exit_code)
        }
    }
}

fn init_logging(verbose: bool, json: bool) {
    let default_level = if verbose { "forge=debug,warn" } else { "forge=info,warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let log_result = tracing_subscriber::registry()
        .with(filter)
        .with(json.then(|| fmt::layer().json().with_writer(std::io::stderr)))
        .with((!json).then(|| fmt::layer().with_target(false).with_writer(std::io::stderr)))
        .try_init();

    if log_result.is_err() {
        // Logging already initialized, continue
    }
}

/// Categorize error to determine exit code
fn categorize_error(e: &anyhow::Error) -> u8 {
    for cause in e.chain() {
        if let Some(engine) = cause.downcast_ref::<EngineError>() {
            return match engine {
                EngineError::ModelInvocation { .. } => ExitCodes::MODEL_ERROR,
                EngineError::JsonExtraction { .. } => ExitCodes::EXTRACTION_ERROR,
                EngineError::ProjectNotFound(_) => ExitCodes::INVALID_ARGS,
                EngineError::Persistence(_) => ExitCodes::PERSISTENCE_ERROR,
            };
        }
        if cause.downcast_ref::<GatewayError>().is_some() {
            return ExitCodes::MODEL_ERROR;
        }
        if cause.downcast_ref::<ExtractionError>().is_some() {
            return ExitCodes::EXTRACTION_ERROR;
        }
        if let Some(store) = cause.downcast_ref::<StoreError>() {
            return match store {
                StoreError::ProjectNotFound(_) => ExitCodes::INVALID_ARGS,
                _ => ExitCodes::PERSISTENCE_ERROR,
            };
        }
    }
    ExitCodes::GENERAL_ERROR
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;
    use forge_engine::Phase;

    #[test]
    fn test_engine_errors_map_to_exit_codes() {
        let err = anyhow::Error::new(EngineError::ModelInvocation {
            phase: Phase::Schema,
            source: GatewayError::Timeout(30),
        });
        assert_eq!(categorize_error(&err), ExitCodes::MODEL_ERROR);

        let err = anyhow::Error::new(EngineError::ProjectNotFound("p1".to_string()));
        assert_eq!(categorize_error(&err), ExitCodes::INVALID_ARGS);

        let err = anyhow::Error::new(EngineError::Persistence(StoreError::Rejected("x".to_string())));
        assert_eq!(categorize_error(&err), ExitCodes::PERSISTENCE_ERROR);
    }

    #[test]
    fn test_context_does_not_hide_cause() {
        let result: Result<(), GatewayError> =
            Err(GatewayError::NotConfigured("OPENAI_API_KEY is not set".to_string()));
        let err = result.context("Failed to configure the model gateway").unwrap_err();
        assert_eq!(categorize_error(&err), ExitCodes::MODEL_ERROR);
    }

    #[test]
    fn test_unknown_errors_are_general() {
        let err = anyhow::anyhow!("something else");
        assert_eq!(categorize_error(&err), ExitCodes::GENERAL_ERROR);
    }
}
