//! Command executor for dispatching CLI commands
//!
//! This module provides the main entry point for executing CLI commands
//! after parsing and configuration loading.

use super::handlers::{JobsCommandHandler, RunCommandHandler, RunJobCommandHandler};
use super::parser::{Cli, Commands};
use crate::config::settings::Settings;
use crate::error::AppResult;

/// Execute a CLI command with the given settings
///
/// This function dispatches to the appropriate command handler based on
/// the parsed CLI arguments. No subcommand behaves like `run`.
///
/// # Arguments
/// * `cli` - Parsed CLI arguments
/// * `settings` - Merged and validated settings
///
/// # Errors
/// Returns errors from command handlers or validation failures
pub async fn execute_command(cli: &Cli, settings: Settings) -> AppResult<()> {
    validate_command_args(cli)?;

    match &cli.command {
        Some(Commands::Run { dry_run }) => {
            RunCommandHandler::new(settings).execute(*dry_run).await
        }
        Some(Commands::Jobs { json }) => JobsCommandHandler::new(settings).execute(*json).await,
        Some(Commands::RunJob { name }) => RunJobCommandHandler::new(settings).execute(name).await,
        None => RunCommandHandler::new(settings).execute(false).await,
    }
}

/// Validate command arguments before execution
fn validate_command_args(cli: &Cli) -> AppResult<()> {
    if let Err(msg) = cli.validate() {
        return Err(crate::error::AppError::Validation {
            field: "cli_arguments".to_string(),
            reason: msg,
        });
    }

    Ok(())
}
