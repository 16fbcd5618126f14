//! CLI argument parsing with clap
//!
//! This module defines the command-line interface structure using clap,
//! including all commands, arguments, and their documentation.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

// Include shadow-rs generated build information
use shadow_rs::shadow;
shadow!(build);

/// Background job worker for the Darebox party game backend
#[derive(Parser, Debug)]
#[command(name = "darebox-worker")]
#[command(about = "Background job worker for the Darebox party game backend")]
#[command(long_about = "
Darebox-worker runs the scheduled background jobs of the Darebox backend:
retention cleanup of gameplay events and AI-assisted generation of new
truth/dare prompts. Jobs are registered on an in-process cron clock and
run until the process receives Ctrl+C or SIGTERM.

EXAMPLES:
    # Start the worker with default configuration
    darebox-worker run

    # Use a custom configuration file
    darebox-worker --config /etc/darebox/worker.toml run

    # Run in development mode with verbose logging
    darebox-worker --env development --verbose run

    # Check configuration without starting the worker
    darebox-worker run --dry-run

    # List registered jobs with their next fire times
    darebox-worker jobs

    # Same, as JSON for scripting
    darebox-worker jobs --json

    # Trigger the cleanup job immediately, regardless of its schedule
    darebox-worker run-job retention-cleanup

For more information about configuration options, see config/default.toml.
")]
#[command(version = build::CLAP_LONG_VERSION)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Configuration file path
    ///
    /// Specify a custom configuration file to use instead of the layered
    /// `config/` directory. The file should be in TOML format and contain
    /// valid configuration sections. The file must exist and be readable.
    ///
    /// Example: --config /etc/darebox/worker.toml
    #[arg(short, long, value_name = "FILE", value_parser = super::validation::validate_config_file_path)]
    pub config: Option<PathBuf>,

    /// Override environment detection
    ///
    /// Force the application to use a specific environment configuration.
    /// This affects which configuration files are loaded and takes
    /// precedence over the DAREBOX_APP_ENV environment variable.
    ///
    /// Available values: development (dev), test, staging (stage),
    /// production (prod)
    #[arg(short, long, value_enum)]
    pub env: Option<Environment>,

    /// Enable verbose logging
    ///
    /// Increases log output to debug level, showing detailed information
    /// about job scheduling and execution. Useful for troubleshooting.
    /// Cannot be used with --quiet.
    #[arg(short, long)]
    pub verbose: bool,

    /// Suppress non-error output
    ///
    /// Reduces log output to error level only, hiding informational messages.
    /// Useful for automated scripts. Cannot be used with --verbose.
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the worker (default)
    ///
    /// Loads configuration, connects to the database, registers the
    /// configured jobs on the cron clock and runs until Ctrl+C or SIGTERM.
    ///
    /// Examples:
    ///   darebox-worker run            # Start with defaults
    ///   darebox-worker run --dry-run  # Validate config without starting
    Run {
        /// Validate configuration and exit
        ///
        /// Performs a complete configuration validation check, including the
        /// configured cron expressions, without starting the worker.
        /// Returns exit code 0 if valid, non-zero if invalid.
        #[arg(long)]
        dry_run: bool,
    },
    /// List registered jobs
    ///
    /// Composes the scheduler from the current configuration without
    /// starting it and prints every registered job with its schedule,
    /// enabled flag and next fire time. Never touches the database.
    ///
    /// Examples:
    ///   darebox-worker jobs          # Human-readable table
    ///   darebox-worker jobs --json   # JSON for scripting
    Jobs {
        /// Print the job list as JSON
        #[arg(long)]
        json: bool,
    },
    /// Trigger one job immediately
    ///
    /// Runs the named job once, right now, regardless of its schedule or
    /// enabled flag, and reports the outcome. An unknown name is reported
    /// without failing the command.
    ///
    /// Examples:
    ///   darebox-worker run-job retention-cleanup
    ///   darebox-worker run-job task-auto-generate
    RunJob {
        /// Name of the job to run
        #[arg(value_name = "NAME")]
        name: String,
    },
}

/// Environment options
#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum Environment {
    #[value(name = "development", alias = "dev")]
    Development,
    #[value(name = "test")]
    Test,
    #[value(name = "staging", alias = "stage")]
    Staging,
    #[value(name = "production", alias = "prod")]
    Production,
}

impl Cli {
    /// Validate CLI arguments and provide detailed error messages
    ///
    /// This method performs additional validation beyond what clap provides,
    /// covering constructions that bypass the parser (tests, embedding).
    pub fn validate(&self) -> Result<(), String> {
        if let Some(Commands::RunJob { name }) = &self.command
            && name.trim().is_empty()
        {
            return Err("Job name cannot be empty".to_string());
        }

        if self.verbose && self.quiet {
            return Err("Cannot use --verbose and --quiet together".to_string());
        }

        Ok(())
    }
}

impl From<Environment> for crate::config::Environment {
    fn from(env: Environment) -> Self {
        match env {
            Environment::Development => crate::config::Environment::Development,
            Environment::Test => crate::config::Environment::Test,
            Environment::Staging => crate::config::Environment::Staging,
            Environment::Production => crate::config::Environment::Production,
        }
    }
}
