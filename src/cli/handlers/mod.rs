//! Command handlers for CLI operations
//!
//! This module contains handlers for different CLI commands,
//! separating command execution logic from parsing and validation.

pub mod jobs;
pub mod run;
pub mod run_job;

pub use jobs::JobsCommandHandler;
pub use run::RunCommandHandler;
pub use run_job::RunJobCommandHandler;
