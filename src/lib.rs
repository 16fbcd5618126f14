//! Darebox worker library
//!
//! Core library modules for the Darebox background job worker.

use shadow_rs::shadow;
shadow!(build);

pub mod cli;
pub mod config;
pub mod db;
pub mod error;
pub mod external;
pub mod jobs;
pub mod logger;
pub mod models;
pub mod repositories;
pub mod schema;
pub mod state;
pub mod worker;

pub use state::AppContext;
pub use worker::Worker;

pub fn pkg_version() -> &'static str {
    build::PKG_VERSION
}
