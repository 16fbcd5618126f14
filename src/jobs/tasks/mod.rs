//! Concrete job bodies wired up by `jobs::setup`.

pub mod auto_generate;
pub mod retention_cleanup;
