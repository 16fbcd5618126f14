//! Clients for services outside the worker's own database.

mod ai;

pub use ai::{CompletionClient, CompletionRequest, OpenAiClient};
