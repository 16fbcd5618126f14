//! Repository layer for data access operations.
//!
//! Exposes narrow store traits so jobs can be exercised against in-memory
//! fakes, with Diesel-backed implementations used in production.

mod play_event_repo;
mod task_repo;

pub use play_event_repo::{PlayEventRepository, PlayEventStore};
pub use task_repo::{TaskRepository, TaskStore};
