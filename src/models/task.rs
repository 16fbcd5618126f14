use chrono::NaiveDateTime;
use diesel::prelude::*;
use diesel_derive_enum::DbEnum;
use serde::{Deserialize, Serialize};

use crate::schema::tasks;

/// Whether a task asks the player to answer a question or perform an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, DbEnum)]
#[db_enum(existing_type_path = "crate::schema::sql_types::TaskKind")]
#[serde(rename_all = "lowercase")]
pub enum TaskKind {
    Truth,
    Dare,
}

impl std::fmt::Display for TaskKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskKind::Truth => write!(f, "truth"),
            TaskKind::Dare => write!(f, "dare"),
        }
    }
}

/// Where a task row came from: shipped with the app or produced by the
/// generation job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, DbEnum)]
#[db_enum(existing_type_path = "crate::schema::sql_types::TaskSource")]
#[serde(rename_all = "lowercase")]
pub enum TaskSource {
    Seed,
    Generated,
}

impl std::fmt::Display for TaskSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskSource::Seed => write!(f, "seed"),
            TaskSource::Generated => write!(f, "generated"),
        }
    }
}

#[derive(Debug, Clone, Queryable, Selectable, Serialize)]
#[diesel(table_name = tasks)]
pub struct Task {
    pub id: i32,
    pub category: String,
    pub kind: TaskKind,
    pub text: String,
    pub source: TaskSource,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = tasks)]
pub struct NewTask {
    pub category: String,
    pub kind: TaskKind,
    pub text: String,
    pub source: TaskSource,
}

impl NewTask {
    /// Convenience constructor for rows produced by the generation job.
    pub fn generated(category: &str, kind: TaskKind, text: String) -> Self {
        Self {
            category: category.to_string(),
            kind,
            text,
            source: TaskSource::Generated,
        }
    }
}
