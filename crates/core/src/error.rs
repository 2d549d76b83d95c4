use std::path::PathBuf;

use crate::domain::TrackedField;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("EXIF parsing error: {0}")]
    Exif(#[from] exif::Error),

    #[error("walkdir error: {0}")]
    WalkDir(#[from] walkdir::Error),

    #[error("photo not found: {0}")]
    PhotoNotFound(String),

    #[error("photo already exists: {0}")]
    PhotoAlreadyExists(String),

    #[error("unknown tracked field: {0} (expected one of year, month, tags, model, lens, email, nick)")]
    UnknownField(String),

    #[error("invalid date {0:?}, expected YYYY-MM-DD or YYYY-MM-DD HH:MM")]
    InvalidDate(String),

    #[error("invalid config value for {key}: {value:?}")]
    InvalidConfig { key: String, value: String },

    #[error("path is not a directory: {}", .0.display())]
    NotADirectory(PathBuf),

    #[error(
        "counter update stopped after {completed}/{total} steps at {step}; recompute {}",
        field_list(.stale_fields)
    )]
    PartialUpdate {
        completed: usize,
        total: usize,
        step: String,
        stale_fields: Vec<TrackedField>,
        #[source]
        source: Box<Error>,
    },
}

fn field_list(fields: &[TrackedField]) -> String {
    fields
        .iter()
        .map(|f| f.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

pub type Result<T> = std::result::Result<T, Error>;
