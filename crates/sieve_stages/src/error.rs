//! Error taxonomy for the transform stages.
//!
//! Structural problems (a missing file, a missing field, a projection past the
//! table's width) are fatal. A message that does not match an extraction
//! pattern is not an error at all: the derived field is left empty.

use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StageError {
    #[error("Required input not found: {}", path.display())]
    MissingResource { path: PathBuf },

    #[error("Field '{field}' not found in {}", file.display())]
    Schema { field: String, file: PathBuf },

    #[error("Column position {index} is out of range for {} ({width} columns)", file.display())]
    ColumnIndex {
        index: usize,
        width: usize,
        file: PathBuf,
    },

    #[error("Malformed archive {}: {reason}", path.display())]
    MalformedArchive { path: PathBuf, reason: String },

    #[error("Failed to parse CSV {}: {source}", file.display())]
    Csv {
        file: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("IO error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid stage setting: {0}")]
    Config(String),

    #[error("Stage '{stage}' changed the row count of {} ({before} -> {after})", file.display())]
    RowCountChanged {
        stage: &'static str,
        file: PathBuf,
        before: usize,
        after: usize,
    },
}

pub type StageResult<T> = std::result::Result<T, StageError>;

impl StageError {
    pub(crate) fn io(path: &Path, source: std::io::Error) -> Self {
        StageError::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    pub(crate) fn csv(file: &Path, source: csv::Error) -> Self {
        StageError::Csv {
            file: file.to_path_buf(),
            source,
        }
    }

    pub(crate) fn schema(field: &str, file: &Path) -> Self {
        StageError::Schema {
            field: field.to_string(),
            file: file.to_path_buf(),
        }
    }

    pub(crate) fn malformed_archive(path: &Path, reason: impl Into<String>) -> Self {
        StageError::MalformedArchive {
            path: path.to_path_buf(),
            reason: reason.into(),
        }
    }

    /// Batch stages skip the item and carry on for these; everything else
    /// aborts the run.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, StageError::MalformedArchive { .. })
    }

    /// The file the error is about, when there is one.
    pub fn path(&self) -> Option<&Path> {
        match self {
            StageError::MissingResource { path }
            | StageError::MalformedArchive { path, .. }
            | StageError::Io { path, .. } => Some(path),
            StageError::Schema { file, .. }
            | StageError::ColumnIndex { file, .. }
            | StageError::Csv { file, .. }
            | StageError::RowCountChanged { file, .. } => Some(file),
            StageError::Config(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_error_names_field_and_file() {
        let err = StageError::schema("Message", Path::new("logs/a.csv"));
        let display = err.to_string();
        assert!(display.contains("Message"));
        assert!(display.contains("logs/a.csv"));
        assert_eq!(err.path(), Some(Path::new("logs/a.csv")));
    }

    #[test]
    fn test_only_archives_are_recoverable() {
        assert!(StageError::malformed_archive(Path::new("a.zip"), "empty").is_recoverable());
        assert!(!StageError::schema("Severity", Path::new("a.csv")).is_recoverable());
        assert!(!StageError::MissingResource {
            path: PathBuf::from("source_logs")
        }
        .is_recoverable());
    }
}
