//! Output sinks for finished sieve tables.
//!
//! The only sink today renders a CSV table as an `.xlsx` workbook: one
//! sheet, bold header, one font throughout, columns sized to their content.

use std::path::PathBuf;
use thiserror::Error;

mod xlsx;
mod xml;

pub use xlsx::{column_width, export_to_xlsx, MAX_DATA_ROWS};

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("Input table not found: {}", path.display())]
    MissingInput { path: PathBuf },

    #[error("{} has {rows} data rows; a worksheet holds at most {max}", path.display())]
    TooManyRows { path: PathBuf, rows: usize, max: usize },

    #[error("Failed to read {}: {source}", path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("Failed to write workbook {}: {source}", path.display())]
    Zip {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },

    #[error("IO error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type SinkResult<T> = std::result::Result<T, SinkError>;
