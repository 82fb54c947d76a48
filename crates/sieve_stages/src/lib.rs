//! Transform stages of the sieve pipeline.
//!
//! Every stage reads CSV tables from one directory and writes CSV tables to
//! another:
//! - Archive extraction and keyword filtering on the way in
//! - Merge & rechunk into bounded files
//! - Projection, routing, address split and classification, token extraction
//! - Severity filter (merged or file-preserving)
//!
//! One-to-one stages implement [`TableTransform`] and run through
//! [`run_per_file`], which enforces row-count preservation.

pub mod archive;
pub mod classify;
pub mod error;
pub mod keyword;
pub mod projection;
pub mod rechunk;
pub mod routing;
pub mod severity;
pub mod split;
pub mod stage;
pub mod table;
pub mod token;
pub mod workspace;

pub use archive::{extract_all, extract_archive, list_archives, ArchiveFailure, ExtractionSummary};
pub use classify::{classify_address, AddressClassification};
pub use error::{StageError, StageResult};
pub use keyword::{filter_keyword, KeywordFilterOutput};
pub use projection::{ColumnSelector, Projection};
pub use rechunk::{chunk_file_name, merge_and_rechunk};
pub use routing::{extract_routing, RoutingExtraction};
pub use severity::{filter_and_merge, filter_per_file};
pub use split::{split_routing, AddressSplit};
pub use stage::{run_per_file, StageOutput, TableTransform};
pub use table::{list_csv_files, Table};
pub use token::TokenExtraction;
pub use workspace::Workspace;
