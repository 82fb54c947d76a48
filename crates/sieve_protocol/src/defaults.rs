//! Canonical default values shared across the pipeline.

pub const DEFAULT_KEYWORD: &str = "RT_IDP_ATTACK";
pub const DEFAULT_CHUNK_ROWS: usize = 800_000;
/// Timestamp, Hostname, AppName, Message of the raw export.
pub const DEFAULT_KEEP_COLUMNS: &[&str] = &["0", "1", "2", "6"];
pub const DEFAULT_SOURCE_DIR: &str = "source_logs";
pub const DEFAULT_WORK_DIR: &str = ".";
pub const DEFAULT_OUTPUT_DIR: &str = "final_output";
pub const DEFAULT_FONT_NAME: &str = "Yu Gothic";
pub const DEFAULT_FONT_SIZE: u32 = 11;
pub const DEFAULT_MIN_WIDTH: u32 = 10;
pub const DEFAULT_MAX_WIDTH: u32 = 50;
pub const MERGED_CHUNK_PREFIX: &str = "merged";
pub const CSV_EXTENSION: &str = "csv";
pub const ARCHIVE_EXTENSION: &str = "zip";
