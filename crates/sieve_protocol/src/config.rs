//! Pipeline configuration.
//!
//! Loaded from TOML, then overridden field by field from the command line.
//! Every stage entry point takes the values it needs from here.

use crate::defaults::{
    DEFAULT_CHUNK_ROWS, DEFAULT_FONT_NAME, DEFAULT_FONT_SIZE, DEFAULT_KEEP_COLUMNS,
    DEFAULT_KEYWORD, DEFAULT_MAX_WIDTH, DEFAULT_MIN_WIDTH, DEFAULT_OUTPUT_DIR,
    DEFAULT_SOURCE_DIR, DEFAULT_WORK_DIR,
};
use crate::Severity;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write config {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("Invalid setting '{field}': {message}")]
    Invalid { field: &'static str, message: String },
}

/// How the severity stage writes its survivors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputMode {
    /// One table holding every surviving row.
    #[default]
    Merged,
    /// One table per input chunk that has survivors.
    PerFile,
}

impl OutputMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputMode::Merged => "merged",
            OutputMode::PerFile => "per_file",
        }
    }
}

/// Cosmetics of the exported spreadsheet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpreadsheetStyle {
    #[serde(default = "default_font_name")]
    pub font_name: String,
    #[serde(default = "default_font_size")]
    pub font_size: u32,
    #[serde(default = "default_min_width")]
    pub min_width: u32,
    #[serde(default = "default_max_width")]
    pub max_width: u32,
}

impl Default for SpreadsheetStyle {
    fn default() -> Self {
        Self {
            font_name: default_font_name(),
            font_size: default_font_size(),
            min_width: default_min_width(),
            max_width: default_max_width(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Directory holding the zipped exports
    #[serde(default = "default_source_dir")]
    pub source_dir: PathBuf,

    /// Parent of every scratch directory
    #[serde(default = "default_work_dir")]
    pub work_dir: PathBuf,

    /// Where spreadsheets land
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Substring a Message must contain to survive the keyword filter
    #[serde(default = "default_keyword")]
    pub keyword: String,

    #[serde(default)]
    pub severity: Severity,

    /// Row ceiling per merged chunk
    #[serde(default = "default_chunk_rows")]
    pub chunk_rows: usize,

    /// Projection selectors: 0-based positions or field names
    #[serde(default = "default_keep_columns")]
    pub keep_columns: Vec<String>,

    #[serde(default)]
    pub output_mode: OutputMode,

    /// Delete each archive once its filtered rows are on disk
    #[serde(default)]
    pub consume_archives: bool,

    /// Leave scratch directories in place after a successful run
    #[serde(default)]
    pub keep_intermediate: bool,

    /// Copy the final CSV table(s) next to the spreadsheets
    #[serde(default)]
    pub keep_csv: bool,

    #[serde(default)]
    pub spreadsheet: SpreadsheetStyle,
}

fn default_source_dir() -> PathBuf {
    PathBuf::from(DEFAULT_SOURCE_DIR)
}

fn default_work_dir() -> PathBuf {
    PathBuf::from(DEFAULT_WORK_DIR)
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(DEFAULT_OUTPUT_DIR)
}

fn default_keyword() -> String {
    DEFAULT_KEYWORD.to_string()
}

fn default_chunk_rows() -> usize {
    DEFAULT_CHUNK_ROWS
}

fn default_keep_columns() -> Vec<String> {
    DEFAULT_KEEP_COLUMNS.iter().map(|s| s.to_string()).collect()
}

fn default_font_name() -> String {
    DEFAULT_FONT_NAME.to_string()
}

fn default_font_size() -> u32 {
    DEFAULT_FONT_SIZE
}

fn default_min_width() -> u32 {
    DEFAULT_MIN_WIDTH
}

fn default_max_width() -> u32 {
    DEFAULT_MAX_WIDTH
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            source_dir: default_source_dir(),
            work_dir: default_work_dir(),
            output_dir: default_output_dir(),
            keyword: default_keyword(),
            severity: Severity::default(),
            chunk_rows: default_chunk_rows(),
            keep_columns: default_keep_columns(),
            output_mode: OutputMode::default(),
            consume_archives: false,
            keep_intermediate: false,
            keep_csv: false,
            spreadsheet: SpreadsheetStyle::default(),
        }
    }
}

impl PipelineConfig {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Save configuration to a TOML file
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        std::fs::write(path, content).map_err(|source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Reject settings no stage can run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.keyword.is_empty() {
            return Err(ConfigError::Invalid {
                field: "keyword",
                message: "must not be empty".to_string(),
            });
        }
        if self.chunk_rows == 0 {
            return Err(ConfigError::Invalid {
                field: "chunk_rows",
                message: "must be at least 1".to_string(),
            });
        }
        if self.keep_columns.is_empty() {
            return Err(ConfigError::Invalid {
                field: "keep_columns",
                message: "must name at least one column".to_string(),
            });
        }
        let mut seen = HashSet::new();
        for selector in &self.keep_columns {
            if !seen.insert(selector.trim()) {
                return Err(ConfigError::Invalid {
                    field: "keep_columns",
                    message: format!("'{}' is listed more than once", selector.trim()),
                });
            }
        }
        if self.spreadsheet.min_width > self.spreadsheet.max_width {
            return Err(ConfigError::Invalid {
                field: "spreadsheet.min_width",
                message: format!(
                    "{} exceeds max_width {}",
                    self.spreadsheet.min_width, self.spreadsheet.max_width
                ),
            });
        }
        if self.spreadsheet.font_size == 0 {
            return Err(ConfigError::Invalid {
                field: "spreadsheet.font_size",
                message: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = PipelineConfig::default();
        assert_eq!(config.keyword, "RT_IDP_ATTACK");
        assert_eq!(config.severity, Severity::Critical);
        assert_eq!(config.chunk_rows, 800_000);
        assert_eq!(config.keep_columns, vec!["0", "1", "2", "6"]);
        assert_eq!(config.output_mode, OutputMode::Merged);
        assert_eq!(config.spreadsheet.min_width, 10);
        assert_eq!(config.spreadsheet.max_width, 50);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config: PipelineConfig = toml::from_str(
            r#"
            keyword = "RT_SCREEN"
            severity = "WARNING"
            output_mode = "per_file"

            [spreadsheet]
            font_size = 9
            "#,
        )
        .unwrap();
        assert_eq!(config.keyword, "RT_SCREEN");
        assert_eq!(config.severity, Severity::Warning);
        assert_eq!(config.output_mode, OutputMode::PerFile);
        assert_eq!(config.spreadsheet.font_size, 9);
        assert_eq!(config.spreadsheet.font_name, "Yu Gothic");
        assert_eq!(config.chunk_rows, 800_000);
    }

    #[test]
    fn test_save_then_load() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("sieve.toml");
        let config = PipelineConfig {
            keyword: "RT_SCREEN".to_string(),
            chunk_rows: 1000,
            ..PipelineConfig::default()
        };
        config.save(&path).unwrap();
        assert_eq!(PipelineConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn test_load_missing_file() {
        let err = PipelineConfig::load(Path::new("/nonexistent/sieve.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn test_validate_rejects_zero_ceiling() {
        let config = PipelineConfig {
            chunk_rows: 0,
            ..PipelineConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("chunk_rows"));
    }

    #[test]
    fn test_validate_rejects_duplicate_columns() {
        let config = PipelineConfig {
            keep_columns: vec!["0".to_string(), "1".to_string(), "0".to_string()],
            ..PipelineConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("more than once"));
    }

    #[test]
    fn test_validate_rejects_inverted_widths() {
        let mut config = PipelineConfig::default();
        config.spreadsheet.min_width = 60;
        assert!(config.validate().is_err());
    }
}
