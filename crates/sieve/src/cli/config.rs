//! Settings resolution and the `config` command.
//!
//! Precedence: command-line flags, then `--config FILE` (or `./sieve.toml`
//! when present), then built-in defaults.

use crate::cli::error::HelpfulError;
use crate::cli::output::print_table;
use anyhow::Result;
use sieve_protocol::paths::{default_config_path, default_logs_dir};
use sieve_protocol::{OutputMode, PipelineConfig, Severity};
use std::path::{Path, PathBuf};

/// Flags shared by `run` and `stage` that tune stage behaviour.
#[derive(Debug, Clone, Default, clap::Args)]
pub struct StageOptions {
    /// Substring a Message must contain to be kept
    #[arg(long)]
    pub keyword: Option<String>,

    /// Severity to keep in the final table
    #[arg(long, value_enum)]
    pub severity: Option<Severity>,

    /// Row ceiling per merged chunk
    #[arg(long)]
    pub chunk_rows: Option<usize>,

    /// Columns to keep, by 0-based position or name (comma separated)
    #[arg(long, value_delimiter = ',')]
    pub keep_columns: Option<Vec<String>>,

    /// Write one severity table (and spreadsheet) per chunk instead of one merged table
    #[arg(long)]
    pub per_file: bool,
}

impl StageOptions {
    pub fn apply(&self, config: &mut PipelineConfig) {
        if let Some(keyword) = &self.keyword {
            config.keyword = keyword.clone();
        }
        if let Some(severity) = self.severity {
            config.severity = severity;
        }
        if let Some(chunk_rows) = self.chunk_rows {
            config.chunk_rows = chunk_rows;
        }
        if let Some(columns) = &self.keep_columns {
            config.keep_columns = columns.iter().map(|c| c.trim().to_string()).collect();
        }
        if self.per_file {
            config.output_mode = OutputMode::PerFile;
        }
    }
}

/// Load the config file, if any. Returns the config and where it came from.
pub fn load_config(explicit: Option<&Path>) -> Result<(PipelineConfig, Option<PathBuf>)> {
    let path = match explicit {
        Some(path) => Some(path.to_path_buf()),
        None => Some(default_config_path()).filter(|p| p.is_file()),
    };
    match path {
        Some(path) => {
            let config =
                PipelineConfig::load(&path).map_err(|e| HelpfulError::config_error(&e))?;
            Ok((config, Some(path)))
        }
        None => Ok((PipelineConfig::default(), None)),
    }
}

/// Arguments for the config command
#[derive(Debug, clap::Args)]
pub struct ConfigArgs {
    /// Config file to resolve (default: ./sieve.toml when present)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, conflicts_with = "toml")]
    pub json: bool,

    /// Output as TOML, ready to save as sieve.toml
    #[arg(long)]
    pub toml: bool,
}

pub fn run(args: ConfigArgs) -> Result<()> {
    let (config, source) = load_config(args.config.as_deref())?;
    let valid = config.validate();

    if args.toml {
        print!(
            "{}",
            toml::to_string_pretty(&config).map_err(|e| anyhow::anyhow!(e))?
        );
        return Ok(());
    }

    if args.json {
        let payload = serde_json::json!({
            "source": source.as_ref().map(|p| p.to_string_lossy().into_owned()),
            "logs_dir": default_logs_dir().to_string_lossy(),
            "valid": valid.is_ok(),
            "error": valid.as_ref().err().map(|e| e.to_string()),
            "config": config,
        });
        println!("{}", serde_json::to_string_pretty(&payload)?);
        return Ok(());
    }

    let source_label = source
        .as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "(defaults)".to_string());
    let rows = vec![
        vec!["config".to_string(), source_label],
        vec!["source_dir".to_string(), config.source_dir.display().to_string()],
        vec!["work_dir".to_string(), config.work_dir.display().to_string()],
        vec!["output_dir".to_string(), config.output_dir.display().to_string()],
        vec!["keyword".to_string(), config.keyword.clone()],
        vec!["severity".to_string(), config.severity.to_string()],
        vec!["chunk_rows".to_string(), config.chunk_rows.to_string()],
        vec!["keep_columns".to_string(), config.keep_columns.join(",")],
        vec!["output_mode".to_string(), config.output_mode.as_str().to_string()],
        vec!["consume_archives".to_string(), config.consume_archives.to_string()],
        vec!["keep_intermediate".to_string(), config.keep_intermediate.to_string()],
        vec!["keep_csv".to_string(), config.keep_csv.to_string()],
        vec![
            "spreadsheet.font".to_string(),
            format!("{} {}pt", config.spreadsheet.font_name, config.spreadsheet.font_size),
        ],
        vec![
            "spreadsheet.width".to_string(),
            format!("{}..{}", config.spreadsheet.min_width, config.spreadsheet.max_width),
        ],
        vec!["logs_dir".to_string(), default_logs_dir().display().to_string()],
    ];
    print_table(&["SETTING", "VALUE"], rows);

    if let Err(err) = valid {
        return Err(HelpfulError::config_error(&err).into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_options_override_config() {
        let mut config = PipelineConfig::default();
        let options = StageOptions {
            keyword: Some("RT_SCREEN".to_string()),
            severity: Some(Severity::Warning),
            chunk_rows: Some(10),
            keep_columns: Some(vec![" 0".to_string(), "Message".to_string()]),
            per_file: true,
        };
        options.apply(&mut config);

        assert_eq!(config.keyword, "RT_SCREEN");
        assert_eq!(config.severity, Severity::Warning);
        assert_eq!(config.chunk_rows, 10);
        assert_eq!(config.keep_columns, vec!["0", "Message"]);
        assert_eq!(config.output_mode, OutputMode::PerFile);
    }

    #[test]
    fn test_empty_options_leave_config_alone() {
        let mut config = PipelineConfig::default();
        StageOptions::default().apply(&mut config);
        assert_eq!(config, PipelineConfig::default());
    }

    #[test]
    fn test_load_explicit_config() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("custom.toml");
        std::fs::write(&path, "keyword = \"RT_SCREEN\"\n").unwrap();

        let (config, source) = load_config(Some(&path)).unwrap();
        assert_eq!(config.keyword, "RT_SCREEN");
        assert_eq!(source, Some(path));
    }

    #[test]
    fn test_missing_explicit_config_is_helpful() {
        let err = load_config(Some(Path::new("/nonexistent/sieve.toml"))).unwrap_err();
        let helpful = err.downcast_ref::<HelpfulError>().unwrap();
        assert!(helpful.suggestions.iter().any(|s| s.starts_with("TRY:")));
    }
}
