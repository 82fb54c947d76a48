//! `sieve run`: the full pipeline.

use crate::cli::config::{load_config, StageOptions};
use crate::cli::error::HelpfulError;
use crate::cli::output::print_run_summary;
use anyhow::Result;
use sieve_protocol::PipelineConfig;
use std::path::PathBuf;

/// Arguments for the run command
#[derive(Debug, clap::Args)]
pub struct RunArgs {
    /// Config file (default: ./sieve.toml when present)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Directory holding the zipped exports
    #[arg(long)]
    pub source: Option<PathBuf>,

    /// Parent directory for scratch directories
    #[arg(long)]
    pub work_dir: Option<PathBuf>,

    /// Where spreadsheets are written
    #[arg(long)]
    pub output: Option<PathBuf>,

    #[command(flatten)]
    pub options: StageOptions,

    /// Delete each archive once its filtered rows are written
    #[arg(long)]
    pub consume_archives: bool,

    /// Keep scratch directories after the run
    #[arg(long)]
    pub keep_intermediate: bool,

    /// Copy the final CSV table(s) next to the spreadsheets
    #[arg(long)]
    pub keep_csv: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl RunArgs {
    pub fn resolve(&self) -> Result<PipelineConfig> {
        let (mut config, _) = load_config(self.config.as_deref())?;
        if let Some(source) = &self.source {
            config.source_dir = source.clone();
        }
        if let Some(work_dir) = &self.work_dir {
            config.work_dir = work_dir.clone();
        }
        if let Some(output) = &self.output {
            config.output_dir = output.clone();
        }
        self.options.apply(&mut config);
        config.consume_archives |= self.consume_archives;
        config.keep_intermediate |= self.keep_intermediate;
        config.keep_csv |= self.keep_csv;
        Ok(config)
    }
}

pub fn cmd_run(args: RunArgs) -> Result<()> {
    let config = args.resolve()?;
    config
        .validate()
        .map_err(|e| HelpfulError::config_error(&e))?;

    if !config.source_dir.is_dir() {
        return Err(HelpfulError::dir_not_found(&config.source_dir, "Source directory")
            .with_suggestion("TRY: Pass --source DIR or set source_dir in sieve.toml")
            .into());
    }

    let report = sieve::run(&config)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_run_summary(&report);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use sieve_protocol::{OutputMode, Severity};

    #[derive(Parser)]
    struct Harness {
        #[command(flatten)]
        args: RunArgs,
    }

    #[test]
    fn test_flags_override_defaults() {
        let harness = Harness::parse_from([
            "sieve",
            "--config",
            "/nonexistent/never-read.toml",
        ]);
        assert!(harness.args.resolve().is_err());

        let harness = Harness::parse_from([
            "sieve",
            "--source",
            "in",
            "--output",
            "out",
            "--severity",
            "WARNING",
            "--keep-columns",
            "0,1,Message",
            "--per-file",
            "--keep-csv",
        ]);
        let config = harness.args.resolve().unwrap();
        assert_eq!(config.source_dir, PathBuf::from("in"));
        assert_eq!(config.output_dir, PathBuf::from("out"));
        assert_eq!(config.severity, Severity::Warning);
        assert_eq!(config.keep_columns, vec!["0", "1", "Message"]);
        assert_eq!(config.output_mode, OutputMode::PerFile);
        assert!(config.keep_csv);
        assert!(!config.consume_archives);
    }
}
