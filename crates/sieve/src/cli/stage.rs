//! `sieve stage`: run one stage over a directory.

use crate::cli::config::{load_config, StageOptions};
use crate::cli::error::HelpfulError;
use crate::cli::output::print_stage_table;
use anyhow::Result;
use sieve_protocol::StageName;
use std::path::PathBuf;

/// Arguments for the stage command
#[derive(Debug, clap::Args)]
pub struct StageArgs {
    /// Stage to run
    #[arg(value_enum)]
    pub stage: StageName,

    /// Directory of input tables (or archives, for `extract`)
    #[arg(long)]
    pub input: PathBuf,

    /// Directory to write into
    #[arg(long)]
    pub output: PathBuf,

    /// Config file (default: ./sieve.toml when present)
    #[arg(long)]
    pub config: Option<PathBuf>,

    #[command(flatten)]
    pub options: StageOptions,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

pub fn cmd_stage(args: StageArgs) -> Result<()> {
    let (mut config, _) = load_config(args.config.as_deref())?;
    args.options.apply(&mut config);
    config
        .validate()
        .map_err(|e| HelpfulError::config_error(&e))?;

    if !args.input.is_dir() {
        return Err(HelpfulError::dir_not_found(&args.input, "Input directory").into());
    }
    if args.input == args.output {
        return Err(HelpfulError::new("Input and output directories must differ")
            .with_context(format!("Both are {}", args.input.display()))
            .with_suggestion("TRY: Write the stage output to a fresh directory")
            .into());
    }

    let report = sieve::run_stage(args.stage, &args.input, &args.output, &config)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_stage_table(std::slice::from_ref(&report));
    }
    Ok(())
}
