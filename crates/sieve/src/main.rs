//! sieve command-line launcher
//!
//! - `run`: archives in, spreadsheets out
//! - `stage`: one stage over one directory
//! - `config`: show resolved settings

use clap::{Parser, Subcommand};
use sieve_logging::{init_logging, LogConfig};
use std::process::ExitCode;

mod cli;

#[derive(Parser, Debug)]
#[command(name = "sieve", version, about = "Batch ETL for zipped appliance syslog exports")]
struct Cli {
    /// Enable verbose logging (info/debug to stderr)
    #[arg(short = 'v', long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the whole pipeline
    Run(cli::run::RunArgs),

    /// Run a single stage over a directory
    Stage(cli::stage::StageArgs),

    /// Show resolved settings
    Config(cli::config::ConfigArgs),
}

fn command_wants_json(command: &Commands) -> bool {
    match command {
        Commands::Run(args) => args.json,
        Commands::Stage(args) => args.json,
        Commands::Config(args) => args.json,
    }
}

fn run_command(command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::Run(args) => cli::run::cmd_run(args),
        Commands::Stage(args) => cli::stage::cmd_stage(args),
        Commands::Config(args) => cli::config::run(args),
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let json_mode = command_wants_json(&cli.command);

    if let Err(err) = init_logging(LogConfig {
        app_name: "sieve",
        verbose: cli.verbose,
    }) {
        eprintln!("Warning: failed to initialize logging: {:#}", err);
    }

    match run_command(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = %format!("{:#}", err), "Command failed");
            if json_mode {
                cli::error::print_json_error(&err);
            } else {
                eprint!("{}", cli::error::HelpfulError::from_anyhow(&err));
            }
            ExitCode::from(1)
        }
    }
}
