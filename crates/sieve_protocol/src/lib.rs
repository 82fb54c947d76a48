//! Shared vocabulary for the sieve pipeline.
//!
//! Every crate in the workspace agrees on the field names, defaults, and
//! configuration defined here. Stages never reach for process-wide state;
//! they receive a [`PipelineConfig`] (or the pieces of it they need).

pub mod config;
pub mod defaults;
pub mod fields;
pub mod paths;
pub mod severity;
pub mod stage;

pub use config::{ConfigError, OutputMode, PipelineConfig, SpreadsheetStyle};
pub use severity::Severity;
pub use stage::StageName;
