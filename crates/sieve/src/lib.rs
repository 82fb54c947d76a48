//! sieve: batch ETL for zipped appliance syslog exports.
//!
//! Archives are unpacked and filtered by keyword, merged into bounded
//! chunks, enriched column by column, filtered by severity, and exported as
//! formatted spreadsheets. [`pipeline::run`] drives a whole run;
//! [`pipeline::run_stage`] runs a single stage over a directory.

pub mod pipeline;
pub mod report;

pub use pipeline::{run, run_stage, PipelineError};
pub use report::{ArchiveFailureReport, RunOutcome, RunReport, StageReport};
