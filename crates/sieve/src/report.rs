//! What a run did, in a form the CLI can print as a table or as JSON.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sieve_protocol::StageName;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunOutcome {
    /// At least one spreadsheet was written.
    Exported,
    /// Input existed but nothing survived the keyword or severity filter.
    NoMatchingEvents,
    /// No archive was found in the source directory.
    NoInput,
}

impl RunOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunOutcome::Exported => "exported",
            RunOutcome::NoMatchingEvents => "no_matching_events",
            RunOutcome::NoInput => "no_input",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageReport {
    pub stage: StageName,
    pub files: usize,
    /// Rows written, when the stage counts them.
    pub rows: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveFailureReport {
    pub archive: PathBuf,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub outcome: RunOutcome,
    pub archives_found: usize,
    pub archive_failures: Vec<ArchiveFailureReport>,
    /// Rows that passed the keyword filter.
    pub matched_rows: usize,
    pub stages: Vec<StageReport>,
    pub final_tables: Vec<PathBuf>,
    pub spreadsheets: Vec<PathBuf>,
    pub scratch_dirs_removed: usize,
}

impl RunReport {
    pub(crate) fn start() -> Self {
        let now = Utc::now();
        Self {
            started_at: now,
            finished_at: now,
            outcome: RunOutcome::NoInput,
            archives_found: 0,
            archive_failures: Vec::new(),
            matched_rows: 0,
            stages: Vec::new(),
            final_tables: Vec::new(),
            spreadsheets: Vec::new(),
            scratch_dirs_removed: 0,
        }
    }

    pub(crate) fn record(&mut self, stage: StageName, files: usize, rows: Option<usize>) {
        self.stages.push(StageReport { stage, files, rows });
    }

    pub(crate) fn finish(mut self, outcome: RunOutcome) -> Self {
        self.outcome = outcome;
        self.finished_at = Utc::now();
        self
    }

    pub fn stage(&self, stage: StageName) -> Option<&StageReport> {
        self.stages.iter().find(|s| s.stage == stage)
    }

    pub fn elapsed_secs(&self) -> f64 {
        (self.finished_at - self.started_at).num_milliseconds() as f64 / 1000.0
    }
}
