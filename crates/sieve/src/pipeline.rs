//! End-to-end run: archives in, spreadsheets out.
//!
//! Phase one walks the archives one at a time (extract, keyword filter,
//! drop the extracted tables). The rest is a fixed chain of directory to
//! directory stages; each stage's input directory is cleared once its output
//! is complete.

use crate::report::{ArchiveFailureReport, RunOutcome, RunReport, StageReport};
use anyhow::{Context, Result};
use sieve_protocol::{ConfigError, OutputMode, PipelineConfig, StageName};
use sieve_sinks::{export_to_xlsx, SinkError};
use sieve_stages::{
    extract_all, extract_archive, filter_and_merge, filter_keyword, filter_per_file,
    list_archives, list_csv_files, merge_and_rechunk, run_per_file, AddressClassification,
    AddressSplit, Projection, RoutingExtraction, StageError, TableTransform, TokenExtraction,
    Workspace,
};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

/// Failure of a run, tagged with where it happened.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Stage '{stage}' failed: {source}")]
    Stage {
        stage: StageName,
        #[source]
        source: StageError,
    },

    #[error("Spreadsheet export failed: {source}")]
    Export {
        #[source]
        source: SinkError,
    },

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl PipelineError {
    pub fn stage(&self) -> Option<StageName> {
        match self {
            PipelineError::Stage { stage, .. } => Some(*stage),
            PipelineError::Export { .. } => Some(StageName::SpreadsheetExport),
            PipelineError::Config(_) => None,
        }
    }
}

fn in_stage(stage: StageName) -> impl FnOnce(StageError) -> PipelineError {
    move |source| PipelineError::Stage { stage, source }
}

/// The one-to-one stages between merge and the severity filter, in order.
const TRANSFORM_CHAIN: [StageName; 7] = [
    StageName::ColumnProjection,
    StageName::RoutingExtraction,
    StageName::AddressSplit,
    StageName::AddressClassification,
    StageName::ProtocolExtraction,
    StageName::SeverityLevelExtraction,
    StageName::SeverityExtraction,
];

/// Build the transform for a one-to-one stage.
pub fn transform_for(
    stage: StageName,
    config: &PipelineConfig,
) -> Result<Option<Box<dyn TableTransform>>, PipelineError> {
    let transform: Box<dyn TableTransform> = match stage {
        StageName::ColumnProjection => Box::new(
            Projection::parse(&config.keep_columns).map_err(in_stage(stage))?,
        ),
        StageName::RoutingExtraction => Box::new(RoutingExtraction),
        StageName::AddressSplit => Box::new(AddressSplit),
        StageName::AddressClassification => Box::new(AddressClassification),
        StageName::ProtocolExtraction => Box::new(TokenExtraction::protocol()),
        StageName::SeverityLevelExtraction => Box::new(TokenExtraction::severity_level()),
        StageName::SeverityExtraction => Box::new(TokenExtraction::severity()),
        _ => return Ok(None),
    };
    Ok(Some(transform))
}

pub fn run(config: &PipelineConfig) -> Result<RunReport> {
    config.validate().map_err(PipelineError::from)?;
    // Surface selector mistakes before touching any archive.
    transform_for(StageName::ColumnProjection, config)?;

    let workspace = Workspace::new(&config.work_dir);
    // Scratch left by a kept or aborted run must not feed this one.
    let stale = workspace
        .cleanup_all()
        .context("Failed to clear scratch directories from a previous run")?;
    if stale > 0 {
        info!(dirs = stale, "Removed scratch directories from a previous run");
    }
    let mut report = RunReport::start();

    info!(
        source = %config.source_dir.display(),
        work = %config.work_dir.display(),
        keyword = %config.keyword,
        severity = %config.severity,
        "Pipeline starting"
    );

    let archives = list_archives(&config.source_dir)
        .map_err(in_stage(StageName::ArchiveExtraction))?;
    report.archives_found = archives.len();
    if archives.is_empty() {
        warn!(source = %config.source_dir.display(), "No archives to process");
        return finish(report, &workspace, config, RunOutcome::NoInput);
    }

    let filtered_dir = ingest_archives(&archives, &workspace, config, &mut report)?;
    if report.matched_rows == 0 {
        warn!(keyword = %config.keyword, "No rows matched the keyword");
        return finish(report, &workspace, config, RunOutcome::NoMatchingEvents);
    }

    // Merge & rechunk
    let merged_dir = stage_dir(&workspace, StageName::MergeRechunk)?;
    let filtered = list_csv_files(&filtered_dir).map_err(in_stage(StageName::MergeRechunk))?;
    let mut current = merge_and_rechunk(&filtered, &merged_dir, config.chunk_rows)
        .map_err(in_stage(StageName::MergeRechunk))?;
    report.record(StageName::MergeRechunk, current.len(), None);
    consume(&workspace, StageName::KeywordFilter, config)?;
    let mut previous = StageName::MergeRechunk;

    for stage in TRANSFORM_CHAIN {
        if current.is_empty() {
            warn!(stage = %stage, "Stage input is empty");
        }
        let output_dir = stage_dir(&workspace, stage)?;
        let transform = transform_for(stage, config)?
            .with_context(|| format!("Stage '{}' has no table transform", stage))?;
        let output =
            run_per_file(transform.as_ref(), &current, &output_dir).map_err(in_stage(stage))?;
        report.record(stage, output.files.len(), Some(output.rows));
        consume(&workspace, previous, config)?;
        current = output.files;
        previous = stage;
    }

    let final_tables = filter_by_severity(&current, &workspace, config)?;
    consume(&workspace, previous, config)?;
    report.record(StageName::SeverityFilter, final_tables.len(), None);
    if final_tables.is_empty() {
        warn!(severity = %config.severity, "No rows matched the target severity");
        return finish(report, &workspace, config, RunOutcome::NoMatchingEvents);
    }

    export(&final_tables, config, &mut report)?;
    report.final_tables = final_tables;
    finish(report, &workspace, config, RunOutcome::Exported)
}

/// Extract, filter, and discard each archive in turn. Returns the keyword
/// filter's output directory.
fn ingest_archives(
    archives: &[PathBuf],
    workspace: &Workspace,
    config: &PipelineConfig,
    report: &mut RunReport,
) -> Result<PathBuf, PipelineError> {
    let extract_dir = stage_dir(workspace, StageName::ArchiveExtraction)?;
    let filtered_dir = stage_dir(workspace, StageName::KeywordFilter)?;
    let mut extracted_files = 0;
    let mut filtered_files = 0;

    for archive in archives {
        let files = match extract_archive(archive, &extract_dir) {
            Ok(files) => files,
            Err(err) if err.is_recoverable() => {
                warn!(archive = %archive.display(), error = %err, "Skipping archive");
                report.archive_failures.push(ArchiveFailureReport {
                    archive: archive.clone(),
                    reason: err.to_string(),
                });
                continue;
            }
            Err(err) => return Err(in_stage(StageName::ArchiveExtraction)(err)),
        };
        extracted_files += files.len();

        let filtered = filter_keyword(&files, &filtered_dir, &config.keyword)
            .map_err(in_stage(StageName::KeywordFilter))?;
        report.matched_rows += filtered.matched_rows;
        filtered_files += filtered.files.len();

        for file in &files {
            fs::remove_file(file).map_err(|source| {
                in_stage(StageName::ArchiveExtraction)(StageError::Io {
                    path: file.clone(),
                    source,
                })
            })?;
        }
        if config.consume_archives {
            fs::remove_file(archive).map_err(|source| {
                in_stage(StageName::ArchiveExtraction)(StageError::Io {
                    path: archive.clone(),
                    source,
                })
            })?;
            info!(archive = %archive.display(), "Consumed archive");
        }
    }

    report.record(StageName::ArchiveExtraction, extracted_files, None);
    report.record(StageName::KeywordFilter, filtered_files, Some(report.matched_rows));
    consume(workspace, StageName::ArchiveExtraction, config)?;
    info!(
        archives = archives.len(),
        failures = report.archive_failures.len(),
        matched_rows = report.matched_rows,
        "Archive ingest finished"
    );
    Ok(filtered_dir)
}

fn filter_by_severity(
    inputs: &[PathBuf],
    workspace: &Workspace,
    config: &PipelineConfig,
) -> Result<Vec<PathBuf>, PipelineError> {
    let stage = StageName::SeverityFilter;
    let dir = stage_dir(workspace, stage)?;
    match config.output_mode {
        OutputMode::Merged => {
            let target = dir.join(config.severity.merged_file_name());
            let written = filter_and_merge(inputs, &target, config.severity)
                .map_err(in_stage(stage))?;
            Ok(written.into_iter().collect())
        }
        OutputMode::PerFile => {
            filter_per_file(inputs, &dir, config.severity).map_err(in_stage(stage))
        }
    }
}

fn export(final_tables: &[PathBuf], config: &PipelineConfig, report: &mut RunReport) -> Result<()> {
    for table in final_tables {
        let xlsx = export_to_xlsx(table, &config.output_dir, &config.spreadsheet)
            .map_err(|source| PipelineError::Export { source })?;
        report.spreadsheets.push(xlsx);

        if config.keep_csv {
            let name = table
                .file_name()
                .with_context(|| format!("Final table has no file name: {}", table.display()))?;
            let copy = config.output_dir.join(name);
            fs::copy(table, &copy).with_context(|| {
                format!("Failed to copy {} to {}", table.display(), copy.display())
            })?;
        }
    }
    report.record(StageName::SpreadsheetExport, report.spreadsheets.len(), None);
    Ok(())
}

fn finish(
    mut report: RunReport,
    workspace: &Workspace,
    config: &PipelineConfig,
    outcome: RunOutcome,
) -> Result<RunReport> {
    if !config.keep_intermediate {
        report.scratch_dirs_removed = workspace
            .cleanup_all()
            .context("Failed to remove scratch directories")?;
    }
    let report = report.finish(outcome);
    info!(
        outcome = report.outcome.as_str(),
        spreadsheets = report.spreadsheets.len(),
        elapsed_secs = report.elapsed_secs(),
        "Pipeline finished"
    );
    Ok(report)
}

fn stage_dir(workspace: &Workspace, stage: StageName) -> Result<PathBuf, PipelineError> {
    workspace.ensure_stage_dir(stage).map_err(in_stage(stage))
}

/// Drop a consumed input directory unless intermediates are being kept.
fn consume(
    workspace: &Workspace,
    stage: StageName,
    config: &PipelineConfig,
) -> Result<(), PipelineError> {
    if config.keep_intermediate {
        return Ok(());
    }
    workspace.clear_stage(stage).map_err(in_stage(stage))?;
    Ok(())
}

/// Run one stage over a directory on its own, outside a full run.
pub fn run_stage(
    stage: StageName,
    input_dir: &Path,
    output_dir: &Path,
    config: &PipelineConfig,
) -> Result<StageReport> {
    info!(
        stage = %stage,
        input = %input_dir.display(),
        output = %output_dir.display(),
        "Running single stage"
    );

    let report = match stage {
        StageName::ArchiveExtraction => {
            let summary = extract_all(input_dir, output_dir).map_err(in_stage(stage))?;
            for failure in &summary.failures {
                warn!(archive = %failure.archive.display(), reason = %failure.reason, "Archive skipped");
            }
            StageReport {
                stage,
                files: summary.files.len(),
                rows: None,
            }
        }
        StageName::KeywordFilter => {
            let inputs = list_csv_files(input_dir).map_err(in_stage(stage))?;
            let output = filter_keyword(&inputs, output_dir, &config.keyword)
                .map_err(in_stage(stage))?;
            StageReport {
                stage,
                files: output.files.len(),
                rows: Some(output.matched_rows),
            }
        }
        StageName::MergeRechunk => {
            let inputs = list_csv_files(input_dir).map_err(in_stage(stage))?;
            let files = merge_and_rechunk(&inputs, output_dir, config.chunk_rows)
                .map_err(in_stage(stage))?;
            StageReport {
                stage,
                files: files.len(),
                rows: None,
            }
        }
        StageName::SeverityFilter => {
            let inputs = list_csv_files(input_dir).map_err(in_stage(stage))?;
            let files = match config.output_mode {
                OutputMode::Merged => filter_and_merge(
                    &inputs,
                    &output_dir.join(config.severity.merged_file_name()),
                    config.severity,
                )
                .map_err(in_stage(stage))?
                .into_iter()
                .collect::<Vec<_>>(),
                OutputMode::PerFile => filter_per_file(&inputs, output_dir, config.severity)
                    .map_err(in_stage(stage))?,
            };
            StageReport {
                stage,
                files: files.len(),
                rows: None,
            }
        }
        StageName::SpreadsheetExport => {
            let inputs = list_csv_files(input_dir).map_err(in_stage(stage))?;
            for input in &inputs {
                export_to_xlsx(input, output_dir, &config.spreadsheet)
                    .map_err(|source| PipelineError::Export { source })?;
            }
            StageReport {
                stage,
                files: inputs.len(),
                rows: None,
            }
        }
        _ => {
            let transform = transform_for(stage, config)?
                .with_context(|| format!("Stage '{}' has no table transform", stage))?;
            let inputs = list_csv_files(input_dir).map_err(in_stage(stage))?;
            let output =
                run_per_file(transform.as_ref(), &inputs, output_dir).map_err(in_stage(stage))?;
            StageReport {
                stage,
                files: output.files.len(),
                rows: Some(output.rows),
            }
        }
    };

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_transform_chain_has_transforms() {
        let config = PipelineConfig::default();
        for stage in TRANSFORM_CHAIN {
            assert!(transform_for(stage, &config).unwrap().is_some(), "{}", stage);
        }
        assert!(transform_for(StageName::MergeRechunk, &config)
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_bad_selector_fails_before_reading_input() {
        let temp = TempDir::new().unwrap();
        let config = PipelineConfig {
            source_dir: temp.path().join("missing"),
            keep_columns: vec!["".to_string()],
            ..PipelineConfig::default()
        };
        let err = run(&config).unwrap_err();
        let err = err.downcast_ref::<PipelineError>().unwrap();
        assert_eq!(err.stage(), Some(StageName::ColumnProjection));
    }

    #[test]
    fn test_missing_source_dir_names_extract_stage() {
        let temp = TempDir::new().unwrap();
        let config = PipelineConfig {
            source_dir: temp.path().join("missing"),
            work_dir: temp.path().to_path_buf(),
            ..PipelineConfig::default()
        };
        let err = run(&config).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("extract"), "{}", message);
        assert!(message.contains("missing"), "{}", message);
    }
}
