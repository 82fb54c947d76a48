//! Severity filter: keep rows whose `Severity` equals the target exactly.
//!
//! Merged mode concatenates every survivor into one file. Per-file mode
//! writes one same-named file per input that kept at least one row.

use crate::error::{StageError, StageResult};
use crate::table::{Table, TableWriter};
use sieve_protocol::fields::SEVERITY;
use sieve_protocol::Severity;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Returns `None` when no row survived; no file is written then.
pub fn filter_and_merge(
    inputs: &[PathBuf],
    output_file: &Path,
    severity: Severity,
) -> StageResult<Option<PathBuf>> {
    let target = severity.as_str();
    let mut writer: Option<TableWriter> = None;

    for input in sorted(inputs) {
        let Some(table) = read_filtered(&input, target)? else {
            continue;
        };
        if writer.is_none() {
            writer = Some(TableWriter::create(output_file, table.headers())?);
        }
        if let Some(w) = writer.as_mut() {
            for row in table.rows() {
                w.write_row(row)?;
            }
        }
    }

    match writer {
        Some(w) => {
            let rows = w.rows_written();
            w.finish()?;
            info!(severity = target, rows, file = %output_file.display(), "Severity merge finished");
            Ok(Some(output_file.to_path_buf()))
        }
        None => {
            info!(severity = target, "No rows matched severity");
            Ok(None)
        }
    }
}

/// File-preserving variant of [`filter_and_merge`].
pub fn filter_per_file(
    inputs: &[PathBuf],
    output_dir: &Path,
    severity: Severity,
) -> StageResult<Vec<PathBuf>> {
    let target = severity.as_str();
    let mut written = Vec::new();

    for input in sorted(inputs) {
        let Some(table) = read_filtered(&input, target)? else {
            continue;
        };
        let file_name = input.file_name().ok_or_else(|| StageError::MissingResource {
            path: input.clone(),
        })?;
        let path = output_dir.join(file_name);
        table.write(&path)?;
        debug!(file = %path.display(), rows = table.len(), "Wrote severity table");
        written.push(path);
    }

    info!(severity = target, files = written.len(), "Severity filter finished");
    Ok(written)
}

/// The input with only matching rows, or `None` if nothing matched.
fn read_filtered(input: &Path, target: &str) -> StageResult<Option<Table>> {
    let mut table = Table::read(input)?;
    if table.is_blank() {
        warn!(file = %input.display(), "Skipping empty table");
        return Ok(None);
    }
    let column = table.require_column(SEVERITY, input)?;
    table.retain_rows(|row| row.get(column).map(String::as_str) == Some(target));
    if table.is_empty() {
        debug!(file = %input.display(), "No rows matched severity");
        return Ok(None);
    }
    Ok(Some(table))
}

fn sorted(inputs: &[PathBuf]) -> Vec<PathBuf> {
    let mut inputs = inputs.to_vec();
    inputs.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    inputs
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write_input(dir: &Path, name: &str, severities: &[&str]) -> PathBuf {
        let mut content = String::from("Timestamp,Severity,Message\n");
        for (i, s) in severities.iter().enumerate() {
            content.push_str(&format!("{name}-{i},{s},m\n"));
        }
        let path = dir.join(name);
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_merges_survivors_in_file_order() {
        let temp = TempDir::new().unwrap();
        let b = write_input(temp.path(), "b.csv", &["CRITICAL", "INFO"]);
        let a = write_input(temp.path(), "a.csv", &["critical", "CRITICAL"]);
        let out = temp.path().join("out/critical_merged.csv");

        let written = filter_and_merge(&[b, a], &out, Severity::Critical)
            .unwrap()
            .unwrap();
        let table = Table::read(&written).unwrap();
        let ids: Vec<&str> = table.column(0).collect();
        assert_eq!(ids, vec!["a.csv-1", "b.csv-0"]);
    }

    #[test]
    fn test_no_survivors_no_file() {
        let temp = TempDir::new().unwrap();
        let a = write_input(temp.path(), "a.csv", &["INFO", "WARNING"]);
        let out = temp.path().join("critical_merged.csv");

        assert_eq!(filter_and_merge(&[a], &out, Severity::Critical).unwrap(), None);
        assert!(!out.exists());
    }

    #[test]
    fn test_missing_severity_column() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("a.csv");
        fs::write(&path, "Timestamp,Message\nt,m\n").unwrap();

        let err = filter_and_merge(&[path], &temp.path().join("o.csv"), Severity::Critical)
            .unwrap_err();
        assert!(matches!(err, StageError::Schema { ref field, .. } if field == "Severity"));
    }

    #[test]
    fn test_per_file_keeps_names() {
        let temp = TempDir::new().unwrap();
        let a = write_input(temp.path(), "a.csv", &["WARNING"]);
        let b = write_input(temp.path(), "b.csv", &["INFO"]);
        let out = temp.path().join("out");

        let written = filter_per_file(&[a, b], &out, Severity::Warning).unwrap();
        assert_eq!(written, vec![out.join("a.csv")]);
    }
}
