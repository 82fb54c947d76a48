//! Keyword filter: keep rows whose Message contains a substring.

use crate::error::{StageError, StageResult};
use crate::table::{RowReader, TableWriter};
use sieve_protocol::fields::MESSAGE;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeywordFilterOutput {
    pub matched_rows: usize,
    pub files: Vec<PathBuf>,
}

/// Write a same-named table per input holding only the rows whose `Message`
/// contains `keyword` (case-sensitive). Inputs without a match produce no
/// file; empty inputs are skipped.
pub fn filter_keyword(
    inputs: &[PathBuf],
    output_dir: &Path,
    keyword: &str,
) -> StageResult<KeywordFilterOutput> {
    if keyword.is_empty() {
        return Err(StageError::Config("keyword must not be empty".to_string()));
    }

    let mut inputs = inputs.to_vec();
    inputs.sort_by(|a, b| a.file_name().cmp(&b.file_name()));

    let mut output = KeywordFilterOutput::default();
    for input in &inputs {
        if let Some((path, matched)) = filter_file(input, output_dir, keyword)? {
            output.matched_rows += matched;
            output.files.push(path);
        }
    }

    info!(
        keyword,
        files = output.files.len(),
        rows = output.matched_rows,
        "Keyword filter finished"
    );
    Ok(output)
}

fn filter_file(
    input: &Path,
    output_dir: &Path,
    keyword: &str,
) -> StageResult<Option<(PathBuf, usize)>> {
    let mut reader = RowReader::open(input)?;
    if reader.headers().is_empty() {
        warn!(file = %input.display(), "Skipping empty table");
        return Ok(None);
    }

    let message = reader
        .headers()
        .iter()
        .position(|h| h == MESSAGE)
        .ok_or_else(|| StageError::schema(MESSAGE, input))?;

    let file_name = input.file_name().ok_or_else(|| StageError::MissingResource {
        path: input.to_path_buf(),
    })?;
    let target = output_dir.join(file_name);

    let mut writer: Option<TableWriter> = None;
    while let Some(row) = reader.next_row()? {
        let hit = row
            .get(message)
            .map(|m| m.contains(keyword))
            .unwrap_or(false);
        if !hit {
            continue;
        }
        if writer.is_none() {
            writer = Some(TableWriter::create(&target, reader.headers())?);
        }
        if let Some(w) = writer.as_mut() {
            w.write_row(&row)?;
        }
    }

    match writer {
        Some(w) => {
            let matched = w.rows_written();
            w.finish()?;
            debug!(file = %target.display(), rows = matched, "Wrote filtered table");
            Ok(Some((target, matched)))
        }
        None => {
            debug!(file = %input.display(), "No rows matched keyword");
            Ok(None)
        }
    }
}
