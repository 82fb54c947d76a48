//! Merge & rechunk: concatenate many tables and cut the result into chunks
//! of at most `ceiling` rows.
//!
//! Rows are streamed into the current chunk file; only one input table is
//! held in memory at a time. The first non-blank table fixes the header.
//! Tables that fail to parse or carry a different header are skipped.

use crate::error::{StageError, StageResult};
use crate::table::{Table, TableWriter};
use sieve_protocol::defaults::{CSV_EXTENSION, MERGED_CHUNK_PREFIX};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

pub fn merge_and_rechunk(
    inputs: &[PathBuf],
    output_dir: &Path,
    ceiling: usize,
) -> StageResult<Vec<PathBuf>> {
    if ceiling == 0 {
        return Err(StageError::Config(
            "chunk row ceiling must be at least 1".to_string(),
        ));
    }

    let mut inputs = inputs.to_vec();
    inputs.sort_by(|a, b| a.file_name().cmp(&b.file_name()));

    let mut chunks = ChunkWriter::new(output_dir, ceiling);
    let mut schema: Option<Vec<String>> = None;
    let mut skipped = 0usize;

    for input in &inputs {
        let table = match Table::read(input) {
            Ok(table) => table,
            Err(err @ StageError::Csv { .. }) => {
                warn!(file = %input.display(), error = %err, "Skipping unreadable table");
                skipped += 1;
                continue;
            }
            Err(err) => return Err(err),
        };
        if table.is_blank() {
            warn!(file = %input.display(), "Skipping empty table");
            skipped += 1;
            continue;
        }

        match &schema {
            None => schema = Some(table.headers().to_vec()),
            Some(expected) if expected.as_slice() != table.headers() => {
                warn!(
                    file = %input.display(),
                    expected = ?expected,
                    found = ?table.headers(),
                    "Skipping table with mismatched header"
                );
                skipped += 1;
                continue;
            }
            Some(_) => {}
        }

        debug!(file = %input.display(), rows = table.len(), "Merging table");
        let headers = table.headers().to_vec();
        for row in table.into_rows() {
            chunks.push(&headers, &row)?;
        }
    }

    let (files, rows) = chunks.finish()?;
    info!(
        inputs = inputs.len(),
        skipped,
        chunks = files.len(),
        rows,
        ceiling,
        "Merge and rechunk finished"
    );
    Ok(files)
}

/// Name of the `index`-th chunk: `merged_000.csv`, `merged_001.csv`, ...
pub fn chunk_file_name(index: usize) -> String {
    format!("{}_{:03}.{}", MERGED_CHUNK_PREFIX, index, CSV_EXTENSION)
}

struct ChunkWriter {
    output_dir: PathBuf,
    ceiling: usize,
    current: Option<TableWriter>,
    written: Vec<PathBuf>,
    total_rows: usize,
}

impl ChunkWriter {
    fn new(output_dir: &Path, ceiling: usize) -> Self {
        Self {
            output_dir: output_dir.to_path_buf(),
            ceiling,
            current: None,
            written: Vec::new(),
            total_rows: 0,
        }
    }

    fn push(&mut self, headers: &[String], row: &[String]) -> StageResult<()> {
        if self.current.is_none() {
            let path = self.output_dir.join(chunk_file_name(self.written.len()));
            self.current = Some(TableWriter::create(&path, headers)?);
        }

        let full = match self.current.as_mut() {
            Some(writer) => {
                writer.write_row(row)?;
                writer.rows_written() >= self.ceiling
            }
            None => false,
        };
        self.total_rows += 1;

        if full {
            self.close_current()?;
        }
        Ok(())
    }

    fn close_current(&mut self) -> StageResult<()> {
        if let Some(writer) = self.current.take() {
            let path = writer.path().to_path_buf();
            debug!(file = %path.display(), rows = writer.rows_written(), "Wrote chunk");
            writer.finish()?;
            self.written.push(path);
        }
        Ok(())
    }

    fn finish(mut self) -> StageResult<(Vec<PathBuf>, usize)> {
        self.close_current()?;
        Ok((std::mem::take(&mut self.written), self.total_rows))
    }
}
