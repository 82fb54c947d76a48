//! One-to-one stage driver.
//!
//! A [`TableTransform`] turns one table into another with the same rows.
//! [`run_per_file`] applies it to every input in name order, writes each
//! result under the same file name, and checks the row count did not move.

use crate::error::{StageError, StageResult};
use crate::table::Table;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

pub trait TableTransform {
    /// Short name used in logs and errors.
    fn name(&self) -> &'static str;

    /// Transform one table. `source` is only used for error messages.
    fn apply(&self, table: Table, source: &Path) -> StageResult<Table>;
}

/// What a stage wrote.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StageOutput {
    pub files: Vec<PathBuf>,
    pub rows: usize,
}

impl StageOutput {
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

pub fn run_per_file<T>(stage: &T, inputs: &[PathBuf], output_dir: &Path) -> StageResult<StageOutput>
where
    T: TableTransform + ?Sized,
{
    let mut inputs = inputs.to_vec();
    inputs.sort_by(|a, b| a.file_name().cmp(&b.file_name()));

    info!(stage = stage.name(), files = inputs.len(), "Stage starting");

    let mut output = StageOutput::default();
    for input in &inputs {
        let table = Table::read(input)?;
        if table.is_blank() {
            warn!(stage = stage.name(), file = %input.display(), "Skipping empty table");
            continue;
        }

        let before = table.len();
        let table = stage.apply(table, input)?;
        if table.len() != before {
            return Err(StageError::RowCountChanged {
                stage: stage.name(),
                file: input.clone(),
                before,
                after: table.len(),
            });
        }

        let file_name = input.file_name().ok_or_else(|| StageError::MissingResource {
            path: input.clone(),
        })?;
        let target = output_dir.join(file_name);
        table.write(&target)?;
        debug!(stage = stage.name(), file = %target.display(), rows = before, "Wrote table");

        output.rows += before;
        output.files.push(target);
    }

    info!(
        stage = stage.name(),
        files = output.files.len(),
        rows = output.rows,
        "Stage finished"
    );
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    struct Upper;

    impl TableTransform for Upper {
        fn name(&self) -> &'static str {
            "upper"
        }

        fn apply(&self, table: Table, _source: &Path) -> StageResult<Table> {
            let headers = table.headers().to_vec();
            let rows = table
                .into_rows()
                .into_iter()
                .map(|row| row.into_iter().map(|v| v.to_uppercase()).collect())
                .collect();
            Ok(Table::with_rows(headers, rows))
        }
    }

    struct DropAll;

    impl TableTransform for DropAll {
        fn name(&self) -> &'static str {
            "drop-all"
        }

        fn apply(&self, table: Table, _source: &Path) -> StageResult<Table> {
            Ok(Table::new(table.headers().to_vec()))
        }
    }

    fn setup(temp: &TempDir) -> Vec<PathBuf> {
        let input = temp.path().join("in");
        fs::create_dir_all(&input).unwrap();
        fs::write(input.join("b.csv"), "x\nb1\nb2\n").unwrap();
        fs::write(input.join("a.csv"), "x\na1\n").unwrap();
        fs::write(input.join("empty.csv"), "").unwrap();
        vec![
            input.join("b.csv"),
            input.join("empty.csv"),
            input.join("a.csv"),
        ]
    }

    #[test]
    fn test_preserves_names_and_order() {
        let temp = TempDir::new().unwrap();
        let inputs = setup(&temp);
        let out = temp.path().join("out");

        let result = run_per_file(&Upper, &inputs, &out).unwrap();
        assert_eq!(result.rows, 3);
        assert_eq!(result.files, vec![out.join("a.csv"), out.join("b.csv")]);
        assert_eq!(fs::read_to_string(out.join("b.csv")).unwrap(), "x\nB1\nB2\n");
        assert!(!out.join("empty.csv").exists());
    }

    #[test]
    fn test_row_count_change_is_fatal() {
        let temp = TempDir::new().unwrap();
        let inputs = setup(&temp);

        let err = run_per_file(&DropAll, &inputs, &temp.path().join("out")).unwrap_err();
        assert!(matches!(err, StageError::RowCountChanged { stage: "drop-all", .. }));
    }
}
