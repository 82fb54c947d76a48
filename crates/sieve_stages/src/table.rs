//! In-memory CSV table: one header plus rows of text fields.
//!
//! Every stage reads one table, changes it, and writes it back out. Writes
//! go through a hidden temp file that is renamed into place, so a stage that
//! fails midway never leaves a truncated table behind.

use crate::error::{StageError, StageResult};
use sieve_protocol::defaults::CSV_EXTENSION;
use std::fs::{self, File};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new(headers: Vec<String>) -> Self {
        Self {
            headers,
            rows: Vec::new(),
        }
    }

    pub fn with_rows(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self { headers, rows }
    }

    /// Read a whole table. A zero-byte file yields a blank table (no header,
    /// no rows); callers decide whether that is worth a warning.
    pub fn read(path: &Path) -> StageResult<Self> {
        let mut reader = open_reader(path)?;
        let headers = read_header_row(&mut reader, path)?;

        let mut rows = Vec::new();
        let mut record = csv::ByteRecord::new();
        while reader
            .read_byte_record(&mut record)
            .map_err(|e| StageError::csv(path, e))?
        {
            rows.push(decode(&record));
        }

        Ok(Self { headers, rows })
    }

    pub fn write(&self, path: &Path) -> StageResult<()> {
        let mut writer = TableWriter::create(path, &self.headers)?;
        for row in &self.rows {
            writer.write_row(row)?;
        }
        writer.finish()
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<Vec<String>> {
        self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// No header at all: the file was empty.
    pub fn is_blank(&self) -> bool {
        self.headers.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Like [`Table::column_index`] but a missing field is a schema error
    /// naming `file`.
    pub fn require_column(&self, name: &str, file: &Path) -> StageResult<usize> {
        self.column_index(name)
            .ok_or_else(|| StageError::schema(name, file))
    }

    pub fn column(&self, index: usize) -> impl Iterator<Item = &str> + '_ {
        self.rows
            .iter()
            .map(move |row| row.get(index).map(String::as_str).unwrap_or(""))
    }

    /// Insert a named column at `at`, shifting later columns right.
    ///
    /// `values` must hold one entry per row.
    pub fn insert_column(&mut self, at: usize, name: &str, values: Vec<String>) {
        debug_assert_eq!(values.len(), self.rows.len());
        let at = at.min(self.headers.len());
        self.headers.insert(at, name.to_string());
        for (row, value) in self.rows.iter_mut().zip(values) {
            let pos = at.min(row.len());
            row.insert(pos, value);
        }
    }

    pub fn retain_rows<F>(&mut self, mut keep: F)
    where
        F: FnMut(&[String]) -> bool,
    {
        self.rows.retain(|row| keep(row));
    }

    /// New table holding only `indices`, in that order. Indices must be in
    /// range for the header.
    pub fn select_columns(&self, indices: &[usize]) -> Table {
        let pick = |row: &[String]| -> Vec<String> {
            indices
                .iter()
                .map(|&i| row.get(i).cloned().unwrap_or_default())
                .collect()
        };
        Table {
            headers: pick(&self.headers),
            rows: self.rows.iter().map(|row| pick(row)).collect(),
        }
    }
}

/// Streams rows into a CSV file, renaming it into place on [`finish`].
///
/// Dropping an unfinished writer removes the temp file.
///
/// [`finish`]: TableWriter::finish
pub struct TableWriter {
    writer: Option<csv::Writer<File>>,
    temp_path: PathBuf,
    final_path: PathBuf,
    rows_written: usize,
}

impl TableWriter {
    pub fn create(path: &Path, headers: &[String]) -> StageResult<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| StageError::io(parent, e))?;
        }
        let temp_path = temp_path_for(path);
        let file = File::create(&temp_path).map_err(|e| StageError::io(&temp_path, e))?;
        let mut writer = csv::WriterBuilder::new().has_headers(false).from_writer(file);
        writer
            .write_record(headers)
            .map_err(|e| StageError::csv(path, e))?;

        Ok(Self {
            writer: Some(writer),
            temp_path,
            final_path: path.to_path_buf(),
            rows_written: 0,
        })
    }

    pub fn write_row(&mut self, row: &[String]) -> StageResult<()> {
        let writer = self.writer.as_mut().ok_or_else(|| {
            StageError::Config(format!(
                "writer for {} already finished",
                self.final_path.display()
            ))
        })?;
        writer
            .write_record(row)
            .map_err(|e| StageError::csv(&self.final_path, e))?;
        self.rows_written += 1;
        Ok(())
    }

    pub fn rows_written(&self) -> usize {
        self.rows_written
    }

    pub fn path(&self) -> &Path {
        &self.final_path
    }

    pub fn finish(mut self) -> StageResult<()> {
        if let Some(mut writer) = self.writer.take() {
            writer
                .flush()
                .map_err(|e| StageError::io(&self.temp_path, e))?;
        }
        fs::rename(&self.temp_path, &self.final_path)
            .map_err(|e| StageError::io(&self.final_path, e))?;
        Ok(())
    }
}

impl Drop for TableWriter {
    fn drop(&mut self) {
        if self.writer.is_some() && self.temp_path.exists() {
            drop(self.writer.take());
            let _ = fs::remove_file(&self.temp_path);
        }
    }
}

/// Streaming reader for stages that never need the whole table at once.
pub struct RowReader {
    reader: csv::Reader<File>,
    headers: Vec<String>,
    path: PathBuf,
    record: csv::ByteRecord,
}

impl RowReader {
    pub fn open(path: &Path) -> StageResult<Self> {
        let mut reader = open_reader(path)?;
        let headers = read_header_row(&mut reader, path)?;
        Ok(Self {
            reader,
            headers,
            path: path.to_path_buf(),
            record: csv::ByteRecord::new(),
        })
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn next_row(&mut self) -> StageResult<Option<Vec<String>>> {
        let more = self
            .reader
            .read_byte_record(&mut self.record)
            .map_err(|e| StageError::csv(&self.path, e))?;
        Ok(more.then(|| decode(&self.record)))
    }
}

/// Every `*.csv` directly under `dir`, sorted by file name.
pub fn list_csv_files(dir: &Path) -> StageResult<Vec<PathBuf>> {
    list_files_with_extension(dir, CSV_EXTENSION)
}

pub(crate) fn list_files_with_extension(dir: &Path, extension: &str) -> StageResult<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(StageError::MissingResource {
            path: dir.to_path_buf(),
        });
    }
    let entries = fs::read_dir(dir).map_err(|e| StageError::io(dir, e))?;
    let mut files = Vec::new();
    for entry in entries {
        let path = entry.map_err(|e| StageError::io(dir, e))?.path();
        let matches = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.eq_ignore_ascii_case(extension))
            .unwrap_or(false);
        if path.is_file() && matches {
            files.push(path);
        }
    }
    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(files)
}

fn open_reader(path: &Path) -> StageResult<csv::Reader<File>> {
    if !path.is_file() {
        return Err(StageError::MissingResource {
            path: path.to_path_buf(),
        });
    }
    let file = File::open(path).map_err(|e| StageError::io(path, e))?;
    Ok(csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(false)
        .from_reader(file))
}

fn read_header_row(reader: &mut csv::Reader<File>, path: &Path) -> StageResult<Vec<String>> {
    let headers = reader
        .byte_headers()
        .map_err(|e| StageError::csv(path, e))?;
    let headers = decode(headers);
    // A lone empty field is what the csv crate reports for a zero-byte file.
    if headers.len() == 1 && headers[0].is_empty() {
        return Ok(Vec::new());
    }
    Ok(headers)
}

fn decode(record: &csv::ByteRecord) -> Vec<String> {
    record
        .iter()
        .map(|field| String::from_utf8_lossy(field).into_owned())
        .collect()
}

fn temp_path_for(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "table".to_string());
    path.with_file_name(format!(".{}.tmp", name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_write_then_read_preserves_quoting() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("a.csv");
        let table = Table::with_rows(
            strings(&["Timestamp", "Message"]),
            vec![
                strings(&["t1", "a, b \"quoted\""]),
                strings(&["t2", ""]),
            ],
        );
        table.write(&path).unwrap();

        let back = Table::read(&path).unwrap();
        assert_eq!(back, table);
        assert!(!temp.path().join(".a.csv.tmp").exists());
    }

    #[test]
    fn test_read_zero_byte_file_is_blank() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("empty.csv");
        fs::write(&path, "").unwrap();

        let table = Table::read(&path).unwrap();
        assert!(table.is_blank());
        assert!(table.is_empty());
    }

    #[test]
    fn test_read_missing_file() {
        let err = Table::read(Path::new("/nonexistent/a.csv")).unwrap_err();
        assert!(matches!(err, StageError::MissingResource { .. }));
    }

    #[test]
    fn test_ragged_row_is_csv_error() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("bad.csv");
        fs::write(&path, "a,b\n1,2,3\n").unwrap();

        let err = Table::read(&path).unwrap_err();
        assert!(matches!(err, StageError::Csv { .. }));
    }

    #[test]
    fn test_insert_column_shifts_right() {
        let mut table = Table::with_rows(
            strings(&["a", "Message"]),
            vec![strings(&["1", "m1"]), strings(&["2", "m2"])],
        );
        table.insert_column(1, "routing", strings(&["r1", "r2"]));

        assert_eq!(table.headers(), strings(&["a", "routing", "Message"]).as_slice());
        assert_eq!(table.rows()[1], strings(&["2", "r2", "m2"]));
    }

    #[test]
    fn test_require_column_names_file() {
        let table = Table::new(strings(&["a"]));
        let err = table
            .require_column("Message", Path::new("x.csv"))
            .unwrap_err();
        assert!(matches!(err, StageError::Schema { ref field, .. } if field == "Message"));
    }

    #[test]
    fn test_list_csv_files_sorted_and_filtered() {
        let temp = TempDir::new().unwrap();
        for name in ["b.csv", "a.csv", "notes.txt", "c.CSV"] {
            fs::write(temp.path().join(name), "x\n").unwrap();
        }

        let files = list_csv_files(temp.path()).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.csv", "b.csv", "c.CSV"]);
    }

    #[test]
    fn test_dropped_writer_removes_temp_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("partial.csv");
        {
            let mut writer = TableWriter::create(&path, &strings(&["a"])).unwrap();
            writer.write_row(&strings(&["1"])).unwrap();
        }
        assert!(!path.exists());
        assert!(!temp.path().join(".partial.csv.tmp").exists());
    }

    #[test]
    fn test_row_reader_streams() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("a.csv");
        fs::write(&path, "h1,h2\n1,2\n3,4\n").unwrap();

        let mut reader = RowReader::open(&path).unwrap();
        assert_eq!(reader.headers(), strings(&["h1", "h2"]).as_slice());
        assert_eq!(reader.next_row().unwrap(), Some(strings(&["1", "2"])));
        assert_eq!(reader.next_row().unwrap(), Some(strings(&["3", "4"])));
        assert_eq!(reader.next_row().unwrap(), None);
    }
}
