//! Archive extraction: unpack the `.csv` members of zipped exports.
//!
//! Members are flattened to `<archive-stem>__<file-name>` so that two
//! archives carrying the same member name never overwrite each other.

use crate::error::{StageError, StageResult};
use crate::table::list_files_with_extension;
use sieve_protocol::defaults::{ARCHIVE_EXTENSION, CSV_EXTENSION};
use std::collections::HashSet;
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// An archive that could not be extracted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveFailure {
    pub archive: PathBuf,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractionSummary {
    pub files: Vec<PathBuf>,
    pub failures: Vec<ArchiveFailure>,
}

/// Every `*.zip` directly under `source_dir`, sorted by name.
pub fn list_archives(source_dir: &Path) -> StageResult<Vec<PathBuf>> {
    list_files_with_extension(source_dir, ARCHIVE_EXTENSION)
}

/// Extract the `.csv` members of one archive into `dest`.
///
/// Non-CSV members are ignored. If extraction fails partway, files already
/// written for this archive are removed.
pub fn extract_archive(archive: &Path, dest: &Path) -> StageResult<Vec<PathBuf>> {
    if !archive.is_file() {
        return Err(StageError::MissingResource {
            path: archive.to_path_buf(),
        });
    }
    if !has_extension(archive, ARCHIVE_EXTENSION) {
        return Err(StageError::malformed_archive(archive, "not a .zip file"));
    }

    let file = File::open(archive).map_err(|e| StageError::io(archive, e))?;
    let mut zip = zip::ZipArchive::new(file)
        .map_err(|e| StageError::malformed_archive(archive, e.to_string()))?;
    if zip.len() == 0 {
        return Err(StageError::malformed_archive(archive, "archive is empty"));
    }

    fs::create_dir_all(dest).map_err(|e| StageError::io(dest, e))?;

    let stem = archive
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "archive".to_string());

    let mut written = Vec::new();
    let result = extract_members(&mut zip, archive, dest, &stem, &mut written);
    if let Err(err) = result {
        for path in &written {
            let _ = fs::remove_file(path);
        }
        return Err(err);
    }

    if written.is_empty() {
        return Err(StageError::malformed_archive(archive, "no .csv members"));
    }

    debug!(archive = %archive.display(), files = written.len(), "Extracted archive");
    Ok(written)
}

fn extract_members(
    zip: &mut zip::ZipArchive<File>,
    archive: &Path,
    dest: &Path,
    stem: &str,
    written: &mut Vec<PathBuf>,
) -> StageResult<()> {
    let mut used_names = HashSet::new();
    for index in 0..zip.len() {
        let mut entry = zip
            .by_index(index)
            .map_err(|e| StageError::malformed_archive(archive, e.to_string()))?;
        if entry.is_dir() {
            continue;
        }

        // enclosed_name rejects absolute paths and `..` traversal.
        let enclosed = entry.enclosed_name();
        let Some(member) = enclosed
            .as_ref()
            .and_then(|p| p.file_name())
            .map(|n| n.to_string_lossy().into_owned())
        else {
            warn!(archive = %archive.display(), entry = entry.name(), "Skipping unsafe member path");
            continue;
        };
        if !has_extension(Path::new(&member), CSV_EXTENSION) {
            continue;
        }

        let target = dest.join(unique_name(stem, &member, &mut used_names));
        let mut out = File::create(&target).map_err(|e| StageError::io(&target, e))?;
        written.push(target.clone());
        io::copy(&mut entry, &mut out)
            .map_err(|e| StageError::malformed_archive(archive, format!("{}: {}", member, e)))?;
    }
    Ok(())
}

fn unique_name(stem: &str, member: &str, used: &mut HashSet<String>) -> String {
    let base = format!("{}__{}", stem, member);
    if used.insert(base.clone()) {
        return base;
    }
    let path = Path::new(member);
    let member_stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let ext = path
        .extension()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| CSV_EXTENSION.to_string());
    let mut n = 1;
    loop {
        let candidate = format!("{}__{}_{}.{}", stem, member_stem, n, ext);
        if used.insert(candidate.clone()) {
            return candidate;
        }
        n += 1;
    }
}

/// Extract every archive under `source_dir`. Malformed archives are logged,
/// recorded as failures, and skipped.
pub fn extract_all(source_dir: &Path, dest: &Path) -> StageResult<ExtractionSummary> {
    let archives = list_archives(source_dir)?;
    let mut summary = ExtractionSummary::default();

    for archive in &archives {
        match extract_archive(archive, dest) {
            Ok(files) => summary.files.extend(files),
            Err(err) if err.is_recoverable() => {
                warn!(archive = %archive.display(), error = %err, "Skipping archive");
                summary.failures.push(ArchiveFailure {
                    archive: archive.clone(),
                    reason: err.to_string(),
                });
            }
            Err(err) => return Err(err),
        }
    }

    info!(
        archives = archives.len(),
        files = summary.files.len(),
        failures = summary.failures.len(),
        "Archive extraction finished"
    );
    Ok(summary)
}

fn has_extension(path: &Path, extension: &str) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case(extension))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;
    use zip::write::SimpleFileOptions;
    use zip::ZipWriter;

    fn write_zip(path: &Path, members: &[(&str, &str)]) {
        let file = File::create(path).unwrap();
        let mut zip = ZipWriter::new(file);
        let options = SimpleFileOptions::default()
            .compression_method(zip::CompressionMethod::Deflated);
        for (name, content) in members {
            zip.start_file(*name, options).unwrap();
            zip.write_all(content.as_bytes()).unwrap();
        }
        zip.finish().unwrap();
    }

    #[test]
    fn test_extracts_only_csv_members() {
        let temp = TempDir::new().unwrap();
        let archive = temp.path().join("export1.zip");
        write_zip(
            &archive,
            &[("logs/a.csv", "x\n1\n"), ("readme.txt", "hi"), ("b.CSV", "x\n2\n")],
        );
        let dest = temp.path().join("out");

        let files = extract_archive(&archive, &dest).unwrap();
        assert_eq!(files, vec![dest.join("export1__a.csv"), dest.join("export1__b.CSV")]);
        assert_eq!(fs::read_to_string(&files[0]).unwrap(), "x\n1\n");
        assert!(!dest.join("export1__readme.txt").exists());
    }

    #[test]
    fn test_same_member_name_in_one_archive() {
        let temp = TempDir::new().unwrap();
        let archive = temp.path().join("e.zip");
        write_zip(&archive, &[("a/x.csv", "x\n1\n"), ("b/x.csv", "x\n2\n")]);

        let files = extract_archive(&archive, temp.path()).unwrap();
        assert_eq!(files.len(), 2);
        assert_ne!(files[0], files[1]);
    }

    #[test]
    fn test_rejects_malformed_archives() {
        let temp = TempDir::new().unwrap();
        let not_zip = temp.path().join("bad.zip");
        fs::write(&not_zip, "not a zip").unwrap();
        let empty = temp.path().join("empty.zip");
        write_zip(&empty, &[]);
        let no_csv = temp.path().join("nocsv.zip");
        write_zip(&no_csv, &[("a.txt", "x")]);
        let wrong_ext = temp.path().join("data.tar");
        fs::write(&wrong_ext, "x").unwrap();

        for archive in [&not_zip, &empty, &no_csv, &wrong_ext] {
            let err = extract_archive(archive, &temp.path().join("out")).unwrap_err();
            assert!(
                matches!(err, StageError::MalformedArchive { .. }),
                "{}: {}",
                archive.display(),
                err
            );
        }
    }

    #[test]
    fn test_missing_archive() {
        let err = extract_archive(Path::new("/nonexistent/a.zip"), Path::new("/tmp")).unwrap_err();
        assert!(matches!(err, StageError::MissingResource { .. }));
    }

    #[test]
    fn test_extract_all_continues_past_failures() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("source");
        fs::create_dir_all(&source).unwrap();
        write_zip(&source.join("a.zip"), &[("x.csv", "x\n1\n")]);
        fs::write(source.join("b.zip"), "garbage").unwrap();
        write_zip(&source.join("c.zip"), &[("x.csv", "x\n3\n")]);

        let summary = extract_all(&source, &temp.path().join("out")).unwrap();
        assert_eq!(summary.files.len(), 2);
        assert_eq!(summary.failures.len(), 1);
        assert_eq!(summary.failures[0].archive, source.join("b.zip"));
    }

    #[test]
    fn test_extract_all_missing_source() {
        let temp = TempDir::new().unwrap();
        let err = extract_all(&temp.path().join("nope"), temp.path()).unwrap_err();
        assert!(matches!(err, StageError::MissingResource { .. }));
    }
}
