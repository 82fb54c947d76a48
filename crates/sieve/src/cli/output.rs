//! Output formatting utilities for CLI commands

use comfy_table::{presets::UTF8_FULL_CONDENSED, Cell, Color, ContentArrangement, Table};
use sieve::{RunOutcome, RunReport, StageReport};

/// Print a table with headers and rows
pub fn print_table(headers: &[&str], rows: Vec<Vec<String>>) {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Dynamic);

    let header_cells: Vec<Cell> = headers
        .iter()
        .map(|h| Cell::new(h).fg(Color::Cyan))
        .collect();
    table.set_header(header_cells);

    for row in rows {
        table.add_row(row);
    }

    println!("{}", table);
}

/// Format a count with thousands separators: 1234567 -> "1,234,567"
pub fn format_count(n: usize) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

pub fn stage_rows(stages: &[StageReport]) -> Vec<Vec<String>> {
    stages
        .iter()
        .map(|s| {
            vec![
                s.stage.to_string(),
                format_count(s.files),
                s.rows.map(format_count).unwrap_or_else(|| "-".to_string()),
            ]
        })
        .collect()
}

pub fn print_stage_table(stages: &[StageReport]) {
    print_table(&["STAGE", "FILES", "ROWS"], stage_rows(stages));
}

pub fn print_run_summary(report: &RunReport) {
    if !report.stages.is_empty() {
        print_stage_table(&report.stages);
        println!();
    }

    println!(
        "Archives: {} found, {} failed",
        report.archives_found,
        report.archive_failures.len()
    );
    for failure in &report.archive_failures {
        println!("  skipped {}: {}", failure.archive.display(), failure.reason);
    }
    println!("Matched rows: {}", format_count(report.matched_rows));

    match report.outcome {
        RunOutcome::Exported => {
            println!("Spreadsheets:");
            for path in &report.spreadsheets {
                println!("  {}", path.display());
            }
        }
        RunOutcome::NoMatchingEvents => println!("No matching events; nothing exported."),
        RunOutcome::NoInput => println!("No archives found; nothing to do."),
    }
    println!("Finished in {:.1}s", report.elapsed_secs());
}

#[cfg(test)]
mod tests {
    use super::*;
    use sieve_protocol::StageName;

    #[test]
    fn test_format_count() {
        assert_eq!(format_count(0), "0");
        assert_eq!(format_count(999), "999");
        assert_eq!(format_count(1000), "1,000");
        assert_eq!(format_count(800_000), "800,000");
        assert_eq!(format_count(1_234_567), "1,234,567");
    }

    #[test]
    fn test_stage_rows_marks_uncounted() {
        let rows = stage_rows(&[
            StageReport {
                stage: StageName::MergeRechunk,
                files: 2,
                rows: None,
            },
            StageReport {
                stage: StageName::ColumnProjection,
                files: 2,
                rows: Some(1500),
            },
        ]);
        assert_eq!(rows[0], vec!["merge", "2", "-"]);
        assert_eq!(rows[1], vec!["project", "2", "1,500"]);
    }
}
