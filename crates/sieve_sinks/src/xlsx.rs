use crate::xml::{column_letter, escape};
use crate::{SinkError, SinkResult};
use sieve_protocol::SpreadsheetStyle;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

/// Worksheet row limit minus the header row.
pub const MAX_DATA_ROWS: usize = 1_048_575;

const SHEET_NAME: &str = "Sheet1";
const NS_MAIN: &str = "http://schemas.openxmlformats.org/spreadsheetml/2006/main";
const NS_REL: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
const NS_PKG_REL: &str = "http://schemas.openxmlformats.org/package/2006/relationships";
const XML_DECL: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#;

const CONTENT_TYPES: &str = r#"<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/><Override PartName="/xl/worksheets/sheet1.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/><Override PartName="/xl/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.styles+xml"/></Types>"#;

/// Render `csv_path` as `<output_dir>/<stem>.xlsx`.
///
/// The table is read twice: once to size the columns, once to write cells,
/// so memory use does not grow with the row count.
pub fn export_to_xlsx(
    csv_path: &Path,
    output_dir: &Path,
    style: &SpreadsheetStyle,
) -> SinkResult<PathBuf> {
    if !csv_path.is_file() {
        return Err(SinkError::MissingInput {
            path: csv_path.to_path_buf(),
        });
    }

    let layout = measure(csv_path, style)?;
    if layout.rows > 0 && layout.rows - 1 > MAX_DATA_ROWS {
        return Err(SinkError::TooManyRows {
            path: csv_path.to_path_buf(),
            rows: layout.rows - 1,
            max: MAX_DATA_ROWS,
        });
    }

    fs::create_dir_all(output_dir).map_err(|source| SinkError::Io {
        path: output_dir.to_path_buf(),
        source,
    })?;
    let stem = csv_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "export".to_string());
    let output = output_dir.join(format!("{}.xlsx", stem));
    let temp = output_dir.join(format!(".{}.xlsx.tmp", stem));

    let result = write_workbook(csv_path, &temp, style, &layout);
    if let Err(err) = result {
        let _ = fs::remove_file(&temp);
        return Err(err);
    }
    fs::rename(&temp, &output).map_err(|source| SinkError::Io {
        path: output.clone(),
        source,
    })?;

    info!(
        input = %csv_path.display(),
        output = %output.display(),
        rows = layout.rows.saturating_sub(1),
        "Exported spreadsheet"
    );
    Ok(output)
}

/// Display width for a column whose longest cell is `max_len` units wide.
pub fn column_width(max_len: usize, style: &SpreadsheetStyle) -> u32 {
    let wanted = u32::try_from(max_len + 2).unwrap_or(u32::MAX);
    wanted.max(style.min_width).min(style.max_width)
}

/// Length of a cell for sizing. Text with any non-ASCII character counts
/// half again as wide.
fn cell_units(value: &str) -> usize {
    let chars = value.chars().count();
    if value.is_ascii() {
        chars
    } else {
        chars * 3 / 2
    }
}

struct Layout {
    widths: Vec<u32>,
    /// Header included.
    rows: usize,
}

fn measure(csv_path: &Path, style: &SpreadsheetStyle) -> SinkResult<Layout> {
    let mut reader = open_reader(csv_path)?;
    let mut longest: Vec<usize> = Vec::new();
    let mut rows = 0usize;
    let mut record = csv::StringRecord::new();

    while reader
        .read_record(&mut record)
        .map_err(|source| csv_error(csv_path, source))?
    {
        rows += 1;
        if longest.len() < record.len() {
            longest.resize(record.len(), 0);
        }
        for (i, value) in record.iter().enumerate() {
            longest[i] = longest[i].max(cell_units(value));
        }
    }

    let widths = longest.iter().map(|&len| column_width(len, style)).collect();
    debug!(file = %csv_path.display(), rows, "Measured table");
    Ok(Layout { widths, rows })
}

fn write_workbook(
    csv_path: &Path,
    target: &Path,
    style: &SpreadsheetStyle,
    layout: &Layout,
) -> SinkResult<()> {
    let file = File::create(target).map_err(|source| SinkError::Io {
        path: target.to_path_buf(),
        source,
    })?;
    let mut zip = ZipWriter::new(file);
    let options =
        SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);

    let parts: [(&str, String); 5] = [
        ("[Content_Types].xml", format!("{}{}", XML_DECL, CONTENT_TYPES)),
        ("_rels/.rels", package_rels()),
        ("xl/workbook.xml", workbook()),
        ("xl/_rels/workbook.xml.rels", workbook_rels()),
        ("xl/styles.xml", styles(style)),
    ];
    for (name, content) in &parts {
        zip.start_file(*name, options)
            .map_err(|source| zip_error(target, source))?;
        zip.write_all(content.as_bytes())
            .map_err(|source| io_error(target, source))?;
    }

    zip.start_file("xl/worksheets/sheet1.xml", options)
        .map_err(|source| zip_error(target, source))?;
    write_sheet(&mut zip, csv_path, target, layout)?;

    zip.finish().map_err(|source| zip_error(target, source))?;
    Ok(())
}

fn write_sheet<W: Write>(
    out: &mut W,
    csv_path: &Path,
    target: &Path,
    layout: &Layout,
) -> SinkResult<()> {
    let io = |source| io_error(target, source);

    write!(out, "{}<worksheet xmlns=\"{}\">", XML_DECL, NS_MAIN).map_err(io)?;
    if !layout.widths.is_empty() {
        out.write_all(b"<cols>").map_err(io)?;
        for (i, width) in layout.widths.iter().enumerate() {
            write!(
                out,
                "<col min=\"{n}\" max=\"{n}\" width=\"{w}\" customWidth=\"1\"/>",
                n = i + 1,
                w = width
            )
            .map_err(io)?;
        }
        out.write_all(b"</cols>").map_err(io)?;
    }
    out.write_all(b"<sheetData>").map_err(io)?;

    let mut reader = open_reader(csv_path)?;
    let mut record = csv::StringRecord::new();
    let mut row_number = 0usize;
    while reader
        .read_record(&mut record)
        .map_err(|source| csv_error(csv_path, source))?
    {
        row_number += 1;
        // Style 1 is the bold header font.
        let style_attr = if row_number == 1 { " s=\"1\"" } else { "" };
        write!(out, "<row r=\"{}\">", row_number).map_err(io)?;
        for (i, value) in record.iter().enumerate() {
            if value.is_empty() {
                continue;
            }
            write!(
                out,
                "<c r=\"{}{}\" t=\"inlineStr\"{}><is><t xml:space=\"preserve\">{}</t></is></c>",
                column_letter(i),
                row_number,
                style_attr,
                escape(value)
            )
            .map_err(io)?;
        }
        out.write_all(b"</row>").map_err(io)?;
    }

    out.write_all(b"</sheetData></worksheet>").map_err(io)?;
    Ok(())
}

fn package_rels() -> String {
    format!(
        "{}<Relationships xmlns=\"{}\"><Relationship Id=\"rId1\" Type=\"{}/officeDocument\" Target=\"xl/workbook.xml\"/></Relationships>",
        XML_DECL, NS_PKG_REL, NS_REL
    )
}

fn workbook() -> String {
    format!(
        "{}<workbook xmlns=\"{}\" xmlns:r=\"{}\"><sheets><sheet name=\"{}\" sheetId=\"1\" r:id=\"rId1\"/></sheets></workbook>",
        XML_DECL, NS_MAIN, NS_REL, SHEET_NAME
    )
}

fn workbook_rels() -> String {
    format!(
        "{}<Relationships xmlns=\"{}\"><Relationship Id=\"rId1\" Type=\"{rel}/worksheet\" Target=\"worksheets/sheet1.xml\"/><Relationship Id=\"rId2\" Type=\"{rel}/styles\" Target=\"styles.xml\"/></Relationships>",
        XML_DECL,
        NS_PKG_REL,
        rel = NS_REL
    )
}

fn styles(style: &SpreadsheetStyle) -> String {
    let name = escape(&style.font_name);
    let size = style.font_size;
    format!(
        "{decl}<styleSheet xmlns=\"{ns}\">\
         <fonts count=\"2\">\
         <font><sz val=\"{size}\"/><name val=\"{name}\"/></font>\
         <font><b/><sz val=\"{size}\"/><name val=\"{name}\"/></font>\
         </fonts>\
         <fills count=\"2\"><fill><patternFill patternType=\"none\"/></fill><fill><patternFill patternType=\"gray125\"/></fill></fills>\
         <borders count=\"1\"><border><left/><right/><top/><bottom/><diagonal/></border></borders>\
         <cellStyleXfs count=\"1\"><xf numFmtId=\"0\" fontId=\"0\" fillId=\"0\" borderId=\"0\"/></cellStyleXfs>\
         <cellXfs count=\"2\">\
         <xf numFmtId=\"0\" fontId=\"0\" fillId=\"0\" borderId=\"0\" xfId=\"0\"/>\
         <xf numFmtId=\"0\" fontId=\"1\" fillId=\"0\" borderId=\"0\" xfId=\"0\" applyFont=\"1\"/>\
         </cellXfs>\
         <cellStyles count=\"1\"><cellStyle name=\"Normal\" xfId=\"0\" builtinId=\"0\"/></cellStyles>\
         </styleSheet>",
        decl = XML_DECL,
        ns = NS_MAIN,
        size = size,
        name = name
    )
}

fn open_reader(csv_path: &Path) -> SinkResult<csv::Reader<File>> {
    let file = File::open(csv_path).map_err(|source| SinkError::Io {
        path: csv_path.to_path_buf(),
        source,
    })?;
    Ok(csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(file))
}

fn csv_error(path: &Path, source: csv::Error) -> SinkError {
    SinkError::Csv {
        path: path.to_path_buf(),
        source,
    }
}

fn zip_error(path: &Path, source: zip::result::ZipError) -> SinkError {
    SinkError::Zip {
        path: path.to_path_buf(),
        source,
    }
}

fn io_error(path: &Path, source: std::io::Error) -> SinkError {
    SinkError::Io {
        path: path.to_path_buf(),
        source,
    }
}
