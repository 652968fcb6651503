// src/export.rs
use std::path::Path;

use csv::Writer;
use rust_xlsxwriter::{Format, FormatBorder, Workbook, XlsxError};
use tracing::info;

use crate::data_types::TransformedRecord;
use crate::errors::{AppError, AppResult};

pub const XLSX_FILE_NAME: &str = "ExportedData.xlsx";
pub const CSV_FILE_NAME: &str = "ExportedData.csv";
pub const PRINT_FILE_NAME: &str = "PrintData.html";

fn to_export_error(err: XlsxError) -> AppError {
    AppError::Export(err.to_string())
}

/// Writes the records to a single "Data" worksheet, header row first.
pub fn write_xlsx(path: &Path, columns: &[String], records: &[TransformedRecord]) -> AppResult<()> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name("Data").map_err(to_export_error)?;

    let header_format = Format::new().set_bold().set_border(FormatBorder::Thin);
    for (col, header) in columns.iter().enumerate() {
        worksheet
            .write_with_format(0, col as u16, header.as_str(), &header_format)
            .map_err(to_export_error)?;
    }

    for (i, record) in records.iter().enumerate() {
        let row = (i + 1) as u32;
        for (col, header) in columns.iter().enumerate() {
            if let Some(value) = record.get(header) {
                worksheet
                    .write(row, col as u16, value)
                    .map_err(to_export_error)?;
            }
        }
    }

    workbook.save(path).map_err(to_export_error)?;
    info!(path = %path.display(), rows = records.len(), "exported XLSX");
    Ok(())
}

pub fn write_csv(path: &Path, columns: &[String], records: &[TransformedRecord]) -> AppResult<()> {
    let mut wtr = Writer::from_path(path).map_err(|err| AppError::Export(err.to_string()))?;

    wtr.write_record(columns)
        .map_err(|err| AppError::Export(err.to_string()))?;
    for record in records {
        wtr.write_record(columns.iter().map(|column| record.cell(column)))
            .map_err(|err| AppError::Export(err.to_string()))?;
    }

    wtr.flush()?;
    info!(path = %path.display(), rows = records.len(), "exported CSV");
    Ok(())
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// A standalone page with the records as a bordered table, ready for the browser's print dialog.
pub fn print_document(columns: &[String], records: &[TransformedRecord]) -> String {
    let head: String = columns
        .iter()
        .map(|h| format!("<th>{}</th>", escape_html(h)))
        .collect();
    let body: String = records
        .iter()
        .map(|record| {
            let cells: String = columns
                .iter()
                .map(|h| format!("<td>{}</td>", escape_html(record.cell(h))))
                .collect();
            format!("<tr>{cells}</tr>")
        })
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        r#"<html>
<head>
  <title>Print Data</title>
  <style>
    table {{ border-collapse: collapse; width: 100%; }}
    th, td {{ border: 1px solid #ddd; padding: 8px; }}
    th {{ background: #f2f2f2; }}
  </style>
</head>
<body onload="window.print()">
  <h2>Exported Data</h2>
  <table>
    <thead><tr>{head}</tr></thead>
    <tbody>
{body}
    </tbody>
  </table>
</body>
</html>
"#
    )
}

pub fn write_print_document(
    path: &Path,
    columns: &[String],
    records: &[TransformedRecord],
) -> AppResult<()> {
    std::fs::write(path, print_document(columns, records))?;
    info!(path = %path.display(), rows = records.len(), "wrote print document");
    Ok(())
}
