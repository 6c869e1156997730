//! CSV rendering for report exports
//!
//! Rows are any `Serialize` value; each configured column pulls the field of
//! the same key from the row's serialized form. Records end in `\r\n`.

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

/// One output column: source key and header label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CsvColumn {
    pub key: &'static str,
    pub label: &'static str,
}

impl CsvColumn {
    pub const fn new(key: &'static str, label: &'static str) -> Self {
        Self { key, label }
    }
}

/// Column set of the incident report, shared with the PDF table.
pub const REPORT_COLUMNS: &[CsvColumn] = &[
    CsvColumn::new("id", "ID"),
    CsvColumn::new("type", "Tipo"),
    CsvColumn::new("severity", "Severidad"),
    CsvColumn::new("date", "Fecha"),
    CsvColumn::new("description", "Descripción"),
    CsvColumn::new("status", "Estado"),
    CsvColumn::new("project", "Proyecto"),
];

#[derive(Debug, Error)]
pub enum CsvExportError {
    #[error("row serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("csv writer failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("csv buffer flush failed: {0}")]
    Flush(String),
}

/// Render `rows` as CSV with a header line of column labels.
pub fn to_csv<T: Serialize>(rows: &[T], columns: &[CsvColumn]) -> Result<String, CsvExportError> {
    let mut builder = csv::WriterBuilder::new();
    builder
        .terminator(csv::Terminator::CRLF)
        .quote_style(csv::QuoteStyle::Necessary);
    let mut wtr = builder.from_writer(vec![]);

    wtr.write_record(columns.iter().map(|c| c.label))?;

    for row in rows {
        let value = serde_json::to_value(row)?;
        let cells: Vec<String> = columns.iter().map(|c| field_text(value.get(c.key))).collect();

        // The writer quotes a lone empty field; that record is a bare CRLF instead
        if let [only] = cells.as_slice() {
            if only.is_empty() {
                let mut buf = finish(wtr)?;
                buf.extend_from_slice(b"\r\n");
                wtr = builder.from_writer(buf);
                continue;
            }
        }
        wtr.write_record(&cells)?;
    }

    String::from_utf8(finish(wtr)?).map_err(|e| CsvExportError::Flush(e.to_string()))
}

fn finish(wtr: csv::Writer<Vec<u8>>) -> Result<Vec<u8>, CsvExportError> {
    wtr.into_inner()
        .map_err(|e| CsvExportError::Flush(e.error().to_string()))
}

/// Cell text for a field: missing and null are empty, strings verbatim.
pub fn field_text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}
