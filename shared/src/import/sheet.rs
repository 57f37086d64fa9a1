//! Reading an uploaded spreadsheet into plain text rows.

use crate::error::ApiError;
use calamine::{open_workbook_auto_from_rs, Data, DataType, Reader};
use std::io::Cursor;

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SheetFormat {
    Csv,
    /// xlsx, xlsm, xls or ods; calamine sniffs the container.
    Workbook,
}

impl SheetFormat {
    /// Pick the format from an explicit `format` query parameter, falling back
    /// to the request's content type. Anything not CSV is read as a workbook.
    pub fn detect(format: Option<&str>, content_type: Option<&str>) -> Result<Self, ApiError> {
        if let Some(format) = format.map(|f| f.trim().to_ascii_lowercase()) {
            return match format.as_str() {
                "csv" => Ok(SheetFormat::Csv),
                "xlsx" | "xlsm" | "xls" | "ods" | "excel" => Ok(SheetFormat::Workbook),
                other => Err(ApiError::validation(format!(
                    "Unsupported import format '{}'",
                    other
                ))),
            };
        }

        let is_csv = content_type
            .map(|ct| ct.to_ascii_lowercase())
            .is_some_and(|ct| ct.starts_with("text/csv") || ct.starts_with("application/csv"));
        Ok(if is_csv {
            SheetFormat::Csv
        } else {
            SheetFormat::Workbook
        })
    }
}

/// The first worksheet as text: a header row plus data rows. Rows with no
/// non-blank cell are dropped.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Sheet {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Sheet {
    pub fn parse(data: &[u8], format: SheetFormat) -> Result<Self, ApiError> {
        if data.is_empty() {
            return Err(ApiError::validation("Uploaded file is empty"));
        }
        let sheet = match format {
            SheetFormat::Csv => parse_csv(data)?,
            SheetFormat::Workbook => parse_workbook(data)?,
        };
        if sheet.headers.iter().all(|h| h.is_empty()) {
            return Err(ApiError::validation("Spreadsheet has no header row"));
        }
        Ok(sheet)
    }

    /// Build from header and data rows already read as text.
    pub fn from_rows(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        let headers = headers.into_iter().map(|h| h.trim().to_string()).collect();
        let rows = rows
            .into_iter()
            .map(|row| row.into_iter().map(|c| c.trim().to_string()).collect::<Vec<_>>())
            .filter(|row| row.iter().any(|c| !c.is_empty()))
            .collect();
        Self { headers, rows }
    }
}

fn parse_csv(data: &[u8]) -> Result<Sheet, ApiError> {
    let data = data.strip_prefix(UTF8_BOM).unwrap_or(data);

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(data);

    let headers: Vec<String> = reader
        .byte_headers()
        .map_err(|e| ApiError::validation(format!("Failed to read CSV headers: {}", e)))?
        .iter()
        .map(|h| String::from_utf8_lossy(h).into_owned())
        .collect();

    let mut rows = Vec::new();
    for (idx, record) in reader.byte_records().enumerate() {
        let record = record.map_err(|e| {
            ApiError::validation(format!("Failed to parse CSV row {}: {}", idx + 1, e))
        })?;
        rows.push(
            record
                .iter()
                .map(|c| String::from_utf8_lossy(c).into_owned())
                .collect(),
        );
    }

    Ok(Sheet::from_rows(headers, rows))
}

fn parse_workbook(data: &[u8]) -> Result<Sheet, ApiError> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(data.to_vec()))
        .map_err(|e| ApiError::validation(format!("Unreadable spreadsheet: {}", e)))?;

    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| ApiError::validation("Spreadsheet has no worksheets"))?
        .map_err(|e| ApiError::validation(format!("Unreadable worksheet: {}", e)))?;

    let mut rows = range.rows();
    let headers = rows
        .next()
        .map(|row| row.iter().map(cell_text).collect())
        .unwrap_or_default();
    let rows = rows
        .map(|row| row.iter().map(cell_text).collect())
        .collect();

    Ok(Sheet::from_rows(headers, rows))
}

/// Render a cell the way a person reading the sheet would type it: whole
/// numbers without a trailing `.0`, dates as `YYYY-MM-DD`.
fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", *f as i64),
        Data::DateTime(_) | Data::DateTimeIso(_) => cell
            .as_date()
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| cell.to_string()),
        other => other.to_string(),
    }
}
