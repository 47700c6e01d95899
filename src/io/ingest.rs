//! CSV ingest for the raw wide panel and the cleaned country-year file.
//!
//! This module is responsible for turning files on disk into in-memory rows:
//!
//! - **Strict schema** for required columns (clear errors + exit code 2)
//! - **Row-level tolerance** (rows that cannot be keyed are skipped and reported)
//! - **No reshaping logic here**: melting/pivoting lives in `data::reshape`

use std::collections::HashMap;
use std::fs::File;
use std::path::Path;

use csv::StringRecord;

use crate::domain::{Indicator, Observation};
use crate::error::AppError;

/// A raw row: one (country, series) pair with one cell per year column.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRow {
    pub line: usize,
    pub country_name: String,
    pub country_code: String,
    pub series_code: String,
    /// Cells aligned with `RawPanel::years`.
    pub cells: Vec<String>,
}

/// A row that could not be used, and why.
#[derive(Debug, Clone, PartialEq)]
pub struct RowError {
    pub line: usize,
    pub message: String,
}

/// The raw wide table after schema validation.
#[derive(Debug, Clone, Default)]
pub struct RawPanel {
    /// Years encoded by the melted columns, in header order.
    pub years: Vec<i32>,
    pub rows: Vec<RawRow>,
    pub row_errors: Vec<RowError>,
    /// Headers that were neither key columns nor year columns.
    pub ignored_columns: Vec<String>,
}

/// Classification of a single header cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum YearHeader {
    Year(i32),
    NotYear,
    Malformed,
}

const COUNTRY_NAME: &str = "country_name";
const COUNTRY_CODE: &str = "country_code";
const SERIES_CODE_ALIASES: [&str; 2] = ["series_code", "indicator_code"];

/// Load the raw wide panel.
pub fn load_raw_panel(path: &Path) -> Result<RawPanel, AppError> {
    let file = File::open(path).map_err(|e| AppError::io(path, e))?;
    read_raw_panel(file, path)
}

/// Parse a raw wide panel from any reader (`origin` is only used in errors).
pub fn read_raw_panel<R: std::io::Read>(reader: R, origin: &Path) -> Result<RawPanel, AppError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = reader
        .headers()
        .map_err(|e| AppError::csv(origin, e))?
        .clone();

    let header_map = build_header_map(&headers);
    let name_idx = require_column(&header_map, COUNTRY_NAME)?;
    let code_idx = require_column(&header_map, COUNTRY_CODE)?;
    let series_idx = SERIES_CODE_ALIASES
        .iter()
        .find_map(|name| header_map.get(*name).copied())
        .ok_or_else(|| {
            AppError::Schema("Missing required column: `series_code` (or `indicator_code`)".to_string())
        })?;

    let mut year_columns: Vec<(usize, i32)> = Vec::new();
    let mut ignored_columns = Vec::new();
    for (idx, name) in headers.iter().enumerate() {
        if idx == name_idx || idx == code_idx || idx == series_idx {
            continue;
        }
        match parse_year_header(name) {
            YearHeader::Year(year) => {
                if year_columns.iter().any(|(_, y)| *y == year) {
                    return Err(AppError::Schema(format!("Year column {year} appears more than once")));
                }
                year_columns.push((idx, year));
            }
            YearHeader::Malformed => {
                return Err(AppError::Schema(format!(
                    "Unparseable year column header '{name}' (expected `YYYY [YRYYYY]`)"
                )));
            }
            YearHeader::NotYear => ignored_columns.push(name.to_string()),
        }
    }

    if year_columns.is_empty() {
        return Err(AppError::Schema(
            "No year columns found (expected headers like `2010 [YR2010]`)".to_string(),
        ));
    }

    let mut rows = Vec::new();
    let mut row_errors = Vec::new();

    for (idx, result) in reader.records().enumerate() {
        // +2: records() starts after the header, and lines are 1-based.
        let line = idx + 2;
        let record = match result {
            Ok(r) => r,
            Err(e) => {
                row_errors.push(RowError {
                    line,
                    message: format!("CSV parse error: {e}"),
                });
                continue;
            }
        };

        let country_code = cell(&record, code_idx);
        let series_code = cell(&record, series_idx);
        if country_code.is_empty() || series_code.is_empty() {
            // Trailing notes in World Bank exports land here.
            row_errors.push(RowError {
                line,
                message: "Missing country or series code".to_string(),
            });
            continue;
        }

        rows.push(RawRow {
            line,
            country_name: cell(&record, name_idx).to_string(),
            country_code: country_code.to_string(),
            series_code: series_code.to_string(),
            cells: year_columns
                .iter()
                .map(|(col, _)| cell(&record, *col).to_string())
                .collect(),
        });
    }

    Ok(RawPanel {
        years: year_columns.into_iter().map(|(_, y)| y).collect(),
        rows,
        row_errors,
        ignored_columns,
    })
}

/// Classify a header as a year column.
///
/// A header claims to be a year column when it starts with four ASCII digits;
/// it must then match `YYYY [YRYYYY]` with both years equal.
pub fn parse_year_header(name: &str) -> YearHeader {
    let name = name.trim();
    let bytes = name.as_bytes();
    if bytes.len() < 4 || !bytes[..4].iter().all(u8::is_ascii_digit) {
        return YearHeader::NotYear;
    }

    let Some(rest) = name[4..].strip_prefix(" [YR") else {
        return YearHeader::Malformed;
    };
    let Some(inner) = rest.strip_suffix(']') else {
        return YearHeader::Malformed;
    };
    if inner.len() != 4 || !inner.bytes().all(|b| b.is_ascii_digit()) || inner != &name[..4] {
        return YearHeader::Malformed;
    }

    match name[..4].parse::<i32>() {
        Ok(year) => YearHeader::Year(year),
        Err(_) => YearHeader::Malformed,
    }
}

/// Load the cleaned country-year file written by the clean stage.
pub fn load_cleaned(path: &Path) -> Result<Vec<Observation>, AppError> {
    let file = File::open(path).map_err(|e| AppError::io(path, e))?;
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(file);

    let headers = reader.headers().map_err(|e| AppError::csv(path, e))?.clone();
    let header_map = build_header_map(&headers);

    let name_idx = require_column(&header_map, COUNTRY_NAME)?;
    let code_idx = require_column(&header_map, COUNTRY_CODE)?;
    let year_idx = require_column(&header_map, "year")?;
    let mut value_idx = Vec::with_capacity(Indicator::ALL.len());
    for indicator in Indicator::ALL {
        value_idx.push((indicator, require_column(&header_map, indicator.field_name())?));
    }

    let mut out = Vec::new();
    for (idx, result) in reader.records().enumerate() {
        let line = idx + 2;
        let record = result.map_err(|e| AppError::csv(path, e))?;
        let year = cell(&record, year_idx).parse::<i32>().map_err(|_| {
            AppError::Schema(format!("{}:{line}: invalid year '{}'", path.display(), cell(&record, year_idx)))
        })?;

        let mut obs = Observation::new(cell(&record, name_idx), cell(&record, code_idx), year);
        for (indicator, col) in &value_idx {
            *obs.slot_mut(*indicator) = parse_value(cell(&record, *col));
        }
        out.push(obs);
    }

    Ok(out)
}

/// Coerce a cell to a number. Anything that is not a finite float is missing.
pub fn parse_value(s: &str) -> Option<f64> {
    let s = s.trim();
    if s.is_empty() || s == ".." || s.eq_ignore_ascii_case("na") {
        return None;
    }
    let v = s.parse::<f64>().ok()?;
    if v.is_finite() { Some(v) } else { None }
}

fn build_header_map(headers: &StringRecord) -> HashMap<String, usize> {
    headers
        .iter()
        .enumerate()
        .map(|(idx, name)| (normalize_header_name(name), idx))
        .collect()
}

fn normalize_header_name(name: &str) -> String {
    // Excel exports may carry a BOM on the first header.
    let name = name.trim().trim_start_matches('\u{feff}');
    name.to_ascii_lowercase().replace([' ', '.'], "_")
}

fn require_column(header_map: &HashMap<String, usize>, name: &str) -> Result<usize, AppError> {
    header_map
        .get(name)
        .copied()
        .ok_or_else(|| AppError::Schema(format!("Missing required column: `{name}`")))
}

fn cell(record: &StringRecord, idx: usize) -> &str {
    record.get(idx).map(str::trim).unwrap_or("")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> Result<RawPanel, AppError> {
        read_raw_panel(text.as_bytes(), Path::new("raw.csv"))
    }

    #[test]
    fn year_headers_are_classified() {
        assert_eq!(parse_year_header("2010 [YR2010]"), YearHeader::Year(2010));
        assert_eq!(parse_year_header("Series Name"), YearHeader::NotYear);
        assert_eq!(parse_year_header("YR2010"), YearHeader::NotYear);
        assert_eq!(parse_year_header("2010 [YR2011]"), YearHeader::Malformed);
        assert_eq!(parse_year_header("2010"), YearHeader::Malformed);
    }

    #[test]
    fn raw_panel_keeps_year_columns_and_ignores_others() {
        let text = "\u{feff}Country Name,Country Code,Series Name,Series Code,2000 [YR2000],2001 [YR2001]\n\
                    Chile,CHL,GDP growth,NY.GDP.MKTP.KD.ZG,5.3,..\n\
                    ,,,,\n";
        let panel = parse(text).unwrap();
        assert_eq!(panel.years, vec![2000, 2001]);
        assert_eq!(panel.ignored_columns, vec!["Series Name".to_string()]);
        assert_eq!(panel.rows.len(), 1);
        assert_eq!(panel.rows[0].cells, vec!["5.3".to_string(), "..".to_string()]);
        assert_eq!(panel.row_errors.len(), 1);
        assert_eq!(panel.row_errors[0].line, 3);
    }

    #[test]
    fn missing_key_column_is_schema_error() {
        let err = parse("Country Name,Series Code,2000 [YR2000]\nChile,SP.POP.GROW,1\n").unwrap_err();
        assert!(matches!(err, AppError::Schema(ref m) if m.contains("country_code")));
    }

    #[test]
    fn malformed_year_header_is_schema_error() {
        let err = parse("Country Name,Country Code,Series Code,2000 [YR1999]\n").unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn no_year_columns_is_schema_error() {
        let err = parse("Country Name,Country Code,Series Code,Notes\n").unwrap_err();
        assert!(matches!(err, AppError::Schema(_)));
    }

    #[test]
    fn values_coerce_to_missing() {
        assert_eq!(parse_value("1.5"), Some(1.5));
        assert_eq!(parse_value(".."), None);
        assert_eq!(parse_value("NA"), None);
        assert_eq!(parse_value("abc"), None);
        assert_eq!(parse_value("inf"), None);
        assert_eq!(parse_value(""), None);
    }
}
