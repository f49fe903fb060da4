use std::path::Path;

use calamine::{Data, Range, Reader};
use chrono::{NaiveDate, NaiveDateTime};

use crate::error::{Result, YtdError};

// ---------------------------------------------------------------------------
// Cell coercion
// ---------------------------------------------------------------------------

/// Parse a currency string: `$1,234.56`, `(50.00)`. None when not numeric.
pub fn parse_amount(raw: &str) -> Option<f64> {
    let s = raw.replace([',', '"', '$'], "");
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    if let Some(inner) = s.strip_prefix('(').and_then(|v| v.strip_suffix(')')) {
        return inner.trim().parse::<f64>().ok().map(|v| -v);
    }
    s.parse().ok()
}

/// Dates as typed into project lists by hand.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    // chrono's %Y also takes "25", so pick the M/D/Y form by the year's width
    let two_digit_year = raw
        .rsplit(['/', '-'])
        .next()
        .is_some_and(|y| y.len() == 2 && y.bytes().all(|b| b.is_ascii_digit()));
    let mdy = if two_digit_year {
        ["%m/%d/%y", "%m-%d-%y"]
    } else {
        ["%m/%d/%Y", "%m-%d-%Y"]
    };
    for fmt in mdy.into_iter().chain(["%Y-%m-%d"]) {
        if let Ok(d) = NaiveDate::parse_from_str(raw, fmt) {
            return Some(d);
        }
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S", "%m/%d/%Y %H:%M:%S"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(dt.date());
        }
    }
    None
}

pub fn excel_serial_to_date(serial: f64) -> Option<NaiveDate> {
    // Excel epoch is 1899-12-30 (accounting for the 1900 leap year bug)
    let base = NaiveDate::from_ymd_opt(1899, 12, 30)?;
    if !serial.is_finite() || serial < 1.0 {
        return None;
    }
    base.checked_add_signed(chrono::Duration::days(serial as i64))
}

pub fn data_text(cell: &Data) -> String {
    match cell {
        Data::String(s) => s.trim().to_string(),
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", *f as i64),
        Data::Float(f) => f.to_string(),
        Data::Int(i) => i.to_string(),
        Data::Bool(b) => b.to_string(),
        Data::DateTime(dt) => excel_serial_to_date(dt.as_f64())
            .map(|d| d.format("%m/%d/%Y").to_string())
            .unwrap_or_default(),
        Data::DateTimeIso(s) | Data::DurationIso(s) => s.clone(),
        Data::Error(_) | Data::Empty => String::new(),
    }
}

pub fn data_number(cell: &Data) -> Option<f64> {
    match cell {
        Data::Float(f) => Some(*f),
        Data::Int(i) => Some(*i as f64),
        Data::String(s) => parse_amount(s),
        _ => None,
    }
}

pub fn data_date(cell: &Data) -> Option<NaiveDate> {
    match cell {
        Data::DateTime(dt) => excel_serial_to_date(dt.as_f64()),
        Data::Float(f) => excel_serial_to_date(*f),
        Data::Int(i) => excel_serial_to_date(*i as f64),
        Data::String(s) | Data::DateTimeIso(s) => parse_date(s),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Grid: a sheet addressed by absolute, zero-based (row, col)
// ---------------------------------------------------------------------------

static EMPTY: Data = Data::Empty;

pub struct Grid {
    range: Range<Data>,
}

impl Grid {
    pub fn new(range: Range<Data>) -> Self {
        Self { range }
    }

    pub fn cell(&self, row: u32, col: u32) -> &Data {
        self.range.get_value((row, col)).unwrap_or(&EMPTY)
    }

    /// One past the last used row.
    pub fn height(&self) -> u32 {
        self.range.end().map(|(r, _)| r + 1).unwrap_or(0)
    }

    /// One past the last used column.
    pub fn width(&self) -> u32 {
        self.range.end().map(|(_, c)| c + 1).unwrap_or(0)
    }

    pub fn text(&self, row: u32, col: u32) -> String {
        data_text(self.cell(row, col))
    }

    pub fn number(&self, row: u32, col: u32) -> Option<f64> {
        data_number(self.cell(row, col))
    }

    pub fn date(&self, row: u32, col: u32) -> Option<NaiveDate> {
        data_date(self.cell(row, col))
    }

    pub fn is_blank(&self, row: u32, col: u32) -> bool {
        self.text(row, col).is_empty()
    }

    pub fn row_is_blank(&self, row: u32) -> bool {
        (0..self.width()).all(|c| self.is_blank(row, c))
    }
}

pub fn open_sheet(path: &Path, sheet: &str) -> Result<Grid> {
    let mut workbook = calamine::open_workbook_auto(path)?;
    let range = workbook.worksheet_range(sheet)?;
    Ok(Grid::new(range))
}

pub fn open_first_sheet(path: &Path) -> Result<(String, Grid)> {
    let mut workbook = calamine::open_workbook_auto(path)?;
    let name = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| YtdError::Other(format!("{} has no sheets", path.display())))?;
    let range = workbook.worksheet_range(&name)?;
    Ok((name, Grid::new(range)))
}
