use std::path::Path;

use crate::error::{Result, YtdError};
use crate::locator::Locate;
use crate::models::SourceRecord;
use crate::runlog::RunLog;
use crate::settings::Settings;
use crate::sheet::{open_sheet, Grid};

/// Column positions resolved from a project-list header row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColumnMap {
    pub acgi: u32,
    pub dept: Option<u32>,
    pub project: Option<u32>,
    pub client_po: Option<u32>,
    pub line: Option<u32>,
    pub kind: Option<u32>,
    pub po_date: Option<u32>,
    pub invoice_date: Option<u32>,
    pub amount: Option<u32>,
    pub amount_invoiced: Option<u32>,
    pub comments: Option<u32>,
    pub completion_date: Option<u32>,
}

fn find(headers: &[String], pred: impl Fn(&str) -> bool) -> Option<u32> {
    headers
        .iter()
        .position(|h| pred(&h.to_lowercase()))
        .map(|i| i as u32)
}

/// Match header names case-insensitively. Column names drift between years,
/// so each role is a substring test rather than an exact name.
pub fn resolve_columns(headers: &[String], comments_fallback: u32) -> ColumnMap {
    ColumnMap {
        acgi: find(headers, |h| h.contains("acgi") && h.contains('#')).unwrap_or(0),
        dept: find(headers, |h| h.contains("dept") || h.contains("department")),
        project: find(headers, |h| {
            h.contains("project") && (h.contains("number") || h.contains("name"))
        }),
        client_po: find(headers, |h| h.contains("client") && h.contains("po")),
        line: find(headers, |h| h.contains("line") && h.contains('#')),
        kind: find(headers, |h| h.trim() == "type"),
        po_date: find(headers, |h| {
            h.contains("po") && h.contains("date") && !h.contains("invoice")
        }),
        invoice_date: find(headers, |h| h.contains("invoice") && h.contains("date")),
        amount: find(headers, |h| h.trim() == "amount"),
        amount_invoiced: find(headers, |h| h.trim() == "amount invoiced"),
        comments: find(headers, |h| h.contains("comment") || h.contains("note")).or_else(|| {
            ((comments_fallback as usize) < headers.len()).then_some(comments_fallback)
        }),
        completion_date: find(headers, |h| h.contains("completion") && h.contains("date")),
    }
}

fn header_row(grid: &Grid, row: u32) -> Vec<String> {
    (0..grid.width()).map(|c| grid.text(row, c)).collect()
}

fn text_at(grid: &Grid, row: u32, col: Option<u32>) -> String {
    col.map(|c| grid.text(row, c)).unwrap_or_default()
}

/// Read one year's sheet into records.
///
/// The header sits at `settings.header_row`; data follows it. A row is kept
/// only when both Amount and Amount Invoiced are numeric.
pub fn load(path: &Path, year: &str, settings: &Settings, log: &mut RunLog) -> Result<Vec<SourceRecord>> {
    let grid = open_sheet(path, year)?;
    let header_at = settings.header_row as u32;
    let headers = header_row(&grid, header_at);
    let cols = resolve_columns(&headers, settings.comments_column as u32);

    if cols.amount.is_none() && cols.amount_invoiced.is_none() {
        return Err(YtdError::Other(format!(
            "{year}: no Amount / Amount Invoiced columns in header row {}",
            header_at + 1
        )));
    }
    for (role, col) in [
        ("Invoice Date", cols.invoice_date),
        ("Amount", cols.amount),
        ("Amount Invoiced", cols.amount_invoiced),
        ("Comments", cols.comments),
    ] {
        if col.is_none() {
            log.warn(format!("{year}: column '{role}' not found"));
        }
    }

    let mut records = Vec::new();
    let mut dropped = 0usize;
    for row in header_at + 1..grid.height() {
        let amount = cols.amount.and_then(|c| grid.number(row, c));
        let invoiced = cols.amount_invoiced.and_then(|c| grid.number(row, c));
        let (Some(amount), Some(amount_invoiced)) = (amount, invoiced) else {
            if !grid.row_is_blank(row) {
                dropped += 1;
            }
            continue;
        };

        let comments = text_at(&grid, row, cols.comments);
        let kind = text_at(&grid, row, cols.kind);
        records.push(SourceRecord {
            acgi: grid.text(row, cols.acgi),
            dept: text_at(&grid, row, cols.dept),
            project: text_at(&grid, row, cols.project),
            client_po: text_at(&grid, row, cols.client_po),
            line: text_at(&grid, row, cols.line),
            kind: if kind.is_empty() { "Completion".into() } else { kind },
            po_date: cols.po_date.and_then(|c| grid.date(row, c)),
            invoice_date: cols.invoice_date.and_then(|c| grid.date(row, c)),
            amount,
            amount_invoiced,
            comments: (!comments.is_empty()).then_some(comments),
            completion_date: cols.completion_date.and_then(|c| grid.date(row, c)),
            source_year: year.to_string(),
        });
    }

    tracing::debug!(year, kept = records.len(), dropped, "loaded project list");
    if dropped > 0 {
        log.info(format!("{year}: skipped {dropped} rows without numeric amounts"));
    }
    Ok(records)
}

/// What a batch load produced: records from every year that could be read,
/// plus which years made it in.
#[derive(Debug, Default)]
pub struct Loaded {
    pub records: Vec<SourceRecord>,
    pub years: Vec<String>,
}

pub fn project_list_name(year: &str) -> String {
    format!("{year} Project List")
}

/// Load every year that can be located and read. Failures are logged and the
/// year is left out; the batch fails only when nothing loads.
pub fn load_years(
    locator: &dyn Locate,
    years: &[String],
    settings: &Settings,
    log: &mut RunLog,
) -> Result<Loaded> {
    let mut loaded = Loaded::default();
    for year in years {
        let Some(path) = locator.locate(&project_list_name(year)) else {
            log.warn(YtdError::SourceUnavailable(year.clone()).to_string());
            continue;
        };
        match load(&path, year, settings, log) {
            Ok(records) => {
                log.info(format!(
                    "Loaded {} records from {}",
                    records.len(),
                    path.display()
                ));
                loaded.records.extend(records);
                loaded.years.push(year.clone());
            }
            Err(e) => log.warn(format!("Error reading {year} project list: {e}")),
        }
    }
    if loaded.years.is_empty() {
        return Err(YtdError::NoSources);
    }
    Ok(loaded)
}
