//! The daily summary run: period totals, receivables per year, the summary
//! workbook, and the day's table upserted into the current quarter ledger.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use rust_xlsxwriter::{Color, Format, FormatAlign, FormatBorder, Workbook, Worksheet};

use crate::aggregate::{period_totals, PeriodTotals};
use crate::error::{Result, YtdError};
use crate::fmt::money;
use crate::ledger::xlsx::{self, Styles};
use crate::ledger::{store, DayTable, TableStyle};
use crate::loader::{load, project_list_name};
use crate::locator::{Locate, TieredLocator};
use crate::models::InvoiceEvent;
use crate::quarter::Quarter;
use crate::receivables::{read_year, YearReceivables};
use crate::runlog::{RunLog, RunOutcome};
use crate::settings::Settings;

pub const SHEET_NAME: &str = "Daily Summary Tables";

const NAVY: u32 = 0x003366;
const BLUE: u32 = 0x0000AA;
const WHITE: u32 = 0xFFFFFF;

/// Blank rows left between the summary's sections.
const SECTION_GAP: u32 = 3;

#[derive(Debug, Clone)]
pub struct DailySummary {
    pub date: NaiveDate,
    pub periods: PeriodTotals,
    /// Records invoiced on the target date, unsplit, in load order.
    pub invoices: Vec<InvoiceEvent>,
    pub years: Vec<YearReceivables>,
}

impl DailySummary {
    pub fn total_receivables(&self) -> f64 {
        self.years.iter().map(|y| y.receivables).sum()
    }

    pub fn total_vendors(&self) -> f64 {
        self.years.iter().map(|y| y.vendors).sum()
    }

    pub fn net_receivables(&self) -> f64 {
        self.total_receivables() - self.total_vendors()
    }

    /// The seven label/value lines at the top of the summary sheet.
    pub fn summary_lines(&self) -> Vec<(String, String)> {
        let p = &self.periods;
        vec![
            (format!("Today ({})", self.date), money(p.today)),
            (format!("This Week (since {})", p.week_start), money(p.week)),
            (format!("This Month (since {})", p.month_start), money(p.month)),
            ("Total Payments Received".to_string(), money(p.received)),
            ("Total Receivables".to_string(), money(self.total_receivables())),
            ("Vendors to be paid".to_string(), money(self.total_vendors())),
            ("Net Receivables".to_string(), money(self.net_receivables())),
        ]
    }

    pub fn day_table(&self) -> DayTable {
        DayTable::from_events(self.date, &self.invoices, TableStyle::Daily)
    }
}

/// Load every selected year and compute the summary figures. A year that
/// cannot be located or read fails the whole summary.
pub fn collect(
    locator: &dyn Locate,
    years: &[String],
    date: NaiveDate,
    settings: &Settings,
    log: &mut RunLog,
) -> Result<DailySummary> {
    let mut sources = Vec::with_capacity(years.len());
    for year in years {
        let path = locator
            .locate(&project_list_name(year))
            .ok_or_else(|| YtdError::SourceUnavailable(year.clone()))?;
        log.info(format!("Found {year} project list: {}", path.display()));
        sources.push((year.clone(), path));
    }

    let mut events = Vec::new();
    for (year, path) in &sources {
        let records = load(path, year, settings, log)?;
        events.extend(records.iter().map(InvoiceEvent::from_record));
    }
    let periods = period_totals(&events, date);
    let invoices: Vec<InvoiceEvent> = events
        .into_iter()
        .filter(|e| e.invoice_date == Some(date))
        .collect();

    let mut receivables = Vec::with_capacity(sources.len());
    for (year, path) in &sources {
        match read_year(path, year, settings, log) {
            Ok(r) => receivables.push(r),
            Err(e) => {
                log.warn(format!("Error reading receivables for {year}: {e}"));
                receivables.push(YearReceivables {
                    year: year.clone(),
                    ..YearReceivables::default()
                });
            }
        }
    }

    Ok(DailySummary {
        date,
        periods,
        invoices,
        years: receivables,
    })
}

// ---------------------------------------------------------------------------
// Summary workbook
// ---------------------------------------------------------------------------

struct SummaryStyles {
    base: Styles,
    banner: Format,
    label: Format,
    value: Format,
}

impl SummaryStyles {
    fn new() -> Self {
        let thin = Format::new().set_border(FormatBorder::Thin);
        Self {
            base: Styles::new(),
            banner: thin
                .clone()
                .set_bold()
                .set_font_size(16)
                .set_font_color(Color::RGB(WHITE))
                .set_background_color(Color::RGB(NAVY))
                .set_align(FormatAlign::Center),
            label: thin.clone().set_bold(),
            value: thin.set_bold().set_font_color(Color::RGB(BLUE)),
        }
    }
}

pub fn summary_file_name(date: NaiveDate) -> String {
    format!("daily_summary_tables_{}.xlsx", date.format("%Y%m%d"))
}

fn write_money(ws: &mut Worksheet, row: u32, col: u16, value: Option<f64>, format: &Format) -> Result<()> {
    match value {
        Some(v) => ws.write_number_with_format(row, col, v, format)?,
        None => ws.write_blank(row, col, format)?,
    };
    Ok(())
}

fn write_receivables_table(ws: &mut Worksheet, s: &SummaryStyles, mut row: u32, summary: &DailySummary) -> Result<u32> {
    let base = &s.base;
    ws.merge_range(row, 0, row, 2, "Receivables vs. Vendors to be Paid by Year", &base.title)?;
    row += 1;
    for (col, name) in ["Year", "Receivables", "Vendors to be paid"].iter().enumerate() {
        ws.write_string_with_format(row, col as u16, *name, &base.header)?;
    }
    row += 1;
    for year in &summary.years {
        ws.write_string_with_format(row, 0, &year.year, &base.cell)?;
        ws.write_number_with_format(row, 1, year.receivables, &base.money)?;
        ws.write_number_with_format(row, 2, year.vendors, &base.money)?;
        row += 1;
    }
    ws.write_string_with_format(row, 0, "Total", &base.total_label)?;
    ws.write_number_with_format(row, 1, summary.total_receivables(), &base.total_money)?;
    ws.write_number_with_format(row, 2, summary.total_vendors(), &base.total_money)?;
    Ok(row + 1)
}

fn write_year_details(ws: &mut Worksheet, s: &SummaryStyles, mut row: u32, year: &YearReceivables) -> Result<u32> {
    let Some(details) = &year.details else {
        return Ok(row);
    };
    let base = &s.base;
    ws.merge_range(row, 0, row, 6, &format!("{} Details", year.year), &base.title)?;
    row += 1;

    for col in 0..7u16 {
        ws.write_blank(row, col, &base.cell)?;
    }
    for (col, value) in [1u16, 3, 4, 6].into_iter().zip(details.totals) {
        write_money(ws, row, col, value, &base.money)?;
    }
    row += 1;

    for col in 0..7u16 {
        ws.write_blank(row, col, &base.cell)?;
    }
    ws.write_string_with_format(row, 0, "To Invoice", &base.cell)?;
    write_money(ws, row, 1, details.to_invoice[0], &base.money)?;
    write_money(ws, row, 6, details.to_invoice[1], &base.money)?;
    row += 1;

    for col in 0..7u16 {
        ws.write_blank(row, col, &base.cell)?;
    }
    ws.write_string_with_format(row, 0, "To invoice less hold", &base.cell)?;
    write_money(ws, row, 1, details.less_hold, &base.money)?;
    Ok(row + 1)
}

pub fn render(summary: &DailySummary) -> Result<Workbook> {
    let styles = SummaryStyles::new();
    let mut workbook = Workbook::new();
    let ws = workbook.add_worksheet();
    ws.set_name(SHEET_NAME)?;
    ws.set_column_width(0, 34)?;
    for col in 1..10u16 {
        ws.set_column_width(col, 16)?;
    }
    ws.set_column_width(2, 40)?;

    let title = format!("Daily Invoicing Summary - {}", summary.date.format("%A, %B %d, %Y"));
    ws.merge_range(0, 0, 0, 9, &title, &styles.banner)?;
    let mut row = 2;
    for (label, value) in summary.summary_lines() {
        ws.write_string_with_format(row, 0, &label, &styles.label)?;
        ws.write_string_with_format(row, 1, &value, &styles.value)?;
        for col in 2..10u16 {
            ws.write_blank(row, col, &styles.base.cell)?;
        }
        row += 1;
    }

    row += SECTION_GAP;
    let invoices_title = format!("Invoices for {}", summary.date.format("%A %m-%d-%Y"));
    row = xlsx::write_titled_table(ws, &styles.base, row, &invoices_title, &summary.day_table())?;

    row += SECTION_GAP;
    row = write_receivables_table(ws, &styles, row, summary)?;

    for year in summary.years.iter().filter(|y| y.details.is_some()) {
        row += SECTION_GAP;
        row = write_year_details(ws, &styles, row, year)?;
    }
    Ok(workbook)
}

/// Write `daily_summary_tables_<YYYYMMDD>.xlsx` into `output_dir`.
pub fn write_summary(summary: &DailySummary, output_dir: &Path) -> Result<PathBuf> {
    std::fs::create_dir_all(output_dir)?;
    let path = output_dir.join(summary_file_name(summary.date));
    let bytes = render(summary)?.save_to_buffer()?;
    store::write_atomic(&path, &bytes)?;
    Ok(path)
}

// ---------------------------------------------------------------------------
// Ledger upsert
// ---------------------------------------------------------------------------

/// Replace (or add) the day's table in the current quarter's ledger. Returns
/// false when the ledger is missing or could not be saved. Nothing to add
/// counts as success.
pub fn upsert_daily_table(locator: &TieredLocator, table: DayTable, log: &mut RunLog) -> bool {
    if table.rows.is_empty() {
        log.info("No daily invoices to add to YTD sheet");
        return true;
    }
    let quarter = Quarter::containing(table.date);
    let Some(path) = locator.locate_ledger(&quarter.ledger_file_name()) else {
        log.warn(format!("YTD sheet not found for {quarter}"));
        return false;
    };
    log.info(format!("YTD sheet found: {}", path.display()));

    let mut ledger = match xlsx::read(&path) {
        Ok(ledger) => ledger,
        Err(e) => {
            log.warn(format!("Could not read YTD sheet {}: {e}", path.display()));
            return false;
        }
    };
    let date_label = table.header_text();
    let count = table.rows.len();
    let replaced = ledger.upsert(table);

    let make_backup = !locator.in_reports(&path);
    if !make_backup {
        log.info("File in reports folder - no backup needed");
    }
    match store::save(&ledger, &path, make_backup, log) {
        Ok(written) => {
            let action = if replaced { "Updated existing" } else { "Added new" };
            log.info(format!(
                "{action} daily table in YTD sheet: {} ({date_label}, {count} records)",
                written.display()
            ));
            true
        }
        Err(e) => {
            log.warn(format!("Failed to save YTD sheet: {e}"));
            false
        }
    }
}

/// What a daily run produced besides its log.
#[derive(Debug, Clone)]
pub struct DailyReport {
    pub summary: DailySummary,
    pub workbook: PathBuf,
    pub ledger_updated: bool,
}

pub fn generate(
    locator: &TieredLocator,
    years: &[String],
    date: NaiveDate,
    output_dir: &Path,
    settings: &Settings,
    log: &mut RunLog,
) -> Result<DailyReport> {
    log.info(format!("Generating summary for {date}"));
    let summary = collect(locator, years, date, settings, log)?;
    let ledger_updated = upsert_daily_table(locator, summary.day_table(), log);
    if !ledger_updated {
        log.warn("YTD sheet update failed or skipped");
    }
    let workbook = write_summary(&summary, output_dir)?;
    log.info(format!("Created {}", workbook.display()));
    Ok(DailyReport {
        summary,
        workbook,
        ledger_updated,
    })
}

/// Entry point for a background worker: the run never panics or returns
/// early, it reports success and the captured log.
pub fn run(
    locator: &TieredLocator,
    years: &[String],
    date: NaiveDate,
    output_dir: &Path,
    settings: &Settings,
) -> RunOutcome<DailyReport> {
    let mut log = RunLog::new();
    match generate(locator, years, date, output_dir, settings, &mut log) {
        Ok(report) => log.finish(Some(report)),
        Err(e) => {
            log.warn(format!("Error generating summary: {e}"));
            log.finish(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::Ledger;
    use crate::models::SourceRecord;
    use crate::sheet::open_sheet;
    use std::path::PathBuf;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn event(acgi: &str, date: NaiveDate, amount: f64, invoiced: f64) -> InvoiceEvent {
        InvoiceEvent::from_record(&SourceRecord {
            acgi: acgi.into(),
            kind: "Completion".into(),
            invoice_date: Some(date),
            amount,
            amount_invoiced: invoiced,
            ..SourceRecord::default()
        })
    }

    fn locator(root: &Path) -> TieredLocator {
        TieredLocator {
            project_root: root.join("network"),
            cache_dir: root.join("quarterly sheets"),
            reports_dir: root.join("reports"),
        }
    }

    fn summary(date: NaiveDate, invoices: Vec<InvoiceEvent>) -> DailySummary {
        DailySummary {
            date,
            periods: period_totals(&invoices, date),
            invoices,
            years: vec![
                YearReceivables {
                    year: "2024".into(),
                    receivables: 1000.0,
                    vendors: 250.0,
                    ..YearReceivables::default()
                },
                YearReceivables {
                    year: "2025".into(),
                    receivables: 500.0,
                    vendors: 0.0,
                    ..YearReceivables::default()
                },
            ],
        }
    }

    #[test]
    fn test_summary_lines() {
        let date = ymd(2025, 5, 15);
        let s = summary(date, vec![event("25-0001", date, 1000.0, 400.0)]);
        let lines = s.summary_lines();
        assert_eq!(lines.len(), 7);
        assert_eq!(lines[0], ("Today (2025-05-15)".to_string(), "$1,000.00".to_string()));
        assert_eq!(lines[1].0, "This Week (since 2025-05-12)");
        assert_eq!(lines[2].0, "This Month (since 2025-05-01)");
        assert_eq!(lines[3].1, "$400.00");
        assert_eq!(lines[4].1, "$1,500.00");
        assert_eq!(lines[5].1, "$250.00");
        assert_eq!(lines[6], ("Net Receivables".to_string(), "$1,250.00".to_string()));
    }

    #[test]
    fn test_write_summary_layout() {
        let dir = tempfile::tempdir().unwrap();
        let date = ymd(2025, 4, 18);
        let s = summary(date, vec![event("25-0001", date, 1000.0, 400.0)]);
        let path = write_summary(&s, dir.path()).unwrap();
        assert_eq!(path, dir.path().join("daily_summary_tables_20250418.xlsx"));

        let grid = open_sheet(&path, SHEET_NAME).unwrap();
        assert_eq!(grid.text(0, 0), "Daily Invoicing Summary - Friday, April 18, 2025");
        assert_eq!(grid.text(2, 0), "Today (2025-04-18)");
        assert_eq!(grid.text(8, 0), "Net Receivables");
        assert_eq!(grid.text(12, 0), "Invoices for Friday 04-18-2025");
        assert_eq!(grid.text(13, 0), "ACGI Project / Invoice #");
        assert_eq!(grid.text(14, 0), "25-0001");
        assert_eq!(grid.text(15, 0), "Total");
        assert_eq!(grid.number(15, 9), Some(400.0));
        assert_eq!(grid.text(19, 0), "Receivables vs. Vendors to be Paid by Year");
        assert_eq!(grid.text(21, 0), "2024");
        assert_eq!(grid.text(23, 0), "Total");
        assert_eq!(grid.number(23, 1), Some(1500.0));
    }

    fn seed_ledger(path: &Path) {
        let mut log = RunLog::new();
        let mut ledger = Ledger::new("Q2 2025 YTD");
        ledger.upsert(DayTable::from_events(
            ymd(2025, 4, 1),
            &[event("25-0001", ymd(2025, 4, 1), 10.0, 10.0)],
            TableStyle::Quarterly,
        ));
        store::save(&ledger, path, false, &mut log).unwrap();
    }

    #[test]
    fn test_upsert_twice_keeps_one_table() {
        let dir = tempfile::tempdir().unwrap();
        let loc = locator(dir.path());
        std::fs::create_dir_all(&loc.cache_dir).unwrap();
        let ledger_path = loc.cache_dir.join("2025 2nd Quarter YTD.xlsx");
        seed_ledger(&ledger_path);

        let date = ymd(2025, 4, 18);
        let mut log = RunLog::new();
        let first = DayTable::from_events(
            date,
            &[event("25-0002", date, 100.0, 100.0), event("25-0003", date, 50.0, 50.0)],
            TableStyle::Daily,
        );
        assert!(upsert_daily_table(&loc, first, &mut log));
        let second = DayTable::from_events(date, &[event("25-0004", date, 70.0, 35.0)], TableStyle::Daily);
        assert!(upsert_daily_table(&loc, second, &mut log));

        let ledger = xlsx::read(&ledger_path).unwrap();
        assert_eq!(ledger.tables.len(), 2);
        let table = ledger.table(date).unwrap();
        assert_eq!(table.rows.len(), 1);
        assert_eq!(table.rows[0].acgi, "25-0004");
        assert_eq!(table.style, TableStyle::Daily);
        assert!(log.contains("Updated existing daily table"));
    }

    #[test]
    fn test_upsert_in_reports_skips_backup() {
        let dir = tempfile::tempdir().unwrap();
        let loc = locator(dir.path());
        std::fs::create_dir_all(&loc.reports_dir).unwrap();
        let ledger_path = loc.reports_dir.join("2025 2nd Quarter YTD.xlsx");
        seed_ledger(&ledger_path);

        let date = ymd(2025, 5, 2);
        let mut log = RunLog::new();
        let table = DayTable::from_events(date, &[event("25-0009", date, 5.0, 5.0)], TableStyle::Daily);
        assert!(upsert_daily_table(&loc, table, &mut log));
        assert!(log.contains("no backup needed"));
        assert_eq!(std::fs::read_dir(&loc.reports_dir).unwrap().count(), 1);
    }

    #[test]
    fn test_upsert_without_ledger_fails_and_empty_day_succeeds() {
        let dir = tempfile::tempdir().unwrap();
        let loc = locator(dir.path());
        let date = ymd(2025, 5, 2);
        let mut log = RunLog::new();
        let table = DayTable::from_events(date, &[event("25-0009", date, 5.0, 5.0)], TableStyle::Daily);
        assert!(!upsert_daily_table(&loc, table, &mut log));
        assert!(log.contains("YTD sheet not found for Q2 2025"));

        let empty = DayTable::from_events(date, &[], TableStyle::Daily);
        assert!(upsert_daily_table(&loc, empty, &mut log));
    }

    #[test]
    fn test_collect_fails_when_a_year_is_missing() {
        let locate = |_: &str| -> Option<PathBuf> { None };
        let mut log = RunLog::new();
        let err = collect(&locate, &["2025".to_string()], ymd(2025, 5, 2), &Settings::default(), &mut log)
            .unwrap_err();
        assert!(matches!(err, YtdError::SourceUnavailable(y) if y == "2025"));
    }

    #[test]
    fn test_run_without_sources_reports_failure() {
        let dir = tempfile::tempdir().unwrap();
        let loc = locator(dir.path());
        let outcome = run(&loc, &["2025".to_string()], ymd(2025, 5, 2), dir.path(), &Settings::default());
        assert!(!outcome.success);
        assert!(outcome.failure().unwrap().starts_with("Error generating summary"));
        assert!(!dir.path().join("daily_summary_tables_20250502.xlsx").exists());
    }
}
