use std::path::Path;
use std::sync::OnceLock;

use chrono::NaiveDate;
use regex::Regex;
use rust_xlsxwriter::{Color, Format, FormatAlign, FormatBorder, Workbook, Worksheet};

use super::{DayTable, Ledger, LedgerRow, TableStyle, DAILY_HEADERS};
use crate::error::Result;
use crate::models::MonthlyAccumulator;
use crate::sheet::{open_first_sheet, Grid};

pub const MONTH_HEADERS: [&str; 13] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
    "YTD Totals",
];

pub const MONEY_FORMAT: &str = "\"$\"#,##0.00";

const GREEN: u32 = 0x00AA00;
const GRAY: u32 = 0xD3D3D3;
const RED: u32 = 0xFF0000;
const WHITE: u32 = 0xFFFFFF;

/// Zero-based row where day tables start when a totals block is present.
const TABLES_START: u32 = 5;

/// Cell formats shared by every ledger and summary sheet.
pub struct Styles {
    pub title: Format,
    pub header: Format,
    pub cell: Format,
    pub money: Format,
    pub total_label: Format,
    pub total_money: Format,
    pub month_total: Format,
    pub plain_total: Format,
    pub quarterly_day: Format,
    pub daily_day: Format,
}

impl Styles {
    pub fn new() -> Self {
        let thin = Format::new().set_border(FormatBorder::Thin);
        let centered = thin.clone().set_align(FormatAlign::Center);
        let title = centered
            .clone()
            .set_bold()
            .set_font_color(Color::RGB(WHITE))
            .set_background_color(Color::RGB(GREEN));
        Self {
            header: centered
                .clone()
                .set_bold()
                .set_background_color(Color::RGB(GRAY)),
            cell: thin.clone(),
            money: thin.clone().set_num_format(MONEY_FORMAT),
            total_label: thin.clone().set_bold().set_font_color(Color::RGB(RED)),
            total_money: thin
                .clone()
                .set_bold()
                .set_font_color(Color::RGB(RED))
                .set_num_format(MONEY_FORMAT),
            month_total: centered
                .clone()
                .set_bold()
                .set_font_color(Color::RGB(RED))
                .set_num_format(MONEY_FORMAT),
            plain_total: centered.clone(),
            quarterly_day: Format::new()
                .set_bold()
                .set_border(FormatBorder::Thick)
                .set_align(FormatAlign::Center),
            daily_day: title.clone(),
            title,
        }
    }
}

impl Default for Styles {
    fn default() -> Self {
        Self::new()
    }
}

fn day_header_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"^\s*(?:Monday|Tuesday|Wednesday|Thursday|Friday|Saturday|Sunday)\s+(\d{1,2})-(\d{1,2})-(\d{4})",
        )
        .expect("invalid day header regex")
    })
}

/// Date named by a day-table header such as `Friday 4-18-2025 (Invoice Date)`.
pub fn parse_day_header(text: &str) -> Option<NaiveDate> {
    let caps = day_header_re().captures(text)?;
    NaiveDate::from_ymd_opt(caps[3].parse().ok()?, caps[1].parse().ok()?, caps[2].parse().ok()?)
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

/// Write one day table starting at `row`. Returns the row after its total.
pub fn write_day_table(ws: &mut Worksheet, styles: &Styles, row: u32, table: &DayTable) -> Result<u32> {
    write_titled_table(ws, styles, row, &table.header_text(), table)
}

/// A day table under a caller-chosen title row.
pub fn write_titled_table(
    ws: &mut Worksheet,
    styles: &Styles,
    mut row: u32,
    title: &str,
    table: &DayTable,
) -> Result<u32> {
    let day_format = match table.style {
        TableStyle::Quarterly => &styles.quarterly_day,
        TableStyle::Daily => &styles.daily_day,
    };
    ws.merge_range(row, 0, row, 9, title, day_format)?;
    row += 1;

    for (col, name) in table.style.headers().iter().enumerate() {
        ws.write_string_with_format(row, col as u16, *name, &styles.header)?;
    }
    row += 1;

    for data in &table.rows {
        write_row(ws, styles, row, data)?;
        row += 1;
    }

    ws.write_string_with_format(row, 0, table.total_label(), &styles.total_label)?;
    for col in 1..9u16 {
        ws.write_blank(row, col, &styles.cell)?;
    }
    if table.style == TableStyle::Quarterly {
        ws.write_number_with_format(row, 7, table.amount_total(), &styles.total_money)?;
    }
    ws.write_number_with_format(row, 9, table.invoiced_total(), &styles.total_money)?;
    Ok(row + 1)
}

fn write_row(ws: &mut Worksheet, styles: &Styles, row: u32, data: &LedgerRow) -> Result<()> {
    for (col, text) in data.text_cells().iter().enumerate() {
        ws.write_string_with_format(row, col as u16, *text, &styles.cell)?;
    }
    ws.write_number_with_format(row, 7, data.amount, &styles.money)?;
    ws.write_string_with_format(row, 8, &data.invoice_date, &styles.cell)?;
    ws.write_number_with_format(row, 9, data.amount_invoiced, &styles.money)?;
    Ok(())
}

fn write_totals(ws: &mut Worksheet, styles: &Styles, totals: &MonthlyAccumulator) -> Result<()> {
    for (col, name) in MONTH_HEADERS.iter().enumerate() {
        ws.write_string_with_format(0, col as u16, *name, &styles.title)?;
    }
    for (col, value) in totals.slots().iter().enumerate() {
        let format = if *value > 0.0 {
            &styles.month_total
        } else {
            &styles.plain_total
        };
        ws.write_number_with_format(1, col as u16, *value, format)?;
    }
    Ok(())
}

/// Build the full workbook for a ledger. Nothing touches disk here.
pub fn render(ledger: &Ledger) -> Result<Workbook> {
    let styles = Styles::new();
    let mut workbook = Workbook::new();
    let ws = workbook.add_worksheet();
    ws.set_name(&ledger.sheet_name)?;
    for col in 0..13u16 {
        ws.set_column_width(col, if col == 12 { 18 } else { 16 })?;
    }
    ws.set_column_width(2, 40)?;

    let mut row = match &ledger.totals {
        Some(totals) => {
            write_totals(ws, &styles, totals)?;
            TABLES_START
        }
        None => TABLES_START - 1,
    };
    for (i, table) in ledger.tables.values().enumerate() {
        if i > 0 {
            row += 1;
        }
        row = write_day_table(ws, &styles, row, table)?;
    }
    Ok(workbook)
}

// ---------------------------------------------------------------------------
// Reading back
// ---------------------------------------------------------------------------

fn read_totals(grid: &Grid) -> Option<MonthlyAccumulator> {
    if !grid.text(0, 0).eq_ignore_ascii_case(MONTH_HEADERS[0]) {
        return None;
    }
    let mut slots = [0.0; 13];
    for (col, slot) in slots.iter_mut().enumerate() {
        *slot = grid.number(1, col as u32).unwrap_or(0.0);
    }
    Some(MonthlyAccumulator::from_slots(slots))
}

fn is_total_label(text: &str) -> bool {
    text == "Total" || text.starts_with("Daily Total")
}

fn read_row(grid: &Grid, row: u32) -> LedgerRow {
    LedgerRow {
        acgi: grid.text(row, 0),
        dept: grid.text(row, 1),
        project: grid.text(row, 2),
        kind: grid.text(row, 3),
        client_po: grid.text(row, 4),
        line: grid.text(row, 5),
        po_date: grid.text(row, 6),
        amount: grid.number(row, 7).unwrap_or(0.0),
        invoice_date: grid.text(row, 8),
        amount_invoiced: grid.number(row, 9).unwrap_or(0.0),
    }
}

fn row_blank(grid: &Grid, row: u32) -> bool {
    (0..10).all(|c| grid.is_blank(row, c))
}

/// Read a ledger written by [`render`] or by earlier in-place tools. Day
/// tables are found by their weekday-prefixed header in column A.
pub fn read(path: &Path) -> Result<Ledger> {
    let (sheet_name, grid) = open_first_sheet(path)?;
    let mut ledger = Ledger::new(sheet_name);
    ledger.totals = read_totals(&grid);

    let height = grid.height();
    let mut row = 0;
    while row < height {
        let Some(date) = parse_day_header(&grid.text(row, 0)) else {
            row += 1;
            continue;
        };
        let style = if grid.text(row + 1, 0) == DAILY_HEADERS[0] {
            TableStyle::Daily
        } else {
            TableStyle::Quarterly
        };
        row += 2;

        let mut rows = Vec::new();
        while row < height {
            let first = grid.text(row, 0);
            if is_total_label(&first) {
                row += 1;
                break;
            }
            if parse_day_header(&first).is_some() || row_blank(&grid, row) {
                break;
            }
            rows.push(read_row(&grid, row));
            row += 1;
        }
        if ledger.upsert(DayTable { date, style, rows }) {
            tracing::warn!("{}: more than one table for {date}; keeping the last", path.display());
        }
    }
    Ok(ledger)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{InvoiceEvent, SourceRecord};

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn event(acgi: &str, date: NaiveDate, amount: f64, invoiced: f64) -> InvoiceEvent {
        InvoiceEvent::from_record(&SourceRecord {
            acgi: acgi.into(),
            dept: "ENG".into(),
            project: format!("Project {acgi}"),
            kind: "Completion".into(),
            invoice_date: Some(date),
            amount,
            amount_invoiced: invoiced,
            ..SourceRecord::default()
        })
    }

    #[test]
    fn test_parse_day_header() {
        assert_eq!(parse_day_header("Friday 4-18-2025 (Invoice Date)"), Some(ymd(2025, 4, 18)));
        assert_eq!(parse_day_header("Friday 04-18-2025 (Invoice Date)"), Some(ymd(2025, 4, 18)));
        assert_eq!(parse_day_header("Daily Total for 04/18/2025 (Invoice Date)"), None);
        assert_eq!(parse_day_header("January"), None);
    }

    #[test]
    fn test_render_then_read_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.xlsx");

        let mut months = [0.0; 12];
        months[0] = 100.0;
        months[3] = 250.0;
        let mut ledger = Ledger::new("Q2 2025 YTD");
        ledger.totals = Some(MonthlyAccumulator::from_months(months));
        let d1 = ymd(2025, 4, 18);
        let d2 = ymd(2025, 4, 21);
        ledger.upsert(DayTable::from_events(
            d1,
            &[event("25-0001", d1, 100.0, 100.0), event("25-0002", d1, 150.0, 150.0)],
            TableStyle::Quarterly,
        ));
        ledger.upsert(DayTable::from_events(d2, &[event("25-0003", d2, 900.0, 300.0)], TableStyle::Daily));

        render(&ledger).unwrap().save(&path).unwrap();
        let back = read(&path).unwrap();

        assert_eq!(back.sheet_name, "Q2 2025 YTD");
        let totals = back.totals.unwrap();
        assert_eq!(totals.month(1), 100.0);
        assert_eq!(totals.month(4), 250.0);
        assert_eq!(totals.ytd(), 350.0);
        assert_eq!(back.tables.len(), 2);
        assert_eq!(back.table(d1).unwrap().style, TableStyle::Quarterly);
        assert_eq!(back.table(d1).unwrap().rows.len(), 2);
        let daily = back.table(d2).unwrap();
        assert_eq!(daily.style, TableStyle::Daily);
        assert_eq!(daily.rows[0].amount, 900.0);
        assert_eq!(daily.rows[0].amount_invoiced, 300.0);
        assert_eq!(back.tables, ledger.tables);
    }

    #[test]
    fn test_read_ledger_without_totals_block() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("daily.xlsx");
        let d = ymd(2025, 5, 2);
        let mut ledger = Ledger::new("Sheet1");
        ledger.upsert(DayTable::from_events(d, &[event("25-0100", d, 10.0, 10.0)], TableStyle::Daily));
        render(&ledger).unwrap().save(&path).unwrap();

        let back = read(&path).unwrap();
        assert!(back.totals.is_none());
        assert_eq!(back.table(d).unwrap().rows[0].acgi, "25-0100");
    }
}
