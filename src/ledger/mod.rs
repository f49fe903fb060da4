//! In-memory model of a quarter ledger workbook.
//!
//! A ledger is a totals block (month headers and the accumulator row)
//! followed by one table per invoice date. Files on disk are always
//! rebuilt from this model, never patched in place.

pub mod store;
pub mod xlsx;

use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::aggregate::Aggregate;
use crate::fmt::{mdy, mdy_short};
use crate::models::{InvoiceEvent, MonthlyAccumulator};
use crate::quarter::Quarter;

pub const QUARTERLY_HEADERS: [&str; 10] = [
    "ACGI Project/ Invoice #",
    "Dept",
    "Project Number/ Name",
    "Type",
    "Client / PO #",
    "Line #",
    "PO Date",
    "Amount",
    "Invoice Date",
    "Amount Invoiced",
];

pub const DAILY_HEADERS: [&str; 10] = [
    "ACGI Project / Invoice #",
    "Dept",
    "Project Number / Name",
    "Type",
    "Client / PO #",
    "Line #",
    "PO Date",
    "Amount",
    "Invoice Date",
    "Amount Invoiced",
];

/// Two table flavours share one ledger: tables written by the quarterly
/// merge and tables upserted by the daily summary. They differ in header
/// text, date formats and the total row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableStyle {
    Quarterly,
    Daily,
}

impl TableStyle {
    pub fn headers(&self) -> &'static [&'static str; 10] {
        match self {
            Self::Quarterly => &QUARTERLY_HEADERS,
            Self::Daily => &DAILY_HEADERS,
        }
    }

    fn date_text(&self, date: Option<NaiveDate>) -> String {
        match (self, date) {
            (_, None) => String::new(),
            (Self::Quarterly, Some(d)) => mdy(d),
            (Self::Daily, Some(d)) => mdy_short(d),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LedgerRow {
    pub acgi: String,
    pub dept: String,
    pub project: String,
    pub kind: String,
    pub client_po: String,
    pub line: String,
    pub po_date: String,
    pub amount: f64,
    pub invoice_date: String,
    pub amount_invoiced: f64,
}

impl LedgerRow {
    /// Quarterly rows carry the invoiced amount in both amount columns.
    pub fn from_event(event: &InvoiceEvent, style: TableStyle) -> Self {
        let amount = match style {
            TableStyle::Quarterly => event.amount_invoiced,
            TableStyle::Daily => event.amount,
        };
        Self {
            acgi: event.acgi.clone(),
            dept: event.dept.clone(),
            project: event.display_project(),
            kind: event.kind.clone(),
            client_po: event.client_po.clone(),
            line: event.line.clone(),
            po_date: style.date_text(event.po_date),
            amount,
            invoice_date: style.date_text(event.invoice_date),
            amount_invoiced: event.amount_invoiced,
        }
    }

    pub fn text_cells(&self) -> [&str; 7] {
        [
            self.acgi.as_str(),
            self.dept.as_str(),
            self.project.as_str(),
            self.kind.as_str(),
            self.client_po.as_str(),
            self.line.as_str(),
            self.po_date.as_str(),
        ]
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DayTable {
    pub date: NaiveDate,
    pub style: TableStyle,
    pub rows: Vec<LedgerRow>,
}

impl DayTable {
    pub fn from_events(date: NaiveDate, events: &[InvoiceEvent], style: TableStyle) -> Self {
        Self {
            date,
            style,
            rows: events.iter().map(|e| LedgerRow::from_event(e, style)).collect(),
        }
    }

    /// `Friday 4-18-2025 (Invoice Date)` or, for daily tables,
    /// `Friday 04-18-2025 (Invoice Date)`.
    pub fn header_text(&self) -> String {
        let day = match self.style {
            TableStyle::Quarterly => self.date.format("%A %-m-%-d-%Y"),
            TableStyle::Daily => self.date.format("%A %m-%d-%Y"),
        };
        format!("{day} (Invoice Date)")
    }

    pub fn total_label(&self) -> String {
        match self.style {
            TableStyle::Quarterly => format!("Daily Total for {} (Invoice Date)", mdy(self.date)),
            TableStyle::Daily => "Total".to_string(),
        }
    }

    pub fn amount_total(&self) -> f64 {
        self.rows.iter().map(|r| r.amount).sum()
    }

    pub fn invoiced_total(&self) -> f64 {
        self.rows.iter().map(|r| r.amount_invoiced).sum()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Ledger {
    pub sheet_name: String,
    pub totals: Option<MonthlyAccumulator>,
    pub tables: BTreeMap<NaiveDate, DayTable>,
}

impl Ledger {
    pub fn new(sheet_name: impl Into<String>) -> Self {
        Self {
            sheet_name: sheet_name.into(),
            totals: None,
            tables: BTreeMap::new(),
        }
    }

    /// The ledger the quarterly merge writes: merged totals plus one table
    /// per invoice date in the quarter.
    pub fn quarterly(quarter: &Quarter, totals: MonthlyAccumulator, agg: &Aggregate) -> Self {
        let tables = agg
            .daily
            .iter()
            .map(|(&date, events)| (date, DayTable::from_events(date, events, TableStyle::Quarterly)))
            .collect();
        Self {
            sheet_name: quarter.sheet_title(),
            totals: Some(totals),
            tables,
        }
    }

    /// Insert or replace the table for its date. Returns true when a table
    /// for that date was already present.
    pub fn upsert(&mut self, table: DayTable) -> bool {
        self.tables.insert(table.date, table).is_some()
    }

    #[cfg(test)]
    pub fn table(&self, date: NaiveDate) -> Option<&DayTable> {
        self.tables.get(&date)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{SourceRecord, SplitInfo};

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn event() -> InvoiceEvent {
        let mut e = InvoiceEvent::from_record(&SourceRecord {
            acgi: "25-0042".into(),
            project: "Chiller".into(),
            kind: "Completion".into(),
            po_date: Some(ymd(2025, 1, 7)),
            invoice_date: Some(ymd(2025, 4, 18)),
            amount: 10000.0,
            amount_invoiced: 5000.0,
            ..SourceRecord::default()
        });
        e.split = Some(SplitInfo {
            label: "50.0% invoiced 04/18/2025".into(),
            original_amount: 10000.0,
            percentage: 50.0,
        });
        e
    }

    #[test]
    fn test_quarterly_row_uses_invoiced_amount_twice() {
        let row = LedgerRow::from_event(&event(), TableStyle::Quarterly);
        assert_eq!(row.amount, 5000.0);
        assert_eq!(row.amount_invoiced, 5000.0);
        assert_eq!(row.project, "Chiller [50.0% invoiced 04/18/2025]");
        assert_eq!(row.po_date, "01/07/2025");
        assert_eq!(row.invoice_date, "04/18/2025");
    }

    #[test]
    fn test_daily_row_keeps_both_amounts() {
        let row = LedgerRow::from_event(&event(), TableStyle::Daily);
        assert_eq!(row.amount, 10000.0);
        assert_eq!(row.amount_invoiced, 5000.0);
        assert_eq!(row.invoice_date, "04/18/25");
    }

    #[test]
    fn test_header_and_total_labels() {
        let q = DayTable::from_events(ymd(2025, 4, 8), &[], TableStyle::Quarterly);
        assert_eq!(q.header_text(), "Tuesday 4-8-2025 (Invoice Date)");
        assert_eq!(q.total_label(), "Daily Total for 04/08/2025 (Invoice Date)");
        let d = DayTable::from_events(ymd(2025, 4, 8), &[], TableStyle::Daily);
        assert_eq!(d.header_text(), "Tuesday 04-08-2025 (Invoice Date)");
        assert_eq!(d.total_label(), "Total");
    }

    #[test]
    fn test_upsert_replaces_same_date() {
        let mut ledger = Ledger::new("Q2 2025 YTD");
        let date = ymd(2025, 4, 18);
        let e = event();
        assert!(!ledger.upsert(DayTable::from_events(date, &[e.clone(), e.clone()], TableStyle::Daily)));
        assert!(ledger.upsert(DayTable::from_events(date, &[e], TableStyle::Daily)));
        assert_eq!(ledger.tables.len(), 1);
        assert_eq!(ledger.table(date).unwrap().rows.len(), 1);
    }
}
