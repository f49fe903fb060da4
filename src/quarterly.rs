//! The quarterly run: load project lists, expand split invoices, aggregate
//! the quarter and merge it into the YTD ledger.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::Datelike;

use crate::aggregate::{aggregate, Aggregate};
use crate::error::Result;
use crate::fmt::money;
use crate::loader::load_years;
use crate::locator::Locate;
use crate::merge::merge;
use crate::models::{InvoiceEvent, SourceRecord, SplitPlan};
use crate::quarter::Quarter;
use crate::reconciler::reconcile;
use crate::runlog::{RunLog, RunOutcome};
use crate::settings::Settings;
use crate::splits;

const MAX_EXAMPLES: usize = 3;

/// Parse each record's comment and expand it into invoice events. Events
/// without an invoice date are dropped. Returns the events and how many
/// records were split.
pub fn expand(records: &[SourceRecord], log: &mut RunLog) -> (Vec<InvoiceEvent>, usize) {
    let mut events = Vec::with_capacity(records.len());
    let mut split_records = 0;
    for record in records {
        let plan = match record.comments.as_deref() {
            Some(comment) => splits::parse(comment, log),
            None => SplitPlan::None,
        };
        let expanded = reconcile(record, &plan, log);
        if expanded.iter().any(|e| e.split.is_some()) {
            split_records += 1;
            log.info(format!(
                "Split invoice found for {}: {} into {} parts",
                record.acgi,
                money(record.amount),
                expanded.len()
            ));
        }
        events.extend(expanded.into_iter().filter(|e| e.invoice_date.is_some()));
    }
    log.info(format!(
        "Split invoice processing complete: {split_records} records split into {} total records",
        events.len()
    ));
    (events, split_records)
}

#[derive(Debug, Clone, PartialEq)]
pub struct Bucket {
    pub label: String,
    pub count: usize,
    pub total: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SplitExample {
    pub acgi: String,
    pub original_amount: f64,
    /// (label, amount invoiced) per part.
    pub parts: Vec<(String, f64)>,
}

/// What the quarter's events add up to, for the completion report.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompletionSummary {
    pub by_month: Vec<Bucket>,
    pub by_year: Vec<Bucket>,
    pub count: usize,
    pub total: f64,
    pub split_events: usize,
    pub split_projects: usize,
    pub examples: Vec<SplitExample>,
}

fn add(map: &mut BTreeMap<(i32, u32), Bucket>, key: (i32, u32), label: String, amount: f64) {
    let bucket = map.entry(key).or_insert(Bucket {
        label,
        count: 0,
        total: 0.0,
    });
    bucket.count += 1;
    bucket.total += amount;
}

pub fn summarize(agg: &Aggregate) -> CompletionSummary {
    let mut months = BTreeMap::new();
    let mut years: BTreeMap<String, Bucket> = BTreeMap::new();
    let mut summary = CompletionSummary::default();
    let mut split_order: Vec<&str> = Vec::new();

    for event in agg.events() {
        let Some(date) = event.invoice_date else {
            continue;
        };
        add(
            &mut months,
            (date.year(), date.month()),
            date.format("%B %Y").to_string(),
            event.amount_invoiced,
        );
        let year = years.entry(event.source_year.clone()).or_insert(Bucket {
            label: event.source_year.clone(),
            count: 0,
            total: 0.0,
        });
        year.count += 1;
        year.total += event.amount_invoiced;
        summary.count += 1;
        summary.total += event.amount_invoiced;

        if event.split.is_some() {
            summary.split_events += 1;
            if !split_order.contains(&event.acgi.as_str()) {
                split_order.push(&event.acgi);
            }
        }
    }

    summary.split_projects = split_order.len();
    summary.examples = split_order
        .iter()
        .take(MAX_EXAMPLES)
        .map(|acgi| {
            let parts: Vec<&InvoiceEvent> = agg
                .events()
                .filter(|e| e.acgi == *acgi && e.split.is_some())
                .collect();
            SplitExample {
                acgi: acgi.to_string(),
                original_amount: parts
                    .first()
                    .and_then(|e| e.split.as_ref())
                    .map(|s| s.original_amount)
                    .unwrap_or(0.0),
                parts: parts
                    .iter()
                    .filter_map(|e| e.split.as_ref().map(|s| (s.label.clone(), e.amount_invoiced)))
                    .collect(),
            }
        })
        .collect();
    summary.by_month = months.into_values().collect();
    summary.by_year = years.into_values().collect();
    summary
}

#[derive(Debug, Clone)]
pub struct QuarterlyReport {
    pub quarter: Quarter,
    pub years: Vec<String>,
    pub aggregate: Aggregate,
    pub summary: CompletionSummary,
    /// The ledger written, or None on a dry run.
    pub ledger: Option<PathBuf>,
}

pub fn process(
    locator: &dyn Locate,
    quarter: &Quarter,
    years: &[String],
    ledger_dir: &Path,
    settings: &Settings,
    dry_run: bool,
    log: &mut RunLog,
) -> Result<QuarterlyReport> {
    let (start, end) = quarter.bounds();
    log.info(format!(
        "Processing {quarter} ({} to {})",
        start.format("%m/%d/%Y"),
        end.format("%m/%d/%Y")
    ));
    let loaded = load_years(locator, years, settings, log)?;
    let (events, _) = expand(&loaded.records, log);
    let agg = aggregate(&events, start, end, &quarter.months());
    log.info(format!(
        "{} invoice events in {quarter}, {} total",
        agg.event_count(),
        money(agg.total())
    ));
    let summary = summarize(&agg);

    let ledger = if dry_run {
        log.info("Dry run: ledger not written");
        None
    } else if agg.event_count() == 0 {
        log.warn(format!("No completion data found for {quarter}"));
        None
    } else {
        Some(merge(quarter, ledger_dir, &agg, settings, log)?)
    };

    Ok(QuarterlyReport {
        quarter: *quarter,
        years: loaded.years,
        aggregate: agg,
        summary,
        ledger,
    })
}

/// Entry point for a background worker and the CLI: never returns early,
/// reports success and the captured log.
pub fn run(
    locator: &dyn Locate,
    quarter: &Quarter,
    years: &[String],
    ledger_dir: &Path,
    settings: &Settings,
    dry_run: bool,
) -> RunOutcome<QuarterlyReport> {
    let mut log = RunLog::new();
    match process(locator, quarter, years, ledger_dir, settings, dry_run, &mut log) {
        Ok(report) => log.finish(Some(report)),
        Err(e) => {
            log.warn(format!("Error updating quarterly YTD file: {e}"));
            log.finish(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::xlsx;
    use chrono::NaiveDate;
    use rust_xlsxwriter::Workbook;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn record(acgi: &str, amount: f64, invoiced: f64, date: Option<NaiveDate>, comment: &str) -> SourceRecord {
        SourceRecord {
            acgi: acgi.into(),
            project: format!("Project {acgi}"),
            kind: "Completion".into(),
            invoice_date: date,
            amount,
            amount_invoiced: invoiced,
            comments: (!comment.is_empty()).then(|| comment.to_string()),
            source_year: "2025".into(),
            ..SourceRecord::default()
        }
    }

    #[test]
    fn test_expand_splits_and_drops_undated() {
        let records = vec![
            record("25-0001", 1000.0, 400.0, Some(ymd(2025, 4, 2)), "Invoiced at 40% on 4/2/2025. Invoiced rest on 5/20/2025"),
            record("25-0002", 50.0, 50.0, Some(ymd(2025, 4, 3)), ""),
            record("25-0003", 80.0, 0.0, None, ""),
        ];
        let mut log = RunLog::new();
        let (events, split) = expand(&records, &mut log);
        assert_eq!(split, 1);
        assert_eq!(events.len(), 3);
        assert_eq!(events[0].amount_invoiced, 400.0);
        assert_eq!(events[1].invoice_date, Some(ymd(2025, 5, 20)));
        assert_eq!(events[1].amount_invoiced, 600.0);
        assert!(log.contains("1 records split into 3 total records"));
    }

    #[test]
    fn test_summarize_groups_by_month_and_year() {
        let records = vec![
            record("25-0001", 1000.0, 400.0, Some(ymd(2025, 4, 2)), "Invoiced at 40% on 4/2/2025. Invoiced rest on 5/20/2025"),
            record("25-0002", 50.0, 50.0, Some(ymd(2025, 4, 3)), ""),
        ];
        let mut log = RunLog::new();
        let (events, _) = expand(&records, &mut log);
        let q2 = Quarter::new(2025, 2).unwrap();
        let (start, end) = q2.bounds();
        let summary = summarize(&aggregate(&events, start, end, &q2.months()));

        assert_eq!(summary.count, 3);
        assert_eq!(summary.total, 1050.0);
        assert_eq!(summary.by_month.len(), 2);
        assert_eq!(summary.by_month[0].label, "April 2025");
        assert_eq!(summary.by_month[0].count, 2);
        assert_eq!(summary.by_month[1].total, 600.0);
        assert_eq!(summary.by_year[0].label, "2025");
        assert_eq!(summary.split_events, 2);
        assert_eq!(summary.split_projects, 1);
        assert_eq!(summary.examples[0].original_amount, 1000.0);
        assert_eq!(summary.examples[0].parts.len(), 2);
    }

    fn write_project_list(path: &Path, year: &str) {
        let mut wb = Workbook::new();
        let ws = wb.add_worksheet();
        ws.set_name(year).unwrap();
        let headers = [
            "ACGI #",
            "Dept",
            "Project Number/Name",
            "Type",
            "Client / PO #",
            "Line #",
            "PO Date",
            "Amount",
            "Invoice Date",
            "Amount Invoiced",
            "Completion Date",
            "Hold",
            "Balance",
            "Comments",
        ];
        for (col, h) in headers.iter().enumerate() {
            ws.write_string(5, col as u16, *h).unwrap();
        }
        ws.write_string(6, 0, "25-0101").unwrap();
        ws.write_number(6, 7, 2000.0).unwrap();
        ws.write_string(6, 8, "04/10/2025").unwrap();
        ws.write_number(6, 9, 1000.0).unwrap();
        ws.write_string(6, 13, "Invoiced at 50% on 4/10/2025. Invoiced rest on 6/2/2025").unwrap();
        ws.write_string(7, 0, "25-0102").unwrap();
        ws.write_number(7, 7, 300.0).unwrap();
        ws.write_string(7, 8, "05/05/2025").unwrap();
        ws.write_number(7, 9, 300.0).unwrap();
        wb.save(path).unwrap();
    }

    #[test]
    fn test_process_writes_ledger_and_dry_run_does_not() {
        let dir = tempfile::tempdir().unwrap();
        let list = dir.path().join("2025 Project List.xlsx");
        write_project_list(&list, "2025");
        let locate = move |name: &str| -> Option<PathBuf> {
            (name == "2025 Project List").then(|| list.clone())
        };
        let ledger_dir = dir.path().join("quarterly sheets");
        let q2 = Quarter::new(2025, 2).unwrap();
        let years = vec!["2025".to_string(), "2024".to_string()];
        let settings = Settings::default();

        let mut log = RunLog::new();
        let dry = process(&locate, &q2, &years, &ledger_dir, &settings, true, &mut log).unwrap();
        assert!(dry.ledger.is_none());
        assert!(!ledger_dir.exists());
        assert_eq!(dry.years, vec!["2025"]);
        assert!(log.contains("Project list not found for 2024"));

        let report = process(&locate, &q2, &years, &ledger_dir, &settings, false, &mut log).unwrap();
        let path = report.ledger.unwrap();
        let ledger = xlsx::read(&path).unwrap();
        let totals = ledger.totals.unwrap();
        assert_eq!(totals.month(4), 1000.0);
        assert_eq!(totals.month(5), 300.0);
        assert_eq!(totals.month(6), 1000.0);
        // configured Q1 baseline carried forward
        assert_eq!(totals.month(1), 872459.74);
        assert_eq!(ledger.tables.len(), 3);
    }

    #[test]
    fn test_run_reports_failure_without_sources() {
        let locate = |_: &str| -> Option<PathBuf> { None };
        let dir = tempfile::tempdir().unwrap();
        let q1 = Quarter::new(2025, 1).unwrap();
        let outcome = run(&locate, &q1, &["2025".to_string()], dir.path(), &Settings::default(), false);
        assert!(!outcome.success);
        assert!(outcome.value.is_none());
        assert!(outcome.log.iter().any(|l| l.contains("No project lists could be loaded")));
    }
}
