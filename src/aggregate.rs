use std::collections::BTreeMap;

use chrono::{Datelike, Duration, NaiveDate};

use crate::models::InvoiceEvent;

/// Events grouped by invoice date, plus monthly totals for the quarter's
/// months.
#[derive(Debug, Default, Clone)]
pub struct Aggregate {
    pub daily: BTreeMap<NaiveDate, Vec<InvoiceEvent>>,
    /// 1-based month -> sum of Amount Invoiced. Every requested month is
    /// present, zero when nothing was invoiced in it.
    pub monthly: BTreeMap<u32, f64>,
}

impl Aggregate {
    pub fn event_count(&self) -> usize {
        self.daily.values().map(Vec::len).sum()
    }

    pub fn total(&self) -> f64 {
        self.monthly.values().sum()
    }

    pub fn events(&self) -> impl Iterator<Item = &InvoiceEvent> {
        self.daily.values().flatten()
    }
}

/// Keep events with `start <= invoice date <= end`, group them by day and
/// order each day by project number.
pub fn aggregate(events: &[InvoiceEvent], start: NaiveDate, end: NaiveDate, months: &[u32]) -> Aggregate {
    let mut out = Aggregate {
        daily: BTreeMap::new(),
        monthly: months.iter().map(|&m| (m, 0.0)).collect(),
    };

    for event in events {
        let Some(date) = event.invoice_date else {
            continue;
        };
        if date < start || date > end {
            continue;
        }
        if let Some(total) = out.monthly.get_mut(&date.month()) {
            *total += event.amount_invoiced;
        }
        out.daily.entry(date).or_default().push(event.clone());
    }

    for day in out.daily.values_mut() {
        day.sort_by_key(InvoiceEvent::sort_key);
    }
    out
}

/// Running totals reported by the daily summary.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct PeriodTotals {
    pub week_start: NaiveDate,
    pub month_start: NaiveDate,
    /// Committed Amount of everything invoiced on the target date.
    pub today: f64,
    /// Amount Invoiced on the target date.
    pub received: f64,
    pub week: f64,
    pub month: f64,
}

pub fn week_start(date: NaiveDate) -> NaiveDate {
    date - Duration::days(date.weekday().num_days_from_monday() as i64)
}

pub fn period_totals(events: &[InvoiceEvent], target: NaiveDate) -> PeriodTotals {
    let week_start = week_start(target);
    let month_start = target.with_day(1).unwrap_or(target);
    let mut totals = PeriodTotals {
        week_start,
        month_start,
        ..PeriodTotals::default()
    };
    for event in events {
        let Some(date) = event.invoice_date else {
            continue;
        };
        if date == target {
            totals.today += event.amount;
            totals.received += event.amount_invoiced;
        }
        if date >= week_start && date <= target {
            totals.week += event.amount_invoiced;
        }
        if date >= month_start && date <= target {
            totals.month += event.amount_invoiced;
        }
    }
    totals
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SourceRecord;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn event(acgi: &str, date: NaiveDate, amount: f64, invoiced: f64) -> InvoiceEvent {
        InvoiceEvent::from_record(&SourceRecord {
            acgi: acgi.into(),
            invoice_date: Some(date),
            amount,
            amount_invoiced: invoiced,
            ..SourceRecord::default()
        })
    }

    #[test]
    fn test_window_is_inclusive_on_both_ends() {
        let events = vec![
            event("25-0001", ymd(2025, 3, 31), 1.0, 1.0),
            event("25-0002", ymd(2025, 4, 1), 10.0, 10.0),
            event("25-0003", ymd(2025, 6, 30), 20.0, 20.0),
            event("25-0004", ymd(2025, 7, 1), 40.0, 40.0),
        ];
        let agg = aggregate(&events, ymd(2025, 4, 1), ymd(2025, 6, 30), &[4, 5, 6]);
        assert_eq!(agg.event_count(), 2);
        assert!(agg.daily.contains_key(&ymd(2025, 4, 1)));
        assert!(agg.daily.contains_key(&ymd(2025, 6, 30)));
        assert!(!agg.daily.contains_key(&ymd(2025, 3, 31)));
        assert!(!agg.daily.contains_key(&ymd(2025, 7, 1)));
        assert_eq!(agg.monthly[&4], 10.0);
        assert_eq!(agg.monthly[&5], 0.0);
        assert_eq!(agg.monthly[&6], 20.0);
        assert_eq!(agg.total(), 30.0);
    }

    #[test]
    fn test_days_sorted_by_project_number() {
        let d = ymd(2025, 5, 2);
        let events = vec![
            event("25-0100", d, 1.0, 1.0),
            event("24-3163", d, 1.0, 1.0),
            event("misc", d, 1.0, 1.0),
            event("25-0009", d, 1.0, 1.0),
        ];
        let agg = aggregate(&events, ymd(2025, 4, 1), ymd(2025, 6, 30), &[4, 5, 6]);
        let order: Vec<&str> = agg.daily[&d].iter().map(|e| e.acgi.as_str()).collect();
        assert_eq!(order, vec!["misc", "24-3163", "25-0009", "25-0100"]);
    }

    #[test]
    fn test_undated_events_are_ignored() {
        let mut e = event("25-0001", ymd(2025, 5, 1), 5.0, 5.0);
        e.invoice_date = None;
        let agg = aggregate(&[e], ymd(2025, 4, 1), ymd(2025, 6, 30), &[4, 5, 6]);
        assert_eq!(agg.event_count(), 0);
    }

    #[test]
    fn test_period_totals() {
        // Thursday
        let target = ymd(2025, 5, 15);
        let events = vec![
            event("25-0001", target, 1000.0, 400.0),
            event("25-0002", ymd(2025, 5, 12), 50.0, 50.0),
            event("25-0003", ymd(2025, 5, 11), 25.0, 25.0),
            event("25-0004", ymd(2025, 4, 30), 7.0, 7.0),
            event("25-0005", ymd(2025, 5, 16), 9.0, 9.0),
        ];
        let t = period_totals(&events, target);
        assert_eq!(t.week_start, ymd(2025, 5, 12));
        assert_eq!(t.month_start, ymd(2025, 5, 1));
        assert_eq!(t.today, 1000.0);
        assert_eq!(t.received, 400.0);
        assert_eq!(t.week, 450.0);
        assert_eq!(t.month, 475.0);
    }
}
