use std::sync::OnceLock;

use chrono::NaiveDate;
use regex::Regex;

use crate::fmt::{mdy, percent};
use crate::models::{SplitIntent, SplitPlan};
use crate::runlog::RunLog;

fn initial_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)Invoiced at (\d+(?:\.\d+)?)%\s*on\s*(\d{1,2}[/-]\d{1,2}[/-]\d{4})")
            .expect("invalid initial clause regex")
    })
}

fn rest_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)Invoiced rest on\s*(\d{1,2}[/-]\d{1,2}[/-]\d{4})")
            .expect("invalid rest clause regex")
    })
}

fn legacy_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)(\d+(?:\.\d+)?)%\s*(?:invoiced|billed|paid)\s*(\d{1,2}[/-]\d{1,2}[/-]\d{4})")
            .expect("invalid legacy clause regex")
    })
}

/// `M/D/YYYY` or `M-D-YYYY`. Returns None for impossible calendar dates.
pub fn parse_comment_date(raw: &str) -> Option<NaiveDate> {
    let parts: Vec<&str> = raw.split(['/', '-']).collect();
    if parts.len() != 3 {
        return None;
    }
    let m: u32 = parts[0].parse().ok()?;
    let d: u32 = parts[1].parse().ok()?;
    let y: i32 = parts[2].parse().ok()?;
    NaiveDate::from_ymd_opt(y, m, d)
}

/// `50.0% invoiced 04/18/2025`; whole percentages keep one decimal.
fn label(pct: f64, date: NaiveDate) -> String {
    let pct = if pct.fract() == 0.0 {
        format!("{pct:.1}")
    } else {
        format!("{pct}")
    };
    format!("{pct}% invoiced {}", mdy(date))
}

/// Read split-invoice intents out of a free-text comment.
///
/// The `Invoiced at P% on D1. Invoiced rest on D2` grammar is tried first;
/// the legacy `P% invoiced|billed|paid D` grammar only when it does not
/// match. Clauses with unreadable dates are dropped with a warning.
pub fn parse(comment: &str, log: &mut RunLog) -> SplitPlan {
    let comment = comment.trim();
    if comment.is_empty() {
        return SplitPlan::None;
    }

    match initial_re().captures(comment) {
        Some(caps) => parse_new_format(comment, &caps, log),
        None => parse_legacy(comment, log),
    }
}

fn parse_new_format(comment: &str, caps: &regex::Captures, log: &mut RunLog) -> SplitPlan {
    let pct: f64 = caps[1].parse().unwrap_or(0.0);
    let initial = match parse_comment_date(&caps[2]) {
        Some(date) => Some(SplitIntent {
            percentage: pct,
            date,
            label: label(pct, date),
        }),
        None => {
            log.warn(format!(
                "Could not parse split invoice date '{}' in '{comment}'",
                &caps[2]
            ));
            None
        }
    };

    let rest = rest_re().captures(comment).and_then(|rc| match parse_comment_date(&rc[1]) {
        Some(date) => {
            let rest_pct = 100.0 - pct;
            Some(SplitIntent {
                percentage: rest_pct,
                date,
                label: format!("{} (rest)", label(rest_pct, date)),
            })
        }
        None => {
            log.warn(format!(
                "Could not parse rest invoice date '{}' in '{comment}'",
                &rc[1]
            ));
            None
        }
    });

    match (initial, rest) {
        (Some(initial), Some(rest)) => SplitPlan::InitialRest { initial, rest },
        (Some(one), None) | (None, Some(one)) => SplitPlan::Single(one),
        (None, None) => SplitPlan::None,
    }
}

fn parse_legacy(comment: &str, log: &mut RunLog) -> SplitPlan {
    let mut intents = Vec::new();
    let mut matched = false;
    for caps in legacy_re().captures_iter(comment) {
        matched = true;
        let pct: f64 = caps[1].parse().unwrap_or(0.0);
        match parse_comment_date(&caps[2]) {
            Some(date) => intents.push(SplitIntent {
                percentage: pct,
                date,
                label: label(pct, date),
            }),
            None => log.warn(format!(
                "Could not parse split invoice '{}% {}' in '{comment}'",
                &caps[1], &caps[2]
            )),
        }
    }
    if !matched {
        return SplitPlan::None;
    }

    let total: f64 = intents.iter().map(|i| i.percentage).sum();
    if (total - 100.0).abs() > 1.0 {
        log.warn(format!(
            "Split invoice percentages sum to {} not 100% in '{comment}'",
            percent(total)
        ));
    }

    if intents.is_empty() {
        SplitPlan::None
    } else {
        SplitPlan::Legacy(intents)
    }
}
