use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::aggregate::Aggregate;
use crate::error::Result;
use crate::fmt::{money, MONTH_ABBREVS};
use crate::ledger::{store, xlsx, Ledger};
use crate::models::MonthlyAccumulator;
use crate::quarter::Quarter;
use crate::runlog::RunLog;
use crate::settings::Settings;

/// Where the carry-forward months came from.
#[derive(Debug, Clone, PartialEq)]
pub enum BaselineSource {
    PreviousLedger(PathBuf),
    Configured,
    Zero,
}

/// Monthly totals to start from: the previous quarter's ledger when it
/// exists, else a configured baseline for this quarter, else zeros.
pub fn carry_forward(
    quarter: &Quarter,
    ledger_dir: &Path,
    settings: &Settings,
    log: &mut RunLog,
) -> ([f64; 12], BaselineSource) {
    if let Some(previous) = quarter.previous() {
        let path = ledger_dir.join(previous.ledger_file_name());
        if path.exists() {
            log.info(format!("Reading monthly totals from previous quarter: {}", path.display()));
            match xlsx::read(&path) {
                Ok(Ledger { totals: Some(totals), .. }) => {
                    let mut months = [0.0; 12];
                    months.copy_from_slice(&totals.slots()[..12]);
                    return (months, BaselineSource::PreviousLedger(path));
                }
                Ok(_) => log.warn(format!("{} has no totals row", path.display())),
                Err(e) => log.warn(format!("Could not read previous quarter file: {e}")),
            }
        } else {
            log.info(format!("Previous quarter file not found: {}", path.display()));
        }
    }

    match settings.baseline_for(quarter.year, quarter.number) {
        Some(months) => {
            log.info(format!("Using configured baseline for {quarter}"));
            (months, BaselineSource::Configured)
        }
        None => {
            log.info("Starting with zero values for all months");
            ([0.0; 12], BaselineSource::Zero)
        }
    }
}

/// Overlay the quarter's fresh monthly totals onto the baseline and
/// recompute YTD. Months outside the quarter keep their baseline value;
/// quarter months without a total are zeroed.
pub fn overlay(baseline: [f64; 12], monthly: &BTreeMap<u32, f64>, quarter: &Quarter) -> MonthlyAccumulator {
    let mut acc = MonthlyAccumulator::from_months(baseline);
    for month in quarter.months() {
        acc.set_month(month, monthly.get(&month).copied().unwrap_or(0.0));
    }
    acc.recompute_ytd();
    acc
}

/// Rebuild and persist the quarter ledger. Returns the file written, which
/// is the `_formatted` fallback if the ledger path could not be written.
pub fn merge(
    quarter: &Quarter,
    ledger_dir: &Path,
    agg: &Aggregate,
    settings: &Settings,
    log: &mut RunLog,
) -> Result<PathBuf> {
    let (baseline, _) = carry_forward(quarter, ledger_dir, settings, log);
    let totals = overlay(baseline, &agg.monthly, quarter);

    log.info(format!("Updating {quarter} monthly totals:"));
    for month in quarter.months() {
        let i = month as usize - 1;
        log.info(format!(
            "  {}: {} -> {}",
            MONTH_ABBREVS[i],
            money(baseline[i]),
            money(totals.month(month))
        ));
    }
    log.info(format!("  YTD Total: {}", money(totals.ytd())));

    std::fs::create_dir_all(ledger_dir)?;
    let ledger = Ledger::quarterly(quarter, totals, agg);
    let path = ledger_dir.join(quarter.ledger_file_name());
    store::save(&ledger, &path, true, log)
}
