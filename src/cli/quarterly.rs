use colored::Colorize;
use comfy_table::{Cell, Table};

use crate::cli::{expand_dir, selected_years};
use crate::error::{Result, YtdError};
use crate::fmt::money;
use crate::locator::TieredLocator;
use crate::quarter::Quarter;
use crate::quarterly::{self, Bucket, CompletionSummary};
use crate::settings::Settings;

const YEAR_RANGE: std::ops::RangeInclusive<i32> = 2020..=2030;

fn bucket_table(buckets: &[Bucket], first: &str) -> Table {
    let mut table = Table::new();
    table.set_header(vec![first, "Records", "Amount Invoiced"]);
    for b in buckets {
        table.add_row(vec![
            Cell::new(&b.label),
            Cell::new(b.count),
            Cell::new(money(b.total)),
        ]);
    }
    table
}

fn print_summary(summary: &CompletionSummary) {
    if summary.count == 0 {
        println!("No completion data to summarize.");
        return;
    }
    println!("By Month\n{}", bucket_table(&summary.by_month, "Month"));
    println!("\nBy Source Year\n{}", bucket_table(&summary.by_year, "Year"));
    println!(
        "\n{} {} records, {}",
        "Overall Total:".bold(),
        summary.count,
        money(summary.total)
    );

    if summary.split_events == 0 {
        return;
    }
    println!("\n{}", "Split Invoice Summary".bold());
    println!("  Total split invoice records: {}", summary.split_events);
    println!("  Projects with split invoicing: {}", summary.split_projects);
    let mut table = Table::new();
    table.set_header(vec!["ACGI #", "Original Amount", "Part", "Amount Invoiced"]);
    for example in &summary.examples {
        for (i, (label, amount)) in example.parts.iter().enumerate() {
            let (acgi, original) = if i == 0 {
                (example.acgi.clone(), money(example.original_amount))
            } else {
                (String::new(), String::new())
            };
            table.add_row(vec![
                Cell::new(acgi),
                Cell::new(original),
                Cell::new(label),
                Cell::new(money(*amount)),
            ]);
        }
    }
    println!("Example split invoices\n{table}");
}

pub fn run(settings: &Settings, quarter: u32, year: i32, years: Vec<String>, dry_run: bool) -> Result<()> {
    if !YEAR_RANGE.contains(&year) {
        return Err(YtdError::Other(format!(
            "Year must be between {} and {}",
            YEAR_RANGE.start(),
            YEAR_RANGE.end()
        )));
    }
    let quarter = Quarter::new(year, quarter)?;
    let years = selected_years(years, settings);
    let locator = TieredLocator::from_settings(settings);
    let ledger_dir = expand_dir(&settings.cache_dir);

    let outcome = quarterly::run(&locator, &quarter, &years, &ledger_dir, settings, dry_run);
    let warnings = outcome.warnings;
    let Some(report) = outcome.value else {
        let reason = outcome.failure().unwrap_or("quarterly run failed").to_string();
        return Err(YtdError::Other(reason));
    };

    println!(
        "{} {} from {} project list(s): {}",
        "Quarter".bold(),
        report.quarter,
        report.years.len(),
        report.years.join(", ")
    );
    println!(
        "{} invoice events across {} invoice days",
        report.aggregate.event_count(),
        report.aggregate.daily.len()
    );
    print_summary(&report.summary);

    match &report.ledger {
        Some(path) => println!("\n{} {}", "Ledger written:".green().bold(), path.display()),
        None if dry_run => println!("\n{}", "Dry run: no ledger written.".yellow()),
        None => println!("\n{}", "Nothing to write.".yellow()),
    }
    if warnings > 0 {
        println!("{warnings} warning(s); rerun with --verbose for the full log.");
    }
    Ok(())
}
