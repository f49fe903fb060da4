use colored::Colorize;
use comfy_table::{Cell, Table};

use crate::cli::{expand_dir, parse_date_arg, selected_years};
use crate::error::{Result, YtdError};
use crate::fmt::money;
use crate::locator::TieredLocator;
use crate::settings::Settings;
use crate::summary;

pub fn run(settings: &Settings, date: Option<String>, output_dir: Option<String>, years: Vec<String>) -> Result<()> {
    let date = match date {
        Some(raw) => parse_date_arg(&raw)?,
        None => chrono::Local::now().date_naive(),
    };
    let output_dir = expand_dir(output_dir.as_deref().unwrap_or(&settings.reports_dir));
    let years = selected_years(years, settings);
    let locator = TieredLocator::from_settings(settings);

    let outcome = summary::run(&locator, &years, date, &output_dir, settings);
    let Some(report) = outcome.value else {
        let reason = outcome.failure().unwrap_or("daily summary failed").to_string();
        return Err(YtdError::Other(reason));
    };
    let summary = &report.summary;

    let mut table = Table::new();
    table.set_header(vec!["Daily Summary", "Amount"]);
    for (label, value) in summary.summary_lines() {
        table.add_row(vec![Cell::new(label), Cell::new(value)]);
    }
    println!("{table}");

    let mut years_table = Table::new();
    years_table.set_header(vec!["Year", "Receivables", "Vendors to be paid", "Flagged cells"]);
    for year in &summary.years {
        years_table.add_row(vec![
            Cell::new(&year.year),
            Cell::new(money(year.receivables)),
            Cell::new(money(year.vendors)),
            Cell::new(year.flagged_cells),
        ]);
    }
    years_table.add_row(vec![
        Cell::new("Total".bold()),
        Cell::new(money(summary.total_receivables())),
        Cell::new(money(summary.total_vendors())),
        Cell::new(""),
    ]);
    println!("\nReceivables vs. Vendors to be Paid by Year\n{years_table}");

    println!(
        "\n{} {} ({} invoices)",
        "Summary written:".green().bold(),
        report.workbook.display(),
        summary.invoices.len()
    );
    if report.ledger_updated {
        println!("{}", "YTD sheet updated.".green());
    } else {
        println!("{}", "YTD sheet update failed or skipped.".yellow());
    }
    Ok(())
}
