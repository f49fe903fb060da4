use colored::Colorize;
use comfy_table::{Cell, Table};

use crate::error::Result;
use crate::locator::{scan, TieredLocator};
use crate::settings::Settings;

pub fn run(settings: &Settings) -> Result<()> {
    let locator = TieredLocator::from_settings(settings);
    let (first, last) = settings.scan_years;
    let found = scan(&locator, first..=last);

    let mut table = Table::new();
    table.set_header(vec!["Year", "Status", "Location"]);
    for (year, path) in &found {
        let (status, location) = match path {
            Some(p) => ("found".green(), p.display().to_string()),
            None => ("missing".dimmed(), String::new()),
        };
        table.add_row(vec![Cell::new(year), Cell::new(status), Cell::new(location)]);
    }
    println!("Project Lists\n{table}");

    let available = found.iter().filter(|(_, p)| p.is_some()).count();
    println!("{available} of {} years available", found.len());
    Ok(())
}
