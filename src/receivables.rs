//! Receivables and vendors-to-pay figures read from the bottom of each
//! year's project list.
//!
//! The sheet ends with three marker rows: a totals row, a "to invoice" row
//! and a "less hold" row. The last two are the final rows with anything in
//! column G; the totals row sits directly above "to invoice".

use std::path::Path;

use crate::error::Result;
use crate::fmt::money;
use crate::runlog::RunLog;
use crate::settings::Settings;
use crate::sheet::{open_sheet, Grid};

const MARKER_COL: u32 = 6; // G
const COL_H: u32 = 7;
const COL_J: u32 = 9;
const COL_K: u32 = 10;
const COL_M: u32 = 12;

/// Decides which cells count as "vendor to be paid".
pub trait CellFlags {
    fn is_flagged(&self, row: u32, col: u32) -> bool;
}

impl<F> CellFlags for F
where
    F: Fn(u32, u32) -> bool,
{
    fn is_flagged(&self, row: u32, col: u32) -> bool {
        self(row, col)
    }
}

/// Flags nothing.
pub struct NoFlags;

impl CellFlags for NoFlags {
    fn is_flagged(&self, _row: u32, _col: u32) -> bool {
        false
    }
}

/// Zero-based rows of the marker block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarkerRows {
    pub totals: u32,
    pub to_invoice: u32,
    pub less_hold: u32,
}

pub fn find_marker_rows(grid: &Grid) -> Option<MarkerRows> {
    let mut filled = (0..grid.height())
        .rev()
        .filter(|&row| !grid.is_blank(row, MARKER_COL));
    let less_hold = filled.next()?;
    let to_invoice = filled.next()?;
    Some(MarkerRows {
        totals: to_invoice.checked_sub(1)?,
        to_invoice,
        less_hold,
    })
}

/// Figures copied into the per-year detail table of the summary.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct YearDetails {
    /// Totals row, columns H, J, K and M.
    pub totals: [Option<f64>; 4],
    /// "To invoice" row, columns H and M.
    pub to_invoice: [Option<f64>; 2],
    /// "Less hold" row, column H.
    pub less_hold: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct YearReceivables {
    pub year: String,
    pub receivables: f64,
    pub vendors: f64,
    pub flagged_cells: usize,
    pub details: Option<YearDetails>,
}

/// Sum of numeric, flagged cells in a 1-based column.
pub fn vendors_to_pay(grid: &Grid, column: u32, flags: &dyn CellFlags) -> (f64, usize) {
    let Some(col) = column.checked_sub(1) else {
        return (0.0, 0);
    };
    (0..grid.height())
        .filter(|&row| flags.is_flagged(row, col))
        .filter_map(|row| grid.number(row, col))
        .fold((0.0, 0), |(sum, n), v| (sum + v, n + 1))
}

/// Read receivables for one year from an already opened sheet.
pub fn year_from_grid(
    grid: &Grid,
    year: &str,
    vendor_column: u32,
    flags: &dyn CellFlags,
    log: &mut RunLog,
) -> YearReceivables {
    let Some(rows) = find_marker_rows(grid) else {
        log.warn(format!("Could not find enough non-empty rows in {year} Project List"));
        return YearReceivables {
            year: year.to_string(),
            ..YearReceivables::default()
        };
    };
    log.info(format!(
        "{year}: totals row {}, to invoice row {}, less hold row {}",
        rows.totals + 1,
        rows.to_invoice + 1,
        rows.less_hold + 1
    ));

    let receivables = match grid.number(rows.totals, COL_M) {
        Some(v) => v,
        None => {
            log.warn(format!("{year}: totals row has no receivables in column M"));
            0.0
        }
    };
    let (vendors, flagged_cells) = vendors_to_pay(grid, vendor_column, flags);
    log.info(format!(
        "{year}: vendors to be paid {} ({flagged_cells} cells)",
        money(vendors)
    ));

    YearReceivables {
        year: year.to_string(),
        receivables,
        vendors,
        flagged_cells,
        details: Some(YearDetails {
            totals: [COL_H, COL_J, COL_K, COL_M].map(|c| grid.number(rows.totals, c)),
            to_invoice: [COL_H, COL_M].map(|c| grid.number(rows.to_invoice, c)),
            less_hold: grid.number(rows.less_hold, COL_H),
        }),
    }
}

/// The fill-colour flags for a sheet when the `fills` feature is enabled.
pub fn flags_for(path: &Path, year: &str, settings: &Settings, log: &mut RunLog) -> Box<dyn CellFlags> {
    #[cfg(feature = "fills")]
    {
        match crate::fills::FillFlags::open(path, year, &settings.flag_colors) {
            Ok(flags) => return Box::new(flags),
            Err(e) => log.warn(format!("{year}: could not read cell fills: {e}")),
        }
    }
    #[cfg(not(feature = "fills"))]
    {
        let _ = (path, settings, &log);
        tracing::debug!(year, "fill colours unavailable; no vendor cells flagged");
    }
    Box::new(NoFlags)
}

/// Open a year's project list and read its receivables. A missing marker
/// block is logged and gives zeros; a sheet that cannot be opened is an error.
pub fn read_year(path: &Path, year: &str, settings: &Settings, log: &mut RunLog) -> Result<YearReceivables> {
    let grid = open_sheet(path, year)?;
    let flags = flags_for(path, year, settings, log);
    Ok(year_from_grid(
        &grid,
        year,
        settings.vendor_column(year),
        flags.as_ref(),
        log,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_xlsxwriter::Workbook;

    /// Rows 0-5 header block, two data rows, then the marker block.
    fn write_list(path: &Path) {
        let mut wb = Workbook::new();
        let ws = wb.add_worksheet();
        ws.set_name("2025").unwrap();
        ws.write_string(5, 6, "Client / PO #").unwrap();
        ws.write_string(6, 6, "PO-1").unwrap();
        ws.write_number(6, 22, 300.0).unwrap();
        ws.write_string(7, 6, "PO-2").unwrap();
        ws.write_number(7, 22, 200.0).unwrap();
        ws.write_string(8, 22, "n/a").unwrap();
        // totals row has nothing in G
        ws.write_number(10, 7, 1000.0).unwrap();
        ws.write_number(10, 9, 900.0).unwrap();
        ws.write_number(10, 10, 800.0).unwrap();
        ws.write_number(10, 12, 5000.0).unwrap();
        ws.write_string(11, 6, "To Invoice").unwrap();
        ws.write_number(11, 7, 400.0).unwrap();
        ws.write_number(11, 12, 4500.0).unwrap();
        ws.write_string(12, 6, "Less Hold").unwrap();
        ws.write_number(12, 7, 350.0).unwrap();
        wb.save(path).unwrap();
    }

    #[test]
    fn test_find_marker_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("list.xlsx");
        write_list(&path);
        let grid = open_sheet(&path, "2025").unwrap();
        assert_eq!(
            find_marker_rows(&grid),
            Some(MarkerRows {
                totals: 10,
                to_invoice: 11,
                less_hold: 12
            })
        );
    }

    #[test]
    fn test_year_from_grid_with_injected_flags() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("list.xlsx");
        write_list(&path);
        let grid = open_sheet(&path, "2025").unwrap();
        let mut log = RunLog::new();
        // rows 6 and 8 flagged; row 8 is text and does not count
        let flags = |row: u32, col: u32| col == 22 && (row == 6 || row == 8);
        let year = year_from_grid(&grid, "2025", 23, &flags, &mut log);
        assert_eq!(year.receivables, 5000.0);
        assert_eq!(year.vendors, 300.0);
        assert_eq!(year.flagged_cells, 1);
        let details = year.details.unwrap();
        assert_eq!(details.totals, [Some(1000.0), Some(900.0), Some(800.0), Some(5000.0)]);
        assert_eq!(details.to_invoice, [Some(400.0), Some(4500.0)]);
        assert_eq!(details.less_hold, Some(350.0));
    }

    #[test]
    fn test_no_flags_means_no_vendors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("list.xlsx");
        write_list(&path);
        let grid = open_sheet(&path, "2025").unwrap();
        assert_eq!(vendors_to_pay(&grid, 23, &NoFlags), (0.0, 0));
        assert_eq!(vendors_to_pay(&grid, 0, &|_: u32, _: u32| true), (0.0, 0));
    }

    #[test]
    fn test_short_sheet_gives_zeros() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("short.xlsx");
        let mut wb = Workbook::new();
        let ws = wb.add_worksheet();
        ws.set_name("2024").unwrap();
        ws.write_string(0, 6, "only one").unwrap();
        wb.save(&path).unwrap();

        let grid = open_sheet(&path, "2024").unwrap();
        let mut log = RunLog::new();
        let year = year_from_grid(&grid, "2024", 22, &NoFlags, &mut log);
        assert_eq!(year.receivables, 0.0);
        assert!(year.details.is_none());
        assert!(log.contains("Could not find enough non-empty rows"));
    }

    #[cfg(feature = "fills")]
    #[test]
    fn test_read_year_uses_cyan_fills() {
        use rust_xlsxwriter::{Color, Format};

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("2025 Project List.xlsx");
        let cyan = Format::new().set_background_color(Color::RGB(0x03FFFF));
        let mut wb = Workbook::new();
        let ws = wb.add_worksheet();
        ws.set_name("2025").unwrap();
        ws.write_number_with_format(6, 22, 120.0, &cyan).unwrap();
        ws.write_number(7, 22, 999.0).unwrap();
        ws.write_number_with_format(8, 22, 30.0, &cyan).unwrap();
        ws.write_number(9, 12, 2500.0).unwrap();
        ws.write_string(10, 6, "To Invoice").unwrap();
        ws.write_string(11, 6, "Less Hold").unwrap();
        wb.save(&path).unwrap();

        let mut log = RunLog::new();
        let year = read_year(&path, "2025", &Settings::default(), &mut log).unwrap();
        assert_eq!(year.receivables, 2500.0);
        assert_eq!(year.vendors, 150.0);
        assert_eq!(year.flagged_cells, 2);
    }
}
