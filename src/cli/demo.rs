use std::path::{Path, PathBuf};

use rust_xlsxwriter::{Color, Format, Workbook};

use crate::error::Result;
use crate::loader::project_list_name;
use crate::settings::{save_settings, Settings};

/// Zero-based row of the header; rows above it are the sheet's title block.
const HEADER_ROW: u32 = 5;

const HEADERS: [&str; 14] = [
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

const CYAN: u32 = 0x03FFFF;
const YELLOW: u32 = 0xFFFF00;

struct DemoProject {
    acgi: &'static str,
    dept: &'static str,
    name: &'static str,
    client_po: &'static str,
    po_date: &'static str,
    amount: f64,
    invoice_date: &'static str,
    invoiced: f64,
    comment: &'static str,
    /// Amount owed to a vendor, and whether it is shaded as "to be paid".
    vendor: Option<(f64, bool)>,
}

const PROJECTS_2024: &[DemoProject] = &[
    DemoProject {
        acgi: "24-2981",
        dept: "MECH",
        name: "Boiler room upgrade",
        client_po: "Northside Schools / 88120",
        po_date: "09/03/2024",
        amount: 15000.0,
        invoice_date: "11/12/2024",
        invoiced: 15000.0,
        comment: "",
        vendor: Some((4200.0, false)),
    },
    DemoProject {
        acgi: "24-3050",
        dept: "ELEC",
        name: "Switchgear study",
        client_po: "Harbor Hospital / HH-3321",
        po_date: "10/21/2024",
        amount: 5000.0,
        invoice_date: "02/10/2025",
        invoiced: 2500.0,
        comment: "Invoiced at 50% on 2/10/2025. Invoiced rest on 4/22/2025",
        vendor: Some((1250.0, true)),
    },
    DemoProject {
        acgi: "24-3163",
        dept: "MECH",
        name: "Rooftop unit replacement",
        client_po: "City of Lakeview / 5530",
        po_date: "12/02/2024",
        amount: 7600.0,
        invoice_date: "04/18/2025",
        invoiced: 7600.0,
        comment: "",
        vendor: Some((980.0, true)),
    },
];

const PROJECTS_2025: &[DemoProject] = &[
    DemoProject {
        acgi: "25-0101",
        dept: "MECH",
        name: "Chiller replacement",
        client_po: "Riverside Plaza / RP-101",
        po_date: "01/06/2025",
        amount: 20000.0,
        invoice_date: "04/07/2025",
        invoiced: 8000.0,
        comment: "Invoiced at 40% on 4/7/2025. Invoiced rest on 5/19/2025",
        vendor: Some((6500.0, true)),
    },
    DemoProject {
        acgi: "25-0102",
        dept: "ELEC",
        name: "Lighting retrofit",
        client_po: "Mercy Clinic / 7781",
        po_date: "02/11/2025",
        amount: 4500.0,
        invoice_date: "04/18/2025",
        invoiced: 4500.0,
        comment: "",
        vendor: None,
    },
    DemoProject {
        acgi: "25-0103",
        dept: "PLMB",
        name: "Domestic water study",
        client_po: "Eastgate Apartments / EA-9",
        po_date: "02/24/2025",
        amount: 12000.0,
        invoice_date: "05/05/2025",
        invoiced: 6000.0,
        comment: "50% invoiced 5/5/2025, 50% billed 6/16/2025",
        vendor: Some((2100.0, false)),
    },
    DemoProject {
        acgi: "25-0104",
        dept: "MECH",
        name: "Controls upgrade",
        client_po: "Lakeview Library / 2290",
        po_date: "03/03/2025",
        amount: 3200.0,
        invoice_date: "06/02/2025",
        invoiced: 3200.0,
        comment: "",
        vendor: None,
    },
    DemoProject {
        acgi: "25-0105",
        dept: "ELEC",
        name: "Generator sizing",
        client_po: "Harbor Hospital / HH-3410",
        po_date: "03/17/2025",
        amount: 9800.0,
        invoice_date: "",
        invoiced: 0.0,
        comment: "",
        vendor: Some((750.0, true)),
    },
    DemoProject {
        acgi: "25-0106",
        dept: "MECH",
        name: "Exhaust fan survey",
        client_po: "Northside Schools / 88301",
        po_date: "01/02/2025",
        amount: 1500.0,
        invoice_date: "01/14/2025",
        invoiced: 1500.0,
        comment: "",
        vendor: None,
    },
];

fn write_project_list(path: &Path, year: &str, projects: &[DemoProject], vendor_col: u16) -> Result<()> {
    let money = Format::new().set_num_format("\"$\"#,##0.00");
    let flagged = money.clone().set_background_color(Color::RGB(CYAN));
    let unflagged = money.clone().set_background_color(Color::RGB(YELLOW));
    let bold = Format::new().set_bold();

    let mut workbook = Workbook::new();
    let ws = workbook.add_worksheet();
    ws.set_name(year)?;
    ws.write_string_with_format(0, 0, project_list_name(year), &bold)?;
    ws.write_string(1, 0, "Sample data written by `ytd demo`")?;
    for (col, name) in HEADERS.iter().enumerate() {
        ws.write_string_with_format(HEADER_ROW, col as u16, *name, &bold)?;
    }
    ws.write_string_with_format(HEADER_ROW, vendor_col, "Vendor Payments", &bold)?;

    let mut row = HEADER_ROW + 1;
    let (mut amount, mut invoiced, mut balance, mut unbilled) = (0.0, 0.0, 0.0, 0.0);
    for p in projects {
        let remaining = p.amount - p.invoiced;
        ws.write_string(row, 0, p.acgi)?;
        ws.write_string(row, 1, p.dept)?;
        ws.write_string(row, 2, p.name)?;
        ws.write_string(row, 3, "Completion")?;
        ws.write_string(row, 4, p.client_po)?;
        ws.write_string(row, 5, "1")?;
        ws.write_string(row, 6, p.po_date)?;
        ws.write_number_with_format(row, 7, p.amount, &money)?;
        if !p.invoice_date.is_empty() {
            ws.write_string(row, 8, p.invoice_date)?;
        }
        ws.write_number_with_format(row, 9, p.invoiced, &money)?;
        ws.write_number_with_format(row, 12, remaining, &money)?;
        if !p.comment.is_empty() {
            ws.write_string(row, 13, p.comment)?;
        }
        if let Some((owed, to_pay)) = p.vendor {
            let format = if to_pay { &flagged } else { &unflagged };
            ws.write_number_with_format(row, vendor_col, owed, format)?;
        }
        amount += p.amount;
        invoiced += p.invoiced;
        balance += remaining;
        if p.invoice_date.is_empty() {
            unbilled += p.amount;
        }
        row += 1;
    }

    // Totals, "to invoice" and "less hold" rows close the sheet.
    row += 1;
    ws.write_number_with_format(row, 7, amount, &money)?;
    ws.write_number_with_format(row, 9, invoiced, &money)?;
    ws.write_number_with_format(row, 10, unbilled, &money)?;
    ws.write_number_with_format(row, 12, balance, &money)?;
    row += 1;
    ws.write_string_with_format(row, 6, "To Invoice", &bold)?;
    ws.write_number_with_format(row, 7, unbilled, &money)?;
    ws.write_number_with_format(row, 12, balance - unbilled, &money)?;
    row += 1;
    ws.write_string_with_format(row, 6, "To Invoice Less Hold", &bold)?;
    ws.write_number_with_format(row, 7, unbilled * 0.9, &money)?;

    workbook.save(path)?;
    Ok(())
}

/// Write the sample project lists under `dir` and a settings file pointing
/// at them. Returns the settings file path.
pub fn create(dir: &Path) -> Result<PathBuf> {
    let settings = Settings {
        project_root: dir.join("network").to_string_lossy().to_string(),
        cache_dir: dir.join("quarterly sheets").to_string_lossy().to_string(),
        reports_dir: dir.join("reports").to_string_lossy().to_string(),
        default_years: vec!["2024".into(), "2025".into()],
        ..Settings::default()
    };
    let lists = PathBuf::from(&settings.cache_dir);
    std::fs::create_dir_all(&lists)?;
    std::fs::create_dir_all(&settings.reports_dir)?;

    for (year, projects) in [("2024", PROJECTS_2024), ("2025", PROJECTS_2025)] {
        let vendor_col = (settings.vendor_column(year) - 1) as u16;
        let path = lists.join(format!("{}.xlsx", project_list_name(year)));
        write_project_list(&path, year, projects, vendor_col)?;
        println!("Wrote {}", path.display());
    }

    save_settings(&settings, Some(&dir.join("settings.json")))
}

pub fn run(dir: &Path) -> Result<()> {
    let settings_path = create(dir)?;
    println!("Settings written to {}", settings_path.display());
    println!();
    println!("Try:");
    println!("  ytd --settings \"{}\" quarterly --quarter 2 --year 2025", settings_path.display());
    println!("  ytd --settings \"{}\" daily --date 2025-04-18", settings_path.display());
    Ok(())
}
