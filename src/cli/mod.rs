pub mod completions;
pub mod daily;
pub mod demo;
pub mod init;
pub mod quarterly;
pub mod scan;

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};

use crate::error::{Result, YtdError};
use crate::settings::{shellexpand_path, Settings};

/// `--years` when given, else the configured default years.
pub(crate) fn selected_years(years: Vec<String>, settings: &Settings) -> Vec<String> {
    if years.is_empty() {
        settings.default_years.clone()
    } else {
        years
    }
}

pub(crate) fn parse_date_arg(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").map_err(|_| YtdError::InvalidDate(raw.to_string()))
}

pub(crate) fn expand_dir(dir: &str) -> PathBuf {
    PathBuf::from(shellexpand_path(dir))
}

#[derive(Parser)]
#[command(
    name = "ytd",
    version,
    about = "Split-invoice reconciliation and quarterly YTD ledgers for project-list workbooks."
)]
pub struct Cli {
    /// Settings file (default: ~/.config/ytd-ledger/settings.json)
    #[arg(long, global = true)]
    pub settings: Option<PathBuf>,

    /// Show every line of the run log.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write a settings file with the folders to search.
    Init {
        /// Network folder holding `<year> Project List/` directories
        #[arg(long = "project-root")]
        project_root: Option<String>,
        /// Local folder for quarterly ledgers and cached project lists
        #[arg(long = "cache-dir")]
        cache_dir: Option<String>,
        /// Folder for daily summaries
        #[arg(long = "reports-dir")]
        reports_dir: Option<String>,
    },
    /// Rebuild the quarter's YTD ledger from the yearly project lists.
    Quarterly {
        /// Quarter number (1-4)
        #[arg(long, short)]
        quarter: u32,
        /// Calendar year of the quarter
        #[arg(long, short)]
        year: i32,
        /// Project-list years to read, e.g. --years 2024 2025
        #[arg(long, num_args = 1..)]
        years: Vec<String>,
        /// Compute and report without writing the ledger
        #[arg(long = "dry-run")]
        dry_run: bool,
    },
    /// Write the daily summary workbook and upsert the day into the quarter ledger.
    Daily {
        /// Target date: YYYY-MM-DD (default: today)
        #[arg(long, short)]
        date: Option<String>,
        /// Where to write the summary (default: the reports folder)
        #[arg(long = "output-dir")]
        output_dir: Option<String>,
        /// Project-list years to read
        #[arg(long, num_args = 1..)]
        years: Vec<String>,
    },
    /// List which yearly project lists can be found.
    Scan,
    /// Write sample project lists and a matching settings file.
    Demo {
        /// Folder to create the sample data in
        #[arg(long)]
        dir: PathBuf,
    },
    /// Print shell completions.
    Completions {
        shell: clap_complete::Shell,
    },
}
