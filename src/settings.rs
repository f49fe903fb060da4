use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Carry-forward monthly totals used when the previous quarter's ledger is
/// missing. Keyed by the quarter being processed; `months` maps month number
/// (1-12) to its total.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Baseline {
    pub year: i32,
    pub quarter: u32,
    pub months: BTreeMap<u32, f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_project_root")]
    pub project_root: String,
    #[serde(default = "default_cache_dir")]
    pub cache_dir: String,
    #[serde(default = "default_reports_dir")]
    pub reports_dir: String,
    #[serde(default = "default_years")]
    pub default_years: Vec<String>,
    #[serde(default = "default_scan_years")]
    pub scan_years: (i32, i32),
    #[serde(default = "default_header_row")]
    pub header_row: usize,
    #[serde(default = "default_comments_column")]
    pub comments_column: usize,
    #[serde(default = "default_baselines")]
    pub baselines: Vec<Baseline>,
    #[serde(default = "default_vendor_columns")]
    pub vendor_columns: BTreeMap<String, u32>,
    #[serde(default = "default_vendor_column")]
    pub default_vendor_column: u32,
    #[serde(default = "default_flag_colors")]
    pub flag_colors: Vec<String>,
}

fn default_project_root() -> String {
    "N:/Project List".to_string()
}

fn default_cache_dir() -> String {
    "quarterly sheets".to_string()
}

fn default_reports_dir() -> String {
    "reports".to_string()
}

fn default_years() -> Vec<String> {
    vec!["2023".into(), "2024".into(), "2025".into()]
}

fn default_scan_years() -> (i32, i32) {
    (2023, 2030)
}

fn default_header_row() -> usize {
    5
}

fn default_comments_column() -> usize {
    13
}

fn default_baselines() -> Vec<Baseline> {
    // Q1 2025 as booked before the first quarterly ledger existed.
    vec![Baseline {
        year: 2025,
        quarter: 2,
        months: BTreeMap::from([(1, 872459.74), (2, 609301.81), (3, 463345.08)]),
    }]
}

fn default_vendor_columns() -> BTreeMap<String, u32> {
    BTreeMap::from([("2023".to_string(), 22), ("2024".to_string(), 22)])
}

fn default_vendor_column() -> u32 {
    23
}

fn default_flag_colors() -> Vec<String> {
    (0x00..=0x0A).map(|r: u8| format!("{r:02X}FFFF")).collect()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            project_root: default_project_root(),
            cache_dir: default_cache_dir(),
            reports_dir: default_reports_dir(),
            default_years: default_years(),
            scan_years: default_scan_years(),
            header_row: default_header_row(),
            comments_column: default_comments_column(),
            baselines: default_baselines(),
            vendor_columns: default_vendor_columns(),
            default_vendor_column: default_vendor_column(),
            flag_colors: default_flag_colors(),
        }
    }
}

impl Settings {
    /// Carry-forward months for the given quarter, indexed 0 = January.
    pub fn baseline_for(&self, year: i32, quarter: u32) -> Option<[f64; 12]> {
        let baseline = self
            .baselines
            .iter()
            .find(|b| b.year == year && b.quarter == quarter)?;
        let mut months = [0.0; 12];
        for (&month, &value) in &baseline.months {
            if (1..=12).contains(&month) {
                months[month as usize - 1] = value;
            }
        }
        Some(months)
    }

    /// 1-based column holding vendor payments for a project-list year.
    pub fn vendor_column(&self, year: &str) -> u32 {
        self.vendor_columns
            .get(year)
            .copied()
            .unwrap_or(self.default_vendor_column)
    }
}

fn config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("ytd-ledger")
}

pub fn settings_path() -> PathBuf {
    config_dir().join("settings.json")
}

pub fn load_settings(path: Option<&Path>) -> Settings {
    let path = path.map(Path::to_path_buf).unwrap_or_else(settings_path);
    if path.exists() {
        let content = std::fs::read_to_string(&path).unwrap_or_default();
        serde_json::from_str(&content).unwrap_or_default()
    } else {
        Settings::default()
    }
}

pub fn save_settings(settings: &Settings, path: Option<&Path>) -> Result<PathBuf> {
    let path = path.map(Path::to_path_buf).unwrap_or_else(settings_path);
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)?;
    }
    let json = serde_json::to_string_pretty(settings)?;
    std::fs::write(&path, format!("{json}\n"))?;
    Ok(path)
}

pub fn shellexpand_path(path: &str) -> String {
    if path.starts_with('~') {
        if let Some(home) = dirs::home_dir() {
            return path.replacen('~', &home.to_string_lossy(), 1);
        }
    }
    path.to_string()
}
