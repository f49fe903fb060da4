use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;

use crate::settings::{shellexpand_path, Settings};

const EXTENSIONS: [&str; 2] = ["xlsx", "xlsm"];

/// Resolve a logical workbook name (no extension) to a file on disk.
pub trait Locate {
    fn locate(&self, logical_name: &str) -> Option<PathBuf>;
}

impl<F> Locate for F
where
    F: Fn(&str) -> Option<PathBuf>,
{
    fn locate(&self, logical_name: &str) -> Option<PathBuf> {
        self(logical_name)
    }
}

/// Searches the network project root, then the local cache folder, then the
/// reports folder, trying each extension in turn.
#[derive(Debug, Clone)]
pub struct TieredLocator {
    pub project_root: PathBuf,
    pub cache_dir: PathBuf,
    pub reports_dir: PathBuf,
}

impl TieredLocator {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            project_root: PathBuf::from(shellexpand_path(&settings.project_root)),
            cache_dir: PathBuf::from(shellexpand_path(&settings.cache_dir)),
            reports_dir: PathBuf::from(shellexpand_path(&settings.reports_dir)),
        }
    }

    /// `<root>/<year> Project List/` for names carrying a year.
    fn network_dir(&self, logical_name: &str) -> Option<PathBuf> {
        let year = year_in_name(logical_name)?;
        Some(self.project_root.join(format!("{year} Project List")))
    }

    pub fn tiers(&self, logical_name: &str) -> Vec<PathBuf> {
        let mut dirs = Vec::with_capacity(3);
        if let Some(dir) = self.network_dir(logical_name) {
            dirs.push(dir);
        }
        dirs.push(self.cache_dir.clone());
        dirs.push(self.reports_dir.clone());
        dirs
    }

    /// Where a quarter ledger lives for the daily upsert: reports first, then
    /// the network folder (copied into the cache), then the cache itself.
    pub fn locate_ledger(&self, file_name: &str) -> Option<PathBuf> {
        let in_reports = self.reports_dir.join(file_name);
        if in_reports.exists() {
            return Some(in_reports);
        }
        if let Some(dir) = self.network_dir(file_name) {
            let on_network = dir.join(file_name);
            if on_network.exists() {
                let cached = self.cache_dir.join(file_name);
                let copied = std::fs::create_dir_all(&self.cache_dir)
                    .and_then(|_| std::fs::copy(&on_network, &cached));
                return match copied {
                    Ok(_) => Some(cached),
                    Err(e) => {
                        tracing::warn!("could not cache {}: {e}", on_network.display());
                        Some(on_network)
                    }
                };
            }
        }
        let cached = self.cache_dir.join(file_name);
        cached.exists().then_some(cached)
    }

    pub fn in_reports(&self, path: &Path) -> bool {
        path.parent()
            .map(|p| same_dir(p, &self.reports_dir))
            .unwrap_or(false)
    }
}

fn same_dir(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}

impl Locate for TieredLocator {
    fn locate(&self, logical_name: &str) -> Option<PathBuf> {
        for dir in self.tiers(logical_name) {
            for ext in EXTENSIONS {
                let candidate = dir.join(format!("{logical_name}.{ext}"));
                if candidate.exists() {
                    tracing::debug!("located {logical_name} at {}", candidate.display());
                    return Some(candidate);
                }
            }
        }
        None
    }
}

fn digits_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\d+").expect("invalid digit run regex"))
}

/// First standalone 4-digit year in 2023-2030 found in a file name.
pub fn year_in_name(name: &str) -> Option<i32> {
    digits_re()
        .find_iter(name)
        .filter(|m| m.len() == 4)
        .filter_map(|m| m.as_str().parse().ok())
        .find(|y| (2023..=2030).contains(y))
}

/// Which yearly project lists resolve, in year order.
pub fn scan(locator: &dyn Locate, years: impl IntoIterator<Item = i32>) -> Vec<(i32, Option<PathBuf>)> {
    years
        .into_iter()
        .map(|y| (y, locator.locate(&format!("{y} Project List"))))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn touch(path: &Path) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, b"x").unwrap();
    }

    fn locator(root: &Path) -> TieredLocator {
        TieredLocator {
            project_root: root.join("network"),
            cache_dir: root.join("quarterly sheets"),
            reports_dir: root.join("reports"),
        }
    }

    #[test]
    fn test_year_in_name() {
        assert_eq!(year_in_name("2025 Project List"), Some(2025));
        assert_eq!(year_in_name("2024 2nd Quarter YTD.xlsx"), Some(2024));
        assert_eq!(year_in_name("Project List 1999"), None);
        assert_eq!(year_in_name("12025 list"), None);
        assert_eq!(year_in_name("Backup 1999 of 2026 sheet"), Some(2026));
        assert_eq!(year_in_name("Q3_2025.xlsx"), Some(2025));
        assert_eq!(year_in_name("summary"), None);
    }

    #[test]
    fn test_network_tier_wins_over_cache() {
        let dir = tempfile::tempdir().unwrap();
        let loc = locator(dir.path());
        let net = dir.path().join("network/2025 Project List/2025 Project List.xlsm");
        let cache = dir.path().join("quarterly sheets/2025 Project List.xlsx");
        touch(&net);
        touch(&cache);
        assert_eq!(loc.locate("2025 Project List"), Some(net));
    }

    #[test]
    fn test_falls_through_to_reports_and_xlsm() {
        let dir = tempfile::tempdir().unwrap();
        let loc = locator(dir.path());
        let reports = dir.path().join("reports/2024 Project List.xlsm");
        touch(&reports);
        assert_eq!(loc.locate("2024 Project List"), Some(reports));
        assert_eq!(loc.locate("2023 Project List"), None);
    }

    #[test]
    fn test_locate_ledger_copies_network_file_into_cache() {
        let dir = tempfile::tempdir().unwrap();
        let loc = locator(dir.path());
        let name = "2025 2nd Quarter YTD.xlsx";
        touch(&dir.path().join("network/2025 Project List").join(name));
        let found = loc.locate_ledger(name).unwrap();
        assert_eq!(found, dir.path().join("quarterly sheets").join(name));
        assert!(found.exists());
        assert!(!loc.in_reports(&found));
    }

    #[test]
    fn test_locate_ledger_prefers_reports() {
        let dir = tempfile::tempdir().unwrap();
        let loc = locator(dir.path());
        let name = "2025 3rd Quarter YTD.xlsx";
        touch(&dir.path().join("reports").join(name));
        touch(&dir.path().join("quarterly sheets").join(name));
        let found = loc.locate_ledger(name).unwrap();
        assert!(loc.in_reports(&found));
    }

    #[test]
    fn test_closure_locator_and_scan() {
        let only_2025 = |name: &str| -> Option<PathBuf> {
            name.starts_with("2025").then(|| PathBuf::from("/lists/2025.xlsx"))
        };
        let found = scan(&only_2025, 2024..=2025);
        assert_eq!(found[0], (2024, None));
        assert_eq!(found[1], (2025, Some(PathBuf::from("/lists/2025.xlsx"))));
    }
}
