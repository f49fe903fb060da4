use std::path::Path;

use crate::error::Result;
use crate::settings::{load_settings, save_settings, shellexpand_path};

pub fn run(
    settings_path: Option<&Path>,
    project_root: Option<String>,
    cache_dir: Option<String>,
    reports_dir: Option<String>,
) -> Result<()> {
    let mut settings = load_settings(settings_path);
    if let Some(dir) = project_root {
        settings.project_root = shellexpand_path(&dir);
    }
    if let Some(dir) = cache_dir {
        settings.cache_dir = shellexpand_path(&dir);
    }
    if let Some(dir) = reports_dir {
        settings.reports_dir = shellexpand_path(&dir);
    }

    let saved = save_settings(&settings, settings_path)?;
    std::fs::create_dir_all(shellexpand_path(&settings.cache_dir))?;
    std::fs::create_dir_all(shellexpand_path(&settings.reports_dir))?;

    println!("Settings written to {}", saved.display());
    println!("Project root:  {}", settings.project_root);
    println!("Ledgers:       {}", settings.cache_dir);
    println!("Reports:       {}", settings.reports_dir);
    Ok(())
}
