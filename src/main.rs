mod aggregate;
mod cli;
mod error;
#[cfg(feature = "fills")]
mod fills;
mod fmt;
mod ledger;
mod loader;
mod locator;
mod merge;
mod models;
mod quarter;
mod quarterly;
mod receivables;
mod reconciler;
mod runlog;
mod settings;
mod sheet;
mod splits;
mod summary;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands};
use settings::load_settings;

fn init_tracing(verbose: bool) {
    let default = if verbose { "ytd_ledger=info" } else { "ytd_ledger=warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let settings_path = cli.settings.as_deref();
    let settings = load_settings(settings_path);

    let result = match cli.command {
        Commands::Init {
            project_root,
            cache_dir,
            reports_dir,
        } => cli::init::run(settings_path, project_root, cache_dir, reports_dir),
        Commands::Quarterly {
            quarter,
            year,
            years,
            dry_run,
        } => cli::quarterly::run(&settings, quarter, year, years, dry_run),
        Commands::Daily {
            date,
            output_dir,
            years,
        } => cli::daily::run(&settings, date, output_dir, years),
        Commands::Scan => cli::scan::run(&settings),
        Commands::Demo { dir } => cli::demo::run(&dir),
        Commands::Completions { shell } => cli::completions::run(shell),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
