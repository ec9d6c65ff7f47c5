// pricedash entry point.
//
// Startup sequence:
// 1. Parse command-line arguments
// 2. Load config
// 3. Initialize tracing (log to file, not terminal)
// 4. Create the session and optionally preload a CSV
// 5. Run the interactive command loop on stdin/stdout

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Parser;
use tracing::{info, warn};

use pricedash::render;
use pricedash::repl::Repl;
use pricedash_core::config;
use pricedash_core::session::Session;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about = "Compare your listing prices against competitors", long_about = None)]
struct Cli {
    /// Config file to use instead of config/pricedash.toml
    #[arg(long)]
    config: Option<PathBuf>,

    /// Research CSV to import before the session starts
    #[arg(long)]
    import: Option<PathBuf>,

    /// Directory for the log file (overrides logging.directory)
    #[arg(long)]
    log_dir: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    // 1. Parse arguments
    let cli = Cli::parse();

    // 2. Load config
    let (config, config_path) =
        config::load_config(cli.config.as_deref()).context("failed to load configuration")?;

    // 3. Initialize tracing
    let log_dir = cli
        .log_dir
        .clone()
        .unwrap_or_else(|| PathBuf::from(&config.logging.directory));
    init_tracing(&log_dir, &config.logging.filter)?;
    info!("pricedash starting up");
    match &config_path {
        Some(path) => info!("Config loaded from {}", path.display()),
        None => info!("No config file found, using defaults"),
    }
    info!(
        "Overpriced ratio {}, undo capacity {}",
        config.pricing.overpriced_ratio, config.undo.capacity
    );

    // 4. Session
    let mut session = Session::new(&config);
    if let Some(path) = &cli.import {
        match session.import_csv_path(path) {
            Ok(summary) => println!("{}", render::import_summary(&summary)),
            Err(e) => {
                warn!("Preload of {} failed: {}", path.display(), e);
                eprintln!("error: import of {} failed: {e}", path.display());
            }
        }
    }

    // 5. Command loop
    let stdin = std::io::stdin();
    let stdout = std::io::stdout();
    let mut repl = Repl::new(
        stdin.lock(),
        stdout.lock(),
        session,
        PathBuf::from(&config.export.path),
    );
    repl.run()?;

    info!("pricedash shut down cleanly");
    Ok(())
}

/// Initialize tracing to log to a file (not the terminal, which is used by the
/// command loop).
fn init_tracing(log_dir: &Path, default_filter: &str) -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    std::fs::create_dir_all(log_dir)
        .with_context(|| format!("failed to create log directory {}", log_dir.display()))?;
    let log_file = std::fs::File::create(log_dir.join("pricedash.log"))
        .context("failed to create log file")?;

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(log_file)
        .with_ansi(false)
        .with_target(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    Ok(())
}
