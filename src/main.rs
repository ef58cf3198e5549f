use std::sync::Arc;
use std::sync::atomic::{ AtomicBool, Ordering };

use anyhow::{ bail, Context, Result };
use clap::{ Parser, Subcommand };
use url::Url;

use poefixer::currency::{ CurrencyPostprocessor, ProcessorOptions };
use poefixer::database::{ Database, DatabaseConfig };
use poefixer::ingest::{ self, IngestOptions };
use poefixer::logger::{ self, LogLevel, LogTag };

#[derive(Parser)]
#[command(name = "fixer")]
#[command(about = "Stash feed ingestion and currency economy analysis", long_about = None)]
struct Cli {
    /// Database connection string, e.g. sqlite:///poefixer.db
    #[arg(short = 'd', long = "database-dsn", global = true, default_value = "sqlite:///poefixer.db")]
    database_dsn: String,

    /// Info-level logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Debug-level logging plus backend statement echo
    #[arg(long, global = true)]
    debug: bool,

    /// Trace-level logging
    #[arg(long, global = true)]
    trace: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Crunch sales and update currency values
    Currency {
        /// Process items updated at or after this unix time instead of
        /// resuming from the last recorded sale
        #[arg(long)]
        start_time: Option<i64>,

        /// Keep processing until interrupted
        #[arg(long)]
        continuous: bool,
    },

    /// Pull the public stash feed into the database
    Ingest {
        /// Feed cursor to resume from
        #[arg(long)]
        next_id: Option<String>,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let level = if cli.trace {
        LogLevel::Trace
    } else if cli.debug {
        LogLevel::Debug
    } else if cli.verbose {
        LogLevel::Info
    } else {
        LogLevel::Warn
    };
    logger::set_level(level);

    if let Err(e) = run(cli).await {
        logger::error(LogTag::System, &format!("{:#}", e));
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = DatabaseConfig {
        path: dsn_to_path(&cli.database_dsn)?,
    };
    let db = Database::with_config(&config)?;

    // Cooperative shutdown: the loops check this between blocks
    let shutdown = Arc::new(AtomicBool::new(false));
    {
        let shutdown = shutdown.clone();
        ctrlc
            ::set_handler(move || {
                logger::info(LogTag::System, "Interrupt received, stopping after this block");
                shutdown.store(true, Ordering::Relaxed);
            })
            .context("Failed to install interrupt handler")?;
    }

    match cli.command {
        Commands::Currency { start_time, continuous } => {
            let options = ProcessorOptions {
                start_time,
                continuous,
                ..Default::default()
            };
            CurrencyPostprocessor::new(&db, options).run(shutdown).await
        }
        Commands::Ingest { next_id } => {
            let options = IngestOptions {
                next_id,
                api_root: None,
            };
            ingest::run_ingest(&db, options, shutdown).await
        }
    }
}

/// Turn a `sqlite://` DSN or bare path into a database path
///
/// Accepts `sqlite:///relative.db`, `sqlite:////abs/path.db`,
/// `sqlite:///:memory:` and plain filesystem paths.
fn dsn_to_path(dsn: &str) -> Result<String> {
    if !dsn.contains("://") {
        return Ok(dsn.to_string());
    }

    let url = Url::parse(dsn).with_context(|| format!("Invalid database DSN: {}", dsn))?;
    if url.scheme() != "sqlite" {
        bail!("Unsupported database scheme: {} (only sqlite is available)", url.scheme());
    }

    let path = url.path();
    let path = path.strip_prefix('/').unwrap_or(path);
    if path.is_empty() {
        bail!("Database DSN has no path: {}", dsn);
    }
    Ok(path.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dsn_relative_path() {
        assert_eq!(dsn_to_path("sqlite:///poefixer.db").unwrap(), "poefixer.db");
    }

    #[test]
    fn test_dsn_absolute_path() {
        assert_eq!(dsn_to_path("sqlite:////var/lib/poe.db").unwrap(), "/var/lib/poe.db");
    }

    #[test]
    fn test_dsn_memory() {
        assert_eq!(dsn_to_path("sqlite:///:memory:").unwrap(), ":memory:");
    }

    #[test]
    fn test_bare_path_passes_through() {
        assert_eq!(dsn_to_path("some/dir/poe.db").unwrap(), "some/dir/poe.db");
    }

    #[test]
    fn test_non_sqlite_scheme_is_rejected() {
        assert!(dsn_to_path("mysql://localhost/poe").is_err());
    }
}
