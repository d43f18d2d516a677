//! medrec-migrate CLI - clinical record migration between stores.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use medrec_migrate::{Config, ImportRun, MigrateError, RunSummary, SqliteStore, TransferRun};
use tracing::{info, Level};

#[derive(Parser)]
#[command(name = "medrec-migrate")]
#[command(about = "Clinical record migration between XML exports, SQLite and PostgreSQL")]
#[command(version)]
struct Cli {
    /// Path to YAML configuration file
    #[arg(short, long, default_value = "config.yaml")]
    config: PathBuf,

    /// Output JSON result to stdout
    #[arg(long)]
    output_json: bool,

    /// Log format: text or json
    #[arg(long, default_value = "text")]
    log_format: String,

    /// Log verbosity: debug, info, warn, error
    #[arg(long, default_value = "info")]
    verbosity: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Import the legacy XML exports into the embedded store
    Import,

    /// Transfer the embedded store into the server store
    Transfer,

    /// Compare row counts between the embedded and server stores
    Verify,

    /// Test store connections
    HealthCheck,
}

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", e.format_detailed());
            ExitCode::from(e.exit_code())
        }
    }
}

async fn run() -> Result<(), MigrateError> {
    let cli = Cli::parse();

    setup_logging(&cli.verbosity, &cli.log_format);

    let config = Config::load(&cli.config)?;
    info!("Loaded configuration from {:?}", cli.config);

    match cli.command {
        Commands::Import => {
            let summary = ImportRun::new(config).await?.run().await?;
            print_summary(cli.output_json, &summary)?;
        }

        Commands::Transfer => {
            let summary = TransferRun::new(config).await?.run().await?;
            print_summary(cli.output_json, &summary)?;
        }

        Commands::Verify => {
            let run = TransferRun::new(config).await?;
            let parities = run.verify().await;
            let mut mismatches = 0;
            for parity in &parities {
                if parity.matches() {
                    println!(
                        "  OK {}: {} rows",
                        parity.table,
                        parity.source_count.unwrap_or(0)
                    );
                } else {
                    mismatches += 1;
                    println!(
                        "  MISMATCH {}: source={:?} destination={:?}",
                        parity.table, parity.source_count, parity.dest_count
                    );
                }
            }
            println!(
                "\n{}/{} tables at parity",
                parities.len() - mismatches,
                parities.len()
            );
        }

        Commands::HealthCheck => {
            let store = SqliteStore::open(&config.store.path).await;
            match &store {
                Ok(_) => println!("  Embedded store: OK ({})", config.store.path.display()),
                Err(e) => println!("  Embedded store: FAILED ({})", e),
            }

            let server = match &config.server {
                Some(server_config) => {
                    let result = medrec_migrate::PgStore::connect(server_config).await;
                    match &result {
                        Ok(_) => println!("  Server store: OK ({})", server_config.host),
                        Err(e) => println!("  Server store: FAILED ({})", e),
                    }
                    Some(result)
                }
                None => {
                    println!("  Server store: not configured");
                    None
                }
            };

            let healthy =
                store.is_ok() && server.map(|result| result.is_ok()).unwrap_or(true);
            println!("\n  Overall: {}", if healthy { "HEALTHY" } else { "UNHEALTHY" });
            if !healthy {
                return Err(MigrateError::Precondition("health check failed".into()));
            }
        }
    }

    Ok(())
}

fn print_summary(output_json: bool, summary: &RunSummary) -> Result<(), MigrateError> {
    if output_json {
        println!("{}", summary.to_json()?);
        return Ok(());
    }

    println!("\n{} completed: {}", summary.operation, summary.verdict);
    println!("  Run ID: {}", summary.run_id);
    println!("  Duration: {:.2}s", summary.duration_seconds);
    for table in &summary.tables {
        let parity = match table.parity {
            Some(true) => " [parity]",
            Some(false) => " [MISMATCH]",
            None => "",
        };
        match &table.error {
            Some(error) => println!("  {}: FAILED - {}{}", table.table, error, parity),
            None => println!(
                "  {}: {} loaded, {} rejected{}",
                table.table, table.succeeded, table.failed, parity
            ),
        }
    }
    if let Some(backup) = &summary.backup_path {
        println!("  Backup: {}", backup.display());
    }
    if let Some(audit) = &summary.audit_copy {
        println!("  Audit copy: {}", audit.display());
    }
    Ok(())
}

fn setup_logging(verbosity: &str, format: &str) {
    let level = match verbosity.to_lowercase().as_str() {
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false);

    if format == "json" {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
}
