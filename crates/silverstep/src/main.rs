use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use silverstep::silverstep_config::{RuntimeConfig, StorageBackend};
use std::path::PathBuf;

/// Bronze-to-silver table transformation step
#[derive(Parser)]
#[command(name = "silverstep")]
#[command(version)]
#[command(about = "Bronze-to-silver table transformation step over Parquet", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Path to configuration file
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Warehouse directory (filesystem backend only)
    #[arg(short, long, value_name = "DIR", global = true)]
    warehouse: Option<PathBuf>,

    /// Log level: trace, debug, info, warn, error
    #[arg(short = 'v', long, value_name = "LEVEL", global = true)]
    log_level: Option<String>,

    /// Environment substituted into physical table names
    #[arg(short, long, value_name = "NAME", global = true)]
    env: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the step once (default if no subcommand given)
    Run,
    /// Show physical names of the source and destination tables and whether they exist
    Tables,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to build tokio runtime")?
        .block_on(async_main(cli))
}

async fn async_main(cli: Cli) -> Result<()> {
    let mut config = if let Some(config_path) = &cli.config {
        RuntimeConfig::load_from_path(config_path)
            .with_context(|| format!("Failed to load config from {}", config_path.display()))?
    } else {
        RuntimeConfig::load_or_default().context("Failed to load configuration")?
    };

    apply_cli_overrides(&mut config, &cli)?;
    config.validate()?;

    silverstep::init_tracing(&config.logging);

    match cli.command {
        Some(Commands::Tables) => print_tables(&config).await,
        Some(Commands::Run) | None => {
            let summary = silverstep::run_with_config(config).await?;
            println!(
                "Wrote {} rows to {} ({} partitions, {} files replaced)",
                summary.write.rows_written,
                summary.destination,
                summary.write.partitions.len(),
                summary.write.files_removed
            );
            Ok(())
        }
    }
}

fn apply_cli_overrides(config: &mut RuntimeConfig, cli: &Cli) -> Result<()> {
    // Override warehouse directory (only valid for fs backend)
    if let Some(warehouse) = &cli.warehouse {
        if config.storage.backend != StorageBackend::Fs {
            anyhow::bail!(
                "--warehouse flag only works with filesystem backend, but backend is '{}'.\n\
                Either remove --warehouse flag or set backend to 'fs' in config file.",
                config.storage.backend
            );
        }

        let fs_config = config.storage.fs.get_or_insert_with(Default::default);
        fs_config.path = warehouse.to_string_lossy().to_string();
    }

    if let Some(level) = &cli.log_level {
        config.logging.level = level.clone();
    }

    if let Some(env) = &cli.env {
        config.tables.env = Some(env.clone());
    }

    Ok(())
}

async fn print_tables(config: &RuntimeConfig) -> Result<()> {
    for status in silverstep::describe_tables(config).await? {
        println!(
            "{:<12} {} -> {} ({})",
            status.role,
            status.logical_name,
            status.physical_name,
            if status.exists { "exists" } else { "missing" }
        );
    }
    Ok(())
}
