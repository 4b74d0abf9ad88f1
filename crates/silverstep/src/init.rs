// Initialization utilities
//
// Storage backend and logging/tracing setup

use anyhow::Result;
use silverstep_config::{LogFormat, LoggingConfig, RuntimeConfig};
use silverstep_storage::{Warehouse, WarehouseTableManager};
use tracing::info;

/// Open the configured warehouse and its table catalog.
pub(crate) fn init_storage(config: &RuntimeConfig) -> Result<(Warehouse, WarehouseTableManager)> {
    info!(
        "Initializing warehouse with storage backend: {}",
        config.storage.backend
    );

    let warehouse = Warehouse::from_config(&config.storage)?;
    let tables = WarehouseTableManager::new(warehouse.clone(), config.tables.clone());
    Ok((warehouse, tables))
}

/// Initialize tracing subscriber from the logging configuration.
///
/// Safe to call more than once; only the first call installs a subscriber.
pub fn init_tracing(config: &LoggingConfig) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let env_filter = EnvFilter::try_new(&config.level).unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(env_filter);

    let _ = match config.format {
        LogFormat::Json => {
            tracing::subscriber::set_global_default(registry.with(fmt::layer().json()))
        }
        LogFormat::Text => tracing::subscriber::set_global_default(registry.with(fmt::layer())),
    };
}
