// Configuration validation
//
// Validates that required fields are present and values are sensible

use super::*;
use anyhow::{bail, Result};
use tracing::warn;

pub fn validate_config(config: &RuntimeConfig) -> Result<()> {
    validate_storage_config(&config.storage)?;
    validate_tables_config(&config.tables)?;
    validate_step_config(&config.step)?;
    Ok(())
}

fn validate_storage_config(config: &StorageConfig) -> Result<()> {
    if config.parquet_row_group_size == 0 {
        bail!("storage.parquet_row_group_size must be greater than 0");
    }

    if config.parquet_row_group_size > 1024 * 1024 {
        warn!(
            parquet_row_group_size = config.parquet_row_group_size,
            "storage.parquet_row_group_size is very large; may cause memory issues"
        );
    }

    match config.backend {
        StorageBackend::Fs => {
            let fs = config
                .fs
                .as_ref()
                .ok_or_else(|| anyhow::anyhow!("fs storage backend requires 'fs' configuration"))?;

            if fs.path.is_empty() {
                bail!(
                    "Filesystem path is required\n\n\
                    How to fix:\n\
                      • Environment: export {}STORAGE_PATH=/data/warehouse\n\
                      • TOML: [storage.fs]\n              path = \"/data/warehouse\"\n",
                    ENV_PREFIX
                );
            }
        }
        StorageBackend::S3 => {
            let s3 = config
                .s3
                .as_ref()
                .ok_or_else(|| anyhow::anyhow!("s3 storage backend requires 's3' configuration"))?;

            if s3.bucket.is_empty() {
                bail!(
                    "S3 bucket name is required\n\n\
                    How to fix:\n\
                      • Environment: export {}S3_BUCKET=my-bucket\n\
                      • TOML: [storage.s3]\n              bucket = \"my-bucket\"\n",
                    ENV_PREFIX
                );
            }

            if s3.region.is_empty() {
                bail!(
                    "S3 region is required\n\n\
                    How to fix:\n\
                      • Environment: export {}S3_REGION=us-west-2\n\
                      • TOML: [storage.s3]\n              region = \"us-west-2\"\n",
                    ENV_PREFIX
                );
            }
        }
    }

    Ok(())
}

fn validate_tables_config(config: &TablesConfig) -> Result<()> {
    let template = &config.name_template;

    if !template.contains("{db}") || !template.contains("{table}") {
        bail!(
            "tables.name_template must contain both {{db}} and {{table}} (got '{}')",
            template
        );
    }

    if !template.contains('.') {
        bail!(
            "tables.name_template must produce 'database.table' names (got '{}')",
            template
        );
    }

    if template.contains("{env}") && config.env.is_none() {
        bail!(
            "tables.name_template uses {{env}} but no environment is set\n\n\
            How to fix:\n\
              • CLI: --env dev\n\
              • Environment: export {}ENV=dev\n\
              • TOML: [tables]\n              env = \"dev\"\n",
            ENV_PREFIX
        );
    }

    for (name, definition) in &config.definitions {
        validate_logical_name("tables.definitions", name)?;
        if let Some(column) = &definition.partition_by {
            if column.is_empty() {
                bail!("tables.definitions.\"{}\".partition_by must not be empty", name);
            }
        }
    }

    Ok(())
}

fn validate_step_config(config: &StepConfig) -> Result<()> {
    validate_logical_name("step.source", &config.source)?;
    validate_logical_name("step.destination", &config.destination)?;

    if config.source == config.destination {
        bail!(
            "step.source and step.destination must differ (both are '{}')",
            config.source
        );
    }

    Ok(())
}

fn validate_logical_name(field: &str, name: &str) -> Result<()> {
    match name.split_once('.') {
        Some((db, table)) if !db.is_empty() && !table.is_empty() && !table.contains('.') => {
            Ok(())
        }
        _ => bail!("{} must be a 'database.table' name (got '{}')", field, name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_storage_config() {
        let s3_config = StorageConfig {
            backend: StorageBackend::S3,
            fs: None,
            s3: Some(S3Config {
                bucket: "test-bucket".to_string(),
                region: "us-east-1".to_string(),
                endpoint: None,
                prefix: None,
            }),
            parquet_row_group_size: 1024,
        };
        assert!(validate_storage_config(&s3_config).is_ok());

        let missing_bucket = StorageConfig {
            s3: Some(S3Config {
                bucket: String::new(),
                region: "us-east-1".to_string(),
                endpoint: None,
                prefix: None,
            }),
            ..s3_config.clone()
        };
        assert!(validate_storage_config(&missing_bucket).is_err());

        let zero_row_groups = StorageConfig {
            parquet_row_group_size: 0,
            ..StorageConfig::default()
        };
        assert!(validate_storage_config(&zero_row_groups).is_err());
    }

    #[test]
    fn test_validate_name_template() {
        let mut tables = TablesConfig::default();
        tables.name_template = "{table}".to_string();
        assert!(validate_tables_config(&tables).is_err());

        tables.name_template = "{env}_{db}.{table}".to_string();
        assert!(validate_tables_config(&tables).is_err());

        tables.env = Some("dev".to_string());
        assert!(validate_tables_config(&tables).is_ok());
    }

    #[test]
    fn test_validate_logical_names() {
        assert!(validate_logical_name("x", "bronze.tbl").is_ok());
        assert!(validate_logical_name("x", "bronze").is_err());
        assert!(validate_logical_name("x", ".tbl").is_err());
        assert!(validate_logical_name("x", "a.b.c").is_err());

        let step = StepConfig {
            destination: DEFAULT_SOURCE_TABLE.to_string(),
            ..StepConfig::default()
        };
        assert!(validate_step_config(&step).is_err());
    }
}
