use super::{FsConfig, LogFormat, RuntimeConfig, S3Config, StorageBackend, WriteMode};
use anyhow::{anyhow, Context, Result};

pub const ENV_PREFIX: &str = "SILVERSTEP_";

/// Abstraction over environment-variable lookups so tests and embedders
/// can supply their own source of overrides.
pub trait EnvSource {
    /// Look up `key` with the SILVERSTEP_ prefix applied.
    fn get(&self, key: &str) -> Option<String>;
}

/// Apply environment-variable overrides (highest priority) to the runtime config.
pub fn apply_env_overrides<E: EnvSource>(config: &mut RuntimeConfig, env: &E) -> Result<()> {
    // Storage backend
    if let Some(backend) = env.get("STORAGE_BACKEND") {
        config.storage.backend = backend
            .parse::<StorageBackend>()
            .context("Invalid SILVERSTEP_STORAGE_BACKEND value")?;
    }
    if let Some(path) = env.get("STORAGE_PATH") {
        config.storage.fs.get_or_insert_with(FsConfig::default).path = path;
    }
    if let Some(val) = get_env_usize(env, "PARQUET_ROW_GROUP_SIZE")? {
        config.storage.parquet_row_group_size = val;
    }

    // S3 storage
    if let Some(bucket) = env.get("S3_BUCKET") {
        ensure_s3(config).bucket = bucket;
    }
    if let Some(region) = env.get("S3_REGION") {
        ensure_s3(config).region = region;
    }
    if let Some(endpoint) = env.get("S3_ENDPOINT") {
        ensure_s3(config).endpoint = Some(endpoint);
    }
    if let Some(prefix) = env.get("S3_PREFIX") {
        ensure_s3(config).prefix = normalize_prefix(prefix);
    }

    // Table naming
    if let Some(env_name) = env.get("ENV") {
        config.tables.env = if env_name.is_empty() {
            None
        } else {
            Some(env_name)
        };
    }
    if let Some(template) = env.get("TABLE_NAME_TEMPLATE") {
        config.tables.name_template = template;
    }

    // Step
    if let Some(source) = env.get("SOURCE_TABLE") {
        config.step.source = source;
    }
    if let Some(destination) = env.get("DESTINATION_TABLE") {
        config.step.destination = destination;
    }
    if let Some(mode) = env.get("WRITE_MODE") {
        config.step.write_mode = mode
            .parse::<WriteMode>()
            .context("Invalid SILVERSTEP_WRITE_MODE value")?;
    }
    if let Some(val) = get_env_usize(env, "PREVIEW_ROWS")? {
        config.step.preview_rows = val;
    }

    // Logging
    if let Some(level) = env.get("LOG_LEVEL") {
        config.logging.level = level;
    }
    if let Some(format) = env.get("LOG_FORMAT") {
        config.logging.format = match format.to_lowercase().as_str() {
            "json" => LogFormat::Json,
            _ => LogFormat::Text,
        };
    }

    Ok(())
}

fn ensure_s3(config: &mut RuntimeConfig) -> &mut S3Config {
    config.storage.s3.get_or_insert_with(|| S3Config {
        bucket: String::new(),
        region: String::new(),
        endpoint: None,
        prefix: None,
    })
}

fn get_env_usize<E: EnvSource>(env: &E, key: &str) -> Result<Option<usize>> {
    match env.get(key) {
        Some(val) => {
            let parsed = val
                .parse::<usize>()
                .map_err(|e| anyhow!("Failed to parse {}{}: {}", ENV_PREFIX, key, e))?;
            Ok(Some(parsed))
        }
        None => Ok(None),
    }
}

pub(crate) fn normalize_prefix(prefix: String) -> Option<String> {
    if prefix.is_empty() {
        None
    } else if prefix.ends_with('/') {
        Some(prefix)
    } else {
        Some(format!("{}/", prefix))
    }
}
