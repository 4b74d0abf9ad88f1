// silverstep-config - Configuration for the bronze-to-silver step
//
// Supports configuration from multiple sources:
// 1. Environment variables (highest priority)
// 2. Config file path from SILVERSTEP_CONFIG env var (or --config)
// 3. Config file contents from SILVERSTEP_CONFIG_CONTENT env var
// 4. Default config file location (./silverstep.toml)
// 5. Built-in defaults (lowest priority)

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

mod env_overrides;
mod parameters;
#[cfg(not(target_arch = "wasm32"))]
mod sources;
mod validation;

pub use env_overrides::{EnvSource, ENV_PREFIX};
pub use parameters::{ConfigError, ParameterResolver, ParameterValue, Parameters};

/// Logical name of the bronze table the step reads.
pub const DEFAULT_SOURCE_TABLE: &str = "bronze_covid.tbl_template_1_mask_usage";
/// Logical name of the silver table the step writes.
pub const DEFAULT_DESTINATION_TABLE: &str = "silver_covid.tbl_template_3_mask_usage";
/// Placeholder resolved against `[parameters]` at pipeline-build time.
pub const DEFAULT_PARAMETER: &str = "%myparameter.myvalue%";

/// Main runtime configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RuntimeConfig {
    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub tables: TablesConfig,

    #[serde(default)]
    pub step: StepConfig,

    /// Free-form values reachable through `%dotted.key%` placeholders.
    #[serde(default)]
    pub parameters: toml::Table,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Storage backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub backend: StorageBackend,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fs: Option<FsConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub s3: Option<S3Config>,

    #[serde(default = "default_row_group_size")]
    pub parquet_row_group_size: usize,
}

fn default_row_group_size() -> usize {
    32 * 1024
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Fs,
            fs: Some(FsConfig::default()),
            s3: None,
            parquet_row_group_size: default_row_group_size(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Fs,
    S3,
}

impl std::fmt::Display for StorageBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageBackend::Fs => write!(f, "fs"),
            StorageBackend::S3 => write!(f, "s3"),
        }
    }
}

impl std::str::FromStr for StorageBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "fs" | "filesystem" => Ok(StorageBackend::Fs),
            "s3" | "aws" => Ok(StorageBackend::S3),
            _ => anyhow::bail!("Unsupported storage backend: {}. Supported: fs, s3", s),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FsConfig {
    pub path: String,
}

impl Default for FsConfig {
    fn default() -> Self {
        Self {
            path: "./warehouse".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct S3Config {
    pub bucket: String,
    pub region: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    /// Optional path prefix for all tables (e.g., "lake/")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,
}

/// Logical-to-physical table naming and per-table definitions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TablesConfig {
    /// Deployment environment substituted for `{env}` in the name template.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub env: Option<String>,

    /// Physical name template; `{db}` and `{table}` come from the logical name.
    #[serde(default = "default_name_template")]
    pub name_template: String,

    /// Keyed by logical name (`db.table`). Configured entries are layered
    /// over the built-in ones, so the silver table keeps its `COUNTYFP`
    /// partition unless it is redefined explicitly.
    #[serde(
        default = "default_definitions",
        deserialize_with = "deserialize_definitions"
    )]
    pub definitions: BTreeMap<String, TableDefinition>,
}

fn default_name_template() -> String {
    "{db}.{table}".to_string()
}

fn default_definitions() -> BTreeMap<String, TableDefinition> {
    let mut definitions = BTreeMap::new();
    definitions.insert(
        DEFAULT_DESTINATION_TABLE.to_string(),
        TableDefinition {
            partition_by: Some("COUNTYFP".to_string()),
        },
    );
    definitions
}

fn deserialize_definitions<'de, D>(
    deserializer: D,
) -> std::result::Result<BTreeMap<String, TableDefinition>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let mut definitions = BTreeMap::<String, TableDefinition>::deserialize(deserializer)?;
    for (name, definition) in default_definitions() {
        definitions.entry(name).or_insert(definition);
    }
    Ok(definitions)
}

impl Default for TablesConfig {
    fn default() -> Self {
        Self {
            env: None,
            name_template: default_name_template(),
            definitions: default_definitions(),
        }
    }
}

impl TablesConfig {
    /// Definition for a logical table, if one is configured.
    pub fn definition(&self, logical_name: &str) -> Option<&TableDefinition> {
        self.definitions.get(logical_name)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableDefinition {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub partition_by: Option<String>,
}

/// The bronze-to-silver step itself
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepConfig {
    #[serde(default = "default_source")]
    pub source: String,

    #[serde(default = "default_destination")]
    pub destination: String,

    /// Either a `%dotted.key%` placeholder or a literal string.
    #[serde(default = "default_parameter")]
    pub parameter: String,

    #[serde(default)]
    pub write_mode: WriteMode,

    /// Rows logged after stages marked for display. Zero disables previews.
    #[serde(default = "default_preview_rows")]
    pub preview_rows: usize,
}

fn default_source() -> String {
    DEFAULT_SOURCE_TABLE.to_string()
}

fn default_destination() -> String {
    DEFAULT_DESTINATION_TABLE.to_string()
}

fn default_parameter() -> String {
    DEFAULT_PARAMETER.to_string()
}

fn default_preview_rows() -> usize {
    20
}

impl Default for StepConfig {
    fn default() -> Self {
        Self {
            source: default_source(),
            destination: default_destination(),
            parameter: default_parameter(),
            write_mode: WriteMode::default(),
            preview_rows: default_preview_rows(),
        }
    }
}

/// How the writer treats data already in the destination table
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WriteMode {
    /// Replace only the partitions present in the incoming data.
    #[default]
    DynamicPartitionOverwrite,
    /// Add files without removing anything.
    Append,
}

impl std::fmt::Display for WriteMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WriteMode::DynamicPartitionOverwrite => write!(f, "dynamic-partition-overwrite"),
            WriteMode::Append => write!(f, "append"),
        }
    }
}

impl std::str::FromStr for WriteMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "dynamic-partition-overwrite" | "dynamic" => Ok(WriteMode::DynamicPartitionOverwrite),
            "append" => Ok(WriteMode::Append),
            _ => anyhow::bail!(
                "Unsupported write mode: {}. Supported: dynamic-partition-overwrite, append",
                s
            ),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Text,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Text,
    Json,
}

impl RuntimeConfig {
    /// Load configuration from all sources with priority
    #[cfg(not(target_arch = "wasm32"))]
    pub fn load() -> Result<Self> {
        sources::load_config()
    }

    /// Load configuration from a specific file path (for CLI usage).
    /// Call [`RuntimeConfig::validate`] once CLI overrides are applied.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn load_from_path(path: impl AsRef<std::path::Path>) -> Result<Self> {
        sources::load_from_file_path(path)
    }

    /// Load configuration with graceful fallback to defaults.
    /// Does not fail if config file is missing. Not validated.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn load_or_default() -> Result<Self> {
        sources::load_or_default()
    }

    /// Parse inline TOML content and layer overrides from an `EnvSource`.
    pub fn from_toml_with_env<E: EnvSource>(content: &str, env: &E) -> Result<Self> {
        let mut config: RuntimeConfig =
            toml::from_str(content).context("Failed to parse inline config content")?;
        config.apply_env_overrides_from(env)?;
        config.validate()?;
        Ok(config)
    }

    /// Apply environment overrides from a custom source.
    pub fn apply_env_overrides_from<E: EnvSource>(&mut self, env: &E) -> Result<()> {
        env_overrides::apply_env_overrides(self, env)
    }

    /// Parameter resolver over the `[parameters]` table.
    pub fn parameters(&self) -> Parameters {
        Parameters::new(self.parameters.clone())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        validation::validate_config(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_backend_from_str() {
        assert_eq!("fs".parse::<StorageBackend>().unwrap(), StorageBackend::Fs);
        assert_eq!("s3".parse::<StorageBackend>().unwrap(), StorageBackend::S3);
        assert_eq!(
            "filesystem".parse::<StorageBackend>().unwrap(),
            StorageBackend::Fs
        );
        assert!("r2".parse::<StorageBackend>().is_err());
    }

    #[test]
    fn test_write_mode_from_str() {
        assert_eq!(
            "dynamic".parse::<WriteMode>().unwrap(),
            WriteMode::DynamicPartitionOverwrite
        );
        assert_eq!("APPEND".parse::<WriteMode>().unwrap(), WriteMode::Append);
        assert!("overwrite".parse::<WriteMode>().is_err());
    }

    #[test]
    fn test_default_configs() {
        let config = RuntimeConfig::default();
        assert_eq!(config.storage.backend, StorageBackend::Fs);
        assert_eq!(config.step.source, DEFAULT_SOURCE_TABLE);
        assert_eq!(config.step.destination, DEFAULT_DESTINATION_TABLE);
        assert_eq!(config.step.write_mode, WriteMode::DynamicPartitionOverwrite);
        assert_eq!(
            config
                .tables
                .definition(DEFAULT_DESTINATION_TABLE)
                .and_then(|d| d.partition_by.as_deref()),
            Some("COUNTYFP")
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_tables_section_keeps_builtin_partitioning() {
        let config: RuntimeConfig = toml::from_str("[tables]\nenv = \"dev\"\n").unwrap();
        assert_eq!(config.tables.env.as_deref(), Some("dev"));
        assert_eq!(
            config
                .tables
                .definition(DEFAULT_DESTINATION_TABLE)
                .and_then(|d| d.partition_by.as_deref()),
            Some("COUNTYFP")
        );

        let config: RuntimeConfig = toml::from_str(
            r#"
            [tables.definitions."bronze_covid.tbl_template_1_mask_usage"]
            partition_by = "STATEFP"
            "#,
        )
        .unwrap();
        assert_eq!(config.tables.definitions.len(), 2);
        assert_eq!(
            config
                .tables
                .definition(DEFAULT_DESTINATION_TABLE)
                .and_then(|d| d.partition_by.as_deref()),
            Some("COUNTYFP")
        );

        // An explicit entry without partition_by leaves the table unpartitioned.
        let config: RuntimeConfig = toml::from_str(
            r#"
            [tables.definitions."silver_covid.tbl_template_3_mask_usage"]
            "#,
        )
        .unwrap();
        assert_eq!(
            config.tables.definition(DEFAULT_DESTINATION_TABLE),
            Some(&TableDefinition::default())
        );
    }

    #[test]
    fn test_parse_full_toml() {
        let content = r#"
            [storage]
            backend = "s3"
            [storage.s3]
            bucket = "lake"
            region = "eu-west-1"
            prefix = "dev/"

            [tables]
            env = "dev"
            name_template = "{env}_{db}.{table}"
            [tables.definitions."silver_covid.tbl_template_3_mask_usage"]
            partition_by = "COUNTYFP"

            [step]
            write_mode = "append"
            preview_rows = 0

            [parameters.myparameter]
            myvalue = "hello"

            [logging]
            level = "debug"
            format = "json"
        "#;

        let config: RuntimeConfig = toml::from_str(content).unwrap();
        assert_eq!(config.storage.backend, StorageBackend::S3);
        assert_eq!(config.storage.parquet_row_group_size, 32 * 1024);
        assert_eq!(config.tables.env.as_deref(), Some("dev"));
        assert_eq!(config.step.write_mode, WriteMode::Append);
        assert_eq!(config.step.source, DEFAULT_SOURCE_TABLE);
        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(
            config.parameters().resolve("myparameter.myvalue").unwrap(),
            ParameterValue::String("hello".to_string())
        );
    }
}
