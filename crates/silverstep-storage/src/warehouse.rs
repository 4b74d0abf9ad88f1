//! Storage operator initialization and physical table layout.
//!
//! A physical table `db.table` lives under `{prefix}{db}/{table}/`.

use crate::error::{Result, StorageError};
use opendal::Operator;
use silverstep_config::{StorageBackend, StorageConfig};

/// Marker file whose presence means the table exists.
pub const TABLE_MARKER: &str = "_table.json";

/// OpenDAL operator plus the path prefix every table is stored under
#[derive(Clone, Debug)]
pub struct Warehouse {
    operator: Operator,
    prefix: String,
}

impl Warehouse {
    /// Wrap an existing operator (used by tests with the memory service).
    ///
    /// A non-empty prefix always ends in `/`, so `lake` and `lake/` name the
    /// same directory.
    pub fn new(operator: Operator, prefix: Option<String>) -> Self {
        let prefix = match prefix {
            Some(p) if !p.is_empty() && !p.ends_with('/') => format!("{}/", p),
            Some(p) => p,
            None => String::new(),
        };
        Self { operator, prefix }
    }

    /// Build the operator for the configured backend.
    pub fn from_config(config: &StorageConfig) -> Result<Self> {
        match config.backend {
            StorageBackend::Fs => {
                let fs = config.fs.as_ref().ok_or_else(|| {
                    StorageError::invalid_config("fs config required for filesystem backend")
                })?;

                let fs_builder = opendal::services::Fs::default().root(&fs.path);
                let operator = Operator::new(fs_builder)
                    .map_err(|e| {
                        StorageError::invalid_config(format!(
                            "Failed to create filesystem operator: {}",
                            e
                        ))
                    })?
                    .finish();

                tracing::debug!("Filesystem warehouse initialized at {}", fs.path);
                Ok(Self::new(operator, None))
            }
            StorageBackend::S3 => {
                let s3 = config.s3.as_ref().ok_or_else(|| {
                    StorageError::invalid_config("s3 config required for S3 backend")
                })?;

                let mut s3_builder = opendal::services::S3::default()
                    .bucket(&s3.bucket)
                    .region(&s3.region);

                if let Some(endpoint) = &s3.endpoint {
                    s3_builder = s3_builder.endpoint(endpoint);
                }

                let operator = Operator::new(s3_builder)
                    .map_err(|e| {
                        StorageError::invalid_config(format!("Failed to create S3 operator: {}", e))
                    })?
                    .finish();

                tracing::debug!("S3 warehouse initialized: bucket={}", s3.bucket);
                Ok(Self::new(operator, s3.prefix.clone()))
            }
        }
    }

    pub fn operator(&self) -> &Operator {
        &self.operator
    }

    /// Root directory (with trailing slash) of a physical `db.table` name.
    pub fn table_root(&self, physical_name: &str) -> Result<String> {
        let (db, table) = split_table_name(physical_name)?;
        Ok(format!("{}{}/{}/", self.prefix, db, table))
    }

    /// Path of the existence marker for a physical table.
    pub fn marker_path(&self, physical_name: &str) -> Result<String> {
        Ok(format!("{}{}", self.table_root(physical_name)?, TABLE_MARKER))
    }

    pub(crate) async fn path_exists(&self, path: &str) -> opendal::Result<bool> {
        match self.operator.stat(path).await {
            Ok(_) => Ok(true),
            Err(e) if e.kind() == opendal::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Parquet files under `dir`, sorted by path.
    pub(crate) async fn list_parquet(&self, dir: &str, recursive: bool) -> opendal::Result<Vec<String>> {
        let entries = match self.operator.list_with(dir).recursive(recursive).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == opendal::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };

        let mut paths: Vec<String> = entries
            .into_iter()
            .filter(|entry| entry.metadata().mode().is_file())
            .map(|entry| entry.path().to_string())
            .filter(|path| path.ends_with(".parquet"))
            .collect();
        paths.sort();
        Ok(paths)
    }
}

/// Split `db.table` into its two parts.
pub fn split_table_name(name: &str) -> Result<(&str, &str)> {
    match name.split_once('.') {
        Some((db, table)) if !db.is_empty() && !table.is_empty() && !table.contains('.') => {
            Ok((db, table))
        }
        _ => Err(StorageError::table_operation(
            name,
            "table names must have the form 'database.table'",
        )),
    }
}
