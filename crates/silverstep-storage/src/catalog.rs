//! Table catalog: logical-to-physical naming, existence and creation.
//!
//! A table exists when its `_table.json` marker exists. The marker records the
//! partition column so the writer can lay out files without consulting
//! configuration again.

use crate::error::{Result, StorageError};
use crate::warehouse::{split_table_name, Warehouse};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use silverstep_config::TablesConfig;

/// Contents of a table's `_table.json` marker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableMetadata {
    pub logical_name: String,
    pub physical_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub partition_by: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Table management capability consumed by the step
#[async_trait]
pub trait TableManager: Send + Sync {
    /// Physical name for a logical `db.table` name.
    fn get_name(&self, logical_name: &str) -> Result<String>;

    async fn exists(&self, logical_name: &str) -> Result<bool>;

    /// Create the table. Its schema is derived from the first write.
    async fn create(&self, logical_name: &str) -> Result<TableMetadata>;

    /// Stored metadata, or `None` if the table does not exist.
    async fn metadata(&self, logical_name: &str) -> Result<Option<TableMetadata>>;
}

/// Catalog kept next to the data in the warehouse
#[derive(Clone, Debug)]
pub struct WarehouseTableManager {
    warehouse: Warehouse,
    tables: TablesConfig,
}

impl WarehouseTableManager {
    pub fn new(warehouse: Warehouse, tables: TablesConfig) -> Self {
        Self { warehouse, tables }
    }
}

#[async_trait]
impl TableManager for WarehouseTableManager {
    fn get_name(&self, logical_name: &str) -> Result<String> {
        let (db, table) = split_table_name(logical_name)?;
        let template = &self.tables.name_template;

        let env = match (&self.tables.env, template.contains("{env}")) {
            (Some(env), _) => env.as_str(),
            (None, false) => "",
            (None, true) => {
                return Err(StorageError::table_operation(
                    logical_name,
                    "name template uses {env} but no environment is configured",
                ))
            }
        };

        let physical = template
            .replace("{env}", env)
            .replace("{db}", db)
            .replace("{table}", table);

        // The physical name must still map onto a table root.
        split_table_name(&physical)?;
        Ok(physical)
    }

    async fn exists(&self, logical_name: &str) -> Result<bool> {
        let physical = self.get_name(logical_name)?;
        let marker = self.warehouse.marker_path(&physical)?;

        self.warehouse
            .path_exists(&marker)
            .await
            .map_err(|e| StorageError::table_operation(&physical, e.to_string()))
    }

    async fn create(&self, logical_name: &str) -> Result<TableMetadata> {
        let physical = self.get_name(logical_name)?;

        if read_marker(&self.warehouse, &physical).await?.is_some() {
            return Err(StorageError::table_operation(
                &physical,
                "table already exists",
            ));
        }

        let metadata = TableMetadata {
            logical_name: logical_name.to_string(),
            physical_name: physical.clone(),
            partition_by: self
                .tables
                .definition(logical_name)
                .and_then(|d| d.partition_by.clone()),
            created_at: Utc::now(),
        };

        let body = serde_json::to_vec_pretty(&metadata)
            .map_err(|e| StorageError::table_operation(&physical, e.to_string()))?;
        let marker = self.warehouse.marker_path(&physical)?;

        self.warehouse
            .operator()
            .write(&marker, body)
            .await
            .map_err(|e| {
                StorageError::table_operation(
                    &physical,
                    format!("failed to write '{}': {}", marker, e),
                )
            })?;

        tracing::info!(
            table = %physical,
            partition_by = ?metadata.partition_by,
            "Created table"
        );

        Ok(metadata)
    }

    async fn metadata(&self, logical_name: &str) -> Result<Option<TableMetadata>> {
        let physical = self.get_name(logical_name)?;
        read_marker(&self.warehouse, &physical).await
    }
}

/// Read the marker of a physical table; `None` if the table does not exist.
pub(crate) async fn read_marker(
    warehouse: &Warehouse,
    physical_name: &str,
) -> Result<Option<TableMetadata>> {
    let marker = warehouse.marker_path(physical_name)?;

    let data = match warehouse.operator().read(&marker).await {
        Ok(data) => data,
        Err(e) if e.kind() == opendal::ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(StorageError::table_operation(
                physical_name,
                format!("failed to read '{}': {}", marker, e),
            ))
        }
    };

    serde_json::from_slice(&data.to_vec())
        .map(Some)
        .map_err(|e| {
            StorageError::table_operation(
                physical_name,
                format!("corrupt table marker '{}': {}", marker, e),
            )
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use opendal::{services, Operator};
    use silverstep_config::TableDefinition;

    fn manager(tables: TablesConfig) -> WarehouseTableManager {
        let op = Operator::new(services::Memory::default()).unwrap().finish();
        WarehouseTableManager::new(Warehouse::new(op, None), tables)
    }

    #[test]
    fn get_name_applies_template() {
        let default = manager(TablesConfig::default());
        assert_eq!(
            default.get_name("silver_covid.tbl_mask").unwrap(),
            "silver_covid.tbl_mask"
        );

        let per_env = manager(TablesConfig {
            env: Some("dev".to_string()),
            name_template: "{env}_{db}.{table}".to_string(),
            ..TablesConfig::default()
        });
        assert_eq!(
            per_env.get_name("silver_covid.tbl_mask").unwrap(),
            "dev_silver_covid.tbl_mask"
        );
        assert!(per_env.get_name("not_qualified").is_err());

        let no_env = manager(TablesConfig {
            env: None,
            name_template: "{env}_{db}.{table}".to_string(),
            ..TablesConfig::default()
        });
        assert!(no_env.get_name("silver_covid.tbl_mask").is_err());
    }

    #[tokio::test]
    async fn create_then_exists() {
        let mut tables = TablesConfig::default();
        tables.definitions.insert(
            "silver.t".to_string(),
            TableDefinition {
                partition_by: Some("COUNTYFP".to_string()),
            },
        );
        let manager = manager(tables);

        assert!(!manager.exists("silver.t").await.unwrap());
        assert!(manager.metadata("silver.t").await.unwrap().is_none());

        let created = manager.create("silver.t").await.unwrap();
        assert_eq!(created.partition_by.as_deref(), Some("COUNTYFP"));

        assert!(manager.exists("silver.t").await.unwrap());
        let stored = manager.metadata("silver.t").await.unwrap().unwrap();
        assert_eq!(stored, created);

        let err = manager.create("silver.t").await.unwrap_err();
        assert_eq!(err.code(), "E005");
    }

    #[tokio::test]
    async fn undefined_tables_are_unpartitioned() {
        let manager = manager(TablesConfig::default());
        let created = manager.create("bronze.raw").await.unwrap();
        assert_eq!(created.partition_by, None);
    }
}
