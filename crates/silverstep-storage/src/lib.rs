//! Table storage for silverstep
//!
//! This crate provides the table catalog, the Parquet reader and the
//! partition-aware writer the bronze-to-silver step runs against. Tables live
//! on an OpenDAL operator, one directory per physical `db.table` name.

mod catalog;
mod encoding;
mod error;
mod partition;
mod projection;
mod reader;
mod warehouse;
mod writer;

pub use catalog::{TableManager, TableMetadata, WarehouseTableManager};
pub use encoding::{decode_parquet, encode_parquet, set_parquet_row_group_size};
pub use error::{ErrorCode, Result, StorageError};
pub use partition::{escape_partition_value, split_by_partition, PartitionSlice, DEFAULT_PARTITION_VALUE};
pub use projection::project;
pub use reader::TableReader;
pub use warehouse::{split_table_name, Warehouse, TABLE_MARKER};
pub use writer::{TableWriter, WriteSummary};

// Re-export commonly used types for convenience
pub use opendal;
pub use silverstep_config::WriteMode;
