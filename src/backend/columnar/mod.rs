//! Partitioned columnar backend
//!
//! Tables are range-partitioned on their Int64 primary key. Writers stage
//! rows in a session and make them durable with an explicit `flush()`;
//! each flush writes one Parquet object per touched partition.
//!
//! ```text
//! <table>/_manifest.json
//! <table>/p0000/0000000000.parquet
//! <table>/p0001/0000000001.parquet
//! ```

mod buffer;
mod creator;
mod parquet_writer;
mod schema;
mod store;

pub use buffer::{PartitionBatch, WriteBuffer};
pub use creator::{TableCreator, TableSpec};
pub use parquet_writer::{read_batches, ParquetWriter};
pub use schema::{is_supported_type, ColumnarSchema, ColumnarSchemaBuilder, PartialRow};
pub use store::{ObjectColumnarStore, ObjectSession, ObjectTable, StoreConfig};

use crate::Result;
use arrow_array::RecordBatch;
use async_trait::async_trait;
use std::sync::Arc;

/// Columnar backend interface
#[async_trait]
pub trait ColumnarStore: Send + Sync {
    /// Create a table. Fails with `Error::TableExists` if the name is taken.
    async fn create_table(&self, spec: TableSpec) -> Result<Arc<dyn ColumnarTable>>;

    async fn open_table(&self, name: &str) -> Result<Arc<dyn ColumnarTable>>;

    async fn table_exists(&self, name: &str) -> Result<bool>;
}

/// Handle to an existing columnar table
#[async_trait]
pub trait ColumnarTable: Send + Sync {
    fn name(&self) -> &str;

    fn schema(&self) -> &ColumnarSchema;

    fn split_points(&self) -> &[i64];

    fn num_replicas(&self) -> u32;

    /// Open an independent write session.
    fn new_session(&self) -> Box<dyn ColumnarSession>;

    /// Rows made durable by successful flushes.
    fn row_count(&self) -> u64;

    /// Read every flushed row back.
    async fn scan(&self) -> Result<Vec<RecordBatch>>;
}

/// Batched write session
#[async_trait]
pub trait ColumnarSession: Send {
    /// Empty row bound to the table schema.
    fn new_row(&self) -> PartialRow;

    /// Stage a complete row. Nothing is durable until `flush` returns Ok.
    fn apply(&mut self, row: PartialRow) -> Result<()>;

    /// Rows staged since the last flush.
    fn pending_rows(&self) -> usize;

    /// Persist all staged rows; returns how many were written.
    async fn flush(&mut self) -> Result<usize>;
}

/// Index of the range partition holding `key`.
pub fn partition_for(split_points: &[i64], key: i64) -> usize {
    split_points.partition_point(|split| *split <= key)
}
