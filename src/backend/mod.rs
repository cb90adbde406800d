//! Storage backends for the wide table
//!
//! - `row`: transactional row store that assigns column IDs
//! - `columnar`: range-partitioned Parquet store on object storage

pub mod columnar;
pub mod row;

pub use columnar::{
    ColumnarSchema, ColumnarSession, ColumnarStore, ColumnarTable, ObjectColumnarStore,
    PartialRow, StoreConfig, TableCreator,
};
pub use row::{ColumnId, MemoryRowStore, RowStore, RowTableDefinition, RowTransaction};
