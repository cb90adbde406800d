//! Schema translation
//!
//! One shared column list (`schema::wide_table_columns`) feeds two thin
//! appliers: the row-store translator issues a single transactional
//! create-table call, the columnar translator narrows types and goes
//! through the staged table creator with range-partition splits.

pub mod columnar;
pub mod partition;
pub mod row_store;

pub use columnar::{column_data_type, metric_data_type, ColumnarTranslator, NUM_REPLICAS};
pub use partition::{split_points, PartitionPlan};
pub use row_store::RowStoreTranslator;
