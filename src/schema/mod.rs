//! Schema definitions for the wide subscriber table
//!
//! The logical model (`AimSchema`) lists aggregate metric fields. The fixed
//! dimension catalog (`DimensionAttribute`) and the shared column builder
//! (`wide_table_columns`) turn it into the physical layout both backends use.

mod columns;
mod dimension;
mod logical;
mod types;

pub use columns::{
    is_reserved_column,
    row_width_bytes,
    wide_table_columns,
    ColumnRole,
    ColumnSpec,
    KEY_COLUMN_COUNT,
    LINKAGE_COLUMN_COUNT,
    WIDE_TABLE_NAME,
};
pub use dimension::{DimensionAttribute, LAST_UPDATED_FIELD, SUBSCRIBER_ID_FIELD};
pub use logical::{AimSchema, AimSchemaBuilder, FieldValue, LogicalField, LogicalType};
pub use types::{TypeDescriptor, ValueType};
