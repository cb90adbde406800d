//! Physical column list of the wide table
//!
//! Both backends share this ordering: the two key columns, one column per
//! metric, then the twelve dimension-linkage columns.

use super::dimension::{DimensionAttribute, LAST_UPDATED_FIELD, SUBSCRIBER_ID_FIELD};
use super::logical::{AimSchema, LogicalType};
use super::types::TypeDescriptor;
use crate::Result;
use serde::{Deserialize, Serialize};

/// Name of the wide table in every backend.
pub const WIDE_TABLE_NAME: &str = "wt";

/// Number of leading key columns (`subscriber_id`, `last_updated`).
pub const KEY_COLUMN_COUNT: usize = 2;

/// Number of trailing dimension-linkage columns.
pub const LINKAGE_COLUMN_COUNT: usize = DimensionAttribute::LINKAGE.len();

/// Role a column plays in the wide table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnRole {
    Key,
    Timestamp,
    Metric,
    Linkage(DimensionAttribute),
}

/// One physical column, backend independent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnSpec {
    pub name: String,
    pub ty: LogicalType,
    pub nullable: bool,
    pub role: ColumnRole,
}

impl ColumnSpec {
    pub fn is_primary_key(&self) -> bool {
        self.role == ColumnRole::Key
    }
}

/// Returns true if `name` collides with a fixed wide-table column.
pub fn is_reserved_column(name: &str) -> bool {
    name == SUBSCRIBER_ID_FIELD
        || name == LAST_UPDATED_FIELD
        || DimensionAttribute::from_column_name(name).is_some()
}

/// Ordered physical columns for an AIM schema.
pub fn wide_table_columns(schema: &AimSchema) -> Vec<ColumnSpec> {
    let mut columns = Vec::with_capacity(KEY_COLUMN_COUNT + schema.len() + LINKAGE_COLUMN_COUNT);

    columns.push(ColumnSpec {
        name: SUBSCRIBER_ID_FIELD.to_string(),
        ty: LogicalType::BigInt,
        nullable: false,
        role: ColumnRole::Key,
    });
    columns.push(ColumnSpec {
        name: LAST_UPDATED_FIELD.to_string(),
        ty: LogicalType::BigInt,
        nullable: false,
        role: ColumnRole::Timestamp,
    });

    for field in schema.fields() {
        columns.push(ColumnSpec {
            name: field.name.clone(),
            ty: field.ty,
            nullable: field.nullable,
            role: ColumnRole::Metric,
        });
    }

    for attr in DimensionAttribute::LINKAGE {
        columns.push(ColumnSpec {
            name: attr.column_name().to_string(),
            ty: LogicalType::SmallInt,
            nullable: false,
            role: ColumnRole::Linkage(attr),
        });
    }

    columns
}

/// Bytes per row as stored by the columnar backend.
///
/// Fails if a metric has no storage domain (see `LogicalType::value_type`).
pub fn row_width_bytes(schema: &AimSchema) -> Result<usize> {
    let mut width = DimensionAttribute::SubscriberId.width() + 8;
    for field in schema.fields() {
        width += TypeDescriptor::describe(field.ty.value_type()?).size_in_bytes;
    }
    width += DimensionAttribute::LINKAGE
        .iter()
        .map(|a| a.width())
        .sum::<usize>();
    Ok(width)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::LogicalField;

    #[test]
    fn test_column_count() {
        let schema = AimSchema::telecom();
        let columns = wide_table_columns(&schema);
        assert_eq!(columns.len(), 2 + schema.len() + 12);

        let empty = AimSchema::builder().build().unwrap();
        assert_eq!(wide_table_columns(&empty).len(), 14);
    }

    #[test]
    fn test_column_order() {
        let schema = AimSchema::builder()
            .with_field(LogicalField::new("calls_sum_local_week", LogicalType::BigInt))
            .with_field(LogicalField::new("cost_sum_all_week", LogicalType::Double))
            .build()
            .unwrap();
        let columns = wide_table_columns(&schema);

        assert_eq!(columns[0].name, "subscriber_id");
        assert!(columns[0].is_primary_key());
        assert_eq!(columns[1].name, "last_updated");
        assert_eq!(columns[2].name, "calls_sum_local_week");
        assert_eq!(columns[3].name, "cost_sum_all_week");
        assert_eq!(columns[4].name, "subscription_type_id");
        assert_eq!(columns.last().unwrap().name, "value_type_threshold_id");
        assert!(columns[4..].iter().all(|c| c.ty == LogicalType::SmallInt && !c.nullable));
        assert_eq!(columns.iter().filter(|c| c.is_primary_key()).count(), 1);
    }

    #[test]
    fn test_row_width() {
        let schema = AimSchema::builder()
            .with_field(LogicalField::new("a", LogicalType::BigInt))
            .with_field(LogicalField::new("b", LogicalType::Int))
            .build()
            .unwrap();
        assert_eq!(row_width_bytes(&schema).unwrap(), 8 + 8 + 8 + 4 + 24);

        let bad = AimSchema::builder()
            .with_field(LogicalField::new("t", LogicalType::Text))
            .build()
            .unwrap();
        assert!(row_width_bytes(&bad).is_err());
    }

    #[test]
    fn test_reserved_columns() {
        assert!(is_reserved_column("subscriber_id"));
        assert!(is_reserved_column("city_zip"));
        assert!(!is_reserved_column("calls_sum_local_week"));
    }
}
