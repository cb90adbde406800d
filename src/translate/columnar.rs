//! AIM schema to columnar table
//!
//! The columnar backend stores only fixed-width numeric columns, so metric
//! types are narrowed first: BIGINT, INT and DOUBLE map to Int64, Int32 and
//! Float64. A metric of any other type fails translation before the backend
//! is touched.

use super::partition::PartitionPlan;
use crate::backend::columnar::{ColumnarSchema, ColumnarStore, ColumnarTable, TableCreator};
use crate::schema::{
    row_width_bytes, wide_table_columns, AimSchema, ColumnRole, ColumnSpec, LogicalType,
    ValueType, SUBSCRIBER_ID_FIELD, WIDE_TABLE_NAME,
};
use crate::{Error, Result};
use arrow_schema::DataType;
use std::sync::Arc;
use tracing::info;

/// Replication factor of the wide table.
pub const NUM_REPLICAS: u32 = 1;

/// Arrow type of a metric column.
pub fn metric_data_type(name: &str, ty: LogicalType) -> Result<DataType> {
    let value_type = ty.value_type().map_err(|_| {
        Error::Precondition(format!(
            "metric '{}' is {}; the columnar backend stores only BIGINT, INT or DOUBLE metrics",
            name, ty
        ))
    })?;
    match value_type {
        ValueType::ULong => Ok(DataType::Int64),
        ValueType::Int => Ok(DataType::Int32),
        ValueType::Double => Ok(DataType::Float64),
        ValueType::UInt => Err(Error::Precondition(format!(
            "metric '{}' has unsigned 32-bit storage, which the columnar backend lacks",
            name
        ))),
    }
}

/// Arrow type of any wide-table column.
pub fn column_data_type(column: &ColumnSpec) -> Result<DataType> {
    match column.role {
        ColumnRole::Metric => metric_data_type(&column.name, column.ty),
        ColumnRole::Key | ColumnRole::Timestamp | ColumnRole::Linkage(_) => match column.ty {
            LogicalType::SmallInt => Ok(DataType::Int16),
            LogicalType::BigInt => Ok(DataType::Int64),
            other => Err(Error::Internal(format!(
                "fixed column '{}' has unexpected type {}",
                column.name, other
            ))),
        },
    }
}

/// Creates the wide table in a columnar store.
#[derive(Debug, Clone)]
pub struct ColumnarTranslator {
    table: String,
}

impl ColumnarTranslator {
    pub fn new() -> Self {
        Self {
            table: WIDE_TABLE_NAME.to_string(),
        }
    }

    pub fn with_table_name(mut self, name: impl Into<String>) -> Self {
        self.table = name.into();
        self
    }

    pub fn table_name(&self) -> &str {
        &self.table
    }

    /// Narrowed columnar schema with `subscriber_id` as primary key.
    pub fn columnar_schema(&self, schema: &AimSchema) -> Result<ColumnarSchema> {
        let mut builder = ColumnarSchema::builder();
        for column in wide_table_columns(schema) {
            let data_type = column_data_type(&column)?;
            builder = builder.add_column(&column.name, data_type, column.nullable);
        }
        builder.set_primary_key(SUBSCRIBER_ID_FIELD).build()
    }

    /// Schema, creator, splits, replication, create. Any failure leaves no
    /// table behind.
    pub async fn create_table(
        &self,
        store: &dyn ColumnarStore,
        schema: &AimSchema,
        plan: &PartitionPlan,
    ) -> Result<Arc<dyn ColumnarTable>> {
        let columnar = self.columnar_schema(schema)?;
        let splits = plan.split_points()?;

        let row_bytes = row_width_bytes(schema)?;

        let mut creator = TableCreator::new(self.table.as_str())
            .schema(columnar)
            .set_range_partition_columns(vec![SUBSCRIBER_ID_FIELD.to_string()]);
        for split in &splits {
            creator = creator.add_range_partition_split(*split);
        }
        let table = creator.num_replicas(NUM_REPLICAS).create(store).await?;

        info!(
            "Columnar table {} ready: {} columns, {} bytes/row, splits {:?}",
            self.table,
            table.schema().num_columns(),
            row_bytes,
            splits
        );
        Ok(table)
    }
}

impl Default for ColumnarTranslator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::ObjectColumnarStore;
    use crate::schema::LogicalField;
    use object_store::memory::InMemory;

    fn store() -> ObjectColumnarStore {
        ObjectColumnarStore::new(Arc::new(InMemory::new()))
    }

    #[test]
    fn test_narrowing() {
        assert_eq!(metric_data_type("a", LogicalType::BigInt).unwrap(), DataType::Int64);
        assert_eq!(metric_data_type("a", LogicalType::Int).unwrap(), DataType::Int32);
        assert_eq!(metric_data_type("a", LogicalType::Double).unwrap(), DataType::Float64);
        for ty in [LogicalType::SmallInt, LogicalType::Float, LogicalType::Text] {
            assert!(metric_data_type("a", ty).unwrap_err().is_precondition());
        }
    }

    #[test]
    fn test_schema_layout() {
        let schema = AimSchema::telecom();
        let columnar = ColumnarTranslator::new().columnar_schema(&schema).unwrap();
        assert_eq!(columnar.num_columns(), 2 + schema.len() + 12);
        assert_eq!(columnar.primary_key(), "subscriber_id");
        assert_eq!(columnar.key_index(), 0);

        let arrow = columnar.arrow_schema();
        assert_eq!(arrow.field(1).name(), "last_updated");
        assert_eq!(arrow.field(1).data_type(), &DataType::Int64);
        let zip = arrow.field_with_name("city_zip").unwrap();
        assert_eq!(zip.data_type(), &DataType::Int16);
        let min = arrow.field_with_name("duration_min_local_day").unwrap();
        assert_eq!(min.data_type(), &DataType::Int32);
    }

    #[tokio::test]
    async fn test_create_with_splits() {
        let store = store();
        let table = ColumnarTranslator::new()
            .create_table(&store, &AimSchema::telecom(), &PartitionPlan::new(1_000_000, 4))
            .await
            .unwrap();
        assert_eq!(table.name(), "wt");
        assert_eq!(table.split_points(), &[250_000, 500_000, 750_000]);
        assert_eq!(table.num_replicas(), 1);
    }

    #[tokio::test]
    async fn test_unsupported_metric_leaves_no_table() {
        for ty in [LogicalType::Text, LogicalType::SmallInt, LogicalType::Float] {
            let store = store();
            let schema = AimSchema::builder()
                .with_field(LogicalField::new("calls_sum_local_week", LogicalType::BigInt))
                .with_field(LogicalField::new("label", ty))
                .build()
                .unwrap();
            let err = ColumnarTranslator::new()
                .create_table(&store, &schema, &PartitionPlan::new(100, 2))
                .await
                .err()
                .unwrap();
            assert!(err.is_precondition(), "{}: {}", ty, err);
            assert!(!store.table_exists("wt").await.unwrap());
        }
    }

    #[tokio::test]
    async fn test_bad_plan_leaves_no_table() {
        let store = store();
        let err = ColumnarTranslator::new()
            .create_table(&store, &AimSchema::telecom(), &PartitionPlan::new(2, 4))
            .await
            .err()
            .unwrap();
        assert!(err.is_precondition());
        assert!(!store.table_exists("wt").await.unwrap());
    }
}
