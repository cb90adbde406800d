//! Schema translation integration tests
//!
//! Both translators must lay out the same columns in the same order; the
//! columnar one additionally narrows types and partitions the key space.

use object_store::memory::InMemory;
use std::sync::Arc;
use widebench::backend::{
    ColumnarStore, ColumnarTable, MemoryRowStore, ObjectColumnarStore, RowStore,
};
use widebench::schema::{
    wide_table_columns, AimSchema, DimensionAttribute, FieldValue, LogicalField, LogicalType,
};
use widebench::translate::{split_points, ColumnarTranslator, PartitionPlan, RowStoreTranslator};
use widebench::Error;

fn custom_schema() -> AimSchema {
    AimSchema::builder()
        .with_field(LogicalField::new("calls_sum_local_week", LogicalType::BigInt))
        .with_field(
            LogicalField::new("duration_min_local_week", LogicalType::Int)
                .initial(FieldValue::Int(i32::MAX)),
        )
        .with_field(LogicalField::new("cost_sum_all_week", LogicalType::Double))
        .build()
        .unwrap()
}

#[tokio::test]
async fn test_both_backends_share_column_order() {
    for schema in [AimSchema::telecom(), custom_schema()] {
        let expected: Vec<String> = wide_table_columns(&schema)
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(expected.len(), 2 + schema.len() + 12);

        let row_store = MemoryRowStore::new();
        RowStoreTranslator::new()
            .bootstrap(&row_store, &schema)
            .await
            .unwrap();
        let row_columns: Vec<String> = row_store
            .table_columns("wt")
            .await
            .unwrap()
            .into_iter()
            .map(|(name, _)| name)
            .collect();
        assert_eq!(row_columns, expected);

        let columnar = ObjectColumnarStore::new(Arc::new(InMemory::new()));
        let table = ColumnarTranslator::new()
            .create_table(&columnar, &schema, &PartitionPlan::new(1_000_000, 4))
            .await
            .unwrap();
        assert_eq!(table.schema().column_names(), expected);
    }
}

#[tokio::test]
async fn test_linkage_tail_is_fixed() {
    let columns = wide_table_columns(&custom_schema());
    let tail: Vec<&str> = columns[columns.len() - 12..]
        .iter()
        .map(|c| c.name.as_str())
        .collect();
    assert_eq!(
        tail,
        vec![
            "subscription_type_id",
            "subscription_cost_id",
            "subscription_free_call_mins_id",
            "subscription_data_id",
            "city_zip",
            "region_cty_id",
            "region_state_id",
            "region_country_id",
            "region_region_id",
            "category_id",
            "value_type_id",
            "value_type_threshold_id",
        ]
    );
    assert!(columns[columns.len() - 12..]
        .iter()
        .all(|c| c.ty == LogicalType::SmallInt && !c.nullable));
}

#[tokio::test]
async fn test_columnar_rejects_unsupported_metric_types() {
    for ty in [LogicalType::Text, LogicalType::SmallInt, LogicalType::Float] {
        let schema = AimSchema::builder()
            .with_field(LogicalField::new("calls_sum_local_week", LogicalType::BigInt))
            .with_field(LogicalField::new("odd_metric", ty))
            .build()
            .unwrap();

        let store = ObjectColumnarStore::new(Arc::new(InMemory::new()));
        let err = ColumnarTranslator::new()
            .create_table(&store, &schema, &PartitionPlan::new(1_000, 2))
            .await
            .err()
            .unwrap();
        assert!(err.is_precondition(), "{} accepted: {}", ty, err);
        assert!(!store.table_exists("wt").await.unwrap());

        // The row store has no such restriction
        let row_store = MemoryRowStore::new();
        RowStoreTranslator::new()
            .bootstrap(&row_store, &schema)
            .await
            .unwrap();
    }
}

#[test]
fn test_split_points_for_million_subscribers() {
    assert_eq!(
        split_points(1_000_000, 4).unwrap(),
        vec![250_000, 500_000, 750_000]
    );
    assert_eq!(split_points(1_000_000, 1).unwrap(), Vec::<i64>::new());
}

#[tokio::test]
async fn test_columnar_table_cannot_be_created_twice() {
    let store = ObjectColumnarStore::new(Arc::new(InMemory::new()));
    let translator = ColumnarTranslator::new();
    let schema = AimSchema::telecom();
    let plan = PartitionPlan::new(100, 2);

    translator.create_table(&store, &schema, &plan).await.unwrap();
    let err = translator
        .create_table(&store, &schema, &plan)
        .await
        .err()
        .unwrap();
    assert!(matches!(err, Error::TableExists(_)));
}

#[tokio::test]
async fn test_context_resolves_row_store_ids() {
    let row_store = MemoryRowStore::new();
    let schema = custom_schema();
    let context = RowStoreTranslator::new()
        .bootstrap(&row_store, &schema)
        .await
        .unwrap();

    for (name, id) in row_store.table_columns("wt").await.unwrap() {
        assert_eq!(context.column(&name), Some(id), "{}", name);
    }
    assert_ne!(
        context.dimension(DimensionAttribute::Zip),
        context.dimension(DimensionAttribute::City)
    );
}
