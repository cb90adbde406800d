//! AIM schema to row-store DDL

use crate::backend::{RowStore, RowTableDefinition, RowTransaction};
use crate::context::ColumnContext;
use crate::schema::{wide_table_columns, AimSchema, SUBSCRIBER_ID_FIELD, WIDE_TABLE_NAME};
use crate::Result;
use tracing::{info, warn};

/// Creates the wide table in a row store and captures its column IDs.
#[derive(Debug, Clone)]
pub struct RowStoreTranslator {
    table: String,
}

impl RowStoreTranslator {
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

    /// Physical table definition for `schema`.
    pub fn table_definition(&self, schema: &AimSchema) -> RowTableDefinition {
        RowTableDefinition {
            name: self.table.clone(),
            columns: wide_table_columns(schema),
            primary_key: vec![SUBSCRIBER_ID_FIELD.to_string()],
        }
    }

    /// Issue the table creation inside `txn` and build the column context
    /// from the assigned IDs. The caller owns commit or rollback.
    pub async fn create_table(
        &self,
        txn: &mut dyn RowTransaction,
        schema: &AimSchema,
    ) -> Result<ColumnContext> {
        let definition = self.table_definition(schema);
        let ids = txn.create_table(&definition).await?;
        ColumnContext::from_columns(&definition.name, &definition.columns, &ids)
    }

    /// Create the table in its own transaction. Nothing is committed on
    /// failure.
    pub async fn bootstrap(&self, store: &dyn RowStore, schema: &AimSchema) -> Result<ColumnContext> {
        let mut txn = store.begin().await?;
        match self.create_table(txn.as_mut(), schema).await {
            Ok(context) => {
                txn.commit().await?;
                info!(
                    "Row-store table {} ready with {} columns",
                    self.table,
                    context.len()
                );
                Ok(context)
            }
            Err(e) => {
                warn!("Row-store table {} creation failed: {}", self.table, e);
                txn.rollback().await;
                Err(e)
            }
        }
    }
}

impl Default for RowStoreTranslator {
    fn default() -> Self {
        Self::new()
    }
}
