//! Table creation for the columnar backend
//!
//! Creation is staged: build a `ColumnarSchema`, hand it to a
//! `TableCreator`, declare range-partition splits and replication, then
//! `create()`. Validation happens before the backend is contacted, and the
//! backend registers the table only once every step succeeded.

use super::schema::ColumnarSchema;
use super::{ColumnarStore, ColumnarTable};
use crate::{Error, Result};
use std::sync::Arc;

/// Validated request to create a columnar table.
#[derive(Debug, Clone, PartialEq)]
pub struct TableSpec {
    pub name: String,
    pub schema: ColumnarSchema,
    /// Ascending range-partition boundaries on the primary key
    pub split_points: Vec<i64>,
    pub num_replicas: u32,
}

impl TableSpec {
    pub fn num_partitions(&self) -> usize {
        self.split_points.len() + 1
    }
}

/// Staged builder for a columnar table
#[derive(Debug)]
pub struct TableCreator {
    name: String,
    schema: Option<ColumnarSchema>,
    range_partition_columns: Vec<String>,
    split_points: Vec<i64>,
    num_replicas: u32,
}

impl TableCreator {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            schema: None,
            range_partition_columns: Vec::new(),
            split_points: Vec::new(),
            num_replicas: 1,
        }
    }

    pub fn schema(mut self, schema: ColumnarSchema) -> Self {
        self.schema = Some(schema);
        self
    }

    /// Columns the range partitioning applies to. Only the primary key is
    /// supported; leaving this empty defaults to it.
    pub fn set_range_partition_columns(mut self, columns: Vec<String>) -> Self {
        self.range_partition_columns = columns;
        self
    }

    pub fn add_range_partition_split(mut self, key: i64) -> Self {
        self.split_points.push(key);
        self
    }

    pub fn num_replicas(mut self, replicas: u32) -> Self {
        self.num_replicas = replicas;
        self
    }

    /// Validate the staged request.
    pub fn into_spec(self) -> Result<TableSpec> {
        if self.name.is_empty() {
            return Err(Error::InvalidSchema("table name must not be empty".into()));
        }
        let schema = self.schema.ok_or_else(|| {
            Error::InvalidSchema(format!("table {} was created without a schema", self.name))
        })?;

        if !self.range_partition_columns.is_empty()
            && self.range_partition_columns != [schema.primary_key()]
        {
            return Err(Error::InvalidSchema(format!(
                "range partitioning must use the primary key '{}', got {:?}",
                schema.primary_key(),
                self.range_partition_columns
            )));
        }

        if self.split_points.windows(2).any(|w| w[0] >= w[1]) {
            return Err(Error::InvalidSchema(format!(
                "split points for table {} must be strictly ascending",
                self.name
            )));
        }

        if self.num_replicas == 0 {
            return Err(Error::InvalidSchema("num_replicas must be >= 1".into()));
        }

        Ok(TableSpec {
            name: self.name,
            schema,
            split_points: self.split_points,
            num_replicas: self.num_replicas,
        })
    }

    /// Validate and create the table in `store`.
    pub async fn create(self, store: &dyn ColumnarStore) -> Result<Arc<dyn ColumnarTable>> {
        let spec = self.into_spec()?;
        store.create_table(spec).await
    }
}
