//! Transactional row-store backend
//!
//! The row store assigns every created column an opaque `ColumnId`. Those
//! IDs are what the aggregation engine addresses columns by, so the
//! translator hands them to the column-ID context right after creation.

use crate::schema::ColumnSpec;
use crate::{Error, Result};
use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

/// Opaque physical column identifier assigned by the row store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ColumnId(pub u32);

impl fmt::Display for ColumnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Table definition handed to the row store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowTableDefinition {
    pub name: String,
    pub columns: Vec<ColumnSpec>,
    pub primary_key: Vec<String>,
}

impl RowTableDefinition {
    /// Check names are unique and the key columns exist and are non-null.
    pub fn validate(&self) -> Result<()> {
        let mut names = HashSet::new();
        for column in &self.columns {
            if !names.insert(column.name.as_str()) {
                return Err(Error::InvalidSchema(format!(
                    "duplicate column '{}' in table {}",
                    column.name, self.name
                )));
            }
        }
        if self.primary_key.is_empty() {
            return Err(Error::InvalidSchema(format!(
                "table {} has no primary key",
                self.name
            )));
        }
        for key in &self.primary_key {
            match self.columns.iter().find(|c| &c.name == key) {
                Some(column) if !column.nullable => {}
                Some(_) => {
                    return Err(Error::InvalidSchema(format!(
                        "primary key column '{}' must be NOT NULL",
                        key
                    )))
                }
                None => {
                    return Err(Error::InvalidSchema(format!(
                        "primary key column '{}' not found in table {}",
                        key, self.name
                    )))
                }
            }
        }
        Ok(())
    }

    /// Render as SQL DDL.
    pub fn to_ddl(&self) -> String {
        let mut parts: Vec<String> = self
            .columns
            .iter()
            .map(|c| {
                format!(
                    "{} {}{}",
                    c.name,
                    c.ty.sql_name(),
                    if c.nullable { "" } else { " NOT NULL" }
                )
            })
            .collect();
        parts.push(format!("PRIMARY KEY ({})", self.primary_key.join(", ")));
        format!("CREATE TABLE {} ({})", self.name, parts.join(", "))
    }
}

/// Row-store backend interface
#[async_trait]
pub trait RowStore: Send + Sync {
    /// Start a transaction.
    async fn begin(&self) -> Result<Box<dyn RowTransaction>>;

    /// Column IDs of a committed table, in column order.
    async fn table_columns(&self, name: &str) -> Result<Vec<(String, ColumnId)>>;
}

/// A row-store transaction. DDL becomes visible on commit.
#[async_trait]
pub trait RowTransaction: Send {
    /// Create a table; returns one ID per column in definition order.
    ///
    /// Fails with `Error::TableExists` if the name is already taken.
    async fn create_table(&mut self, definition: &RowTableDefinition) -> Result<Vec<ColumnId>>;

    async fn commit(self: Box<Self>) -> Result<()>;

    async fn rollback(self: Box<Self>);
}

#[derive(Debug)]
struct RowTable {
    definition: RowTableDefinition,
    column_ids: Vec<ColumnId>,
}

#[derive(Debug, Default)]
struct RowCatalog {
    tables: RwLock<HashMap<String, RowTable>>,
    next_column_id: AtomicU32,
}

/// In-memory transactional row store
#[derive(Debug, Clone, Default)]
pub struct MemoryRowStore {
    catalog: Arc<RowCatalog>,
}

impl MemoryRowStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn table_names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.catalog.tables.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Definition of a committed table.
    pub fn definition(&self, name: &str) -> Option<RowTableDefinition> {
        self.catalog
            .tables
            .read()
            .get(name)
            .map(|t| t.definition.clone())
    }
}

#[async_trait]
impl RowStore for MemoryRowStore {
    async fn begin(&self) -> Result<Box<dyn RowTransaction>> {
        Ok(Box::new(MemoryTransaction {
            catalog: self.catalog.clone(),
            pending: Vec::new(),
        }))
    }

    async fn table_columns(&self, name: &str) -> Result<Vec<(String, ColumnId)>> {
        let tables = self.catalog.tables.read();
        let table = tables
            .get(name)
            .ok_or_else(|| Error::TableNotFound(name.to_string()))?;
        Ok(table
            .definition
            .columns
            .iter()
            .map(|c| c.name.clone())
            .zip(table.column_ids.iter().copied())
            .collect())
    }
}

/// Transaction over a `MemoryRowStore`
pub struct MemoryTransaction {
    catalog: Arc<RowCatalog>,
    pending: Vec<RowTable>,
}

#[async_trait]
impl RowTransaction for MemoryTransaction {
    async fn create_table(&mut self, definition: &RowTableDefinition) -> Result<Vec<ColumnId>> {
        definition.validate()?;

        let taken = self.catalog.tables.read().contains_key(&definition.name)
            || self
                .pending
                .iter()
                .any(|t| t.definition.name == definition.name);
        if taken {
            return Err(Error::TableExists(definition.name.clone()));
        }

        let width = definition.columns.len() as u32;
        let first = self.catalog.next_column_id.fetch_add(width, Ordering::Relaxed);
        let column_ids: Vec<ColumnId> = (first..first + width).map(ColumnId).collect();

        debug!("Staged DDL: {}", definition.to_ddl());

        self.pending.push(RowTable {
            definition: definition.clone(),
            column_ids: column_ids.clone(),
        });
        Ok(column_ids)
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        let MemoryTransaction { catalog, pending } = *self;
        let mut tables = catalog.tables.write();

        // All-or-nothing: a concurrent commit may have taken a name
        if let Some(conflict) = pending
            .iter()
            .find(|t| tables.contains_key(&t.definition.name))
        {
            return Err(Error::TableExists(conflict.definition.name.clone()));
        }

        for table in pending {
            info!(
                "Created row-store table {} with {} columns",
                table.definition.name,
                table.column_ids.len()
            );
            tables.insert(table.definition.name.clone(), table);
        }
        Ok(())
    }

    async fn rollback(self: Box<Self>) {
        debug!("Rolled back {} staged tables", self.pending.len());
    }
}
