//! Column-ID context
//!
//! Maps every logical field of the wide table to the physical `ColumnId`
//! the row store assigned when the table was created. The context is built
//! once during bootstrap, published with [`install`], and only read after
//! that.

use crate::backend::ColumnId;
use crate::schema::{ColumnRole, ColumnSpec, DimensionAttribute, LINKAGE_COLUMN_COUNT};
use crate::{Error, Result};
use std::collections::HashMap;
use std::sync::OnceLock;

static GLOBAL: OnceLock<ColumnContext> = OnceLock::new();

/// Logical name to physical column ID table
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnContext {
    table: String,
    subscriber_id: ColumnId,
    last_updated: ColumnId,
    /// Metric columns in physical order
    metrics: Vec<(String, ColumnId)>,
    metric_index: HashMap<String, usize>,
    dimensions: [ColumnId; LINKAGE_COLUMN_COUNT],
}

impl ColumnContext {
    /// Build the context from the column list and the IDs the backend
    /// returned for it, in the same order.
    pub fn from_columns(table: &str, columns: &[ColumnSpec], ids: &[ColumnId]) -> Result<Self> {
        if columns.len() != ids.len() {
            return Err(Error::Internal(format!(
                "table {} has {} columns but the backend returned {} IDs",
                table,
                columns.len(),
                ids.len()
            )));
        }

        let mut subscriber_id = None;
        let mut last_updated = None;
        let mut metrics = Vec::new();
        let mut dimensions: [Option<ColumnId>; LINKAGE_COLUMN_COUNT] = [None; LINKAGE_COLUMN_COUNT];

        for (column, id) in columns.iter().zip(ids.iter().copied()) {
            match column.role {
                ColumnRole::Key => subscriber_id = Some(id),
                ColumnRole::Timestamp => last_updated = Some(id),
                ColumnRole::Metric => metrics.push((column.name.clone(), id)),
                ColumnRole::Linkage(attr) => {
                    let idx = attr.linkage_index().ok_or_else(|| {
                        Error::Internal(format!("{} is not a linkage attribute", attr))
                    })?;
                    dimensions[idx] = Some(id);
                }
            }
        }

        let missing = |what: &str| Error::Internal(format!("table {} has no {} column", table, what));
        let subscriber_id = subscriber_id.ok_or_else(|| missing("key"))?;
        let last_updated = last_updated.ok_or_else(|| missing("timestamp"))?;
        let mut resolved = [ColumnId(0); LINKAGE_COLUMN_COUNT];
        for (slot, (id, attr)) in resolved
            .iter_mut()
            .zip(dimensions.iter().zip(DimensionAttribute::LINKAGE))
        {
            *slot = id.ok_or_else(|| missing(attr.column_name()))?;
        }

        let metric_index = metrics
            .iter()
            .enumerate()
            .map(|(idx, (name, _))| (name.clone(), idx))
            .collect();

        Ok(Self {
            table: table.to_string(),
            subscriber_id,
            last_updated,
            metrics,
            metric_index,
            dimensions: resolved,
        })
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn metric(&self, name: &str) -> Option<ColumnId> {
        self.metric_index.get(name).map(|idx| self.metrics[*idx].1)
    }

    pub fn metrics(&self) -> impl Iterator<Item = (&str, ColumnId)> {
        self.metrics.iter().map(|(name, id)| (name.as_str(), *id))
    }

    pub fn dimension(&self, attr: DimensionAttribute) -> ColumnId {
        match attr.linkage_index() {
            Some(idx) => self.dimensions[idx],
            None => self.subscriber_id,
        }
    }

    pub fn subscriber_id(&self) -> ColumnId {
        self.subscriber_id
    }

    pub fn last_updated(&self) -> ColumnId {
        self.last_updated
    }

    /// Any column by physical name.
    pub fn column(&self, name: &str) -> Option<ColumnId> {
        if let Some(id) = self.metric(name) {
            return Some(id);
        }
        if name == crate::schema::LAST_UPDATED_FIELD {
            return Some(self.last_updated);
        }
        DimensionAttribute::from_column_name(name).map(|attr| self.dimension(attr))
    }

    /// Number of mapped columns.
    pub fn len(&self) -> usize {
        2 + self.metrics.len() + self.dimensions.len()
    }

    pub fn is_empty(&self) -> bool {
        false
    }
}

/// Publish the process-wide context. Only the first call succeeds.
pub fn install(context: ColumnContext) -> Result<&'static ColumnContext> {
    let table = context.table.clone();
    GLOBAL.set(context).map_err(|_| {
        Error::Precondition(format!(
            "column context already installed (attempted for table {})",
            table
        ))
    })?;
    tracing::info!("Installed column context for table {}", table);
    GLOBAL
        .get()
        .ok_or_else(|| Error::Internal("column context vanished after install".into()))
}

/// The installed context, if bootstrap has run.
pub fn global() -> Option<&'static ColumnContext> {
    GLOBAL.get()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{wide_table_columns, AimSchema, LogicalField, LogicalType};

    fn context() -> ColumnContext {
        let schema = AimSchema::builder()
            .with_field(LogicalField::new("calls_sum_local_week", LogicalType::BigInt))
            .with_field(LogicalField::new("cost_sum_all_week", LogicalType::Double))
            .build()
            .unwrap();
        let columns = wide_table_columns(&schema);
        let ids: Vec<ColumnId> = (100..100 + columns.len() as u32).map(ColumnId).collect();
        ColumnContext::from_columns("wt", &columns, &ids).unwrap()
    }

    #[test]
    fn test_lookup() {
        let ctx = context();
        assert_eq!(ctx.len(), 16);
        assert_eq!(ctx.subscriber_id(), ColumnId(100));
        assert_eq!(ctx.last_updated(), ColumnId(101));
        assert_eq!(ctx.metric("calls_sum_local_week"), Some(ColumnId(102)));
        assert_eq!(ctx.metric("cost_sum_all_week"), Some(ColumnId(103)));
        assert_eq!(ctx.metric("subscriber_id"), None);
        assert_eq!(ctx.dimension(DimensionAttribute::SubscriptionType), ColumnId(104));
        assert_eq!(ctx.dimension(DimensionAttribute::ValueThreshold), ColumnId(115));
        assert_eq!(ctx.dimension(DimensionAttribute::SubscriberId), ColumnId(100));
        assert_eq!(ctx.column("city_zip"), Some(ColumnId(108)));
        assert_eq!(ctx.column("nope"), None);
    }

    #[test]
    fn test_id_count_mismatch() {
        let schema = AimSchema::builder().build().unwrap();
        let columns = wide_table_columns(&schema);
        let err = ColumnContext::from_columns("wt", &columns, &[ColumnId(1)]).unwrap_err();
        assert!(matches!(err, Error::Internal(_)));
    }

    #[test]
    fn test_install_once() {
        let installed = install(context()).unwrap();
        assert_eq!(installed.table(), "wt");
        assert!(std::ptr::eq(global().unwrap(), installed));

        let err = install(context()).unwrap_err();
        assert!(err.is_precondition());
    }
}
