//! Object-storage implementation of the columnar backend

use super::buffer::{PartitionBatch, WriteBuffer};
use super::creator::TableSpec;
use super::parquet_writer::{read_batches, ParquetWriter};
use super::schema::{ColumnManifest, ColumnarSchema, PartialRow};
use super::{partition_for, ColumnarSession, ColumnarStore, ColumnarTable};
use crate::schema::FieldValue;
use crate::{Error, Result};

use arrow_array::{
    Array, ArrayRef, Float64Array, Int16Array, Int32Array, Int64Array, RecordBatch,
};
use arrow_schema::{DataType, SchemaRef};
use async_trait::async_trait;
use bytes::Bytes;
use futures::TryStreamExt;
use object_store::path::Path;
use object_store::{ObjectMeta, ObjectStore, PutPayload};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

const MANIFEST_FILE: &str = "_manifest.json";
const DATA_EXTENSION: &str = "parquet";

/// Configuration for the columnar store
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Rows per partition a session stages before sealing them into an Arrow batch
    pub session_batch_rows: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            session_batch_rows: 10_000,
        }
    }
}

/// Persisted table definition
#[derive(Debug, Clone, Serialize, Deserialize)]
struct TableManifest {
    name: String,
    columns: Vec<ColumnManifest>,
    primary_key: String,
    split_points: Vec<i64>,
    num_replicas: u32,
}

/// Columnar store persisting Parquet objects in an `ObjectStore`
pub struct ObjectColumnarStore {
    object_store: Arc<dyn ObjectStore>,
    config: StoreConfig,
    writer: ParquetWriter,
    tables: RwLock<HashMap<String, Arc<ObjectTable>>>,
}

impl ObjectColumnarStore {
    pub fn new(object_store: Arc<dyn ObjectStore>) -> Self {
        Self::with_config(object_store, StoreConfig::default())
    }

    pub fn with_config(object_store: Arc<dyn ObjectStore>, config: StoreConfig) -> Self {
        Self {
            object_store,
            config,
            writer: ParquetWriter::new(),
            tables: RwLock::new(HashMap::new()),
        }
    }

    fn manifest_path(name: &str) -> Path {
        Path::from(format!("{}/{}", name, MANIFEST_FILE))
    }

    async fn manifest_exists(&self, name: &str) -> Result<bool> {
        match self.object_store.head(&Self::manifest_path(name)).await {
            Ok(_) => Ok(true),
            Err(object_store::Error::NotFound { .. }) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    fn build_table(&self, spec: TableSpec) -> ObjectTable {
        ObjectTable {
            state: Arc::new(TableState {
                name: spec.name,
                schema: spec.schema,
                split_points: spec.split_points,
                num_replicas: spec.num_replicas,
                object_store: self.object_store.clone(),
                writer: self.writer.clone(),
                batch_rows: self.config.session_batch_rows.max(1),
                keys: Mutex::new(HashSet::new()),
                rows: AtomicU64::new(0),
                next_seq: AtomicU64::new(0),
            }),
        }
    }

    /// Rebuild a table handle from its manifest and existing data objects.
    async fn load_table(&self, name: &str) -> Result<Option<ObjectTable>> {
        let bytes = match self.object_store.get(&Self::manifest_path(name)).await {
            Ok(result) => result.bytes().await?,
            Err(object_store::Error::NotFound { .. }) => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let manifest: TableManifest = serde_json::from_slice(&bytes)?;
        let schema = ColumnarSchema::from_manifest(&manifest.columns, &manifest.primary_key)?;

        let table = self.build_table(TableSpec {
            name: manifest.name,
            schema,
            split_points: manifest.split_points,
            num_replicas: manifest.num_replicas,
        });

        let objects = table.state.data_objects().await?;
        let next_seq = objects
            .iter()
            .filter_map(|meta| meta.location.filename())
            .filter_map(|file| file.trim_end_matches(".parquet").parse::<u64>().ok())
            .max()
            .map(|seq| seq + 1)
            .unwrap_or(0);
        table.state.next_seq.store(next_seq, Ordering::Relaxed);

        let key_index = table.state.schema.key_index();
        let mut keys = HashSet::new();
        for batch in table.scan().await? {
            keys.extend(key_values(&batch, key_index)?);
        }
        table.state.rows.store(keys.len() as u64, Ordering::Relaxed);
        *table.state.keys.lock() = keys;

        info!(
            "Loaded columnar table {} ({} rows, {} data objects)",
            name,
            table.row_count(),
            objects.len()
        );
        Ok(Some(table))
    }
}

#[async_trait]
impl ColumnarStore for ObjectColumnarStore {
    async fn create_table(&self, spec: TableSpec) -> Result<Arc<dyn ColumnarTable>> {
        let mut tables = self.tables.write().await;
        if tables.contains_key(&spec.name) || self.manifest_exists(&spec.name).await? {
            return Err(Error::TableExists(spec.name));
        }

        let manifest = TableManifest {
            name: spec.name.clone(),
            columns: spec.schema.to_manifest(),
            primary_key: spec.schema.primary_key().to_string(),
            split_points: spec.split_points.clone(),
            num_replicas: spec.num_replicas,
        };
        let json = serde_json::to_vec_pretty(&manifest)?;
        self.object_store
            .put(&Self::manifest_path(&spec.name), PutPayload::from(Bytes::from(json)))
            .await?;

        info!(
            "Created columnar table {} ({} columns, {} partitions, {} replicas)",
            spec.name,
            spec.schema.num_columns(),
            spec.num_partitions(),
            spec.num_replicas
        );

        let table = Arc::new(self.build_table(spec));
        tables.insert(table.name().to_string(), table.clone());
        Ok(table)
    }

    async fn open_table(&self, name: &str) -> Result<Arc<dyn ColumnarTable>> {
        if let Some(table) = self.tables.read().await.get(name) {
            return Ok(table.clone());
        }

        let mut tables = self.tables.write().await;
        if let Some(table) = tables.get(name) {
            return Ok(table.clone());
        }
        let table = self
            .load_table(name)
            .await?
            .ok_or_else(|| Error::TableNotFound(name.to_string()))?;
        let table = Arc::new(table);
        tables.insert(name.to_string(), table.clone());
        Ok(table)
    }

    async fn table_exists(&self, name: &str) -> Result<bool> {
        if self.tables.read().await.contains_key(name) {
            return Ok(true);
        }
        self.manifest_exists(name).await
    }
}

struct TableState {
    name: String,
    schema: ColumnarSchema,
    split_points: Vec<i64>,
    num_replicas: u32,
    object_store: Arc<dyn ObjectStore>,
    writer: ParquetWriter,
    batch_rows: usize,
    /// Primary keys reserved by flushes
    keys: Mutex<HashSet<i64>>,
    rows: AtomicU64,
    next_seq: AtomicU64,
}

impl TableState {
    /// Reserve keys for a flush, all or nothing.
    fn reserve_keys(&self, keys: &[i64]) -> Result<()> {
        let mut reserved = self.keys.lock();
        for (idx, key) in keys.iter().enumerate() {
            if !reserved.insert(*key) {
                for taken in &keys[..idx] {
                    reserved.remove(taken);
                }
                return Err(Error::DuplicateKey {
                    table: self.name.clone(),
                    key: *key,
                });
            }
        }
        Ok(())
    }

    fn release_keys(&self, keys: &[i64]) {
        let mut reserved = self.keys.lock();
        for key in keys {
            reserved.remove(key);
        }
    }

    fn object_path(&self, partition: usize, seq: u64) -> Path {
        Path::from(format!(
            "{}/p{:04}/{:010}.{}",
            self.name, partition, seq, DATA_EXTENSION
        ))
    }

    async fn write_partition_batch(&self, batch: &PartitionBatch) -> Result<()> {
        let bytes = self.writer.write_batch(&batch.batch)?;
        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
        let path = self.object_path(batch.partition, seq);
        let size = bytes.len();
        self.object_store.put(&path, PutPayload::from(bytes)).await?;
        debug!(
            "Wrote {} rows ({} bytes) to {}",
            batch.batch.num_rows(),
            size,
            path
        );
        Ok(())
    }

    async fn data_objects(&self) -> Result<Vec<ObjectMeta>> {
        let prefix = Path::from(self.name.as_str());
        let mut objects: Vec<ObjectMeta> = self
            .object_store
            .list(Some(&prefix))
            .try_collect()
            .await?;
        objects.retain(|meta| meta.location.extension() == Some(DATA_EXTENSION));
        objects.sort_by(|a, b| a.location.as_ref().cmp(b.location.as_ref()));
        Ok(objects)
    }
}

/// Handle to a table in an `ObjectColumnarStore`
pub struct ObjectTable {
    state: Arc<TableState>,
}

#[async_trait]
impl ColumnarTable for ObjectTable {
    fn name(&self) -> &str {
        &self.state.name
    }

    fn schema(&self) -> &ColumnarSchema {
        &self.state.schema
    }

    fn split_points(&self) -> &[i64] {
        &self.state.split_points
    }

    fn num_replicas(&self) -> u32 {
        self.state.num_replicas
    }

    fn new_session(&self) -> Box<dyn ColumnarSession> {
        Box::new(ObjectSession {
            table: self.state.clone(),
            pending: BTreeMap::new(),
            buffer: WriteBuffer::new(),
            staged_keys: Vec::new(),
        })
    }

    fn row_count(&self) -> u64 {
        self.state.rows.load(Ordering::Relaxed)
    }

    async fn scan(&self) -> Result<Vec<RecordBatch>> {
        let mut batches = Vec::new();
        for meta in self.state.data_objects().await? {
            let bytes = self.state.object_store.get(&meta.location).await?.bytes().await?;
            batches.extend(read_batches(bytes)?);
        }
        Ok(batches)
    }
}

/// Write session over an `ObjectTable`
pub struct ObjectSession {
    table: Arc<TableState>,
    /// Staged rows per partition, not yet sealed into Arrow batches
    pending: BTreeMap<usize, Vec<Vec<Option<FieldValue>>>>,
    buffer: WriteBuffer,
    staged_keys: Vec<i64>,
}

impl ObjectSession {
    fn seal(&mut self, partition: usize) -> Result<()> {
        if let Some(rows) = self.pending.remove(&partition) {
            let batch = build_batch(&self.table.schema.arrow_schema(), &rows)?;
            self.buffer.append(partition, batch)?;
        }
        Ok(())
    }
}

#[async_trait]
impl ColumnarSession for ObjectSession {
    fn new_row(&self) -> PartialRow {
        PartialRow::new(self.table.schema.arrow_schema())
    }

    fn apply(&mut self, row: PartialRow) -> Result<()> {
        row.check_complete()?;
        let key = row
            .key(self.table.schema.key_index())
            .ok_or_else(|| Error::FieldType {
                column: self.table.schema.primary_key().to_string(),
                reason: "primary key not set".into(),
            })?;

        let partition = partition_for(&self.table.split_points, key);
        let staged = self.pending.entry(partition).or_default();
        staged.push(row.into_values());
        self.staged_keys.push(key);

        if staged.len() >= self.table.batch_rows {
            self.seal(partition)?;
        }
        Ok(())
    }

    fn pending_rows(&self) -> usize {
        self.staged_keys.len()
    }

    async fn flush(&mut self) -> Result<usize> {
        let partitions: Vec<usize> = self.pending.keys().copied().collect();
        for partition in partitions {
            self.seal(partition)?;
        }
        if self.buffer.is_empty() {
            return Ok(0);
        }

        debug!(
            "Flushing {} rows in {} batches to table {}",
            self.buffer.row_count(),
            self.buffer.batch_count(),
            self.table.name
        );
        let keys = std::mem::take(&mut self.staged_keys);
        let batches = self.buffer.take();
        self.table.reserve_keys(&keys)?;

        let key_index = self.table.schema.key_index();
        let mut written = 0usize;
        for (idx, batch) in batches.iter().enumerate() {
            if let Err(e) = self.table.write_partition_batch(batch).await {
                // Keys of batches that never reached storage become free again
                for unwritten in &batches[idx..] {
                    self.table
                        .release_keys(&key_values(&unwritten.batch, key_index)?);
                }
                warn!(
                    "Flush to table {} failed after {} of {} batches: {}",
                    self.table.name,
                    idx,
                    batches.len(),
                    e
                );
                return Err(e);
            }
            written += batch.batch.num_rows();
            self.table
                .rows
                .fetch_add(batch.batch.num_rows() as u64, Ordering::Relaxed);
        }

        debug!("Flushed {} rows to table {}", written, self.table.name);
        Ok(written)
    }
}

fn build_batch(schema: &SchemaRef, rows: &[Vec<Option<FieldValue>>]) -> Result<RecordBatch> {
    let mut columns: Vec<ArrayRef> = Vec::with_capacity(schema.fields().len());
    for (idx, field) in schema.fields().iter().enumerate() {
        let column: ArrayRef = match field.data_type() {
            DataType::Int16 => Arc::new(Int16Array::from(
                rows.iter()
                    .map(|row| match row[idx] {
                        Some(FieldValue::SmallInt(v)) => Some(v),
                        _ => None,
                    })
                    .collect::<Vec<_>>(),
            )),
            DataType::Int32 => Arc::new(Int32Array::from(
                rows.iter()
                    .map(|row| match row[idx] {
                        Some(FieldValue::Int(v)) => Some(v),
                        _ => None,
                    })
                    .collect::<Vec<_>>(),
            )),
            DataType::Int64 => Arc::new(Int64Array::from(
                rows.iter()
                    .map(|row| match row[idx] {
                        Some(FieldValue::BigInt(v)) => Some(v),
                        _ => None,
                    })
                    .collect::<Vec<_>>(),
            )),
            DataType::Float64 => Arc::new(Float64Array::from(
                rows.iter()
                    .map(|row| match row[idx] {
                        Some(FieldValue::Double(v)) => Some(v),
                        _ => None,
                    })
                    .collect::<Vec<_>>(),
            )),
            other => {
                return Err(Error::Internal(format!(
                    "column {} has unsupported type {}",
                    field.name(),
                    other
                )))
            }
        };
        columns.push(column);
    }
    Ok(RecordBatch::try_new(schema.clone(), columns)?)
}

fn key_values(batch: &RecordBatch, key_index: usize) -> Result<Vec<i64>> {
    let keys = batch
        .column(key_index)
        .as_any()
        .downcast_ref::<Int64Array>()
        .ok_or_else(|| Error::Internal("primary key column is not Int64".into()))?;
    Ok(keys.values().iter().copied().collect())
}
