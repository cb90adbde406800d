//! Sharded population tests
//!
//! Workers own disjoint ranges, so their union must be the full range with
//! no duplicates. One failing worker must fail the whole run.

use arrow_array::Int64Array;
use async_trait::async_trait;
use object_store::memory::InMemory;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use widebench::backend::columnar::ColumnarSchema;
use widebench::backend::{ColumnarSession, ColumnarTable, ObjectColumnarStore, PartialRow};
use widebench::clock::FixedClock;
use widebench::populate::{populate_sharded, shard_ranges, Populator};
use widebench::reference::ReferenceData;
use widebench::schema::{AimSchema, FieldValue, SUBSCRIBER_ID_FIELD};
use widebench::translate::{ColumnarTranslator, PartitionPlan};
use widebench::{Error, Result};

async fn setup(subscribers: u64) -> (Arc<dyn ColumnarTable>, Populator, Arc<AimSchema>) {
    let store = ObjectColumnarStore::new(Arc::new(InMemory::new()));
    let schema = Arc::new(AimSchema::telecom());
    let table = ColumnarTranslator::new()
        .create_table(&store, &schema, &PartitionPlan::new(subscribers, 4))
        .await
        .unwrap();
    let populator = Populator::new(
        Arc::new(ReferenceData::telecom().unwrap()),
        Arc::new(FixedClock::new(0)),
    )
    .with_seed(99);
    (table, populator, schema)
}

async fn scanned_keys(table: &dyn ColumnarTable) -> Vec<i64> {
    let mut keys = Vec::new();
    for batch in table.scan().await.unwrap() {
        let ids = batch
            .column_by_name(SUBSCRIBER_ID_FIELD)
            .unwrap()
            .as_any()
            .downcast_ref::<Int64Array>()
            .unwrap();
        keys.extend(ids.values().iter().copied());
    }
    keys.sort_unstable();
    keys
}

#[tokio::test]
async fn test_sharded_populate_covers_range_once() {
    let (table, populator, schema) = setup(10_000).await;

    let report = populate_sharded(table.clone(), &populator, schema, 0, 9_999, 7)
        .await
        .unwrap();
    assert_eq!(report.rows, 10_000);
    assert_eq!(table.row_count(), 10_000);
    assert_eq!(scanned_keys(table.as_ref()).await, (0..10_000).collect::<Vec<_>>());
}

#[tokio::test]
async fn test_more_workers_than_subscribers() {
    let (table, populator, schema) = setup(100).await;
    let report = populate_sharded(table.clone(), &populator, schema, 10, 12, 16)
        .await
        .unwrap();
    assert_eq!(report.rows, 3);
    assert_eq!(scanned_keys(table.as_ref()).await, vec![10, 11, 12]);
}

#[tokio::test]
async fn test_overlapping_second_run_fails() {
    let (table, populator, schema) = setup(1_000).await;
    populate_sharded(table.clone(), &populator, schema.clone(), 0, 499, 4)
        .await
        .unwrap();

    let err = populate_sharded(table.clone(), &populator, schema, 400, 599, 4)
        .await
        .unwrap_err();
    match err {
        Error::Worker { source, .. } => {
            assert!(matches!(*source, Error::DuplicateKey { .. }))
        }
        other => panic!("unexpected error: {}", other),
    }
}

#[tokio::test]
async fn test_invalid_range_is_precondition() {
    let (table, populator, schema) = setup(1_000).await;
    let err = populate_sharded(table, &populator, schema, 10, 5, 2)
        .await
        .unwrap_err();
    assert!(err.is_precondition());
}

/// Table whose sessions fail to flush when they staged `poison_key`.
struct FlakyTable {
    inner: Arc<dyn ColumnarTable>,
    poison_key: i64,
    flushes: Arc<AtomicUsize>,
}

struct FlakySession {
    inner: Box<dyn ColumnarSession>,
    poison_key: i64,
    poisoned: bool,
    flushes: Arc<AtomicUsize>,
}

#[async_trait]
impl ColumnarTable for FlakyTable {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn schema(&self) -> &ColumnarSchema {
        self.inner.schema()
    }

    fn split_points(&self) -> &[i64] {
        self.inner.split_points()
    }

    fn num_replicas(&self) -> u32 {
        self.inner.num_replicas()
    }

    fn new_session(&self) -> Box<dyn ColumnarSession> {
        Box::new(FlakySession {
            inner: self.inner.new_session(),
            poison_key: self.poison_key,
            poisoned: false,
            flushes: self.flushes.clone(),
        })
    }

    fn row_count(&self) -> u64 {
        self.inner.row_count()
    }

    async fn scan(&self) -> Result<Vec<arrow_array::RecordBatch>> {
        self.inner.scan().await
    }
}

#[async_trait]
impl ColumnarSession for FlakySession {
    fn new_row(&self) -> PartialRow {
        self.inner.new_row()
    }

    fn apply(&mut self, row: PartialRow) -> Result<()> {
        if row.get(SUBSCRIBER_ID_FIELD) == Some(&FieldValue::BigInt(self.poison_key)) {
            self.poisoned = true;
        }
        self.inner.apply(row)
    }

    fn pending_rows(&self) -> usize {
        self.inner.pending_rows()
    }

    async fn flush(&mut self) -> Result<usize> {
        self.flushes.fetch_add(1, Ordering::SeqCst);
        if self.poisoned {
            return Err(Error::Internal("simulated flush failure".into()));
        }
        self.inner.flush().await
    }
}

#[tokio::test]
async fn test_failed_flush_fails_the_run() {
    let (inner, populator, schema) = setup(1_000).await;
    let flushes = Arc::new(AtomicUsize::new(0));
    let table: Arc<dyn ColumnarTable> = Arc::new(FlakyTable {
        inner: inner.clone(),
        poison_key: 620,
        flushes: flushes.clone(),
    });

    let err = populate_sharded(table, &populator, schema, 0, 999, 4)
        .await
        .unwrap_err();
    // Shard [500, 749] holds the poison key
    assert!(matches!(err, Error::Worker { worker: 2, .. }), "{}", err);
    assert!(!err.is_precondition());

    let shards = shard_ranges(0, 999, 4).unwrap();
    assert_eq!(shards[2], (500, 749));
    assert!(flushes.load(Ordering::SeqCst) >= 1);

    // Nothing of the failing shard was made durable
    let keys = scanned_keys(inner.as_ref()).await;
    assert!(
        keys.iter().all(|k| !(500..=749).contains(k)),
        "failed shard leaked keys"
    );
    assert!(keys.len() <= 750);
}

#[tokio::test]
async fn test_seeded_runs_are_reproducible() {
    let (first, populator, schema) = setup(1_000).await;
    populate_sharded(first.clone(), &populator, schema.clone(), 0, 999, 3)
        .await
        .unwrap();
    let (second, _, _) = setup(1_000).await;
    populate_sharded(second.clone(), &populator, schema, 0, 999, 3)
        .await
        .unwrap();

    let zips = |batches: Vec<arrow_array::RecordBatch>| {
        let mut rows: Vec<(i64, i16)> = Vec::new();
        for batch in batches {
            let ids = batch
                .column_by_name("subscriber_id")
                .unwrap()
                .as_any()
                .downcast_ref::<Int64Array>()
                .unwrap()
                .clone();
            let zip = batch
                .column_by_name("city_zip")
                .unwrap()
                .as_any()
                .downcast_ref::<arrow_array::Int16Array>()
                .unwrap()
                .clone();
            rows.extend(ids.values().iter().copied().zip(zip.values().iter().copied()));
        }
        rows.sort_unstable();
        rows
    };
    assert_eq!(
        zips(first.scan().await.unwrap()),
        zips(second.scan().await.unwrap())
    );
}
