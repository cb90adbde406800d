//! Parallel population over disjoint subscriber ranges

use super::{PopulateReport, Populator};
use crate::backend::ColumnarTable;
use crate::schema::AimSchema;
use crate::{Error, Result};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinSet;
use tracing::{info, warn};

/// Split `[lo, hi]` into at most `workers` contiguous, disjoint, non-empty
/// closed ranges that together cover it exactly.
pub fn shard_ranges(lo: i64, hi: i64, workers: usize) -> Result<Vec<(i64, i64)>> {
    if workers == 0 {
        return Err(Error::Precondition("worker count must be >= 1".into()));
    }
    if lo > hi {
        return Err(Error::Precondition(format!(
            "empty subscriber range [{}, {}]",
            lo, hi
        )));
    }

    let total = (hi as i128) - (lo as i128) + 1;
    let shards = (workers as i128).min(total);
    let base = total / shards;
    let extra = total % shards;

    let mut ranges = Vec::with_capacity(shards as usize);
    let mut start = lo as i128;
    for shard in 0..shards {
        let len = base + if shard < extra { 1 } else { 0 };
        let end = start + len - 1;
        ranges.push((start as i64, end as i64));
        start = end + 1;
    }
    Ok(ranges)
}

/// Populate `[lo, hi]` with one task per shard. Each task opens its own
/// session and draws from its own RNG stream. The first failing worker
/// cancels the rest and its error is returned.
pub async fn populate_sharded(
    table: Arc<dyn ColumnarTable>,
    populator: &Populator,
    schema: Arc<AimSchema>,
    lo: i64,
    hi: i64,
    workers: usize,
) -> Result<PopulateReport> {
    let ranges = shard_ranges(lo, hi, workers)?;
    let start = Instant::now();
    info!(
        "Populating table {} [{}, {}] with {} workers",
        table.name(),
        lo,
        hi,
        ranges.len()
    );

    let mut tasks = JoinSet::new();
    for (worker, (shard_lo, shard_hi)) in ranges.into_iter().enumerate() {
        let table = table.clone();
        let populator = populator.clone();
        let schema = schema.clone();
        tasks.spawn(async move {
            let mut session = table.new_session();
            let mut generator = populator.generator(worker);
            let result = populator
                .populate_with(&mut generator, session.as_mut(), &schema, shard_lo, shard_hi)
                .await;
            (worker, result)
        });
    }

    let mut total = PopulateReport {
        rows: 0,
        elapsed: Duration::ZERO,
    };
    while let Some(joined) = tasks.join_next().await {
        let (worker, result) = joined?;
        match result {
            Ok(report) => total = total.merge(report),
            Err(e) => {
                warn!("Worker {} failed, cancelling remaining shards: {}", worker, e);
                tasks.abort_all();
                return Err(Error::Worker {
                    worker,
                    source: Box::new(e),
                });
            }
        }
    }

    total.elapsed = start.elapsed();
    info!(
        "Populated {} rows into {} in {:?} ({:.0} rows/s)",
        total.rows,
        table.name(),
        total.elapsed,
        total.rows_per_sec()
    );
    Ok(total)
}
