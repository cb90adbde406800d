//! Bulk population of the wide table
//!
//! `Populator::populate` writes one row per subscriber ID in a closed
//! range through a columnar session. Metric columns start at their
//! schema-declared initial values; only the dimension linkage is random.
//! Rows are staged and flushed once at the end, and any failure aborts
//! the whole range.

mod generator;
mod sharded;

pub use generator::{GeneratedRow, RowGenerator};
pub use sharded::{populate_sharded, shard_ranges};

use crate::backend::{ColumnarSession, PartialRow};
use crate::clock::Clock;
use crate::reference::ReferenceData;
use crate::schema::AimSchema;
use crate::{Error, Result};
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Outcome of a populate call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PopulateReport {
    /// Rows flushed
    pub rows: u64,
    #[serde(with = "duration_human")]
    pub elapsed: Duration,
}

impl PopulateReport {
    pub fn rows_per_sec(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs == 0.0 {
            self.rows as f64
        } else {
            self.rows as f64 / secs
        }
    }

    /// Combine reports of concurrent workers; elapsed is the slowest one.
    pub fn merge(self, other: PopulateReport) -> PopulateReport {
        PopulateReport {
            rows: self.rows + other.rows,
            elapsed: self.elapsed.max(other.elapsed),
        }
    }
}

mod duration_human {
    use serde::Serializer;
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&humantime::format_duration(*value))
    }
}

/// Writes synthetic subscriber rows.
#[derive(Clone)]
pub struct Populator {
    reference: Arc<ReferenceData>,
    clock: Arc<dyn Clock>,
    seed: Option<u64>,
}

impl Populator {
    pub fn new(reference: Arc<ReferenceData>, clock: Arc<dyn Clock>) -> Self {
        Self {
            reference,
            clock,
            seed: None,
        }
    }

    /// Reproducible dimension draws.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn reference(&self) -> &Arc<ReferenceData> {
        &self.reference
    }

    pub fn seed(&self) -> Option<u64> {
        self.seed
    }

    /// Generator for worker `worker`; seeded runs give each worker its own
    /// deterministic stream.
    pub fn generator(&self, worker: usize) -> RowGenerator {
        match self.seed {
            Some(seed) => {
                let seed = seed ^ (worker as u64).wrapping_mul(0x9e3779b97f4a7c15);
                RowGenerator::new(self.reference.clone(), seed)
            }
            None => RowGenerator::from_entropy(self.reference.clone()),
        }
    }

    /// Insert subscribers `lo..=hi` and flush.
    pub async fn populate(
        &self,
        session: &mut dyn ColumnarSession,
        schema: &AimSchema,
        lo: i64,
        hi: i64,
    ) -> Result<PopulateReport> {
        let mut generator = self.generator(0);
        self.populate_with(&mut generator, session, schema, lo, hi)
            .await
    }

    pub(crate) async fn populate_with(
        &self,
        generator: &mut RowGenerator,
        session: &mut dyn ColumnarSession,
        schema: &AimSchema,
        lo: i64,
        hi: i64,
    ) -> Result<PopulateReport> {
        if lo > hi {
            return Err(Error::Precondition(format!(
                "empty subscriber range [{}, {}]",
                lo, hi
            )));
        }
        // The single flush below must carry only this range
        if session.pending_rows() != 0 {
            return Err(Error::Precondition(format!(
                "session already holds {} unflushed rows",
                session.pending_rows()
            )));
        }
        let start = Instant::now();

        let template = metric_template(session, schema)?;
        let mut staged = 0u64;
        for subscriber_id in lo..=hi {
            let generated = generator.next_row(subscriber_id, self.clock.now_millis())?;
            let mut row = template.clone();
            generated.apply_to(&mut row)?;
            session.apply(row)?;
            staged += 1;
        }

        debug!("Staged {} rows for [{}, {}], flushing", staged, lo, hi);
        let flushed = session.flush().await? as u64;
        if flushed != staged {
            return Err(Error::Internal(format!(
                "staged {} rows for [{}, {}] but flush wrote {}",
                staged, lo, hi, flushed
            )));
        }

        let report = PopulateReport {
            rows: flushed,
            elapsed: start.elapsed(),
        };
        info!(
            "Populated subscribers [{}, {}]: {} rows in {:?} ({:.0} rows/s)",
            lo,
            hi,
            report.rows,
            report.elapsed,
            report.rows_per_sec()
        );
        Ok(report)
    }
}

/// Row with every metric set to its initial value, built once per call.
fn metric_template(session: &dyn ColumnarSession, schema: &AimSchema) -> Result<PartialRow> {
    let mut row = session.new_row();
    for field in schema.fields() {
        row.set_value(&field.name, field.initial.clone())?;
    }
    Ok(row)
}
