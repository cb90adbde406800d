//! widebench CLI
//!
//! Creates the wide subscriber table in both backends and bulk-populates
//! the columnar copy.
//!
//! ## Usage
//!
//! ```bash
//! widebench setup --subscribers 1000000 --partitions 4
//!
//! STORAGE_BACKEND=local STORAGE_PATH=/tmp/wt \
//!   widebench populate --subscribers 1000000 --workers 8 --seed 42 --report
//! ```

use widebench::backend::{ColumnarStore, ColumnarTable, MemoryRowStore, ObjectColumnarStore};
use widebench::clock::SystemClock;
use widebench::config::{BenchConfig, ComponentFactory, StorageBackend};
use widebench::context;
use widebench::populate::{populate_sharded, PopulateReport, Populator};
use widebench::reference::ReferenceData;
use widebench::schema::{AimSchema, SUBSCRIBER_ID_FIELD};
use widebench::telemetry::{init_logging, LogFormat};
use widebench::translate::{ColumnarTranslator, RowStoreTranslator};
use widebench::Error;

use arrow::array::{Array, Int64Array};
use arrow::compute::concat_batches;
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::info;

/// Wide-table schema setup and population
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Object store backend: memory or local
    #[arg(long, global = true, env = "STORAGE_BACKEND", default_value = "memory")]
    storage: String,

    /// Directory for the local object store
    #[arg(long, global = true, env = "STORAGE_PATH")]
    storage_path: Option<String>,

    /// Log level
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Log format: text or json
    #[arg(long, global = true, env = "WIDEBENCH_LOG_FORMAT", default_value = "text")]
    log_format: String,

    /// Print a JSON run report to stdout
    #[arg(long, global = true)]
    report: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create the row-store and columnar schemas
    Setup(SizeArgs),
    /// Create the schemas, populate the columnar table, verify the row count
    Populate(PopulateArgs),
}

#[derive(Args, Debug, Clone)]
struct SizeArgs {
    /// Expected subscriber count
    #[arg(long, env = "WIDEBENCH_SUBSCRIBERS")]
    subscribers: Option<u64>,

    /// Range partitions of the columnar table
    #[arg(long, env = "WIDEBENCH_PARTITIONS")]
    partitions: Option<u32>,

    /// Rows a session stages per partition before sealing a batch
    #[arg(long, env = "WIDEBENCH_BATCH_ROWS")]
    batch_rows: Option<usize>,

    /// Open the columnar table if it already exists instead of failing
    #[arg(long)]
    reuse: bool,
}

#[derive(Args, Debug)]
struct PopulateArgs {
    #[command(flatten)]
    size: SizeArgs,

    /// Concurrent workers
    #[arg(long, env = "WIDEBENCH_WORKERS")]
    workers: Option<usize>,

    /// RNG seed for reproducible runs
    #[arg(long, env = "WIDEBENCH_SEED")]
    seed: Option<u64>,

    /// First subscriber ID (default: 0)
    #[arg(long)]
    lo: Option<i64>,

    /// Last subscriber ID, inclusive (default: subscribers - 1)
    #[arg(long)]
    hi: Option<i64>,

    /// Abort population after this long (e.g. "30s", "5m")
    #[arg(long)]
    timeout: Option<humantime::Duration>,

    /// Skip reading the table back after population
    #[arg(long)]
    no_verify: bool,
}

#[derive(Debug, Serialize)]
struct RunReport {
    command: &'static str,
    storage: StorageBackend,
    config: BenchConfig,
    table: String,
    row_store_columns: usize,
    columnar_columns: usize,
    split_points: Vec<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    range: Option<(i64, i64)>,
    #[serde(skip_serializing_if = "Option::is_none")]
    populate: Option<PopulateReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    verified_rows: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let log_format: LogFormat = cli.log_format.parse()?;
    init_logging(&cli.log_level, log_format)?;

    let storage: StorageBackend = cli.storage.parse()?;
    let object_store = ComponentFactory::object_store(storage, cli.storage_path.as_deref())?;

    let (size, populate_args) = match &cli.command {
        Command::Setup(size) => (size.clone(), None),
        Command::Populate(args) => (args.size.clone(), Some(args)),
    };

    let mut config = BenchConfig::from_env()?;
    if let Some(subscribers) = size.subscribers {
        config.subscribers = subscribers;
    }
    if let Some(partitions) = size.partitions {
        config.partitions = partitions;
    }
    if let Some(batch_rows) = size.batch_rows {
        config.batch_rows = batch_rows;
    }
    if let Some(args) = populate_args {
        if let Some(workers) = args.workers {
            config.workers = workers;
        }
        if args.seed.is_some() {
            config.seed = args.seed;
        }
    }
    config.validate()?;

    info!("Starting widebench with {:?} ({} storage)", config, storage.as_str());

    let schema = Arc::new(AimSchema::telecom());
    let reference = Arc::new(ReferenceData::telecom()?);

    // Row store: create the table and publish the column-ID context
    let row_store = MemoryRowStore::new();
    let column_context = RowStoreTranslator::new().bootstrap(&row_store, &schema).await?;
    let column_context = context::install(column_context)?;

    // Columnar store
    let columnar_store = ObjectColumnarStore::with_config(object_store, config.store_config());
    let translator = ColumnarTranslator::new();
    let plan = config.partition_plan();
    let table: Arc<dyn ColumnarTable> = if size.reuse
        && columnar_store.table_exists(translator.table_name()).await?
    {
        info!("Reusing existing columnar table {}", translator.table_name());
        columnar_store.open_table(translator.table_name()).await?
    } else {
        translator.create_table(&columnar_store, &schema, &plan).await?
    };

    let mut report = RunReport {
        command: if populate_args.is_some() { "populate" } else { "setup" },
        storage,
        config: config.clone(),
        table: table.name().to_string(),
        row_store_columns: column_context.len(),
        columnar_columns: table.schema().num_columns(),
        split_points: table.split_points().to_vec(),
        range: None,
        populate: None,
        verified_rows: None,
    };

    if let Some(args) = populate_args {
        let lo = args.lo.unwrap_or(0);
        let hi = match args.hi {
            Some(hi) => hi,
            None => i64::try_from(config.subscribers)
                .map_err(|_| Error::Config("subscribers exceeds the key domain".into()))?
                - 1,
        };

        let mut populator = Populator::new(reference, Arc::new(SystemClock::new()));
        if let Some(seed) = config.seed {
            populator = populator.with_seed(seed);
        }

        let run = populate_sharded(
            table.clone(),
            &populator,
            schema.clone(),
            lo,
            hi,
            config.workers,
        );
        let outcome = match args.timeout {
            Some(limit) => tokio::time::timeout(limit.into(), run)
                .await
                .map_err(|_| Error::Internal(format!("population exceeded {}", limit)))??,
            None => run.await?,
        };
        report.range = Some((lo, hi));
        report.populate = Some(outcome);

        if !args.no_verify {
            let verified = verify(table.as_ref()).await?;
            info!("Verified {} distinct subscribers in {}", verified, table.name());
            report.verified_rows = Some(verified);
        }
    } else {
        println!(
            "table {}: {} row-store columns, {} columnar columns, splits {:?}",
            report.table, report.row_store_columns, report.columnar_columns, report.split_points
        );
    }

    if cli.report {
        println!("{}", serde_json::to_string_pretty(&report)?);
    }
    Ok(())
}

/// Read the table back and check every flushed key is distinct.
async fn verify(table: &dyn ColumnarTable) -> Result<u64, Error> {
    let batches = table.scan().await?;
    if batches.is_empty() {
        return Ok(0);
    }
    let all = concat_batches(&batches[0].schema(), &batches)?;
    let keys = all
        .column_by_name(SUBSCRIBER_ID_FIELD)
        .and_then(|c| c.as_any().downcast_ref::<Int64Array>())
        .ok_or_else(|| Error::Internal("subscriber_id column missing from scan".into()))?;

    let distinct: HashSet<i64> = keys.values().iter().copied().collect();
    if distinct.len() != keys.len() || keys.len() as u64 != table.row_count() {
        return Err(Error::Internal(format!(
            "scan returned {} keys ({} distinct) but the table reports {} rows",
            keys.len(),
            distinct.len(),
            table.row_count()
        )));
    }
    Ok(distinct.len() as u64)
}
