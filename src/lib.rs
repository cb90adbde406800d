//! # widebench
//!
//! Schema translation and synthetic population for a wide, denormalized
//! telecom-subscriber analytics table (`wt`).
//!
//! One logical description of the table (aggregate metric fields plus a
//! fixed tail of dimension-linkage columns) is translated onto two storage
//! backends:
//!
//! - **Row store**: a single transactional create-table call. The column
//!   IDs it assigns become the process-wide [`context::ColumnContext`] that
//!   the aggregation engine reads.
//! - **Columnar store**: metric types narrowed to Int64/Int32/Float64, an
//!   explicit primary key, and range-partition splits on `subscriber_id`,
//!   stored as Parquet objects on an `object_store`.
//!
//! The [`populate::Populator`] then fills the columnar table with one row
//! per subscriber. Dimension attributes that belong together (zip, city,
//! state, country and region of one location, say) always come from a
//! single random draw over [`reference::ReferenceData`].
//!
//! ## Data flow
//!
//! ```text
//! AimSchema + ReferenceData
//!     -> RowStoreTranslator  -> MemoryRowStore      -> ColumnContext
//!     -> ColumnarTranslator  -> ObjectColumnarStore -> Populator (N workers)
//! ```

pub mod backend;
pub mod clock;
pub mod config;
pub mod context;
pub mod populate;
pub mod reference;
pub mod schema;
pub mod telemetry;
pub mod translate;

mod error;

pub use error::{Error, Result};

/// Re-exports for convenience
pub mod prelude {
    pub use crate::backend::{
        ColumnarSession, ColumnarStore, ColumnarTable, MemoryRowStore, ObjectColumnarStore,
        RowStore,
    };
    pub use crate::clock::{Clock, FixedClock, SystemClock};
    pub use crate::config::{BenchConfig, ComponentFactory, StorageBackend};
    pub use crate::context::ColumnContext;
    pub use crate::populate::{populate_sharded, PopulateReport, Populator};
    pub use crate::reference::ReferenceData;
    pub use crate::schema::{AimSchema, DimensionAttribute, LogicalField, LogicalType};
    pub use crate::translate::{ColumnarTranslator, PartitionPlan, RowStoreTranslator};
    pub use crate::{Error, Result};
}
