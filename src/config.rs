//! Run configuration and component factory
//!
//! `BenchConfig` sizes a benchmark run; `ComponentFactory` builds the
//! object store behind the columnar backend. Both read environment
//! variables so the CLI and tests can switch between in-memory and
//! filesystem storage without code changes.

use crate::backend::StoreConfig;
use crate::translate::PartitionPlan;
use crate::{Error, Result};
use object_store::{local::LocalFileSystem, memory::InMemory, ObjectStore};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;
use tracing::info;

/// Sizing of a benchmark run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BenchConfig {
    /// Expected subscriber universe `[0, subscribers)`
    pub subscribers: u64,
    /// Range partitions of the columnar table
    pub partitions: u32,
    /// Concurrent population workers
    pub workers: usize,
    /// RNG seed; unset draws from entropy
    pub seed: Option<u64>,
    /// Rows a session stages per partition before sealing a batch
    pub batch_rows: usize,
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            subscribers: 1_000_000,
            partitions: 4,
            workers: 4,
            seed: None,
            batch_rows: 10_000,
        }
    }
}

impl BenchConfig {
    /// Read the run sizing from the environment.
    ///
    /// Environment variables:
    /// - WIDEBENCH_SUBSCRIBERS (default: 1000000)
    /// - WIDEBENCH_PARTITIONS (default: 4)
    /// - WIDEBENCH_WORKERS (default: 4)
    /// - WIDEBENCH_SEED (optional)
    /// - WIDEBENCH_BATCH_ROWS (default: 10000)
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();
        let config = Self {
            subscribers: env_or("WIDEBENCH_SUBSCRIBERS", defaults.subscribers)?,
            partitions: env_or("WIDEBENCH_PARTITIONS", defaults.partitions)?,
            workers: env_or("WIDEBENCH_WORKERS", defaults.workers)?,
            seed: env_opt("WIDEBENCH_SEED")?,
            batch_rows: env_or("WIDEBENCH_BATCH_ROWS", defaults.batch_rows)?,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.subscribers == 0 {
            return Err(Error::Config("subscribers must be > 0".into()));
        }
        if self.partitions == 0 {
            return Err(Error::Config("partitions must be > 0".into()));
        }
        if self.workers == 0 {
            return Err(Error::Config("workers must be > 0".into()));
        }
        if self.batch_rows == 0 {
            return Err(Error::Config("batch_rows must be > 0".into()));
        }
        Ok(())
    }

    pub fn partition_plan(&self) -> PartitionPlan {
        PartitionPlan::new(self.subscribers, self.partitions)
    }

    pub fn store_config(&self) -> StoreConfig {
        StoreConfig {
            session_batch_rows: self.batch_rows,
        }
    }
}

fn env_opt<T: FromStr>(name: &str) -> Result<Option<T>>
where
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| Error::Config(format!("{} has invalid value '{}': {}", name, raw, e))),
        _ => Ok(None),
    }
}

fn env_or<T: FromStr>(name: &str, default: T) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    Ok(env_opt(name)?.unwrap_or(default))
}

/// Object store kinds the factory can build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Memory,
    Local,
}

impl StorageBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            StorageBackend::Memory => "memory",
            StorageBackend::Local => "local",
        }
    }
}

impl FromStr for StorageBackend {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(StorageBackend::Memory),
            "local" | "fs" => Ok(StorageBackend::Local),
            other => Err(Error::Config(format!(
                "Unknown STORAGE_BACKEND: {}. Use 'memory' or 'local'",
                other
            ))),
        }
    }
}

pub struct ComponentFactory;

impl ComponentFactory {
    /// Create object store from environment
    ///
    /// Environment variables:
    /// - STORAGE_BACKEND: "memory" (default) or "local"
    /// - STORAGE_PATH: directory for the local backend (required for local)
    pub async fn create_object_store() -> Result<Arc<dyn ObjectStore>> {
        let backend: StorageBackend = std::env::var("STORAGE_BACKEND")
            .unwrap_or_else(|_| "memory".to_string())
            .parse()?;
        let path = std::env::var("STORAGE_PATH").ok();
        Self::object_store(backend, path.as_deref())
    }

    /// Create an object store of the given kind.
    pub fn object_store(
        backend: StorageBackend,
        path: Option<&str>,
    ) -> Result<Arc<dyn ObjectStore>> {
        match backend {
            StorageBackend::Memory => {
                info!("Using in-memory object store (development mode)");
                Ok(Arc::new(InMemory::new()))
            }
            StorageBackend::Local => {
                let path = path.ok_or_else(|| {
                    Error::Config("STORAGE_PATH required when STORAGE_BACKEND=local".to_string())
                })?;
                std::fs::create_dir_all(path)?;
                info!("Using local filesystem object store at {}", path);
                Ok(Arc::new(LocalFileSystem::new_with_prefix(path)?))
            }
        }
    }
}
