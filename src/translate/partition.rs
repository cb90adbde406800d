//! Range-partition split points on `subscriber_id`

use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// Expected key universe `[0, expected_subscribers)` cut into `partitions`
/// equal ranges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionPlan {
    pub expected_subscribers: u64,
    pub partitions: u32,
}

impl PartitionPlan {
    pub fn new(expected_subscribers: u64, partitions: u32) -> Self {
        Self {
            expected_subscribers,
            partitions,
        }
    }

    pub fn split_points(&self) -> Result<Vec<i64>> {
        split_points(self.expected_subscribers, self.partitions)
    }
}

/// `P-1` split keys at `k * (N/P)` for `k = 1..P`.
pub fn split_points(expected_subscribers: u64, partitions: u32) -> Result<Vec<i64>> {
    if partitions == 0 {
        return Err(Error::Precondition("partition count must be >= 1".into()));
    }
    if expected_subscribers < partitions as u64 {
        return Err(Error::Precondition(format!(
            "{} subscribers cannot fill {} partitions",
            expected_subscribers, partitions
        )));
    }
    if expected_subscribers > i64::MAX as u64 {
        return Err(Error::Precondition(format!(
            "{} subscribers exceed the key domain",
            expected_subscribers
        )));
    }

    let step = expected_subscribers / partitions as u64;
    Ok((1..partitions as u64).map(|k| (k * step) as i64).collect())
}
