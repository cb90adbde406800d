//! Session write buffer for sealed record batches

use crate::Result;
use arrow_array::RecordBatch;

/// A sealed batch destined for one range partition.
#[derive(Debug, Clone)]
pub struct PartitionBatch {
    pub partition: usize,
    pub batch: RecordBatch,
}

/// Write buffer that accumulates sealed batches until the session flushes
#[derive(Debug)]
pub struct WriteBuffer {
    /// Accumulated batches
    batches: Vec<PartitionBatch>,
    /// Total row count
    row_count: usize,
}

impl WriteBuffer {
    /// Create a new empty write buffer
    pub fn new() -> Self {
        Self {
            batches: Vec::new(),
            row_count: 0,
        }
    }

    /// Append a sealed batch for `partition`
    pub fn append(&mut self, partition: usize, batch: RecordBatch) -> Result<()> {
        self.row_count += batch.num_rows();
        self.batches.push(PartitionBatch { partition, batch });
        Ok(())
    }

    /// Take all batches from the buffer, leaving it empty
    pub fn take(&mut self) -> Vec<PartitionBatch> {
        self.row_count = 0;
        std::mem::take(&mut self.batches)
    }

    /// Check if the buffer is empty
    pub fn is_empty(&self) -> bool {
        self.batches.is_empty()
    }

    /// Get the total row count
    pub fn row_count(&self) -> usize {
        self.row_count
    }

    /// Get the number of batches
    pub fn batch_count(&self) -> usize {
        self.batches.len()
    }
}

impl Default for WriteBuffer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow_array::{Int16Array, Int64Array};
    use arrow_schema::{DataType, Field, Schema};
    use std::sync::Arc;

    fn create_test_batch(rows: usize) -> RecordBatch {
        let schema = Arc::new(Schema::new(vec![
            Field::new("subscriber_id", DataType::Int64, false),
            Field::new("city_zip", DataType::Int16, false),
        ]));

        let keys: Vec<i64> = (0..rows as i64).collect();
        let zips: Vec<i16> = (0..rows).map(|i| (i % 7) as i16 + 1).collect();

        RecordBatch::try_new(
            schema,
            vec![
                Arc::new(Int64Array::from(keys)),
                Arc::new(Int16Array::from(zips)),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_buffer_append() {
        let mut buffer = WriteBuffer::new();
        assert!(buffer.is_empty());

        buffer.append(0, create_test_batch(100)).unwrap();

        assert!(!buffer.is_empty());
        assert_eq!(buffer.row_count(), 100);
        assert_eq!(buffer.batch_count(), 1);
    }

    #[test]
    fn test_buffer_take() {
        let mut buffer = WriteBuffer::new();

        buffer.append(0, create_test_batch(100)).unwrap();
        buffer.append(3, create_test_batch(200)).unwrap();

        assert_eq!(buffer.row_count(), 300);

        let batches = buffer.take();
        assert_eq!(batches.len(), 2);
        assert_eq!(batches[1].partition, 3);
        assert!(buffer.is_empty());
        assert_eq!(buffer.row_count(), 0);
        assert_eq!(buffer.batch_count(), 0);
    }
}
