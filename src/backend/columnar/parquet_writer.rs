//! Parquet encoding for flushed wide-table batches

use crate::{Error, Result};
use arrow_array::RecordBatch;
use bytes::Bytes;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::ArrowWriter;
use parquet::basic::{Compression, ZstdLevel};
use parquet::file::properties::{EnabledStatistics, WriterProperties, WriterVersion};

/// Parquet writer tuned for wide tables of small integer columns
#[derive(Debug, Clone)]
pub struct ParquetWriter {
    /// Writer properties
    props: WriterProperties,
}

impl ParquetWriter {
    pub fn new() -> Self {
        Self {
            props: Self::build_writer_properties(),
        }
    }

    fn build_writer_properties() -> WriterProperties {
        WriterProperties::builder()
            .set_writer_version(WriterVersion::PARQUET_2_0)
            .set_compression(Compression::ZSTD(ZstdLevel::default()))
            // Linkage columns have a handful of distinct values per sample set
            .set_dictionary_enabled(true)
            .set_max_row_group_size(500_000)
            // Chunk statistics let scans prune on subscriber_id
            .set_statistics_enabled(EnabledStatistics::Chunk)
            .set_bloom_filter_enabled(false)
            .build()
    }

    /// Write a record batch to Parquet bytes
    pub fn write_batch(&self, batch: &RecordBatch) -> Result<Bytes> {
        let mut buffer = Vec::new();

        {
            let mut writer =
                ArrowWriter::try_new(&mut buffer, batch.schema(), Some(self.props.clone()))?;

            writer.write(batch)?;
            writer.close()?;
        }

        Ok(Bytes::from(buffer))
    }
}

impl Default for ParquetWriter {
    fn default() -> Self {
        Self::new()
    }
}

/// Decode every record batch in a Parquet object
pub fn read_batches(bytes: Bytes) -> Result<Vec<RecordBatch>> {
    let reader = ParquetRecordBatchReaderBuilder::try_new(bytes)?.build()?;
    reader
        .map(|batch| batch.map_err(Error::from))
        .collect()
}
