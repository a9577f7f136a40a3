use crate::error::{ProcessingError, Result};
use crate::models::{ClimateVariable, DailyRegionSummary, GroupKey, Pollutant};
use crate::utils::constants::{
    COMPRESSION_GZIP, COMPRESSION_LZ4, COMPRESSION_NONE, COMPRESSION_SNAPPY, COMPRESSION_ZSTD,
    DAY_COLUMN, DEFAULT_ROW_GROUP_SIZE, INDEX_COLUMN, REGION_COLUMN,
};
use arrow::array::*;
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use chrono::{Datelike, NaiveDate};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::ArrowWriter;
use parquet::basic::{Compression, GzipLevel, ZstdLevel};
use parquet::file::properties::WriterProperties;
use std::fs::File;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// Days from 0001-01-01 to 1970-01-01, the Date32 origin
const EPOCH_DAYS_FROM_CE: i32 = 719_163;

pub struct ParquetWriter {
    compression: Compression,
    row_group_size: usize,
}

impl ParquetWriter {
    pub fn new() -> Self {
        Self {
            compression: Compression::SNAPPY,
            row_group_size: DEFAULT_ROW_GROUP_SIZE,
        }
    }

    pub fn with_compression(mut self, compression: &str) -> Result<Self> {
        self.compression = match compression.to_lowercase().as_str() {
            COMPRESSION_SNAPPY => Compression::SNAPPY,
            COMPRESSION_GZIP => Compression::GZIP(GzipLevel::default()),
            COMPRESSION_LZ4 => Compression::LZ4,
            COMPRESSION_ZSTD => Compression::ZSTD(ZstdLevel::default()),
            COMPRESSION_NONE => Compression::UNCOMPRESSED,
            _ => {
                return Err(ProcessingError::Config(format!(
                    "Unsupported compression: {}",
                    compression
                )))
            }
        };
        Ok(self)
    }

    pub fn with_row_group_size(mut self, size: usize) -> Self {
        self.row_group_size = size.max(1);
        self
    }

    fn properties(&self) -> WriterProperties {
        WriterProperties::builder()
            .set_compression(self.compression)
            .set_max_row_group_size(self.row_group_size)
            .build()
    }

    /// Write the daily table; an empty table still produces a file with the schema
    pub fn write_summaries(&self, summaries: &[DailyRegionSummary], path: &Path) -> Result<()> {
        let schema = create_schema();
        let file = File::create(path)?;

        let mut writer = ArrowWriter::try_new(file, schema.clone(), Some(self.properties()))?;
        if !summaries.is_empty() {
            writer.write(&summaries_to_batch(summaries, schema)?)?;
        }
        writer.close()?;

        debug!("Wrote {} daily rows to {}", summaries.len(), path.display());
        Ok(())
    }

    /// Write the daily table in record batches of `batch_size` rows
    pub fn write_summaries_batched(
        &self,
        summaries: &[DailyRegionSummary],
        path: &Path,
        batch_size: usize,
    ) -> Result<()> {
        let schema = create_schema();
        let file = File::create(path)?;

        let mut writer = ArrowWriter::try_new(file, schema.clone(), Some(self.properties()))?;
        for chunk in summaries.chunks(batch_size.max(1)) {
            let batch = summaries_to_batch(chunk, schema.clone())?;
            writer.write(&batch)?;
        }
        writer.close()?;

        debug!(
            "Wrote {} daily rows to {} in batches of {}",
            summaries.len(),
            path.display(),
            batch_size
        );
        Ok(())
    }

    /// Read up to `limit` rows back from a daily table file
    pub fn read_summaries(&self, path: &Path, limit: usize) -> Result<Vec<DailyRegionSummary>> {
        let file = File::open(path)?;
        let parquet_reader = ParquetRecordBatchReaderBuilder::try_new(file)?
            .with_batch_size(limit.clamp(1, 8192))
            .build()?;

        let mut summaries = Vec::new();

        for batch_result in parquet_reader {
            let batch = batch_result?;
            let remaining = limit - summaries.len();
            summaries.extend(batch_to_summaries(&batch, remaining)?);

            if summaries.len() >= limit {
                break;
            }
        }

        Ok(summaries)
    }

    /// Read the whole daily table back
    pub fn read_all_summaries(&self, path: &Path) -> Result<Vec<DailyRegionSummary>> {
        self.read_summaries(path, usize::MAX)
    }

    /// Get file statistics
    pub fn get_file_info(&self, path: &Path) -> Result<ParquetFileInfo> {
        use parquet::file::reader::{FileReader, SerializedFileReader};

        let file = File::open(path)?;
        let reader = SerializedFileReader::new(file)?;
        let metadata = reader.metadata();

        let row_groups = metadata.num_row_groups();
        let row_group_sizes = (0..row_groups)
            .map(|i| metadata.row_group(i).num_rows())
            .collect();

        // Compression actually used in the file, not this writer's setting
        let compression = (row_groups > 0 && metadata.row_group(0).num_columns() > 0)
            .then(|| metadata.row_group(0).column(0).compression())
            .unwrap_or(Compression::UNCOMPRESSED);

        Ok(ParquetFileInfo {
            total_rows: metadata.file_metadata().num_rows(),
            row_groups: row_groups as i32,
            row_group_sizes,
            file_size: std::fs::metadata(path)?.len(),
            compression,
        })
    }
}

impl Default for ParquetWriter {
    fn default() -> Self {
        Self::new()
    }
}

/// Arrow schema of the daily table, columns in output order
pub fn create_schema() -> Arc<Schema> {
    let mut fields = vec![
        Field::new(DAY_COLUMN, DataType::Date32, false),
        Field::new(REGION_COLUMN, DataType::Utf8, false),
    ];
    fields.extend(
        Pollutant::ALL
            .iter()
            .map(|p| Field::new(p.column_name(), DataType::Float64, true)),
    );
    fields.extend(
        ClimateVariable::ALL
            .iter()
            .map(|v| Field::new(v.column_name(), DataType::Float64, true)),
    );
    fields.extend(
        Pollutant::ALL
            .iter()
            .map(|p| Field::new(p.subindex_column(), DataType::UInt8, true)),
    );
    fields.push(Field::new(INDEX_COLUMN, DataType::UInt8, true));

    Arc::new(Schema::new(fields))
}

/// Convert summaries to an Arrow RecordBatch
fn summaries_to_batch(
    summaries: &[DailyRegionSummary],
    schema: Arc<Schema>,
) -> Result<RecordBatch> {
    let days: Vec<i32> = summaries
        .iter()
        .map(|s| s.day.num_days_from_ce() - EPOCH_DAYS_FROM_CE)
        .collect();
    let regions: Vec<&str> = summaries.iter().map(|s| s.region.as_str()).collect();

    let mut columns: Vec<ArrayRef> = vec![
        Arc::new(Date32Array::from(days)),
        Arc::new(StringArray::from(regions)),
    ];
    for pollutant in Pollutant::ALL {
        let values: Vec<Option<f64>> = summaries.iter().map(|s| s.pollutant(pollutant)).collect();
        columns.push(Arc::new(Float64Array::from(values)));
    }
    for variable in ClimateVariable::ALL {
        let values: Vec<Option<f64>> = summaries.iter().map(|s| s.climate(variable)).collect();
        columns.push(Arc::new(Float64Array::from(values)));
    }
    for pollutant in Pollutant::ALL {
        let grades: Vec<Option<u8>> = summaries.iter().map(|s| s.subindex(pollutant)).collect();
        columns.push(Arc::new(UInt8Array::from(grades)));
    }
    let index: Vec<Option<u8>> = summaries.iter().map(|s| s.indice_atmo).collect();
    columns.push(Arc::new(UInt8Array::from(index)));

    Ok(RecordBatch::try_new(schema, columns)?)
}

fn column<'a, T: 'static>(batch: &'a RecordBatch, name: &str) -> Result<&'a T> {
    batch
        .column_by_name(name)
        .ok_or_else(|| ProcessingError::MissingColumn(name.to_string()))?
        .as_any()
        .downcast_ref::<T>()
        .ok_or_else(|| ProcessingError::InvalidFormat(format!("Invalid {} column type", name)))
}

fn optional<T: ArrowPrimitiveType>(array: &PrimitiveArray<T>, i: usize) -> Option<T::Native> {
    (!array.is_null(i)).then(|| array.value(i))
}

fn batch_to_summaries(batch: &RecordBatch, limit: usize) -> Result<Vec<DailyRegionSummary>> {
    let days = column::<Date32Array>(batch, DAY_COLUMN)?;
    let regions = column::<StringArray>(batch, REGION_COLUMN)?;

    let pollutants = Pollutant::ALL
        .iter()
        .map(|p| column::<Float64Array>(batch, p.column_name()))
        .collect::<Result<Vec<_>>>()?;
    let climate = ClimateVariable::ALL
        .iter()
        .map(|v| column::<Float64Array>(batch, v.column_name()))
        .collect::<Result<Vec<_>>>()?;
    let subindices = Pollutant::ALL
        .iter()
        .map(|p| column::<UInt8Array>(batch, p.subindex_column()))
        .collect::<Result<Vec<_>>>()?;
    let index = column::<UInt8Array>(batch, INDEX_COLUMN)?;

    let rows = batch.num_rows().min(limit);
    let mut summaries = Vec::with_capacity(rows);

    for i in 0..rows {
        let day = NaiveDate::from_num_days_from_ce_opt(days.value(i) + EPOCH_DAYS_FROM_CE)
            .ok_or_else(|| ProcessingError::InvalidFormat("Invalid day in Parquet file".to_string()))?;

        let mut summary = DailyRegionSummary::empty(GroupKey::new(day, regions.value(i)));
        for (slot, pollutant) in Pollutant::ALL.iter().enumerate() {
            *summary.pollutant_mut(*pollutant) = optional(pollutants[slot], i);
            *summary.subindex_mut(*pollutant) = optional(subindices[slot], i);
        }
        for (slot, variable) in ClimateVariable::ALL.iter().enumerate() {
            *summary.climate_mut(*variable) = optional(climate[slot], i);
        }
        summary.indice_atmo = optional(index, i);

        summaries.push(summary);
    }

    Ok(summaries)
}

#[derive(Debug)]
pub struct ParquetFileInfo {
    pub total_rows: i64,
    pub row_groups: i32,
    pub row_group_sizes: Vec<i64>,
    pub file_size: u64,
    pub compression: Compression,
}

impl ParquetFileInfo {
    pub fn summary(&self) -> String {
        let avg_rows = if self.row_groups > 0 {
            self.total_rows as f64 / self.row_groups as f64
        } else {
            0.0
        };

        format!(
            "Parquet File Summary:\n\
            - Total rows: {}\n\
            - Row groups: {}\n\
            - File size: {:.2} MB\n\
            - Compression: {:?}\n\
            - Avg rows per group: {:.0}",
            self.total_rows,
            self.row_groups,
            self.file_size as f64 / 1_048_576.0,
            self.compression,
            avg_rows
        )
    }
}
