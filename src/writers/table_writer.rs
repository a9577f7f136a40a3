use crate::error::{ProcessingError, Result};
use crate::models::DailyRegionSummary;
use crate::writers::parquet_writer::create_schema;
use crate::writers::ParquetWriter;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::str::FromStr;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Parquet,
    Csv,
    Json,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Parquet => "parquet",
            OutputFormat::Csv => "csv",
            OutputFormat::Json => "json",
        }
    }

    /// Format implied by a file extension, if recognised
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(|e| e.parse().ok())
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for OutputFormat {
    type Err = ProcessingError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "parquet" | "pq" => Ok(OutputFormat::Parquet),
            "csv" => Ok(OutputFormat::Csv),
            "json" => Ok(OutputFormat::Json),
            other => Err(ProcessingError::Config(format!(
                "Unsupported output format: {}",
                other
            ))),
        }
    }
}

/// Writes the daily table in any supported output format
pub struct TableWriter {
    format: OutputFormat,
    parquet: ParquetWriter,
}

impl TableWriter {
    pub fn new(format: OutputFormat) -> Self {
        Self {
            format,
            parquet: ParquetWriter::new(),
        }
    }

    pub fn with_parquet_writer(mut self, parquet: ParquetWriter) -> Self {
        self.parquet = parquet;
        self
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }

    pub fn write(&self, summaries: &[DailyRegionSummary], path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        match self.format {
            OutputFormat::Parquet => self.parquet.write_summaries(summaries, path)?,
            OutputFormat::Csv => write_csv(summaries, File::create(path)?)?,
            OutputFormat::Json => write_json(summaries, BufWriter::new(File::create(path)?))?,
        }

        info!(
            "Wrote {} daily rows as {} to {}",
            summaries.len(),
            self.format,
            path.display()
        );
        Ok(())
    }
}

/// CSV with a header row; missing values are empty fields
pub fn write_csv<W: Write>(summaries: &[DailyRegionSummary], sink: W) -> Result<()> {
    let mut writer = csv::Writer::from_writer(sink);
    // Serialization only emits the header with the first row
    if summaries.is_empty() {
        writer.write_record(create_schema().fields().iter().map(|f| f.name()))?;
    }
    for summary in summaries {
        writer.serialize(summary)?;
    }
    writer.flush()?;
    Ok(())
}

/// JSON array of row objects; missing values are null
pub fn write_json<W: Write>(summaries: &[DailyRegionSummary], mut sink: W) -> Result<()> {
    serde_json::to_writer_pretty(&mut sink, summaries)?;
    writeln!(sink)?;
    sink.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::GroupKey;
    use chrono::NaiveDate;
    use tempfile::TempDir;

    fn row() -> DailyRegionSummary {
        let day = NaiveDate::from_ymd_opt(2024, 1, 9).unwrap();
        let mut summary = DailyRegionSummary::empty(GroupKey::new(day, "Bretagne"));
        summary.pm10 = Some(12.5);
        summary.subindex_pm10 = Some(2);
        summary.indice_atmo = Some(2);
        summary
    }

    #[test]
    fn test_format_parsing() {
        assert_eq!("CSV".parse::<OutputFormat>().unwrap(), OutputFormat::Csv);
        assert_eq!(
            OutputFormat::from_path(Path::new("out/table.json")),
            Some(OutputFormat::Json)
        );
        assert_eq!(OutputFormat::from_path(Path::new("table")), None);
        assert!("xlsx".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn test_csv_output() {
        let mut buffer = Vec::new();
        write_csv(&[row()], &mut buffer).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        let mut lines = text.lines();

        let header = lines.next().unwrap();
        assert!(header.starts_with("day,region,pm10,pm2_5"));
        assert!(header.ends_with("subindex_so2,indice_atmo"));
        assert!(lines.next().unwrap().starts_with("2024-01-09,Bretagne,12.5,,"));
    }

    #[test]
    fn test_empty_csv_keeps_header() {
        let mut with_row = Vec::new();
        write_csv(&[row()], &mut with_row).unwrap();
        let mut empty = Vec::new();
        write_csv(&[], &mut empty).unwrap();

        let expected = String::from_utf8(with_row).unwrap();
        let text = String::from_utf8(empty).unwrap();
        assert_eq!(text.lines().count(), 1);
        assert_eq!(text.lines().next(), expected.lines().next());
    }

    #[test]
    fn test_json_output() {
        let mut buffer = Vec::new();
        write_json(&[row()], &mut buffer).unwrap();

        let parsed: serde_json::Value = serde_json::from_slice(&buffer).unwrap();
        assert_eq!(parsed[0]["region"], "Bretagne");
        assert_eq!(parsed[0]["indice_atmo"], 2);
        assert!(parsed[0]["ozone"].is_null());
    }

    #[test]
    fn test_write_creates_parent_directory() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("atmo.csv");

        TableWriter::new(OutputFormat::Csv).write(&[row()], &path).unwrap();
        assert!(path.exists());
    }
}
