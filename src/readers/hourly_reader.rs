use crate::error::{ProcessingError, Result};
use crate::models::{ClimateVariable, GroupKey, HourlyObservation, Pollutant};
use crate::utils::constants::{
    DATE_COLUMN, DAY_COLUMN, DEFAULT_BUFFER_SIZE, HOUR_COLUMN, REGION_COLUMN,
};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Timelike};
use csv::{ReaderBuilder, StringRecord};
use memmap2::Mmap;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use tracing::{debug, info};

/// Column positions resolved from the header row
#[derive(Debug, Clone)]
struct HeaderLayout {
    day: Option<usize>,
    date: Option<usize>,
    hour: Option<usize>,
    region: usize,
    pollutants: [usize; 5],
    climate: [usize; 5],
}

impl HeaderLayout {
    fn from_headers(headers: &StringRecord) -> Result<Self> {
        let position = |name: &str| headers.iter().position(|h| h.trim() == name);
        let required = |name: &str| {
            position(name).ok_or_else(|| ProcessingError::MissingColumn(name.to_string()))
        };

        let day = position(DAY_COLUMN);
        let date = position(DATE_COLUMN);
        if day.is_none() && date.is_none() {
            return Err(ProcessingError::MissingColumn(format!(
                "{} (or {})",
                DAY_COLUMN, DATE_COLUMN
            )));
        }

        let mut pollutants = [0; 5];
        for pollutant in Pollutant::ALL {
            pollutants[pollutant.index()] = required(pollutant.column_name())?;
        }

        let mut climate = [0; 5];
        for (slot, variable) in ClimateVariable::ALL.iter().enumerate() {
            climate[slot] = required(variable.column_name())?;
        }

        Ok(Self {
            day,
            date,
            hour: position(HOUR_COLUMN),
            region: required(REGION_COLUMN)?,
            pollutants,
            climate,
        })
    }
}

/// Reads hourly observation tables from CSV
pub struct HourlyReader {
    use_mmap: bool,
}

impl HourlyReader {
    pub fn new() -> Self {
        Self { use_mmap: false }
    }

    pub fn with_mmap(use_mmap: bool) -> Self {
        Self { use_mmap }
    }

    /// Read hourly observations from a CSV file
    pub fn read_observations(&self, path: &Path) -> Result<Vec<HourlyObservation>> {
        Ok(self.read_batch(path)?.observations)
    }

    /// Read a CSV file, keeping track of rows whose hour is positional
    pub fn read_batch(&self, path: &Path) -> Result<HourlyBatch> {
        let file = File::open(path)?;

        let batch = if self.use_mmap {
            let mmap = unsafe { Mmap::map(&file)? };
            self.read_batch_from(&mmap[..])?
        } else {
            self.read_batch_from(BufReader::with_capacity(DEFAULT_BUFFER_SIZE, file))?
        };

        info!(
            "Read {} hourly observations from {}",
            batch.observations.len(),
            path.display()
        );
        Ok(batch)
    }

    /// Read hourly observations from any CSV source with a header row.
    ///
    /// Fails with `MissingColumn` when a required column is absent; extra
    /// columns are ignored.
    pub fn read_from<R: Read>(&self, source: R) -> Result<Vec<HourlyObservation>> {
        Ok(self.read_batch_from(source)?.observations)
    }

    pub fn read_batch_from<R: Read>(&self, source: R) -> Result<HourlyBatch> {
        let mut reader = ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(false)
            .from_reader(source);

        let layout = HeaderLayout::from_headers(reader.headers()?)?;
        debug!("Resolved input columns: {:?}", layout);

        let mut sequence: HashMap<GroupKey, u32> = HashMap::new();
        let mut batch = HourlyBatch::default();

        for record in reader.records() {
            let record = record?;
            let line = record.position().map_or(0, |p| p.line());
            let (observation, positional) =
                self.parse_record(&record, &layout, line, &mut sequence)?;
            batch.observations.push(observation);
            batch.positional.push(positional);
        }

        Ok(batch)
    }

    fn parse_record(
        &self,
        record: &StringRecord,
        layout: &HeaderLayout,
        line: u64,
        sequence: &mut HashMap<GroupKey, u32>,
    ) -> Result<(HourlyObservation, bool)> {
        let field = move |index: usize| record.get(index).unwrap_or("");

        let timestamp = match layout.date {
            Some(index) if !field(index).is_empty() => Some(parse_timestamp(field(index), line)?),
            _ => None,
        };

        let day = match (layout.day, timestamp) {
            (Some(index), _) if !field(index).is_empty() => {
                NaiveDate::parse_from_str(field(index), "%Y-%m-%d").map_err(|_| {
                    ProcessingError::InvalidFormat(format!(
                        "line {}: invalid day '{}'",
                        line,
                        field(index)
                    ))
                })?
            }
            (_, Some(ts)) => ts.date(),
            _ => {
                return Err(ProcessingError::InvalidFormat(format!(
                    "line {}: no day or date value",
                    line
                )))
            }
        };

        let region = field(layout.region);
        if region.is_empty() {
            return Err(ProcessingError::InvalidFormat(format!(
                "line {}: empty region",
                line
            )));
        }

        let explicit_hour = match layout.hour {
            Some(index) if !field(index).is_empty() => {
                Some(field(index).parse::<u32>().map_err(|_| {
                    ProcessingError::InvalidFormat(format!(
                        "line {}: invalid hour '{}'",
                        line,
                        field(index)
                    ))
                })?)
            }
            _ => None,
        };

        // Without any time information, the hour is the row's position in its group
        let position = sequence
            .entry(GroupKey::new(day, region))
            .and_modify(|n| *n += 1)
            .or_insert(0);
        let timed_hour = explicit_hour.or_else(|| timestamp.map(|ts| ts.hour()));
        let hour = timed_hour.unwrap_or(*position);

        let mut observation = HourlyObservation::new(day, region, hour);
        for pollutant in Pollutant::ALL {
            let index = layout.pollutants[pollutant.index()];
            *observation.pollutant_mut(pollutant) = parse_value(field(index), line)?;
        }
        for (slot, variable) in ClimateVariable::ALL.iter().enumerate() {
            *observation.climate_mut(*variable) = parse_value(field(layout.climate[slot]), line)?;
        }

        Ok((observation, timed_hour.is_none()))
    }
}

impl Default for HourlyReader {
    fn default() -> Self {
        Self::new()
    }
}

/// Rows read from one source
#[derive(Debug, Clone, Default)]
pub struct HourlyBatch {
    pub observations: Vec<HourlyObservation>,
    /// Per row: the hour is the row's position in its (day, region) group
    pub positional: Vec<bool>,
}

impl HourlyBatch {
    /// Concatenate batches in order.
    ///
    /// Positional hours continue across batches, so a group split over
    /// several files is numbered as if the files were one table.
    pub fn concat(batches: Vec<HourlyBatch>) -> Vec<HourlyObservation> {
        let mut offsets: HashMap<GroupKey, u32> = HashMap::new();
        let mut observations = Vec::new();

        for batch in batches {
            let mut counts: HashMap<GroupKey, u32> = HashMap::new();
            let rows = batch.observations.into_iter().zip(batch.positional);
            for (mut observation, positional) in rows {
                let key = observation.key();
                if positional {
                    observation.hour += offsets.get(&key).copied().unwrap_or(0);
                }
                *counts.entry(key).or_insert(0) += 1;
                observations.push(observation);
            }
            for (key, count) in counts {
                *offsets.entry(key).or_insert(0) += count;
            }
        }

        observations
    }
}

/// Parse a measure; empty fields and NaN are missing readings
pub fn parse_value(raw: &str, line: u64) -> Result<Option<f64>> {
    if raw.is_empty() || raw.eq_ignore_ascii_case("na") {
        return Ok(None);
    }

    let value = raw.parse::<f64>().map_err(|_| {
        ProcessingError::InvalidFormat(format!("line {}: invalid number '{}'", line, raw))
    })?;

    Ok(if value.is_nan() { None } else { Some(value) })
}

/// Parse an hourly timestamp into UTC wall-clock time
pub fn parse_timestamp(raw: &str, line: u64) -> Result<NaiveDateTime> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.naive_utc());
    }
    if let Ok(ts) = DateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%:z") {
        return Ok(ts.naive_utc());
    }

    ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        .ok_or_else(|| {
            ProcessingError::InvalidFormat(format!("line {}: invalid timestamp '{}'", line, raw))
        })
}
