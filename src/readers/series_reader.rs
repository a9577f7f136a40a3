use crate::error::{ProcessingError, Result};
use crate::models::Pollutant;
use crate::readers::hourly_reader::parse_value;
use csv::ReaderBuilder;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use tracing::debug;

/// Pollutant columns of a table, one value per row
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PollutantSeries {
    columns: BTreeMap<Pollutant, Vec<Option<f64>>>,
    rows: usize,
}

impl PollutantSeries {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_column(mut self, pollutant: Pollutant, values: Vec<Option<f64>>) -> Self {
        self.rows = self.rows.max(values.len());
        self.columns.insert(pollutant, values);
        self
    }

    pub fn get(&self, pollutant: Pollutant) -> Option<&[Option<f64>]> {
        self.columns.get(&pollutant).map(Vec::as_slice)
    }

    pub fn require(&self, pollutant: Pollutant) -> Result<&[Option<f64>]> {
        self.get(pollutant)
            .ok_or_else(|| ProcessingError::MissingColumn(pollutant.column_name().to_string()))
    }

    pub fn pollutants(&self) -> Vec<Pollutant> {
        self.columns.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }
}

/// Reads pollutant columns from a CSV table, ignoring every other column
pub struct SeriesReader;

impl SeriesReader {
    pub fn new() -> Self {
        Self
    }

    pub fn read_series(&self, path: &Path) -> Result<PollutantSeries> {
        let file = File::open(path)?;
        let series = self.read_from(BufReader::new(file))?;
        debug!(
            "Read {} rows of {:?} from {}",
            series.len(),
            series.pollutants(),
            path.display()
        );
        Ok(series)
    }

    pub fn read_from<R: Read>(&self, source: R) -> Result<PollutantSeries> {
        let mut reader = ReaderBuilder::new().trim(csv::Trim::All).from_reader(source);

        let columns: Vec<(usize, Pollutant)> = reader
            .headers()?
            .iter()
            .enumerate()
            .filter_map(|(index, name)| name.parse::<Pollutant>().ok().map(|p| (index, p)))
            .collect();

        let mut values: Vec<Vec<Option<f64>>> = vec![Vec::new(); columns.len()];
        let mut rows = 0;

        for record in reader.records() {
            let record = record?;
            let line = record.position().map_or(0, |p| p.line());
            for (slot, (index, _)) in columns.iter().enumerate() {
                values[slot].push(parse_value(record.get(*index).unwrap_or(""), line)?);
            }
            rows += 1;
        }

        let mut series = PollutantSeries::new();
        for ((_, pollutant), column) in columns.into_iter().zip(values) {
            series = series.with_column(pollutant, column);
        }
        series.rows = rows;
        Ok(series)
    }
}

impl Default for SeriesReader {
    fn default() -> Self {
        Self::new()
    }
}
