use crate::error::{ProcessingError, Result};
use crate::models::{AtmoCategory, ClimateVariable, DailyRegionSummary, Pollutant};
use crate::processors::daily_aggregator::mean_present;
use crate::writers::ParquetWriter;
use chrono::{Datelike, NaiveDate};
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Debug)]
pub struct IndexStatistics {
    pub total_rows: usize,
    pub rows_with_index: usize,
    pub date_range: (NaiveDate, NaiveDate),
    pub region_statistics: BTreeMap<String, RegionIndexStats>,
    /// Keyed by calendar month, 1..=12
    pub monthly_means: BTreeMap<u32, MonthlyMeans>,
}

#[derive(Debug, Default)]
pub struct RegionIndexStats {
    pub days: usize,
    pub days_with_index: usize,
    pub mean_index: Option<f64>,
    /// Highest index and the first day it was reached
    pub worst: Option<(u8, NaiveDate)>,
    pub category_counts: BTreeMap<AtmoCategory, usize>,
    /// Days each pollutant set the index, in `Pollutant::ALL` order
    pub driver_counts: [usize; 5],
}

impl RegionIndexStats {
    pub fn dominant_pollutant(&self) -> Option<Pollutant> {
        Pollutant::ALL
            .iter()
            .copied()
            .filter(|p| self.driver_counts[p.index()] > 0)
            .max_by_key(|p| self.driver_counts[p.index()])
    }
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct MonthlyMeans {
    pub rows: usize,
    pub pollutants: [Option<f64>; 5],
    pub climate: [Option<f64>; 5],
}

pub struct IndexAnalyzer;

impl IndexAnalyzer {
    pub fn new() -> Self {
        Self
    }

    pub fn analyze_parquet(&self, path: &Path) -> Result<IndexStatistics> {
        self.analyze_parquet_with_limit(path, 0)
    }

    /// Analyse up to `limit` rows of a daily table file (0 reads everything)
    pub fn analyze_parquet_with_limit(&self, path: &Path, limit: usize) -> Result<IndexStatistics> {
        let writer = ParquetWriter::new();
        let total_rows = writer.get_file_info(path)?.total_rows.max(0) as usize;

        let rows_to_read = if limit == 0 {
            total_rows
        } else {
            limit.min(total_rows)
        };

        let summaries = writer.read_summaries(path, rows_to_read)?;
        self.analyze(&summaries)
    }

    pub fn analyze(&self, summaries: &[DailyRegionSummary]) -> Result<IndexStatistics> {
        let first = summaries
            .first()
            .ok_or_else(|| ProcessingError::MissingData("No daily rows to analyze".to_string()))?;

        let mut date_range = (first.day, first.day);
        let mut region_statistics: BTreeMap<String, RegionIndexStats> = BTreeMap::new();
        let mut index_sums: BTreeMap<&str, (u64, usize)> = BTreeMap::new();
        let mut by_month: BTreeMap<u32, Vec<&DailyRegionSummary>> = BTreeMap::new();

        for summary in summaries {
            date_range.0 = date_range.0.min(summary.day);
            date_range.1 = date_range.1.max(summary.day);
            by_month.entry(summary.day.month()).or_default().push(summary);

            let stats = region_statistics.entry(summary.region.clone()).or_default();
            stats.days += 1;

            let Some(index) = summary.indice_atmo else {
                continue;
            };

            stats.days_with_index += 1;
            if stats.worst.map_or(true, |(worst, _)| index > worst) {
                stats.worst = Some((index, summary.day));
            }
            if let Some(category) = AtmoCategory::from_grade(index) {
                *stats.category_counts.entry(category).or_insert(0) += 1;
            }
            for pollutant in summary.driving_pollutants() {
                stats.driver_counts[pollutant.index()] += 1;
            }

            let sum = index_sums.entry(summary.region.as_str()).or_insert((0, 0));
            sum.0 += index as u64;
            sum.1 += 1;
        }

        for (region, (sum, count)) in index_sums {
            if let Some(stats) = region_statistics.get_mut(region) {
                stats.mean_index = Some(sum as f64 / count as f64);
            }
        }

        let monthly_means = by_month
            .into_iter()
            .map(|(month, rows)| (month, monthly_means(&rows)))
            .collect();

        Ok(IndexStatistics {
            total_rows: summaries.len(),
            rows_with_index: summaries.iter().filter(|s| s.has_index()).count(),
            date_range,
            region_statistics,
            monthly_means,
        })
    }
}

impl Default for IndexAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

fn monthly_means(rows: &[&DailyRegionSummary]) -> MonthlyMeans {
    let mut means = MonthlyMeans {
        rows: rows.len(),
        ..Default::default()
    };
    for pollutant in Pollutant::ALL {
        means.pollutants[pollutant.index()] = mean_present(rows.iter().map(|r| r.pollutant(pollutant)));
    }
    for (slot, variable) in ClimateVariable::ALL.iter().enumerate() {
        means.climate[slot] = mean_present(rows.iter().map(|r| r.climate(*variable)));
    }
    means
}

fn format_optional(value: Option<f64>) -> String {
    value.map_or("-".to_string(), |v| format!("{:.1}", v))
}

impl IndexStatistics {
    pub fn summary(&self) -> String {
        let coverage = if self.total_rows > 0 {
            100.0 * self.rows_with_index as f64 / self.total_rows as f64
        } else {
            0.0
        };

        let mut summary = format!(
            "Regions: {}\n\
            Date Range: {} to {} ({} days)\n\
            Rows: {} total, {} with an index ({:.1}%)\n",
            self.region_statistics.len(),
            self.date_range.0,
            self.date_range.1,
            self.date_range.1.signed_duration_since(self.date_range.0).num_days() + 1,
            self.total_rows,
            self.rows_with_index,
            coverage
        );

        summary.push_str("\nRegion          days  mean  worst           main driver\n");
        for (region, stats) in &self.region_statistics {
            let worst = stats
                .worst
                .map_or("-".to_string(), |(grade, day)| format!("{} on {}", grade, day));
            let driver = stats
                .dominant_pollutant()
                .map_or("-".to_string(), |p| p.symbol().to_string());

            summary.push_str(&format!(
                "{:<15} {:>4}  {:>4}  {:<15} {}\n",
                region,
                stats.days,
                format_optional(stats.mean_index),
                worst,
                driver
            ));
        }

        summary
    }

    pub fn detailed_summary(&self) -> String {
        let mut summary = self.summary();

        summary.push_str("\nCategory days per region:\n");
        for (region, stats) in &self.region_statistics {
            let bands: Vec<String> = stats
                .category_counts
                .iter()
                .map(|(category, count)| format!("{} {}", category, count))
                .collect();
            summary.push_str(&format!("- {}: {}\n", region, bands.join(", ")));
        }

        summary.push_str("\nMonthly means (µg/m³, climate in native units):\n");
        let header: Vec<&str> = Pollutant::ALL
            .iter()
            .map(|p| p.symbol())
            .chain(ClimateVariable::ALL.iter().map(|v| v.column_name()))
            .collect();
        summary.push_str(&format!("month rows  {}\n", header.join(" | ")));

        for (month, means) in &self.monthly_means {
            let values: Vec<String> = means
                .pollutants
                .iter()
                .chain(means.climate.iter())
                .map(|v| format_optional(*v))
                .collect();
            summary.push_str(&format!(
                "{:>5} {:>4}  {}\n",
                month,
                means.rows,
                values.join(" | ")
            ));
        }

        summary
    }
}
