use crate::error::{ProcessingError, Result};
use crate::models::{DailyRegionSummary, HourlyObservation};
use crate::processors::atmo_calculator::{distinct_keys, filter_regions, AtmoCalculator};
use crate::processors::daily_aggregator::DailyAggregate;
use crate::processors::{IntegrityChecker, IntegrityReport};
use crate::readers::ConcurrentReader;
use crate::utils::constants::DEFAULT_CHUNK_SIZE;
use crate::utils::progress::ProgressReporter;
use rayon::prelude::*;
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{info, warn};

pub struct ParallelProcessor {
    max_workers: usize,
    chunk_size: usize,
    use_mmap: bool,
}

impl ParallelProcessor {
    pub fn new(max_workers: usize) -> Self {
        Self {
            max_workers: max_workers.max(1),
            chunk_size: DEFAULT_CHUNK_SIZE,
            use_mmap: false,
        }
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    pub fn with_mmap(mut self, use_mmap: bool) -> Self {
        self.use_mmap = use_mmap;
        self
    }

    /// Same result as `AtmoCalculator::compute`, with groups aggregated
    /// on a worker pool.
    ///
    /// Each (day, region) group is independent; the join back onto the
    /// input keys keeps the sequential row order.
    pub fn compute_parallel<S: AsRef<str>>(
        &self,
        observations: &[HourlyObservation],
        calculator: &AtmoCalculator,
        regions: &[S],
        progress: Option<&ProgressReporter>,
    ) -> Result<Vec<DailyRegionSummary>> {
        let groups = calculator.aggregator().group(observations);
        let total_groups = groups.len();
        let processed = AtomicUsize::new(0);

        if let Some(p) = progress {
            p.set_message(&format!("Aggregating {} daily groups...", total_groups));
        }

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.max_workers)
            .build()
            .map_err(|e| ProcessingError::Config(e.to_string()))?;

        let aggregates: HashMap<_, DailyAggregate> = pool.install(|| {
            groups
                .par_chunks(self.chunk_size)
                .flat_map_iter(|chunk| {
                    let aggregated: Vec<_> = chunk
                        .iter()
                        .map(|(key, rows)| (key.clone(), calculator.aggregator().aggregate_group(rows)))
                        .collect();

                    let count = processed.fetch_add(chunk.len(), Ordering::Relaxed) + chunk.len();
                    if let Some(p) = progress {
                        p.update(count as u64);
                    }

                    aggregated
                })
                .collect()
        });

        let summaries = calculator.assemble(distinct_keys(observations), &aggregates)?;
        Ok(filter_regions(summaries, regions))
    }

    /// Read hourly files, check them and compute the daily index table.
    ///
    /// `None` for `regions` keeps every region present in the input.
    pub async fn process_files(
        &self,
        paths: &[PathBuf],
        calculator: &AtmoCalculator,
        regions: Option<&[String]>,
        progress: Option<&ProgressReporter>,
    ) -> Result<(Vec<DailyRegionSummary>, IntegrityReport)> {
        if let Some(p) = progress {
            p.set_message(&format!("Reading {} input files...", paths.len()));
        }

        let reader = ConcurrentReader::new(self.max_workers).with_mmap(self.use_mmap);
        let observations = reader.read_all(paths).await?;

        if let Some(p) = progress {
            p.set_message("Checking data integrity...");
        }

        let integrity_report = IntegrityChecker::new().check_observations(&observations);
        if !integrity_report.violations.is_empty() {
            warn!(
                "Integrity check found {} issues in {} hourly rows",
                integrity_report.violations.len(),
                integrity_report.total_rows
            );
        }

        let all_regions;
        let regions = match regions {
            Some(regions) => regions,
            None => {
                all_regions = distinct_regions(&observations);
                all_regions.as_slice()
            }
        };

        let summaries = self.compute_parallel(&observations, calculator, regions, progress)?;
        info!(
            "Computed {} daily rows from {} hourly rows",
            summaries.len(),
            observations.len()
        );

        if let Some(p) = progress {
            p.finish_with_message(&format!("Computed {} daily rows", summaries.len()));
        }

        Ok((summaries, integrity_report))
    }
}

/// Regions in order of first appearance
pub fn distinct_regions(observations: &[HourlyObservation]) -> Vec<String> {
    let mut seen = HashSet::new();
    observations
        .iter()
        .filter(|o| seen.insert(o.region.as_str()))
        .map(|o| o.region.clone())
        .collect()
}

impl Default for ParallelProcessor {
    fn default() -> Self {
        Self::new(num_cpus::get())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Pollutant;
    use crate::processors::MissingPolicy;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;

    fn observations() -> Vec<HourlyObservation> {
        let regions = ["Bretagne", "Occitanie", "Hauts-de-France"];
        let mut rows = Vec::new();
        for d in 1..=5 {
            let day = NaiveDate::from_ymd_opt(2024, 7, d).unwrap();
            for hour in 0..24 {
                for (i, region) in regions.iter().enumerate() {
                    let base = (d * 7 + hour + i as u32 * 13) as f64;
                    let mut row = HourlyObservation::new(day, *region, hour)
                        .with_pollutant(Pollutant::Pm10, Some(base % 60.0))
                        .with_pollutant(Pollutant::Pm2_5, Some(base % 30.0))
                        .with_pollutant(Pollutant::NitrogenDioxide, Some(base * 2.0 % 150.0))
                        .with_pollutant(Pollutant::Ozone, Some(base * 3.0 % 200.0));
                    if hour % 5 != 0 {
                        row.sulphur_dioxide = Some(base % 40.0);
                    }
                    rows.push(row);
                }
            }
        }
        rows
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let rows = observations();
        let calculator = AtmoCalculator::new().with_missing_policy(MissingPolicy::Propagate);
        let regions = ["Occitanie", "Bretagne"];

        let sequential = calculator.compute(&rows, &regions).unwrap();
        let parallel = ParallelProcessor::new(4)
            .with_chunk_size(2)
            .compute_parallel(&rows, &calculator, &regions, None)
            .unwrap();

        assert_eq!(sequential.len(), 10);
        assert_eq!(parallel, sequential);
    }

    #[test]
    fn test_single_worker() {
        let rows = observations();
        let calculator = AtmoCalculator::new();

        let parallel = ParallelProcessor::new(1)
            .compute_parallel(&rows, &calculator, &["Hauts-de-France"], None)
            .unwrap();

        assert_eq!(parallel.len(), 5);
        assert!(parallel.iter().all(|s| s.indice_atmo.is_some()));
    }

    #[tokio::test]
    async fn test_process_files() {
        use std::io::Write;
        use tempfile::NamedTempFile;

        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            "day,region,pm10,pm2_5,nitrogen_dioxide,ozone,sulphur_dioxide,\
             temperature_2m,relative_humidity_2m,precipitation,surface_pressure,wind_speed_10m"
        )
        .unwrap();
        for _ in 0..8 {
            writeln!(file, "2024-07-01,Corse,12,6,30,90,3,25,50,0,1015,11").unwrap();
        }

        let (summaries, report) = ParallelProcessor::new(2)
            .process_files(&[file.path().to_path_buf()], &AtmoCalculator::new(), None, None)
            .await
            .unwrap();

        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].ozone, Some(90.0));
        assert_eq!(report.total_rows, 8);
        assert_eq!(report.count(crate::processors::ViolationType::DuplicateHour), 0);

        let only_other = vec!["Bretagne".to_string()];
        let (filtered, _) = ParallelProcessor::new(1)
            .process_files(
                &[file.path().to_path_buf()],
                &AtmoCalculator::new(),
                Some(only_other.as_slice()),
                None,
            )
            .await
            .unwrap();
        assert!(filtered.is_empty());
    }

    #[tokio::test]
    async fn test_group_split_across_files_matches_single_file() {
        use tempfile::TempDir;

        let header = "day,region,pm10,pm2_5,nitrogen_dioxide,ozone,sulphur_dioxide,\
                      temperature_2m,relative_humidity_2m,precipitation,surface_pressure,wind_speed_10m";
        let rows = |ozone: f64| -> String {
            (0..8)
                .map(|_| format!("2024-07-01,Corse,12,6,30,{},3,25,50,0,1015,11\n", ozone))
                .collect()
        };

        let dir = TempDir::new().unwrap();
        let whole = dir.path().join("whole.csv");
        std::fs::write(&whole, format!("{}\n{}{}", header, rows(0.0), rows(100.0))).unwrap();
        let first = dir.path().join("a.csv");
        std::fs::write(&first, format!("{}\n{}", header, rows(0.0))).unwrap();
        let second = dir.path().join("b.csv");
        std::fs::write(&second, format!("{}\n{}", header, rows(100.0))).unwrap();

        let processor = ParallelProcessor::new(2);
        let calculator = AtmoCalculator::new();
        let (single, _) = processor
            .process_files(&[whole], &calculator, None, None)
            .await
            .unwrap();
        let (split, report) = processor
            .process_files(&[first, second], &calculator, None, None)
            .await
            .unwrap();

        assert_eq!(single[0].ozone, Some(100.0));
        assert_eq!(single[0].subindex_o3, Some(4));
        assert_eq!(split, single);
        assert_eq!(report.count(crate::processors::ViolationType::DuplicateHour), 0);
    }

    #[test]
    fn test_distinct_regions() {
        let regions = distinct_regions(&observations());
        assert_eq!(regions, vec!["Bretagne", "Occitanie", "Hauts-de-France"]);
    }
}
