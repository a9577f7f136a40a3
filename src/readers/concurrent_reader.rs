use crate::error::{ProcessingError, Result};
use crate::models::HourlyObservation;
use crate::readers::hourly_reader::{HourlyBatch, HourlyReader};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use tokio::task::JoinHandle;
use tracing::info;

/// Reads several hourly CSV files at once
pub struct ConcurrentReader {
    max_workers: usize,
    use_mmap: bool,
}

impl ConcurrentReader {
    pub fn new(max_workers: usize) -> Self {
        Self {
            max_workers: max_workers.max(1),
            use_mmap: false,
        }
    }

    pub fn with_mmap(mut self, use_mmap: bool) -> Self {
        self.use_mmap = use_mmap;
        self
    }

    /// Read all files concurrently.
    ///
    /// Rows are concatenated in the order the paths are given, so the
    /// result is the same as reading the files one after another as a
    /// single table.
    pub async fn read_all(&self, paths: &[PathBuf]) -> Result<Vec<HourlyObservation>> {
        let paths = paths.to_vec();
        let max_workers = self.max_workers;
        let use_mmap = self.use_mmap;

        let handle: JoinHandle<Result<Vec<HourlyBatch>>> =
            tokio::task::spawn_blocking(move || {
                Self::read_files_parallel_static(&paths, max_workers, use_mmap)
            });

        let observations = HourlyBatch::concat(handle.await??);

        info!("Read {} hourly observations in total", observations.len());
        Ok(observations)
    }

    fn read_files_parallel_static(
        paths: &[PathBuf],
        max_workers: usize,
        use_mmap: bool,
    ) -> Result<Vec<HourlyBatch>> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(max_workers)
            .build()
            .map_err(|e| ProcessingError::Config(e.to_string()))?;

        pool.install(|| {
            paths
                .par_iter()
                .map(|path| {
                    let reader = HourlyReader::with_mmap(use_mmap);
                    reader.read_batch(path)
                })
                .collect()
        })
    }

    /// CSV files directly inside a directory, sorted by name
    pub fn find_csv_files(dir_path: &Path) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        for entry in std::fs::read_dir(dir_path)? {
            let path = entry?.path();
            let is_csv = path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e.eq_ignore_ascii_case("csv"));
            if path.is_file() && is_csv {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }

    /// Expand directories into their CSV files, keep plain files as given
    pub fn expand_inputs(inputs: &[PathBuf]) -> Result<Vec<PathBuf>> {
        let mut paths = Vec::new();
        for input in inputs {
            if input.is_dir() {
                paths.extend(Self::find_csv_files(input)?);
            } else {
                paths.push(input.clone());
            }
        }

        if paths.is_empty() {
            return Err(ProcessingError::MissingData(
                "no input CSV files found".to_string(),
            ));
        }
        Ok(paths)
    }
}

impl Default for ConcurrentReader {
    fn default() -> Self {
        Self::new(num_cpus::get())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const HEADER: &str = "day,region,pm10,pm2_5,nitrogen_dioxide,ozone,sulphur_dioxide,\
temperature_2m,relative_humidity_2m,precipitation,surface_pressure,wind_speed_10m";

    fn write_region(dir: &Path, name: &str, region: &str, hours: usize) -> PathBuf {
        let mut content = format!("{}\n", HEADER);
        for h in 0..hours {
            content.push_str(&format!(
                "2024-04-01,{},{},4,20,50,2,12,70,0,1012,9\n",
                region,
                10 + h
            ));
        }
        let path = dir.join(name);
        fs::write(&path, content).unwrap();
        path
    }

    #[tokio::test]
    async fn test_read_all_keeps_file_order() {
        let dir = TempDir::new().unwrap();
        let second = write_region(dir.path(), "b.csv", "Normandie", 3);
        let first = write_region(dir.path(), "a.csv", "Bretagne", 2);

        let rows = ConcurrentReader::new(2)
            .read_all(&[second, first])
            .await
            .unwrap();

        assert_eq!(rows.len(), 5);
        assert_eq!(rows[0].region, "Normandie");
        assert_eq!(rows[4].region, "Bretagne");
    }

    #[tokio::test]
    async fn test_group_split_over_files_continues_hours() {
        let dir = TempDir::new().unwrap();
        let first = write_region(dir.path(), "a.csv", "Bretagne", 3);
        let second = write_region(dir.path(), "b.csv", "Bretagne", 2);

        let rows = ConcurrentReader::new(2)
            .read_all(&[first, second])
            .await
            .unwrap();

        let hours: Vec<u32> = rows.iter().map(|r| r.hour).collect();
        assert_eq!(hours, vec![0, 1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn test_read_all_propagates_errors() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("missing.csv");

        assert!(ConcurrentReader::new(1).read_all(&[missing]).await.is_err());
    }

    #[test]
    fn test_expand_inputs() {
        let dir = TempDir::new().unwrap();
        write_region(dir.path(), "b.csv", "Normandie", 1);
        write_region(dir.path(), "a.csv", "Bretagne", 1);
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let paths = ConcurrentReader::expand_inputs(&[dir.path().to_path_buf()]).unwrap();
        let names: Vec<_> = paths
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["a.csv", "b.csv"]);

        let empty = TempDir::new().unwrap();
        assert!(ConcurrentReader::expand_inputs(&[empty.path().to_path_buf()]).is_err());
    }
}
