use crate::analyzers::{ForecastEvaluator, IndexAnalyzer};
use crate::cli::args::{Cli, Commands};
use crate::config::AtmoConfig;
use crate::error::{ProcessingError, Result};
use crate::models::{AtmoCategory, DailyRegionSummary, Pollutant};
use crate::processors::{AtmoCalculator, IntegrityChecker, MissingPolicy, ParallelProcessor};
use crate::readers::{ConcurrentReader, SeriesReader};
use crate::utils::filename::generate_default_output_filename;
use crate::utils::progress::ProgressReporter;
use crate::writers::{OutputFormat, ParquetWriter, TableWriter};
use std::path::{Path, PathBuf};
use tracing::info;

pub async fn run(cli: Cli) -> Result<()> {
    let config = AtmoConfig::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Compute {
            input,
            output_file,
            regions,
            format,
            compression,
            missing_policy,
            max_workers,
            chunk_size,
            mmap,
        } => {
            let options = ComputeOptions {
                input,
                output_file,
                regions,
                format,
                compression,
                missing_policy,
                max_workers,
                chunk_size,
                mmap,
            };
            compute(options, &config, cli.verbose).await
        }
        Commands::Validate { input, max_workers } => {
            validate(&input, max_workers.unwrap_or(config.processing.max_workers)).await
        }
        Commands::Info {
            file,
            sample,
            analysis_limit,
            detailed,
        } => info_command(&file, sample, analysis_limit, detailed),
        Commands::Grade { pollutant, value } => grade(&pollutant, value, &config),
        Commands::Evaluate {
            forecast,
            observed,
            history,
            pollutants,
        } => evaluate(&forecast, &observed, &history, &pollutants),
    }
}

struct ComputeOptions {
    input: Vec<PathBuf>,
    output_file: Option<PathBuf>,
    regions: Vec<String>,
    format: Option<String>,
    compression: Option<String>,
    missing_policy: Option<String>,
    max_workers: Option<usize>,
    chunk_size: Option<usize>,
    mmap: bool,
}

async fn compute(options: ComputeOptions, config: &AtmoConfig, verbose: bool) -> Result<()> {
    let missing_policy = match options.missing_policy {
        Some(policy) => policy.parse::<MissingPolicy>()?,
        None => config.index.missing_policy,
    };
    let calculator = AtmoCalculator::new()
        .with_tables(config.index.index_tables()?)
        .with_missing_policy(missing_policy);

    // Explicit flag, then output extension, then configuration
    let format = match (&options.format, &options.output_file) {
        (Some(format), _) => format.parse::<OutputFormat>()?,
        (None, Some(path)) => OutputFormat::from_path(path).unwrap_or(config.output.format),
        (None, None) => config.output.format,
    };
    let output_file = options
        .output_file
        .unwrap_or_else(|| generate_default_output_filename(format));
    let compression = options
        .compression
        .unwrap_or_else(|| config.output.compression.clone());

    let parquet = ParquetWriter::new()
        .with_compression(&compression)?
        .with_row_group_size(config.output.row_group_size);
    let writer = TableWriter::new(format).with_parquet_writer(parquet);

    let regions = if !options.regions.is_empty() {
        Some(options.regions)
    } else if !config.regions.is_empty() {
        Some(config.regions.clone())
    } else {
        None
    };

    let max_workers = options.max_workers.unwrap_or(config.processing.max_workers);
    let chunk_size = options.chunk_size.unwrap_or(config.processing.chunk_size);
    let paths = ConcurrentReader::expand_inputs(&options.input)?;

    println!("Computing daily ATMO index...");
    println!("Input files: {}", paths.len());
    println!("Output file: {} ({})", output_file.display(), format);
    match &regions {
        Some(regions) => println!("Regions: {}", regions.join(", ")),
        None => println!("Regions: all"),
    }
    println!(
        "Missing sub-indices: {:?}, Workers: {}, Chunk size: {}",
        missing_policy, max_workers, chunk_size
    );

    let progress = ProgressReporter::new_spinner("Processing data...", false);
    let processor = ParallelProcessor::new(max_workers)
        .with_chunk_size(chunk_size)
        .with_mmap(options.mmap || config.processing.use_mmap);

    let (summaries, integrity_report) = processor
        .process_files(&paths, &calculator, regions.as_deref(), Some(&progress))
        .await?;

    if !integrity_report.violations.is_empty() {
        println!(
            "\nData quality: {} issues in {} hourly rows (run `validate` for details)",
            integrity_report.violations.len(),
            integrity_report.total_rows
        );
        if verbose {
            println!(
                "{}",
                IntegrityChecker::new().generate_summary(&integrity_report)
            );
        }
    }

    writer.write(&summaries, &output_file)?;
    info!("Daily table written to {}", output_file.display());

    println!("\nWrote {} daily rows to {}", summaries.len(), output_file.display());
    if !summaries.is_empty() {
        println!("\n{}", IndexAnalyzer::new().analyze(&summaries)?.summary());
    }

    Ok(())
}

async fn validate(input: &[PathBuf], max_workers: usize) -> Result<()> {
    let paths = ConcurrentReader::expand_inputs(input)?;
    println!("Validating {} input files...", paths.len());

    let progress = ProgressReporter::new_spinner("Reading hourly data...", false);
    let observations = ConcurrentReader::new(max_workers).read_all(&paths).await?;
    progress.finish_with_message(&format!("Read {} hourly rows", observations.len()));

    let checker = IntegrityChecker::new();
    let report = checker.check_observations(&observations);
    println!("\n{}", checker.generate_summary(&report));

    if report.has_blocking_violations() {
        return Err(ProcessingError::InvalidFormat(
            "input contains negative or non-finite concentrations".to_string(),
        ));
    }

    println!("Validation completed");
    Ok(())
}

fn info_command(file: &Path, sample: usize, analysis_limit: usize, detailed: bool) -> Result<()> {
    let writer = ParquetWriter::new();

    let file_info = writer.get_file_info(file)?;
    println!("{}", file_info.summary());

    if file_info.total_rows == 0 {
        println!("\nNo daily rows to analyze");
        return Ok(());
    }

    let statistics = IndexAnalyzer::new().analyze_parquet_with_limit(file, analysis_limit)?;
    println!("\n=== Index Statistics ===");
    if detailed {
        println!("{}", statistics.detailed_summary());
    } else {
        println!("{}", statistics.summary());
    }

    if sample > 0 {
        let rows = writer.read_summaries(file, sample)?;
        println!("\nSample rows (first {}):", rows.len());
        for row in &rows {
            println!("  {}", describe_row(row));
        }
    }

    Ok(())
}

fn describe_row(row: &DailyRegionSummary) -> String {
    match (row.indice_atmo, row.category()) {
        (Some(index), Some(category)) => {
            let drivers: Vec<&str> = row.driving_pollutants().iter().map(|p| p.symbol()).collect();
            format!(
                "{} {}: index {} ({}) driven by {}",
                row.day,
                row.region,
                index,
                category,
                drivers.join(", ")
            )
        }
        _ => format!("{} {}: no index", row.day, row.region),
    }
}

fn grade(pollutant: &str, value: f64, config: &AtmoConfig) -> Result<()> {
    let pollutant: Pollutant = pollutant.parse()?;
    let grade = config.index.index_tables()?.grade(pollutant, value)?;

    let category = AtmoCategory::from_grade(grade).ok_or_else(|| {
        ProcessingError::InvalidFormat(format!("grade {} has no category", grade))
    })?;

    println!(
        "{} {} µg/m³ -> sub-index {} ({}, {})",
        pollutant.symbol(),
        value,
        grade,
        category,
        category.color()
    );
    Ok(())
}

fn evaluate(forecast: &Path, observed: &Path, history: &Path, pollutants: &[String]) -> Result<()> {
    let reader = SeriesReader::new();
    let forecast = reader.read_series(forecast)?;
    let observed = reader.read_series(observed)?;
    let history = reader.read_series(history)?;

    let pollutants = if pollutants.is_empty() {
        forecast.pollutants()
    } else {
        pollutants
            .iter()
            .map(|p| p.parse())
            .collect::<Result<Vec<Pollutant>>>()?
    };

    let evaluation = ForecastEvaluator::new(pollutants).evaluate(&forecast, &observed, &history)?;
    println!("{}", evaluation.summary());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_info_on_empty_table() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("empty.parquet");
        TableWriter::new(OutputFormat::Parquet)
            .write(&[], &path)
            .unwrap();

        assert!(info_command(&path, 10, 0, true).is_ok());
    }
}
