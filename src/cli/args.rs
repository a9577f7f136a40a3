use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "atmo-processor")]
#[command(about = "Daily ATMO air-quality index from hourly regional observations")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(short, long, global = true, help = "Enable verbose logging")]
    pub verbose: bool,

    #[arg(long, global = true, help = "Log file path")]
    pub log_file: Option<PathBuf>,

    #[arg(long, global = true, help = "Configuration file [default: atmo.toml if present]")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Compute the daily index table from hourly CSV files
    Compute {
        #[arg(
            short,
            long,
            required = true,
            num_args = 1..,
            help = "Hourly CSV files or directories containing them"
        )]
        input: Vec<PathBuf>,

        #[arg(
            short,
            long,
            help = "Output file path [default: output/atmo-index-{YYMMDD}.{ext}]"
        )]
        output_file: Option<PathBuf>,

        #[arg(
            short,
            long = "region",
            help = "Region to keep (repeatable) [default: config regions, else all]"
        )]
        regions: Vec<String>,

        #[arg(short, long, help = "parquet, csv or json [default: from output extension]")]
        format: Option<String>,

        #[arg(short, long, help = "snappy, gzip, lz4, zstd or none")]
        compression: Option<String>,

        #[arg(long, help = "skip or propagate")]
        missing_policy: Option<String>,

        #[arg(long)]
        max_workers: Option<usize>,

        #[arg(long)]
        chunk_size: Option<usize>,

        #[arg(long, default_value = "false", help = "Memory-map input files")]
        mmap: bool,
    },

    /// Check hourly CSV files without computing the index
    Validate {
        #[arg(short, long, required = true, num_args = 1..)]
        input: Vec<PathBuf>,

        #[arg(long)]
        max_workers: Option<usize>,
    },

    /// Display information about a daily index Parquet file
    Info {
        #[arg(short, long)]
        file: PathBuf,

        #[arg(short, long, default_value = "10")]
        sample: usize,

        #[arg(
            long,
            default_value = "0",
            help = "Maximum rows to analyze (0 = all rows)"
        )]
        analysis_limit: usize,

        #[arg(long, default_value = "false", help = "Include category and monthly tables")]
        detailed: bool,
    },

    /// Grade a single concentration
    Grade {
        #[arg(short, long, help = "pm10, pm2_5, no2, o3 or so2")]
        pollutant: String,

        #[arg(long, allow_negative_numbers = true, help = "Concentration in µg/m³")]
        value: f64,
    },

    /// Score forecasts against observations
    Evaluate {
        #[arg(long, help = "CSV of forecast pollutant columns")]
        forecast: PathBuf,

        #[arg(long, help = "CSV of observed pollutant columns, same rows as the forecast")]
        observed: PathBuf,

        #[arg(long, help = "CSV of historical pollutant columns used for the weights")]
        history: PathBuf,

        #[arg(
            short,
            long = "pollutant",
            help = "Pollutant to include (repeatable) [default: every forecast column]"
        )]
        pollutants: Vec<String>,
    },
}
