use chrono::NaiveDate;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ProcessingError>;

#[derive(Error, Debug)]
pub enum ProcessingError {
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV parsing error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Date parsing error: {0}")]
    DateParse(#[from] chrono::ParseError),

    #[error("Parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Configuration source error: {0}")]
    ConfigSource(#[from] config::ConfigError),

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("Missing required column: {0}")]
    MissingColumn(String),

    #[error("Invalid {pollutant} concentration: {value} (must be finite and non-negative)")]
    InvalidConcentration { pollutant: String, value: f64 },

    #[error("Invalid threshold table for {pollutant}: {message}")]
    InvalidThresholds { pollutant: String, message: String },

    #[error("Cannot grade {region} on {day}: {source}")]
    Grading {
        day: NaiveDate,
        region: String,
        #[source]
        source: Box<ProcessingError>,
    },

    #[error("Unknown pollutant: {0}")]
    UnknownPollutant(String),

    #[error("Forecast evaluation error: {0}")]
    Evaluation(String),

    #[error("Missing required data: {0}")]
    MissingData(String),

    #[error("Invalid data format: {0}")]
    InvalidFormat(String),

    #[error("Async task error: {0}")]
    TaskJoin(#[from] tokio::task::JoinError),
}
