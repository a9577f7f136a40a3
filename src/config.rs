use crate::error::{ProcessingError, Result};
use crate::models::Pollutant;
use crate::processors::{IndexTables, MissingPolicy, ThresholdTable};
use crate::utils::constants::{
    COMPRESSION_SNAPPY, CONFIG_ENV_PREFIX, DEFAULT_CHUNK_SIZE, DEFAULT_ROW_GROUP_SIZE,
};
use crate::writers::OutputFormat;
use config::{Config, Environment, File};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::debug;
use validator::Validate;

/// Looked up in the working directory when no `--config` is given
pub const DEFAULT_CONFIG_FILE: &str = "atmo.toml";

/// Top-level configuration.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(default, deny_unknown_fields)]
pub struct AtmoConfig {
    /// Grading settings.
    #[validate(nested)]
    pub index: IndexConfig,

    /// Default region allow-list; empty keeps every region.
    pub regions: Vec<String>,

    /// Worker pool settings.
    #[validate(nested)]
    pub processing: ProcessingConfig,

    /// Output table settings.
    #[validate(nested)]
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(default, deny_unknown_fields)]
pub struct IndexConfig {
    pub missing_policy: MissingPolicy,

    /// Replacement bounds keyed by pollutant name, 9 values each
    pub thresholds: BTreeMap<String, Vec<f64>>,
}

impl IndexConfig {
    /// Default tables with the configured overrides applied
    pub fn index_tables(&self) -> Result<IndexTables> {
        let mut tables = IndexTables::new();
        for (name, bounds) in &self.thresholds {
            let pollutant: Pollutant = name.parse()?;
            tables = tables.with_table(ThresholdTable::from_slice(pollutant, bounds)?);
            debug!("Using configured {} thresholds {:?}", pollutant, bounds);
        }
        Ok(tables)
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    #[validate(range(min = 1))]
    pub max_workers: usize,

    #[validate(range(min = 1))]
    pub chunk_size: usize,

    pub use_mmap: bool,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            max_workers: num_cpus::get(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            use_mmap: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(default, deny_unknown_fields)]
pub struct OutputConfig {
    pub format: OutputFormat,

    #[validate(length(min = 1))]
    pub compression: String,

    #[validate(range(min = 1))]
    pub row_group_size: usize,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: OutputFormat::Parquet,
            compression: COMPRESSION_SNAPPY.to_string(),
            row_group_size: DEFAULT_ROW_GROUP_SIZE,
        }
    }
}

impl AtmoConfig {
    /// Load configuration from a TOML file overlaid with `ATMO__*` variables.
    ///
    /// An explicit `path` must exist; otherwise `atmo.toml` is read when
    /// present. Threshold overrides are checked here so a bad table fails
    /// before any data is read.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let file_source = match path {
            Some(path) => File::from(path).required(true),
            None => File::with_name(DEFAULT_CONFIG_FILE).required(false),
        };

        let config: AtmoConfig = Config::builder()
            .add_source(file_source)
            .add_source(
                Environment::with_prefix(CONFIG_ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("regions")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        config.check()?;
        debug!("Loaded configuration: {:?}", config);
        Ok(config)
    }

    /// Parse configuration from TOML text, without the environment overlay
    pub fn from_toml(text: &str) -> Result<Self> {
        let config: AtmoConfig = Config::builder()
            .add_source(File::from_str(text, config::FileFormat::Toml))
            .build()?
            .try_deserialize()?;

        config.check()?;
        Ok(config)
    }

    fn check(&self) -> Result<()> {
        self.validate()?;
        self.index.index_tables()?;
        if self.regions.iter().any(|r| r.trim().is_empty()) {
            return Err(ProcessingError::Config(
                "regions must not contain empty names".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = AtmoConfig::from_toml("").unwrap();

        assert_eq!(config.index.missing_policy, MissingPolicy::SkipMissing);
        assert!(config.regions.is_empty());
        assert_eq!(config.output.format, OutputFormat::Parquet);
        assert_eq!(config.output.compression, "snappy");
        assert!(config.processing.max_workers >= 1);
    }

    #[test]
    fn test_full_file() {
        let config = AtmoConfig::from_toml(
            r#"
            regions = ["Bretagne", "Normandie"]

            [index]
            missing_policy = "propagate"

            [index.thresholds]
            pm10 = [5, 10, 15, 20, 25, 30, 35, 40, 45]

            [processing]
            max_workers = 2
            chunk_size = 50

            [output]
            format = "csv"
            compression = "zstd"
            "#,
        )
        .unwrap();

        assert_eq!(config.regions, vec!["Bretagne", "Normandie"]);
        assert_eq!(config.index.missing_policy, MissingPolicy::Propagate);
        assert_eq!(config.processing.max_workers, 2);
        assert_eq!(config.output.format, OutputFormat::Csv);

        let tables = config.index.index_tables().unwrap();
        assert_eq!(tables.grade(Pollutant::Pm10, 12.0).unwrap(), 3);
        assert_eq!(tables.grade(Pollutant::Ozone, 12.0).unwrap(), 1);
    }

    #[test]
    fn test_invalid_thresholds_rejected() {
        let descending = "[index.thresholds]\nozone = [9, 8, 7, 6, 5, 4, 3, 2, 1]\n";
        assert!(AtmoConfig::from_toml(descending).is_err());

        let short = "[index.thresholds]\nso2 = [1, 2, 3]\n";
        assert!(AtmoConfig::from_toml(short).is_err());

        let unknown = "[index.thresholds]\nco = [1, 2, 3, 4, 5, 6, 7, 8, 9]\n";
        assert!(AtmoConfig::from_toml(unknown).is_err());
    }

    #[test]
    fn test_validation_errors() {
        assert!(AtmoConfig::from_toml("[processing]\nmax_workers = 0\n").is_err());
        assert!(AtmoConfig::from_toml("[output]\nformat = \"xlsx\"\n").is_err());
        assert!(AtmoConfig::from_toml("unknown_key = 1\n").is_err());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "regions = [\"Corse\"]").unwrap();

        let config = AtmoConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.regions, vec!["Corse"]);

        let missing = file.path().with_extension("absent.toml");
        assert!(AtmoConfig::load(Some(&missing)).is_err());
    }
}
