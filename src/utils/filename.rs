use crate::writers::OutputFormat;
use chrono::{Datelike, Local, NaiveDate};
use std::path::PathBuf;

/// Default output path: output/atmo-index-{YYMMDD}.{ext}
pub fn generate_default_output_filename(format: OutputFormat) -> PathBuf {
    output_filename_for(Local::now().date_naive(), format)
}

pub fn output_filename_for(date: NaiveDate, format: OutputFormat) -> PathBuf {
    let filename = format!(
        "atmo-index-{:02}{:02}{:02}.{}",
        date.year() % 100,
        date.month(),
        date.day(),
        format.extension()
    );
    PathBuf::from("output").join(filename)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_filename_for() {
        let date = NaiveDate::from_ymd_opt(2025, 3, 7).unwrap();

        assert_eq!(
            output_filename_for(date, OutputFormat::Parquet),
            PathBuf::from("output/atmo-index-250307.parquet")
        );
        assert_eq!(
            output_filename_for(date, OutputFormat::Json),
            PathBuf::from("output/atmo-index-250307.json")
        );
    }

    #[test]
    fn test_generate_default_output_filename() {
        let filename = generate_default_output_filename(OutputFormat::Csv);
        let filename_str = filename.to_string_lossy();

        assert!(filename_str.starts_with("output"));
        assert!(filename_str.contains("atmo-index-"));
        assert!(filename_str.ends_with(".csv"));
    }
}
