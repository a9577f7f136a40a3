/// Sub-index upper bounds (µg/m³); a value equal to bound `i` (1-based) grades `i`
pub const PM10_THRESHOLDS: [f64; 9] = [6.0, 13.0, 20.0, 27.0, 34.0, 41.0, 49.0, 64.0, 79.0];
pub const PM2_5_THRESHOLDS: [f64; 9] = [5.0, 10.0, 15.0, 20.0, 25.0, 30.0, 40.0, 50.0, 75.0];
pub const NO2_THRESHOLDS: [f64; 9] = [29.0, 54.0, 84.0, 109.0, 134.0, 164.0, 199.0, 274.0, 399.0];
pub const O3_THRESHOLDS: [f64; 9] = [29.0, 54.0, 79.0, 104.0, 129.0, 149.0, 179.0, 209.0, 239.0];
pub const SO2_THRESHOLDS: [f64; 9] = [39.0, 79.0, 119.0, 159.0, 199.0, 249.0, 299.0, 399.0, 499.0];

/// Grade above every threshold
pub const MAX_GRADE: u8 = 10;

/// Width of the ozone rolling window in hourly readings
pub const OZONE_WINDOW_HOURS: usize = 8;

/// Input column names
pub const DAY_COLUMN: &str = "day";
pub const DATE_COLUMN: &str = "date";
pub const HOUR_COLUMN: &str = "hour";
pub const REGION_COLUMN: &str = "region";
pub const INDEX_COLUMN: &str = "indice_atmo";

/// Processing defaults
pub const DEFAULT_CHUNK_SIZE: usize = 1000;
pub const DEFAULT_ROW_GROUP_SIZE: usize = 10000;
pub const DEFAULT_BUFFER_SIZE: usize = 8192 * 16; // 128KB

/// Configuration environment prefix (ATMO__INDEX__MISSING_POLICY=...)
pub const CONFIG_ENV_PREFIX: &str = "ATMO";

/// Parquet compression options
pub const COMPRESSION_SNAPPY: &str = "snappy";
pub const COMPRESSION_GZIP: &str = "gzip";
pub const COMPRESSION_LZ4: &str = "lz4";
pub const COMPRESSION_ZSTD: &str = "zstd";
pub const COMPRESSION_NONE: &str = "none";
