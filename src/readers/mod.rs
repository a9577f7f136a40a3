pub mod concurrent_reader;
pub mod hourly_reader;
pub mod series_reader;

pub use concurrent_reader::ConcurrentReader;
pub use hourly_reader::{HourlyBatch, HourlyReader};
pub use series_reader::{PollutantSeries, SeriesReader};
