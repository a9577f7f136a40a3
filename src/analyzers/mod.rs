pub mod forecast_eval;
pub mod index_analyzer;

pub use forecast_eval::{ForecastEvaluation, ForecastEvaluator, PollutantError};
pub use index_analyzer::{IndexAnalyzer, IndexStatistics, MonthlyMeans, RegionIndexStats};
