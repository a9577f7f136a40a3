pub mod atmo_calculator;
pub mod daily_aggregator;
pub mod integrity_checker;
pub mod parallel_processor;
pub mod subindex;

pub use atmo_calculator::AtmoCalculator;
pub use daily_aggregator::{DailyAggregate, DailyAggregator};
pub use integrity_checker::{
    IntegrityChecker, IntegrityReport, ObservationViolation, RegionStatistics, ViolationType,
};
pub use parallel_processor::ParallelProcessor;
pub use subindex::{composite_index, IndexTables, MissingPolicy, ThresholdTable};
