pub mod category;
pub mod observation;
pub mod pollutant;
pub mod summary;

pub use category::AtmoCategory;
pub use observation::HourlyObservation;
pub use pollutant::{ClimateVariable, Pollutant};
pub use summary::{DailyRegionSummary, GroupKey};
